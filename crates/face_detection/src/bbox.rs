/// A type-safe bounding box.
///
/// It wraps four `f32` coordinates, the type parameter `T` marks how they should be read so
/// that corner and center based boxes cannot be mixed up.
///
/// ```
/// use face_detection::bbox::*;
///
/// let prior = Bbox::cxcywh(176.0, 176.0, 256.0, 256.0);
/// let corners: Bbox<Xyxy> = prior.convert();
///
/// assert_eq!(corners.inner, (48.0, 48.0, 304.0, 304.0));
/// ```
///
/// # Formats
///
/// - [`Xyxy`] (xmin, ymin, xmax, ymax)
/// - [`Cxcywh`] (center_x, center_y, width, height)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox<T> {
    pub inner: (f32, f32, f32, f32),
    _marker: std::marker::PhantomData<T>,
}

impl<T> Bbox<T> {
    fn new(bbox: (f32, f32, f32, f32)) -> Self {
        Bbox {
            inner: bbox,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> From<Bbox<T>> for (f32, f32, f32, f32) {
    fn from(bbox: Bbox<T>) -> Self {
        bbox.inner
    }
}

/// Trait for converting a bounding box to a different representation.
pub trait ConvertBbox<T> {
    fn convert(&self) -> Bbox<T>;
}

/// Marker type for bounding boxes with coordinates of the top-left and bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyxy;

impl Bbox<Xyxy> {
    /// Create a bounding box from the coordinates of the top-left and bottom-right corners.
    #[must_use]
    pub fn xyxy(x1: f32, y1: f32, x2: f32, y2: f32) -> Bbox<Xyxy> {
        Bbox::new((x1, y1, x2, y2))
    }

    /// Scale the x coordinates by `scale_x` and the y coordinates by `scale_y`.
    #[must_use]
    pub fn scaled(&self, scale_x: f32, scale_y: f32) -> Bbox<Xyxy> {
        let (x1, y1, x2, y2) = self.inner;
        Bbox::new((x1 * scale_x, y1 * scale_y, x2 * scale_x, y2 * scale_y))
    }

    /// Area of the box on a discrete pixel grid, where both corners are inside the box.
    ///
    /// A box from `(0, 0)` to `(9, 9)` covers 10 by 10 pixels, so its area is `100.0`.
    #[must_use]
    pub fn inclusive_area(&self) -> f32 {
        let (x1, y1, x2, y2) = self.inner;
        (x2 - x1 + 1.0) * (y2 - y1 + 1.0)
    }

    /// Overlapping area of two boxes, using the same pixel convention as
    /// [`Bbox::inclusive_area`]. Boxes that do not overlap have an intersection of `0.0`.
    #[must_use]
    pub fn inclusive_intersection(&self, other: &Bbox<Xyxy>) -> f32 {
        let (x1, y1, x2, y2) = self.inner;
        let (x3, y3, x4, y4) = other.inner;

        let w = (x2.min(x4) - x1.max(x3) + 1.0).max(0.0);
        let h = (y2.min(y4) - y1.max(y3) + 1.0).max(0.0);
        w * h
    }

    /// Intersection over union of two boxes, on the discrete pixel grid.
    ///
    /// Returns `0.0` when the union is empty.
    #[must_use]
    pub fn inclusive_iou(&self, other: &Bbox<Xyxy>) -> f32 {
        let intersection = self.inclusive_intersection(other);
        let union = self.inclusive_area() + other.inclusive_area() - intersection;

        if union == 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

impl ConvertBbox<Xyxy> for Bbox<Xyxy> {
    fn convert(&self) -> Bbox<Xyxy> {
        *self
    }
}

impl ConvertBbox<Cxcywh> for Bbox<Xyxy> {
    fn convert(&self) -> Bbox<Cxcywh> {
        let (x1, y1, x2, y2) = self.inner;
        Bbox::new(((x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1))
    }
}

/// Marker type for bounding boxes with coordinates of the center and the width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cxcywh;

impl Bbox<Cxcywh> {
    /// Create a bounding box from the coordinates of the center and the width and height.
    #[must_use]
    pub fn cxcywh(cx: f32, cy: f32, w: f32, h: f32) -> Bbox<Cxcywh> {
        Bbox::new((cx, cy, w, h))
    }
}

impl ConvertBbox<Xyxy> for Bbox<Cxcywh> {
    fn convert(&self) -> Bbox<Xyxy> {
        let (cx, cy, w, h) = self.inner;
        let x1 = cx - w / 2.0;
        let y1 = cy - h / 2.0;
        Bbox::new((x1, y1, x1 + w, y1 + h))
    }
}

impl ConvertBbox<Cxcywh> for Bbox<Cxcywh> {
    fn convert(&self) -> Bbox<Cxcywh> {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inclusive_iou_xyxy() {
        let bbox1 = Bbox::xyxy(0.0, 0.0, 9.0, 9.0);
        let bbox2 = Bbox::xyxy(5.0, 5.0, 14.0, 14.0);

        assert_eq!(bbox1.inclusive_area(), 100.0);
        assert_eq!(bbox1.inclusive_intersection(&bbox2), 25.0);
        assert_eq!(bbox1.inclusive_iou(&bbox2), 25.0 / 175.0);
    }

    #[test]
    fn touching_boxes_share_a_pixel_column() {
        let bbox1 = Bbox::xyxy(0.0, 0.0, 9.0, 9.0);
        let bbox2 = Bbox::xyxy(9.0, 0.0, 18.0, 9.0);

        assert_eq!(bbox1.inclusive_intersection(&bbox2), 10.0);
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let bbox1 = Bbox::xyxy(0.0, 0.0, 4.0, 4.0);
        let bbox2 = Bbox::xyxy(10.0, 10.0, 14.0, 14.0);

        assert_eq!(bbox1.inclusive_intersection(&bbox2), 0.0);
        assert_eq!(bbox1.inclusive_iou(&bbox2), 0.0);
    }

    #[test]
    fn zero_union_has_zero_iou() {
        // a degenerate box with a width and height of -1 pixel has an area of zero
        let degenerate = Bbox::xyxy(5.0, 5.0, 4.0, 4.0);

        assert_eq!(degenerate.inclusive_area(), 0.0);
        assert_eq!(degenerate.inclusive_iou(&degenerate), 0.0);
    }

    #[test]
    fn convert_between_formats() {
        let center = Bbox::cxcywh(10.0, 20.0, 4.0, 8.0);
        let corners: Bbox<Xyxy> = center.convert();
        assert_eq!(corners.inner, (8.0, 16.0, 12.0, 24.0));

        let back: Bbox<Cxcywh> = corners.convert();
        assert_eq!(back.inner, center.inner);
    }

    #[test]
    fn scaled_scales_axes_independently() {
        let bbox = Bbox::xyxy(1.0, 2.0, 3.0, 4.0).scaled(2.0, 0.5);
        assert_eq!(bbox.inner, (2.0, 1.0, 6.0, 2.0));
    }
}
