use crate::{
    bbox::{Bbox, Xyxy},
    config::ImageSize,
};

/// Maps boxes from the detector input image to the original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescaler {
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Rescaler {
    #[must_use]
    pub fn new(origin_size: ImageSize, input_size: ImageSize) -> Self {
        Self {
            scale_x: origin_size.width as f32 / input_size.width as f32,
            scale_y: origin_size.height as f32 / input_size.height as f32,
        }
    }

    #[must_use]
    pub fn rescale(&self, bbox: Bbox<Xyxy>) -> Bbox<Xyxy> {
        bbox.scaled(self.scale_x, self.scale_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_are_scaled_independently() {
        let rescaler = Rescaler::new(ImageSize::new(1280, 480), ImageSize::new(640, 640));
        assert_eq!(rescaler.scale_x, 2.0);
        assert_eq!(rescaler.scale_y, 0.75);

        let bbox = rescaler.rescale(Bbox::xyxy(10.0, 40.0, 20.0, 80.0));
        assert_eq!(bbox.inner, (20.0, 30.0, 40.0, 60.0));
    }
}
