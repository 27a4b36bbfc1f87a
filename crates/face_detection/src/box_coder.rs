use ndarray::{Array2, ArrayView2, Axis, s, stack};

use crate::{
    config::{DEFAULT_VARIANCE, ImageSize},
    error::{Error, Result},
};

/// Decodes box regression outputs relative to a set of priors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxCoder {
    pub variance: [f32; 2],
}

impl Default for BoxCoder {
    fn default() -> Self {
        Self::new(DEFAULT_VARIANCE)
    }
}

impl BoxCoder {
    /// Create a new [`BoxCoder`] with the given variance.
    ///
    /// The first value scales the center offsets, the second one the log-space size offsets.
    #[must_use]
    pub fn new(variance: [f32; 2]) -> Self {
        BoxCoder { variance }
    }

    /// Decode `deltas` (`dx, dy, dw, dh`) against `priors` (`cx, cy, s_kx, s_ky`) into
    /// normalized `x_min, y_min, x_max, y_max` boxes.
    pub fn decode(&self, deltas: ArrayView2<f32>, priors: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_columns("deltas", deltas)?;
        check_columns("priors", priors)?;

        if deltas.nrows() != priors.nrows() {
            return Err(Error::ShapeMismatch {
                what: "box deltas",
                expected: priors.nrows(),
                found: deltas.nrows(),
            });
        }

        let [center_variance, size_variance] = self.variance;

        let ctr_x = &priors.column(0) + &(&deltas.column(0) * center_variance * &priors.column(2));
        let ctr_y = &priors.column(1) + &(&deltas.column(1) * center_variance * &priors.column(3));

        let w = &priors.column(2) * &deltas.column(2).mapv(|dw| (dw * size_variance).exp());
        let h = &priors.column(3) * &deltas.column(3).mapv(|dh| (dh * size_variance).exp());

        let x1 = ctr_x - &w / 2.0;
        let y1 = ctr_y - &h / 2.0;
        let x2 = &x1 + &w;
        let y2 = &y1 + &h;

        Ok(stack![Axis(1), x1, y1, x2, y2])
    }

    /// Decode like [`BoxCoder::decode`], and scale the boxes to pixel coordinates of an
    /// image with the given size.
    pub fn decode_to_pixels(
        &self,
        deltas: ArrayView2<f32>,
        priors: ArrayView2<f32>,
        input_size: ImageSize,
    ) -> Result<Array2<f32>> {
        let mut boxes = self.decode(deltas, priors)?;

        let width = input_size.width as f32;
        let height = input_size.height as f32;
        boxes.slice_mut(s![.., 0..;2]).mapv_inplace(|x| x * width);
        boxes.slice_mut(s![.., 1..;2]).mapv_inplace(|y| y * height);

        Ok(boxes)
    }
}

fn check_columns(name: &str, array: ArrayView2<f32>) -> Result<()> {
    if array.ncols() == 4 {
        return Ok(());
    }

    Err(Error::InvalidShape {
        name: name.to_string(),
        shape: array.shape().to_vec(),
        expected: "(N, 4)",
    })
}
