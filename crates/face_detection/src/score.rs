//! Confidence filtering of decoded proposals.

use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{Error, Result};

/// Column of the class scores that holds the face probability.
pub const FACE_CLASS: usize = 1;

/// Extract the face probability of every anchor from the `(N, 2)` class scores.
pub fn face_scores(class_scores: ArrayView2<f32>) -> Result<Array1<f32>> {
    if class_scores.ncols() <= FACE_CLASS {
        return Err(Error::InvalidShape {
            name: "class scores".to_string(),
            shape: class_scores.shape().to_vec(),
            expected: "(N, 2)",
        });
    }

    Ok(class_scores.column(FACE_CLASS).to_owned())
}

/// Keep the boxes whose score is strictly above `threshold`, in their original order.
///
/// A score equal to the threshold is dropped, and so is a `NaN` score.
pub fn filter_by_score(
    scores: ArrayView1<f32>,
    boxes: ArrayView2<f32>,
    threshold: f32,
) -> Result<(Array2<f32>, Array1<f32>)> {
    if scores.len() != boxes.nrows() {
        return Err(Error::ShapeMismatch {
            what: "scores",
            expected: boxes.nrows(),
            found: scores.len(),
        });
    }

    let keep = scores.iter().positions(|&score| score > threshold).collect_vec();

    Ok((boxes.select(Axis(0), &keep), scores.select(Axis(0), &keep)))
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        let threshold = 0.5_f32;
        let above = f32::from_bits(threshold.to_bits() + 1);

        let scores = array![threshold, above, 0.2];
        let boxes = array![
            [0.0, 0.0, 1.0, 1.0],
            [1.0, 1.0, 2.0, 2.0],
            [2.0, 2.0, 3.0, 3.0]
        ];

        let (kept_boxes, kept_scores) =
            filter_by_score(scores.view(), boxes.view(), threshold).unwrap();

        assert_eq!(kept_scores.to_vec(), vec![above]);
        assert_eq!(kept_boxes.row(0).to_vec(), vec![1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn order_is_preserved() {
        let scores = array![0.9, 0.1, 0.6, 0.7];
        let boxes = array![
            [0.0, 0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 1.0],
            [2.0, 2.0, 2.0, 2.0],
            [3.0, 3.0, 3.0, 3.0]
        ];

        let (kept_boxes, kept_scores) = filter_by_score(scores.view(), boxes.view(), 0.5).unwrap();

        assert_eq!(kept_scores.to_vec(), vec![0.9, 0.6, 0.7]);
        assert_eq!(kept_boxes.column(0).to_vec(), vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn nothing_passes() {
        let scores = array![0.1, f32::NAN];
        let boxes = Array2::<f32>::zeros((2, 4));

        let (kept_boxes, kept_scores) = filter_by_score(scores.view(), boxes.view(), 0.5).unwrap();

        assert!(kept_scores.is_empty());
        assert_eq!(kept_boxes.dim(), (0, 4));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let scores = array![0.9];
        let boxes = Array2::<f32>::zeros((2, 4));

        assert!(matches!(
            filter_by_score(scores.view(), boxes.view(), 0.5),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn face_scores_takes_second_column() {
        let class_scores = array![[0.9, 0.1], [0.2, 0.8]];
        assert_eq!(face_scores(class_scores.view()).unwrap().to_vec(), vec![0.1, 0.8]);

        let single_class = array![[0.9], [0.2]];
        assert!(matches!(
            face_scores(single_class.view()),
            Err(Error::InvalidShape { .. })
        ));
    }
}
