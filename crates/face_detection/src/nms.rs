//! Greedy non-maximum suppression.

use std::cmp::Ordering;

use itertools::{Itertools, izip};
use ndarray::{Array1, ArrayView1};

use crate::{
    bbox::{Bbox, Xyxy},
    error::{Error, Result},
};

/// Applies greedy Non-Maximum Suppression (NMS) to boxes given as coordinate columns.
///
/// Returns the indices of the kept boxes, in the order they were selected, which is by
/// descending score. Boxes with an equal score are selected lowest index first, and NaN
/// scores, regardless of their sign, are selected before all others.
///
/// Areas and intersections are measured on the discrete pixel grid, so a box from `x1` to
/// `x2` is `x2 - x1 + 1` pixels wide. A box is suppressed unless its IoU with an already
/// selected box is at most `threshold`, so a NaN IoU suppresses. The IoU of two boxes with an
/// empty union is `0.0`.
///
/// All arithmetic is done in `f32`. Results may differ from a `f64` implementation for
/// boxes whose IoU is within rounding distance of `threshold`.
pub fn non_max_suppression(
    x1: ArrayView1<f32>,
    y1: ArrayView1<f32>,
    x2: ArrayView1<f32>,
    y2: ArrayView1<f32>,
    scores: ArrayView1<f32>,
    threshold: f32,
) -> Result<Vec<usize>> {
    let num_boxes = scores.len();
    for found in [x1.len(), y1.len(), x2.len(), y2.len()] {
        if found != num_boxes {
            return Err(Error::ShapeMismatch {
                what: "box coordinates",
                expected: num_boxes,
                found,
            });
        }
    }

    let areas = izip!(x1, y1, x2, y2)
        .map(|(x1, y1, x2, y2)| (x2 - x1 + 1.0) * (y2 - y1 + 1.0))
        .collect_vec();

    // stable sort, so ties keep their original order
    let mut order = (0..num_boxes).collect_vec();
    order.sort_by(|&a, &b| descending_nan_first(scores[a], scores[b]));

    let mut keep = Vec::new();
    while let Some((&i, rest)) = order.split_first() {
        keep.push(i);

        order = rest
            .iter()
            .copied()
            .filter(|&j| {
                let w = (x2[i].min(x2[j]) - x1[i].max(x1[j]) + 1.0).max(0.0);
                let h = (y2[i].min(y2[j]) - y1[i].max(y1[j]) + 1.0).max(0.0);
                let intersection = w * h;

                let union = areas[i] + areas[j] - intersection;
                let overlap = if union == 0.0 {
                    0.0
                } else {
                    intersection / union
                };

                overlap <= threshold
            })
            .collect();
    }

    Ok(keep)
}

fn descending_nan_first(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Applies [`non_max_suppression`] to a slice of boxes.
pub fn suppress_boxes(boxes: &[Bbox<Xyxy>], scores: &[f32], threshold: f32) -> Result<Vec<usize>> {
    if boxes.len() != scores.len() {
        return Err(Error::ShapeMismatch {
            what: "scores",
            expected: boxes.len(),
            found: scores.len(),
        });
    }

    let column = |f: fn(&Bbox<Xyxy>) -> f32| boxes.iter().map(f).collect::<Array1<f32>>();
    let x1 = column(|b| b.inner.0);
    let y1 = column(|b| b.inner.1);
    let x2 = column(|b| b.inner.2);
    let y2 = column(|b| b.inner.3);

    non_max_suppression(
        x1.view(),
        y1.view(),
        x2.view(),
        y2.view(),
        ArrayView1::from(scores),
        threshold,
    )
}
