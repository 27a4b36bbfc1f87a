//! Runs the post-processing pipeline on synthetic detector outputs.
//!
//! The config is loaded from the directory passed as the first argument, if any:
//!
//! ```sh
//! RUST_LOG=debug cargo run --example single_detect -- ./config
//! ```

use face_detection::prelude::*;
use miette::{IntoDiagnostic, Result};
use ndarray::{Array2, Array3};
use odal::Config;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    miette::set_panic_hook();

    let config = match std::env::args().nth(1) {
        Some(dir) => PostprocessConfig::load(dir)?,
        None => PostprocessConfig::new(ImageSize::new(1280, 720), ImageSize::new(640, 360)),
    };
    let postprocessor = Postprocessor::new(config)?;
    let num_priors = postprocessor.priors().nrows();

    // the detector emits a batch dimension
    let deltas = Array3::<f32>::zeros((1, num_priors, 4));
    let mut scores = Array2::<f32>::from_elem((num_priors, 2), 0.0);
    scores.column_mut(0).fill(1.0);

    // pretend a few neighbouring anchors fired on the same face
    for (index, score) in [(num_priors / 2, 0.95), (num_priors / 2 + 2, 0.9), (num_priors - 1, 0.6)] {
        scores[[index, 0]] = 1.0 - score;
        scores[[index, 1]] = score;
    }

    let outputs: RawOutputs = [
        ("face_rpn_bbox_pred", deltas.into_dyn()),
        (
            "face_rpn_cls_prob",
            scores.into_shape_with_order((1, num_priors, 2)).into_diagnostic()?.into_dyn(),
        ),
    ]
    .into_iter()
    .collect();

    for detection in postprocessor.process(&outputs)? {
        let (x1, y1, x2, y2) = detection.bbox.inner;
        tracing::info!(
            "face: {:.3} at ({x1:.1}, {y1:.1}) - ({x2:.1}, {y2:.1})",
            detection.score
        );
    }

    Ok(())
}
