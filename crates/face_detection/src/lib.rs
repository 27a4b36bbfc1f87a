//! Post-processing for single-stage, anchor-based face detectors.
//!
//! The detector emits a box regression and a `(background, face)` score for every prior box.
//! The [`Postprocessor`] turns these into face detections in original image coordinates:
//!
//! 1. [`anchor`] generates the priors for the detector input size.
//! 2. [`box_coder`] decodes the box regression against the priors.
//! 3. [`score`] drops proposals with a low face probability.
//! 4. [`nms`] removes overlapping proposals.
//! 5. [`rescale`] maps the remaining boxes to the original image.
//!
//! ## Example
//! ```
//! use face_detection::prelude::*;
//! use ndarray::Array2;
//!
//! let config = PostprocessConfig::new(ImageSize::new(640, 640), ImageSize::new(320, 320));
//! let postprocessor = Postprocessor::new(config).unwrap();
//!
//! let num_priors = postprocessor.priors().nrows();
//! let deltas = Array2::<f32>::zeros((num_priors, 4));
//! let scores = Array2::<f32>::zeros((num_priors, 2));
//!
//! let detections = postprocessor.process_arrays(deltas.view(), scores.view()).unwrap();
//! assert!(detections.is_empty());
//! ```

pub mod anchor;
pub mod bbox;
pub mod box_coder;
pub mod config;
mod error;
pub mod nms;
pub mod outputs;
pub mod postprocess;
pub mod rescale;
pub mod score;

pub use config::{ImageSize, PostprocessConfig};
pub use error::{Error, Result};
pub use postprocess::{Detection, Postprocessor};

#[allow(missing_docs)]
pub mod prelude {
    pub use crate::anchor::{FeatureLevel, Prior, PriorBoxGenerator};
    pub use crate::bbox::{Bbox, ConvertBbox, Cxcywh, Xyxy};
    pub use crate::box_coder::BoxCoder;
    pub use crate::config::{ImageSize, PostprocessConfig};
    pub use crate::error::{Error, Result};
    pub use crate::outputs::{RawOutputs, TensorNames, TensorRole};
    pub use crate::postprocess::{Detection, Postprocessor};
    pub use crate::rescale::Rescaler;
}
