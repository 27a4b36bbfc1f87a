//! Configuration of the post-processing pipeline.

use std::path::Path;

use odal::{Config, ConfigKind, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    anchor::{FeatureLevel, default_levels},
    error::{Error, Result},
    outputs::TensorNames,
};

/// Default IoU above which a lower scoring box is suppressed.
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;

/// Default face probability a detection must exceed.
pub const DEFAULT_FACE_PROB_THRESHOLD: f32 = 0.5;

/// Default box decoding variance, this has to match the encoding used while training the
/// detector.
pub const DEFAULT_VARIANCE: [f32; 2] = [0.1, 0.2];

/// Size of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Configuration of the [`Postprocessor`](crate::Postprocessor).
///
/// Only the image sizes are required, every other field falls back to the default the
/// detector was trained with.
///
/// ```toml
/// origin_image_size = { width = 1280, height = 960 }
/// input_image_size = { width = 640, height = 480 }
/// nms_threshold = 0.3
/// face_prob_threshold = 0.5
/// variance = [0.1, 0.2]
///
/// [tensor_names]
/// boxes = "face_rpn_bbox_pred"
/// scores = "face_rpn_cls_prob"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostprocessConfig {
    /// Size of the image the detections are reported in.
    pub origin_image_size: ImageSize,
    /// Size of the image the detector was run on.
    pub input_image_size: ImageSize,
    #[serde(default = "default_nms_threshold")]
    pub nms_threshold: f32,
    #[serde(default = "default_face_prob_threshold")]
    pub face_prob_threshold: f32,
    #[serde(default = "default_variance")]
    pub variance: [f32; 2],
    /// The feature map levels of the detector, in the order the detector emits its outputs.
    #[serde(default = "default_levels")]
    pub levels: Vec<FeatureLevel>,
    #[serde(default)]
    pub tensor_names: TensorNames,
}

fn default_nms_threshold() -> f32 {
    DEFAULT_NMS_THRESHOLD
}

fn default_face_prob_threshold() -> f32 {
    DEFAULT_FACE_PROB_THRESHOLD
}

fn default_variance() -> [f32; 2] {
    DEFAULT_VARIANCE
}

impl Config for PostprocessConfig {
    const PATH: &'static str = "face_detection.toml";
}

impl PostprocessConfig {
    /// Create a config with the default thresholds, variance and feature levels.
    #[must_use]
    pub fn new(origin_image_size: ImageSize, input_image_size: ImageSize) -> Self {
        Self {
            origin_image_size,
            input_image_size,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            face_prob_threshold: DEFAULT_FACE_PROB_THRESHOLD,
            variance: DEFAULT_VARIANCE,
            levels: default_levels(),
            tensor_names: TensorNames::default(),
        }
    }

    #[must_use]
    pub fn with_nms_threshold(mut self, nms_threshold: f32) -> Self {
        self.nms_threshold = nms_threshold;
        self
    }

    #[must_use]
    pub fn with_face_prob_threshold(mut self, face_prob_threshold: f32) -> Self {
        self.face_prob_threshold = face_prob_threshold;
        self
    }

    #[must_use]
    pub fn with_variance(mut self, variance: [f32; 2]) -> Self {
        self.variance = variance;
        self
    }

    #[must_use]
    pub fn with_tensor_names(mut self, tensor_names: TensorNames) -> Self {
        self.tensor_names = tensor_names;
        self
    }

    /// Load the config from `main_dir`, applying the overlay in `overlay_dir` if there is one.
    pub fn load_or_overlay(main_dir: impl AsRef<Path>, overlay_dir: impl AsRef<Path>) -> Result<Self> {
        let config = match Self::load_with_overlay(&main_dir, &overlay_dir) {
            Ok(config) => config,
            Err(odal::Error {
                name,
                kind:
                    ErrorKind::Load {
                        path,
                        config_kind: ConfigKind::Overlay,
                        ..
                    },
            }) => {
                tracing::warn!("`{name}`: failed to read overlay from `{path}`, using main config");
                Self::load(&main_dir)?
            }
            Err(e) => return Err(e.into()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the config describes a usable pipeline.
    pub fn validate(&self) -> Result<()> {
        for (name, size) in [
            ("origin_image_size", self.origin_image_size),
            ("input_image_size", self.input_image_size),
        ] {
            if size.width == 0 || size.height == 0 {
                return Err(Error::InvalidConfig(format!(
                    "`{name}` must be non-zero, got {}x{}",
                    size.width, size.height
                )));
            }
        }

        if !self.nms_threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "`nms_threshold` must be finite, got {}",
                self.nms_threshold
            )));
        }

        if !self.face_prob_threshold.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "`face_prob_threshold` must be finite, got {}",
                self.face_prob_threshold
            )));
        }

        if !self.variance.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "`variance` must be finite, got {:?}",
                self.variance
            )));
        }

        if self.levels.is_empty() {
            return Err(Error::InvalidConfig("`levels` must not be empty".to_string()));
        }

        if let Some(level) = self
            .levels
            .iter()
            .find(|level| level.step == 0 || level.min_sizes.is_empty())
        {
            return Err(Error::InvalidConfig(format!(
                "every level needs a non-zero step and at least one min size, got {level:?}"
            )));
        }

        Ok(())
    }
}
