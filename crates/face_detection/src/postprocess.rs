use ndarray::{Array2, ArrayView2};

use crate::{
    anchor::PriorBoxGenerator,
    bbox::{Bbox, Xyxy},
    box_coder::BoxCoder,
    config::PostprocessConfig,
    error::{Error, Result},
    nms::non_max_suppression,
    outputs::RawOutputs,
    rescale::Rescaler,
    score::{face_scores, filter_by_score},
};

/// A detected face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// The bounding box of the face in original image coordinates.
    pub bbox: Bbox<Xyxy>,
    /// The face probability of the detection.
    pub score: f32,
}

impl From<Detection> for (f32, f32, f32, f32, f32) {
    fn from(detection: Detection) -> Self {
        let (x1, y1, x2, y2) = detection.bbox.inner;
        (x1, y1, x2, y2, detection.score)
    }
}

/// Turns the raw outputs of the face detector into [`Detection`]s.
///
/// The priors only depend on the input size, so they are generated once when the
/// postprocessor is created. A postprocessor holds no mutable state and can be shared
/// between threads.
#[derive(Debug, Clone)]
pub struct Postprocessor {
    config: PostprocessConfig,
    priors: Array2<f32>,
    box_coder: BoxCoder,
    rescaler: Rescaler,
}

impl Postprocessor {
    pub fn new(config: PostprocessConfig) -> Result<Self> {
        config.validate()?;

        let priors = PriorBoxGenerator::new(config.levels.clone()).generate(config.input_image_size);
        tracing::debug!(
            num_priors = priors.nrows(),
            input = ?config.input_image_size,
            origin = ?config.origin_image_size,
            "generated priors"
        );

        Ok(Self {
            box_coder: BoxCoder::new(config.variance),
            rescaler: Rescaler::new(config.origin_image_size, config.input_image_size),
            priors,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    /// The `(N, 4)` priors the raw outputs are decoded against.
    #[must_use]
    pub fn priors(&self) -> ArrayView2<'_, f32> {
        self.priors.view()
    }

    #[must_use]
    pub fn scale_x(&self) -> f32 {
        self.rescaler.scale_x
    }

    #[must_use]
    pub fn scale_y(&self) -> f32 {
        self.rescaler.scale_y
    }

    /// Post-process the named output tensors of a single detector run.
    pub fn process(&self, outputs: &RawOutputs) -> Result<Vec<Detection>> {
        let resolved = outputs.resolve(&self.config.tensor_names)?;
        self.process_arrays(resolved.deltas, resolved.scores)
    }

    /// Post-process the `(N, 4)` box deltas and `(N, 2)` class scores of a single detector
    /// run, where `N` is the number of priors.
    ///
    /// Detections are returned by descending score.
    pub fn process_arrays(
        &self,
        deltas: ArrayView2<f32>,
        class_scores: ArrayView2<f32>,
    ) -> Result<Vec<Detection>> {
        let num_priors = self.priors.nrows();
        for (what, found) in [
            ("box deltas", deltas.nrows()),
            ("class scores", class_scores.nrows()),
        ] {
            if found != num_priors {
                return Err(Error::ShapeMismatch {
                    what,
                    expected: num_priors,
                    found,
                });
            }
        }

        let proposals = self.box_coder.decode_to_pixels(
            deltas,
            self.priors.view(),
            self.config.input_image_size,
        )?;
        let scores = face_scores(class_scores)?;

        let (proposals, scores) = filter_by_score(
            scores.view(),
            proposals.view(),
            self.config.face_prob_threshold,
        )?;
        tracing::debug!(candidates = scores.len(), "filtered proposals by face probability");

        if scores.is_empty() {
            return Ok(Vec::new());
        }

        let keep = non_max_suppression(
            proposals.column(0),
            proposals.column(1),
            proposals.column(2),
            proposals.column(3),
            scores.view(),
            self.config.nms_threshold,
        )?;
        tracing::debug!(detections = keep.len(), "applied non-maximum suppression");

        Ok(keep
            .into_iter()
            .map(|i| {
                let bbox = Bbox::xyxy(
                    proposals[[i, 0]],
                    proposals[[i, 1]],
                    proposals[[i, 2]],
                    proposals[[i, 3]],
                );

                Detection {
                    bbox: self.rescaler.rescale(bbox),
                    score: scores[i],
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageSize;

    #[test]
    fn postprocessor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Postprocessor>();
    }

    #[test]
    fn caches_priors_for_input_size() {
        let postprocessor = Postprocessor::new(PostprocessConfig::new(
            ImageSize::new(1280, 960),
            ImageSize::new(640, 480),
        ))
        .unwrap();

        // (80 * 60 + 40 * 30 + 20 * 15) * 2
        assert_eq!(postprocessor.priors().nrows(), 12600);
        assert_eq!(postprocessor.scale_x(), 2.0);
        assert_eq!(postprocessor.scale_y(), 2.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PostprocessConfig::new(ImageSize::new(640, 480), ImageSize::new(0, 0));
        assert!(matches!(
            Postprocessor::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn detection_as_tuple() {
        let detection = Detection {
            bbox: Bbox::xyxy(1.0, 2.0, 3.0, 4.0),
            score: 0.75,
        };

        let tuple: (f32, f32, f32, f32, f32) = detection.into();
        assert_eq!(tuple, (1.0, 2.0, 3.0, 4.0, 0.75));
    }
}
