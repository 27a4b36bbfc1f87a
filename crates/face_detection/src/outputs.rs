//! Resolution of the raw detector outputs.
//!
//! The detector emits its outputs as named tensors. Which tensor holds the box deltas and
//! which one the class scores is either configured explicitly, or discovered from the
//! tensor names.

use std::{collections::BTreeMap, fmt};

use ndarray::{ArrayD, ArrayView2, ArrayViewD, Axis, Ix2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The role a tensor plays in the detector output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TensorRole {
    /// The `(dx, dy, dw, dh)` box regression of every anchor.
    BoxDeltas,
    /// The `(background, face)` scores of every anchor.
    ClassScores,
}

impl TensorRole {
    /// The substring that marks a tensor name as belonging to this role.
    #[must_use]
    pub const fn marker(self) -> &'static str {
        match self {
            TensorRole::BoxDeltas => "bbox",
            TensorRole::ClassScores => "cls",
        }
    }

    /// The number of values per anchor.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            TensorRole::BoxDeltas => 4,
            TensorRole::ClassScores => 2,
        }
    }

    /// Whether `name` follows the naming convention of this role.
    ///
    /// The marker has to appear somewhere inside the name, with at least one character on
    /// either side, e.g. `face_rpn_bbox_pred` for the box deltas.
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        let marker = self.marker();
        name.match_indices(marker)
            .any(|(start, _)| start > 0 && start + marker.len() < name.len())
    }
}

impl fmt::Display for TensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorRole::BoxDeltas => f.write_str("box deltas"),
            TensorRole::ClassScores => f.write_str("class scores"),
        }
    }
}

/// Explicit tensor names, these take precedence over discovery by naming convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TensorNames {
    pub boxes: Option<String>,
    pub scores: Option<String>,
}

impl TensorNames {
    #[must_use]
    pub fn new(boxes: impl Into<String>, scores: impl Into<String>) -> Self {
        Self {
            boxes: Some(boxes.into()),
            scores: Some(scores.into()),
        }
    }

    fn get(&self, role: TensorRole) -> Option<&str> {
        match role {
            TensorRole::BoxDeltas => self.boxes.as_deref(),
            TensorRole::ClassScores => self.scores.as_deref(),
        }
    }
}

/// The raw outputs of a single detector run.
#[derive(Debug, Clone, Default)]
pub struct RawOutputs {
    tensors: BTreeMap<String, ArrayD<f32>>,
}

/// Views into the box deltas and class scores of a [`RawOutputs`].
#[derive(Debug, Clone, Copy)]
pub struct ResolvedOutputs<'a> {
    /// `(N, 4)` box deltas.
    pub deltas: ArrayView2<'a, f32>,
    /// `(N, 2)` class scores.
    pub scores: ArrayView2<'a, f32>,
}

impl RawOutputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tensor, returning the tensor previously stored under the same name.
    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) -> Option<ArrayD<f32>> {
        self.tensors.insert(name.into(), tensor)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.tensors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Find the box deltas and class scores.
    ///
    /// Tensors may have a leading batch dimension, as long as it contains a single image.
    pub fn resolve(&self, names: &TensorNames) -> Result<ResolvedOutputs<'_>> {
        Ok(ResolvedOutputs {
            deltas: self.resolve_role(TensorRole::BoxDeltas, names)?,
            scores: self.resolve_role(TensorRole::ClassScores, names)?,
        })
    }

    fn resolve_role(&self, role: TensorRole, names: &TensorNames) -> Result<ArrayView2<'_, f32>> {
        let (name, tensor) = match names.get(role) {
            Some(name) => self
                .tensors
                .get_key_value(name)
                .ok_or_else(|| Error::UnknownTensor {
                    role,
                    name: name.to_string(),
                })?,
            None => self.discover(role)?,
        };

        tracing::trace!(%role, name = %name, shape = ?tensor.shape(), "resolved output tensor");
        as_anchor_matrix(name, tensor.view(), role)
    }

    fn discover(&self, role: TensorRole) -> Result<(&String, &ArrayD<f32>)> {
        let mut candidates = self.tensors.iter().filter(|(name, _)| role.matches(name));

        match (candidates.next(), candidates.next()) {
            (Some(found), None) => Ok(found),
            (None, _) => Err(Error::MissingTensor { role }),
            (Some(_), Some(_)) => Err(Error::AmbiguousTensor {
                role,
                candidates: self
                    .names()
                    .filter(|name| role.matches(name))
                    .map(str::to_string)
                    .collect(),
            }),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, ArrayD<f32>)> for RawOutputs {
    fn from_iter<I: IntoIterator<Item = (S, ArrayD<f32>)>>(iter: I) -> Self {
        Self {
            tensors: iter
                .into_iter()
                .map(|(name, tensor)| (name.into(), tensor))
                .collect(),
        }
    }
}

/// View a `(N, width)` or `(1, N, width)` tensor as a `(N, width)` matrix.
fn as_anchor_matrix<'a>(
    name: &str,
    tensor: ArrayViewD<'a, f32>,
    role: TensorRole,
) -> Result<ArrayView2<'a, f32>> {
    let shape = tensor.shape().to_vec();
    let invalid_shape = || Error::InvalidShape {
        name: name.to_string(),
        shape: shape.clone(),
        expected: match role {
            TensorRole::BoxDeltas => "(N, 4) or (1, N, 4)",
            TensorRole::ClassScores => "(N, 2) or (1, N, 2)",
        },
    };

    let matrix = match shape.as_slice() {
        [1, _, _] => tensor.index_axis_move(Axis(0), 0),
        [_, _] => tensor,
        _ => return Err(invalid_shape()),
    }
    .into_dimensionality::<Ix2>()
    .map_err(|_| invalid_shape())?;

    if matrix.ncols() != role.width() {
        return Err(invalid_shape());
    }

    Ok(matrix)
}
