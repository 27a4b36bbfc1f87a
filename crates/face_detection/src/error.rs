//! See [`Error`].

use miette::Diagnostic;
use thiserror::Error;

use crate::outputs::TensorRole;

/// Error types for this crate.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("expected {expected} {what}, found {found}")]
    #[diagnostic(help("raw model outputs must be index-aligned with the generated priors"))]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("tensor `{name}` has shape {shape:?}, expected {expected}")]
    InvalidShape {
        name: String,
        shape: Vec<usize>,
        expected: &'static str,
    },

    #[error("more than one output tensor matches the {role} role: {candidates:?}")]
    #[diagnostic(help("name the tensor explicitly in the `tensor_names` config table"))]
    AmbiguousTensor {
        role: TensorRole,
        candidates: Vec<String>,
    },

    #[error("no output tensor matches the {role} role")]
    MissingTensor { role: TensorRole },

    #[error("output tensor `{name}` ({role}) does not exist")]
    UnknownTensor { role: TensorRole, name: String },

    #[error("invalid post-processing config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] odal::Error),
}

/// Type alias for [`Result<T, Error>`].
pub type Result<T> = std::result::Result<T, Error>;
