//! Result and Error types for the crate.
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// Result containing an error variant from this module.
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two configuration roots a file was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// The main configuration directory, shared by every deployment.
    Main,
    /// The overlay directory, containing deployment specific overrides.
    Overlay,
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKind::Main => f.write_str("main"),
            ConfigKind::Overlay => f.write_str("overlay"),
        }
    }
}

/// Error raised while loading or storing the configuration `name`.
#[derive(Debug, Error, Diagnostic)]
#[error("configuration error in `{name}`")]
pub struct Error {
    /// The file name of the configuration, see [`crate::Config::PATH`].
    pub name: &'static str,
    /// What went wrong.
    #[source]
    pub kind: ErrorKind,
}

/// Configuration error variants
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The file could not be read.
    #[error("failed to read {config_kind} config from `{path}`")]
    Load {
        path: String,
        config_kind: ConfigKind,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML, or does not match the configuration struct.
    #[error("failed to parse `{path}`")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be represented as TOML.
    #[error("failed to serialize config")]
    Serialize(#[source] toml::ser::Error),

    /// The file could not be written.
    #[error("failed to write config to `{path}`")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
