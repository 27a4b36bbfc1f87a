//! Loading of TOML configuration files.
//!
//! Every configuration lives in a main directory shared by all deployments, and can be
//! partially overridden by a file with the same name in an overlay directory. Only the keys
//! present in the overlay are replaced, nested tables are merged recursively.

mod error;


use std::{fs, path::Path};

use serde::{Serialize, de::DeserializeOwned};
use toml::Table;

pub use error::{ConfigKind, Error, ErrorKind, Result};

/// A configuration struct that is stored as a TOML file.
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Deserialize, Serialize)]
/// #[serde(deny_unknown_fields)]
/// struct CameraConfig {
///     exposure: u32,
/// }
///
/// impl odal::Config for CameraConfig {
///     const PATH: &'static str = "camera.toml";
/// }
///
/// use odal::Config;
/// let config = CameraConfig::load_with_overlay("./config", "./config/overlay/lab").unwrap();
/// ```
pub trait Config: DeserializeOwned + Serialize {
    /// The file name of the configuration, relative to the configuration directories.
    const PATH: &'static str;

    /// Load the configuration from `main_dir`.
    fn load(main_dir: impl AsRef<Path>) -> Result<Self> {
        let table = read_table::<Self>(main_dir.as_ref(), ConfigKind::Main)?;
        from_table::<Self>(table, main_dir.as_ref())
    }

    /// Load the configuration from `main_dir`, with the values of the file in `overlay_dir`
    /// taking precedence.
    ///
    /// A missing overlay file is reported as [`ErrorKind::Load`] with
    /// [`ConfigKind::Overlay`], so callers can fall back to [`Config::load`].
    fn load_with_overlay(main_dir: impl AsRef<Path>, overlay_dir: impl AsRef<Path>) -> Result<Self> {
        let main = read_table::<Self>(main_dir.as_ref(), ConfigKind::Main)?;
        let overlay = read_table::<Self>(overlay_dir.as_ref(), ConfigKind::Overlay)?;

        from_table::<Self>(merge_tables(main, overlay), overlay_dir.as_ref())
    }

    /// Write the configuration to `dir`, replacing any existing file.
    fn store(&self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join(Self::PATH);
        let contents = toml::to_string_pretty(self).map_err(|source| Error {
            name: Self::PATH,
            kind: ErrorKind::Serialize(source),
        })?;

        fs::write(&path, contents).map_err(|source| Error {
            name: Self::PATH,
            kind: ErrorKind::Store {
                path: path.display().to_string(),
                source,
            },
        })
    }
}

fn read_table<T: Config>(dir: &Path, config_kind: ConfigKind) -> Result<Table> {
    let path = dir.join(T::PATH);
    let contents = fs::read_to_string(&path).map_err(|source| Error {
        name: T::PATH,
        kind: ErrorKind::Load {
            path: path.display().to_string(),
            config_kind,
            source,
        },
    })?;

    contents.parse::<Table>().map_err(|source| Error {
        name: T::PATH,
        kind: ErrorKind::Parse {
            path: path.display().to_string(),
            source,
        },
    })
}

fn from_table<T: Config>(table: Table, dir: &Path) -> Result<T> {
    toml::Value::Table(table)
        .try_into::<T>()
        .map_err(|source| Error {
            name: T::PATH,
            kind: ErrorKind::Parse {
                path: dir.join(T::PATH).display().to_string(),
                source,
            },
        })
}

/// Merge `overlay` into `main`.
///
/// Values in `overlay` replace the values in `main`, except when both are tables, in which
/// case they are merged recursively. Keys that only exist in the overlay are added.
#[must_use]
pub fn merge_tables(mut main: Table, overlay: Table) -> Table {
    for (key, overlay_value) in overlay {
        let merged = match (main.remove(&key), overlay_value) {
            (Some(toml::Value::Table(main_table)), toml::Value::Table(overlay_table)) => {
                toml::Value::Table(merge_tables(main_table, overlay_table))
            }
            (_, overlay_value) => overlay_value,
        };

        main.insert(key, merged);
    }

    main
}
