//! Parser options: server control binary, entry-file candidates, vhost
//! root hint and the minimum supported engine version.
//!
//! Options deserialize from TOML so distribution-specific layouts can be
//! described in a file, and validate after load; every field has a Debian
//! style default.

use semver::Version;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("failed to read options from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse options TOML: {source}")]
    Toml {
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid options: {message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserOptions {
    /// Server control binary used for runtime introspection dumps.
    pub ctl: String,

    /// Entry-file candidates probed under the server root, in order.
    pub entry_files: Vec<String>,

    /// Directory whose `*.conf` files hold virtual hosts, preloaded at
    /// construction when set.
    pub vhost_root: Option<PathBuf>,

    /// Minimum tree engine version, as a semver string.
    pub min_engine_version: String,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            ctl: "apache2ctl".to_string(),
            entry_files: vec![
                "apache2.conf".to_string(),
                "httpd.conf".to_string(),
                "conf/httpd.conf".to_string(),
            ],
            vhost_root: None,
            min_engine_version: "1.2.0".to_string(),
        }
    }
}

impl ParserOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.ctl.trim().is_empty() {
            return Err(OptionsError::Validation {
                message: "ctl must name a binary".to_string(),
            });
        }
        if self.entry_files.is_empty() {
            return Err(OptionsError::Validation {
                message: "entry_files must list at least one candidate".to_string(),
            });
        }
        Version::parse(&self.min_engine_version).map_err(|e| OptionsError::Validation {
            message: format!(
                "min_engine_version '{}' is not a version: {e}",
                self.min_engine_version
            ),
        })?;
        Ok(())
    }

    /// The validated minimum engine version.
    ///
    /// Panics only if `validate` was skipped; load paths always validate.
    pub fn min_engine_version(&self) -> Version {
        Version::parse(&self.min_engine_version).expect("options validated at load time")
    }
}

pub fn load_from_str(input: &str) -> Result<ParserOptions, OptionsError> {
    let options: ParserOptions =
        toml_edit::de::from_str(input).map_err(|source| OptionsError::Toml { source })?;
    options.validate()?;
    Ok(options)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<ParserOptions, OptionsError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| OptionsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}
