use semver::Version;
use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy crossing the public boundary.
///
/// Every engine-level and OS-level failure is wrapped into one of these
/// kinds before it reaches a caller. `NoInstallation` and `NotSupported`
/// are fatal to construction; a parser that failed to construct must be
/// discarded and rebuilt. `Misconfiguration` signals an environment
/// problem with the live server that the caller may fix and retry.
/// `Config` is the single generic domain kind covering malformed runtime
/// reports, save failures, and structurally invalid tree addresses.
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("no httpd installation found at {path}: {reason}")]
    NoInstallation { path: PathBuf, reason: String },

    #[error("tree engine version {found} is below the supported minimum {minimum}")]
    NotSupported { found: Version, minimum: Version },

    #[error("unable to query the running httpd via `{command}`: {detail}")]
    Misconfiguration { command: String, detail: String },

    #[error("{message}")]
    Config { message: String },
}

impl ParserError {
    /// Shorthand for the generic domain kind.
    pub fn config(message: impl Into<String>) -> Self {
        ParserError::Config {
            message: message.into(),
        }
    }
}
