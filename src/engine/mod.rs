//! Boundary to the external configuration-tree engine.
//!
//! The httpd configuration language is parsed and serialized by an external
//! Augeas-style engine; this crate never owns the grammar. [`TreeEngine`] is
//! the narrow contract consumed from it: load, match, get, set, insert and
//! save primitives over hierarchical path-string addresses, plus a version
//! query and a structured per-file error report after save.
//!
//! Addresses live under the `/files` namespace and are 1-indexed, e.g.
//! `/files/etc/apache2/apache2.conf/directive[2]/arg[1]`. Directive nodes
//! carry the label `directive` with the directive name as value and `arg`
//! children; section nodes carry the section name as label with `arg`
//! children followed by nested nodes; comments carry the label `#comment`.

pub mod memory;

use semver::Version;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("malformed tree address '{address}': {message}")]
    BadAddress { address: String, message: String },

    #[error("no loaded file owns address '{address}'")]
    Unloaded { address: String },

    #[error("failed to load '{path}' into the tree: {message}")]
    Load { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file the engine could not write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub file: PathBuf,
    pub message: String,
}

/// Outcome of a save or save dry-run.
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Files written (or, for a dry-run, files that would be written).
    pub saved: Vec<PathBuf>,
    /// Per-file failures. Empty on full success.
    pub errors: Vec<FileError>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Contract consumed from the external tree engine.
///
/// Implementations own the [`ConfigTree`](crate) state: a forest of parsed
/// files addressed by path strings. The adapter is the only caller; nothing
/// else in the crate touches raw addresses or patterns.
pub trait TreeEngine {
    /// Engine version, checked against a minimum before any load.
    fn version(&self) -> Result<Version, EngineError>;

    /// Load a file, or every file matching a wildcard pattern, into the
    /// tree. Returns the files newly materialized by this call; files
    /// already present are not repeated.
    fn load(&mut self, path_or_glob: &str) -> Result<Vec<PathBuf>, EngineError>;

    /// All files currently present in the tree.
    fn loaded(&self) -> Vec<PathBuf>;

    /// Match a pattern against the tree, returning addresses in document
    /// order. Patterns are addresses whose final segments may use a `*`
    /// label, omit indices (meaning every index), or follow a `//`
    /// descendant separator; filesystem segments may contain wildcards.
    fn matches(&self, pattern: &str) -> Result<Vec<String>, EngineError>;

    /// Value at an address, or `None` if the address does not resolve.
    fn get(&self, address: &str) -> Result<Option<String>, EngineError>;

    /// Set the value at an address, creating the node and any missing
    /// ancestors. Index selectors `[n]`, `[last()]` and `[last()+1]` are
    /// honored during creation.
    fn set(&mut self, address: &str, value: &str) -> Result<(), EngineError>;

    /// Insert a new, valueless sibling node with the given label before or
    /// after the node at `sibling`.
    fn insert(&mut self, sibling: &str, label: &str, before: bool) -> Result<(), EngineError>;

    /// Dry-run save: report which files have unsaved modifications and
    /// which of them would fail to write, without touching anything.
    fn check(&mut self) -> Result<SaveReport, EngineError>;

    /// Flush pending modifications. Files listed in `errors` keep their
    /// pending state.
    fn save(&mut self) -> Result<SaveReport, EngineError>;
}
