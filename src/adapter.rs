//! Thin boundary over the external tree engine.
//!
//! Translates filesystem paths into engine-namespaced addresses and exposes
//! typed operations (search, value access, sibling insertion, save) to the
//! rest of the crate. No other module builds or dissects address strings,
//! and every [`EngineError`] is re-raised as a [`ParserError`] without
//! interpretation.

use crate::engine::{EngineError, SaveReport, TreeEngine};
use crate::errors::ParserError;
use semver::Version;
use std::path::{Path, PathBuf};

/// Map a filesystem path to its engine address.
///
/// Pure and total: the same input always yields the same address, with no
/// dependency on tree state.
pub fn files_path(path: impl AsRef<Path>) -> String {
    format!("/files{}", path.as_ref().display())
}

pub struct TreeAdapter {
    engine: Box<dyn TreeEngine>,
}

impl TreeAdapter {
    pub fn new(engine: Box<dyn TreeEngine>) -> Self {
        TreeAdapter { engine }
    }

    pub fn version(&self) -> Result<Version, ParserError> {
        self.engine.version().map_err(wrap)
    }

    /// Load a file or wildcard pattern, returning the files the engine
    /// newly materialized.
    pub fn load(&mut self, path_or_glob: &str) -> Result<Vec<PathBuf>, ParserError> {
        self.engine.load(path_or_glob).map_err(wrap)
    }

    pub fn loaded(&self) -> Vec<PathBuf> {
        self.engine.loaded()
    }

    /// Direct children of `parent` carrying `label` (`*` for any label).
    pub fn match_children(&self, parent: &str, label: &str) -> Result<Vec<String>, ParserError> {
        self.engine
            .matches(&format!("{parent}/{label}"))
            .map_err(wrap)
    }

    /// All descendants of `context` carrying `label`, in document order.
    pub fn match_descendants(&self, context: &str, label: &str) -> Result<Vec<String>, ParserError> {
        self.engine
            .matches(&format!("{context}//{label}"))
            .map_err(wrap)
    }

    pub fn get(&self, address: &str) -> Result<Option<String>, ParserError> {
        self.engine.get(address).map_err(wrap)
    }

    /// Append a directive with its arguments as the last child of `parent`.
    /// Returns the new directive's address.
    pub fn append_directive(
        &mut self,
        parent: &str,
        name: &str,
        args: &[&str],
    ) -> Result<String, ParserError> {
        self.engine
            .set(&format!("{parent}/directive[last()+1]"), name)
            .map_err(wrap)?;
        let index = self.match_children(parent, "directive")?.len();
        let address = format!("{parent}/directive[{index}]");
        self.set_args(&address, args)?;
        Ok(address)
    }

    /// Insert a directive before every existing child of `parent`. Returns
    /// the new directive's address (always `directive[1]`).
    pub fn insert_directive_first(
        &mut self,
        parent: &str,
        name: &str,
        args: &[&str],
    ) -> Result<String, ParserError> {
        let address = format!("{parent}/directive[1]");
        if let Some(first) = self.match_children(parent, "*")?.first() {
            self.engine.insert(first, "directive", true).map_err(wrap)?;
        }
        self.engine.set(&address, name).map_err(wrap)?;
        self.set_args(&address, args)?;
        Ok(address)
    }

    fn set_args(&mut self, directive: &str, args: &[&str]) -> Result<(), ParserError> {
        for (i, arg) in args.iter().enumerate() {
            self.engine
                .set(&format!("{directive}/arg[{}]", i + 1), arg)
                .map_err(wrap)?;
        }
        Ok(())
    }

    /// Append a section node (e.g. a module guard) with a single argument
    /// as the last child of `parent`. Returns the section's address.
    pub fn append_section(
        &mut self,
        parent: &str,
        label: &str,
        arg: &str,
    ) -> Result<String, ParserError> {
        self.engine
            .set(&format!("{parent}/{label}[last()+1]/arg"), arg)
            .map_err(wrap)?;
        let index = self.match_children(parent, label)?.len();
        Ok(format!("{parent}/{label}[{index}]"))
    }

    pub fn append_comment(&mut self, parent: &str, text: &str) -> Result<(), ParserError> {
        self.engine
            .set(&format!("{parent}/#comment[last()+1]"), text)
            .map_err(wrap)
    }

    /// Address one step up the tree, or `None` at a file root.
    pub fn parent_of(&self, address: &str) -> Option<String> {
        let (parent, _) = address.rsplit_once('/')?;
        if parent == "/files" || parent.is_empty() {
            return None;
        }
        Some(parent.to_string())
    }

    /// Node label encoded in the final address segment.
    pub fn label_of(&self, address: &str) -> Option<String> {
        let (_, last) = address.rsplit_once('/')?;
        let label = match last.find('[') {
            Some(open) => &last[..open],
            None => last,
        };
        if label.is_empty() {
            None
        } else {
            Some(label.to_string())
        }
    }

    /// The loaded file owning `address`: the longest loaded path that
    /// prefixes it on a segment boundary.
    pub fn owning_file(&self, address: &str) -> Option<PathBuf> {
        let mut best: Option<PathBuf> = None;
        for file in self.engine.loaded() {
            let prefix = files_path(&file);
            let owns = address == prefix
                || address
                    .strip_prefix(&prefix)
                    .is_some_and(|rest| rest.starts_with('/'));
            if owns {
                let better = match &best {
                    Some(prev) => prev.as_os_str().len() < file.as_os_str().len(),
                    None => true,
                };
                if better {
                    best = Some(file);
                }
            }
        }
        best
    }

    /// Dry-run save: which files carry unsaved modifications.
    pub fn check(&mut self) -> Result<SaveReport, ParserError> {
        self.engine.check().map_err(wrap)
    }

    pub fn save(&mut self) -> Result<SaveReport, ParserError> {
        self.engine.save().map_err(wrap)
    }
}

fn wrap(err: EngineError) -> ParserError {
    ParserError::config(err.to_string())
}
