//! Runtime introspection and reconciliation.
//!
//! The live server remains the second source of truth for modules,
//! variables and the resolved include set. [`HttpdParser::reconcile`]
//! refreshes the session tables from its diagnostic dumps.

pub mod ctl;
pub mod dumps;

pub use ctl::{DumpKind, HttpdCtl, RuntimeSource};
pub use dumps::{parse_defines, parse_includes, parse_modules, RuntimeModule};

use crate::errors::ParserError;
use crate::parser::HttpdParser;
use std::collections::HashMap;
use std::path::PathBuf;

impl HttpdParser {
    /// Rebuild the module and variable tables from the live server's
    /// introspection dumps and lazily load any resolved include file the
    /// tree does not cover yet.
    ///
    /// Safe to call repeatedly: tables are rebuilt wholesale, never merged,
    /// and files already parsed are never reloaded. The commit is
    /// all-or-nothing — every report must parse before any table is
    /// replaced, so a malformed dump leaves the previous state intact.
    /// A subprocess that cannot run at all surfaces as
    /// [`ParserError::Misconfiguration`] instead, distinguishing an
    /// environment problem from a logic problem.
    pub fn reconcile(&mut self) -> Result<(), ParserError> {
        let run_cfg = self.runtime.dump(DumpKind::RunCfg)?;
        let includes_report = self.runtime.dump(DumpKind::Includes)?;
        let modules_report = self.runtime.dump(DumpKind::Modules)?;

        // Parse all three reports into local buffers before touching any
        // session state.
        let variables = dumps::parse_defines(&run_cfg)?;
        let include_files = dumps::parse_includes(&includes_report);
        let runtime_modules = dumps::parse_modules(&modules_report);

        let mut caught_up = 0usize;
        for file in &include_files {
            let path = file.display().to_string();
            if !self.is_covered(&path) {
                self.parse_file(&path)?;
                caught_up += 1;
            }
        }

        let mut modules: HashMap<String, Option<PathBuf>> = runtime_modules
            .into_iter()
            .map(|module| (module.identifier, None))
            .collect();
        // A defining file parsed out of the tree wins over the built-in
        // sentinel for the same identifier.
        for (identifier, file) in self.scan_load_modules()? {
            modules.insert(identifier, file);
        }

        self.variables = variables;
        self.modules = modules;
        tracing::debug!(
            variables = self.variables.len(),
            modules = self.modules.len(),
            caught_up,
            "reconciled with live server state"
        );
        Ok(())
    }
}
