//! Structural mutation primitives.
//!
//! Every operation observes the result of all prior calls immediately;
//! nothing is transactional across calls. The guard and comment
//! operations search first and create only when absent, since automation
//! runs the same edit pass repeatedly across invocations.

use super::{strip_quotes, HttpdParser};
use crate::adapter::files_path;
use crate::errors::ParserError;

impl HttpdParser {
    /// Append one directive per element of `values` as the last children
    /// of `path`, in input order. Added directives are visible to
    /// subsequent searches without any flush.
    pub fn add_directive(
        &mut self,
        path: &str,
        name: &str,
        values: &[&str],
    ) -> Result<(), ParserError> {
        for value in values.iter().copied() {
            self.adapter.append_directive(path, name, &[value])?;
        }
        tracing::debug!(path, name, count = values.len(), "appended directives");
        Ok(())
    }

    /// Like [`add_directive`](Self::add_directive), but the batch lands
    /// before all existing children of `path`, keeping its own order.
    pub fn add_directive_at_start(
        &mut self,
        path: &str,
        name: &str,
        values: &[&str],
    ) -> Result<(), ParserError> {
        // Inserting each element at the very front, last value first,
        // leaves the batch in input order ahead of the prior children.
        for value in values.iter().rev().copied() {
            self.adapter.insert_directive_first(path, name, &[value])?;
        }
        tracing::debug!(path, name, count = values.len(), "prepended directives");
        Ok(())
    }

    /// Ensure an `<IfModule guard_module>` block exists as a child of
    /// `path` (reusing one when present), then append the directives
    /// inside it.
    ///
    /// `guard_module` should already be known to the module table; an
    /// unknown module is not rejected here but leaves the new block
    /// invisible to guarded searches until a reconcile learns about it.
    pub fn add_directive_into_module_guard(
        &mut self,
        path: &str,
        name: &str,
        values: &[&str],
        guard_module: &str,
    ) -> Result<(), ParserError> {
        let guard = self.module_guard(path, guard_module)?;
        self.add_directive(&guard, name, values)
    }

    fn module_guard(&mut self, path: &str, module: &str) -> Result<String, ParserError> {
        for section in self.adapter.match_children(path, "IfModule")? {
            let matches = self
                .first_arg(&section)?
                .is_some_and(|arg| strip_quotes(&arg) == module);
            if matches {
                return Ok(section);
            }
        }
        tracing::debug!(path, module, "creating module guard block");
        self.adapter.append_section(path, "IfModule", module)
    }

    /// Append a comment as the last child of `path` unless an identical
    /// comment already exists anywhere in the owning file. Comments are
    /// provenance markers for automation-authored edits; the server never
    /// evaluates them.
    pub fn add_comment(&mut self, path: &str, text: &str) -> Result<(), ParserError> {
        let file = self.adapter.owning_file(path).ok_or_else(|| {
            ParserError::config(format!("address '{path}' is not inside a loaded file"))
        })?;
        let file_addr = files_path(&file);
        for addr in self.adapter.match_descendants(&file_addr, "#comment")? {
            if self.adapter.get(&addr)?.as_deref() == Some(text) {
                return Ok(());
            }
        }
        self.adapter.append_comment(path, text)
    }
}
