//! Directive search and argument access over the loaded tree.

use super::{strip_quotes, HttpdParser};
use crate::adapter::files_path;
use crate::errors::ParserError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;

static VAR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{[^ \}]*\}").expect("static regex"));

impl HttpdParser {
    /// Find every directive named `name` (case-insensitively) under
    /// `start`, following `Include`/`IncludeOptional` directives so only
    /// files actually in effect are searched, and skipping directives
    /// inside module or define guards whose condition is not met by the
    /// current tables.
    ///
    /// Returns the addresses of the matching directives' argument nodes in
    /// tree traversal order; `arg` restricts matches to directives carrying
    /// that argument. An empty result is success, not an error.
    pub fn find_directives(
        &self,
        name: &str,
        arg: Option<&str>,
        start: Option<&str>,
    ) -> Result<Vec<String>, ParserError> {
        let start = match start {
            Some(s) => s.to_string(),
            None => files_path(&self.entry_file),
        };
        let mut results = Vec::new();
        self.find_in(&name.to_ascii_lowercase(), arg, &start, &mut results)?;
        Ok(results)
    }

    fn find_in(
        &self,
        wanted: &str,
        arg: Option<&str>,
        start: &str,
        results: &mut Vec<String>,
    ) -> Result<(), ParserError> {
        for addr in self.adapter.match_descendants(start, "directive")? {
            let Some(found) = self.adapter.get(&addr)? else {
                continue;
            };
            let lower = found.to_ascii_lowercase();
            let is_include = lower == "include" || lower == "includeoptional";
            if lower != wanted && !is_include {
                continue;
            }
            if !self.in_effect(&addr)? {
                continue;
            }

            if is_include {
                if let Some(raw) = self.first_arg(&addr)? {
                    if let Some(target) = self.resolve_include_target(&raw) {
                        self.find_in(wanted, arg, &files_path(&target), results)?;
                    }
                }
            }

            if lower == wanted {
                for arg_addr in self.adapter.match_children(&addr, "arg")? {
                    let keep = match arg {
                        None => true,
                        Some(want) => self
                            .adapter
                            .get(&arg_addr)?
                            .is_some_and(|v| strip_quotes(&v).eq_ignore_ascii_case(want)),
                    };
                    if keep {
                        results.push(arg_addr);
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a directive is effective under its enclosing guards: every
    /// ancestor `<IfModule>` must name a known module and every
    /// `<IfDefine>` a known variable, with `!` negating the test.
    fn in_effect(&self, address: &str) -> Result<bool, ParserError> {
        let mut current = self.adapter.parent_of(address);
        while let Some(addr) = current {
            if let Some(label) = self.adapter.label_of(&addr) {
                let satisfied = match label.to_ascii_lowercase().as_str() {
                    "ifmodule" => {
                        Some(self.guard_satisfied(&addr, |key| self.modules.contains_key(key))?)
                    }
                    "ifdefine" => {
                        Some(self.guard_satisfied(&addr, |key| self.variables.contains_key(key))?)
                    }
                    _ => None,
                };
                if satisfied == Some(false) {
                    return Ok(false);
                }
            }
            current = self.adapter.parent_of(&addr);
        }
        Ok(true)
    }

    fn guard_satisfied(
        &self,
        section: &str,
        known: impl Fn(&str) -> bool,
    ) -> Result<bool, ParserError> {
        let Some(raw) = self.first_arg(section)? else {
            // A guard without a condition constrains nothing.
            return Ok(true);
        };
        let condition = strip_quotes(&raw);
        Ok(match condition.strip_prefix('!') {
            Some(negated) => !known(negated),
            None => known(condition),
        })
    }

    pub(crate) fn first_arg(&self, address: &str) -> Result<Option<String>, ParserError> {
        match self.adapter.match_children(address, "arg")?.first() {
            Some(arg_addr) => self.adapter.get(arg_addr),
            None => Ok(None),
        }
    }

    /// Value at an address with quoting removed and `${VAR}` references
    /// interpolated from the variable table. Missing addresses yield
    /// `Ok(None)`; only structurally malformed addresses error.
    pub fn get_argument(&self, address: &str) -> Result<Option<String>, ParserError> {
        let Some(raw) = self.adapter.get(address)? else {
            return Ok(None);
        };
        let mut value = strip_quotes(&raw).to_string();
        let snapshot = value.clone();
        for reference in VAR_REF.find_iter(&snapshot) {
            let full = reference.as_str();
            let key = &full[2..full.len() - 1];
            if let Some(replacement) = self.variables.get(key) {
                value = value.replace(full, replacement);
            }
        }
        Ok(Some(value))
    }

    /// Addresses of every comment under the server root containing `text`.
    pub fn find_comments(&self, text: &str) -> Result<Vec<String>, ParserError> {
        let root_addr = files_path(self.server_root());
        let mut found = Vec::new();
        for addr in self.adapter.match_descendants(&root_addr, "#comment")? {
            if let Some(content) = self.adapter.get(&addr)? {
                if content.contains(text) {
                    found.push(addr);
                }
            }
        }
        Ok(found)
    }

    /// Fold `LoadModule` directives from the effective tree into the
    /// module table, keeping any runtime-reported entries.
    pub(crate) fn parse_load_modules(&mut self) -> Result<(), ParserError> {
        let scanned = self.scan_load_modules()?;
        self.modules.extend(scanned);
        Ok(())
    }

    /// Scan the tree for `LoadModule` directives: identifier argument to
    /// defining file path. Directives missing either argument are logged
    /// and skipped.
    pub(crate) fn scan_load_modules(&self) -> Result<HashMap<String, Option<PathBuf>>, ParserError> {
        let mut table = HashMap::new();

        // Argument addresses arrive in tree order; group them back into
        // per-directive argument lists.
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for arg_addr in self.find_directives("LoadModule", None, None)? {
            let Some(parent) = self.adapter.parent_of(&arg_addr) else {
                continue;
            };
            let same_directive = grouped
                .last()
                .map(|(directive, _)| *directive == parent)
                .unwrap_or(false);
            if same_directive {
                grouped.last_mut().expect("just checked").1.push(arg_addr);
            } else {
                grouped.push((parent, vec![arg_addr]));
            }
        }

        for (directive, args) in grouped {
            let identifier = match args.first() {
                Some(addr) => self.get_argument(addr)?,
                None => None,
            };
            let file = match args.get(1) {
                Some(addr) => self.get_argument(addr)?,
                None => None,
            };
            match (identifier, file) {
                (Some(identifier), Some(file)) => {
                    table.insert(identifier, Some(PathBuf::from(file)));
                }
                _ => {
                    tracing::debug!(address = %directive, "could not read LoadModule directive");
                }
            }
        }
        Ok(table)
    }
}
