//! Parsers for the live server's three introspection reports.
//!
//! Pure text-in, data-out functions. The consumer tolerates unknown lines
//! (they are context signals, not table content) and relies only on the
//! fields parsed here.

use crate::errors::ParserError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

static DEFINE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Define: ([^ \n]+)$").expect("static regex"));

static MODULE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)_module\s+\((static|shared)\)\s*$").expect("static regex"));

static INCLUDE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\((?:\*|\d+)\)\s+(\S.*?)\s*$").expect("static regex"));

/// The define used to trigger the run-config dump; it shows up in its own
/// output and is not a real server variable.
const DUMP_FLAG: &str = "DUMP_RUN_CFG";

/// Parse the variables report.
///
/// Lines other than `Define: NAME[=VALUE]` are ignored. A flag-style
/// define yields an empty-string value. A segment with more than one
/// unescaped `=` is malformed and fails the whole parse.
pub fn parse_defines(output: &str) -> Result<HashMap<String, String>, ParserError> {
    let mut variables = HashMap::new();
    for line in output.lines() {
        let Some(caps) = DEFINE_LINE.captures(line) else {
            continue;
        };
        let segment = &caps[1];
        if segment == DUMP_FLAG {
            continue;
        }
        let (name, value) = split_define(segment).ok_or_else(|| {
            ParserError::config(format!(
                "unexpected number of equal signs in runtime variable dump line '{line}'"
            ))
        })?;
        variables.insert(name.to_string(), value.to_string());
    }
    Ok(variables)
}

/// Split `NAME[=VALUE]` at the first unescaped `=`; `None` when a second
/// unescaped `=` makes the segment ambiguous.
fn split_define(segment: &str) -> Option<(&str, &str)> {
    let mut delimiters = Vec::new();
    let mut escaped = false;
    for (pos, ch) in segment.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            '=' if !escaped => delimiters.push(pos),
            _ => escaped = false,
        }
        if ch != '\\' {
            escaped = false;
        }
    }
    match delimiters.as_slice() {
        [] => Some((segment, "")),
        [pos] => Some((&segment[..*pos], &segment[pos + 1..])),
        _ => None,
    }
}

/// One loaded module as reported by the live server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeModule {
    /// Canonical identifier: the reported name plus the `_module` suffix.
    pub identifier: String,
    /// Shared modules are loaded from disk and may be cross-referenced
    /// against `LoadModule` directives; static ones are compiled in.
    pub shared: bool,
}

/// Parse the modules report. Unrecognized lines (including the header)
/// are skipped.
pub fn parse_modules(output: &str) -> Vec<RuntimeModule> {
    output
        .lines()
        .filter_map(|line| {
            MODULE_LINE.captures(line).map(|caps| RuntimeModule {
                identifier: format!("{}_module", &caps[1]),
                shared: &caps[2] == "shared",
            })
        })
        .collect()
}

/// Parse the includes report: every line with a source-order marker
/// (`(*)` or `(<n>)`) names one resolved include file.
pub fn parse_includes(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| {
            INCLUDE_LINE
                .captures(line)
                .map(|caps| PathBuf::from(&caps[1]))
        })
        .collect()
}
