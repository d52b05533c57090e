//! Out-of-process introspection of the running server.

use crate::errors::ParserError;
use std::path::PathBuf;
use std::process::Command;

/// The three structured reports the server can dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    /// Runtime variables (`Define:` lines).
    RunCfg,
    /// Resolved include files with source-order markers.
    Includes,
    /// Loaded modules, static or shared.
    Modules,
}

impl DumpKind {
    pub fn flag(self) -> &'static str {
        match self {
            DumpKind::RunCfg => "DUMP_RUN_CFG",
            DumpKind::Includes => "DUMP_INCLUDES",
            DumpKind::Modules => "DUMP_MODULES",
        }
    }
}

/// Source of introspection report text.
///
/// The live implementation shells out to the server control binary; tests
/// substitute canned output.
pub trait RuntimeSource {
    fn dump(&self, kind: DumpKind) -> Result<String, ParserError>;
}

/// Runs `<ctl> -t -D <DUMP_*>` and returns its stdout.
///
/// A process that cannot be spawned, or exits non-zero, is an environment
/// problem and surfaces as [`ParserError::Misconfiguration`]; report
/// content is never judged here.
#[derive(Debug, Clone)]
pub struct HttpdCtl {
    binary: PathBuf,
}

impl HttpdCtl {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        HttpdCtl {
            binary: binary.into(),
        }
    }

    fn command_line(&self, kind: DumpKind) -> String {
        format!("{} -t -D {}", self.binary.display(), kind.flag())
    }
}

impl RuntimeSource for HttpdCtl {
    fn dump(&self, kind: DumpKind) -> Result<String, ParserError> {
        let command = self.command_line(kind);
        tracing::debug!(%command, "querying runtime configuration");

        let output = Command::new(&self.binary)
            .args(["-t", "-D", kind.flag()])
            .output()
            .map_err(|e| ParserError::Misconfiguration {
                command: command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ParserError::Misconfiguration {
                command,
                detail: format!("exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_misconfiguration() {
        let ctl = HttpdCtl::new("/nonexistent/apachectl");
        let err = ctl.dump(DumpKind::RunCfg).unwrap_err();
        assert!(matches!(err, ParserError::Misconfiguration { .. }));
        assert!(err.to_string().contains("/nonexistent/apachectl"));
    }

    #[test]
    #[cfg(unix)]
    fn nonzero_exit_is_misconfiguration() {
        // `false` ignores its arguments and always exits 1.
        let ctl = HttpdCtl::new("false");
        let err = ctl.dump(DumpKind::Modules).unwrap_err();
        assert!(matches!(err, ParserError::Misconfiguration { .. }));
    }

    #[test]
    #[cfg(unix)]
    fn stdout_is_returned_verbatim() {
        // `echo` reflects the dump flag back, standing in for the server.
        let ctl = HttpdCtl::new("echo");
        let out = ctl.dump(DumpKind::Includes).unwrap();
        assert!(out.contains("DUMP_INCLUDES"));
    }
}
