//! The configuration parser: root resolution, file loading and the
//! session state every query and mutation operates on.
//!
//! One [`HttpdParser`] instance owns exclusive access to one configuration
//! root for the duration of a session. Construction resolves and validates
//! the root, gates on the engine version, loads the entry file and its
//! transitive includes, and computes the canonical insertion locations.
//! A construction error is terminal: discard the instance and retry from
//! scratch.

mod mutate;
mod query;

use crate::adapter::{files_path, TreeAdapter};
use crate::engine::TreeEngine;
use crate::errors::ParserError;
use crate::options::ParserOptions;
use crate::runtime::RuntimeSource;
use glob::Pattern;
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

/// Canonical files for global, Listen and ServerName directive insertion.
///
/// Slots without an unambiguous canonical file fall back to the root entry
/// file; the fallback is ordinary behavior, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    pub default: PathBuf,
    pub listen: PathBuf,
    pub name: PathBuf,
}

pub struct HttpdParser {
    pub(crate) adapter: TreeAdapter,
    pub(crate) runtime: Box<dyn RuntimeSource>,
    root: PathBuf,
    entry_file: PathBuf,
    loc: Locations,
    /// Files and wildcard patterns loaded into the tree, verbatim as
    /// requested. Grows monotonically; never pruned within a session.
    pub(crate) parsed_files: BTreeSet<String>,
    /// Module identifier -> defining file, or `None` for built-ins.
    pub(crate) modules: HashMap<String, Option<PathBuf>>,
    /// Runtime variable name -> value ("" for flag-style defines).
    pub(crate) variables: HashMap<String, String>,
}

impl std::fmt::Debug for HttpdParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpdParser")
            .field("root", &self.root)
            .field("entry_file", &self.entry_file)
            .field("parsed_files", &self.parsed_files.len())
            .field("modules", &self.modules.len())
            .field("variables", &self.variables.len())
            .finish_non_exhaustive()
    }
}

impl HttpdParser {
    /// Resolve a configuration root and build a ready parser.
    ///
    /// Fails with [`ParserError::NoInstallation`] when the root directory
    /// or its entry file is absent, and with [`ParserError::NotSupported`]
    /// when the engine predates `options.min_engine_version`. The version
    /// gate runs before anything is loaded.
    pub fn new(
        engine: Box<dyn TreeEngine>,
        runtime: Box<dyn RuntimeSource>,
        server_root: impl AsRef<Path>,
        options: &ParserOptions,
    ) -> Result<Self, ParserError> {
        options
            .validate()
            .map_err(|e| ParserError::config(e.to_string()))?;

        let (root, entry_file) = probe_installation(server_root.as_ref(), options)?;

        let adapter = TreeAdapter::new(engine);
        let minimum = options.min_engine_version();
        let found = adapter.version()?;
        if found < minimum {
            return Err(ParserError::NotSupported { found, minimum });
        }

        let mut parser = HttpdParser {
            adapter,
            runtime,
            root,
            loc: Locations {
                default: entry_file.clone(),
                listen: entry_file.clone(),
                name: entry_file.clone(),
            },
            entry_file: entry_file.clone(),
            parsed_files: BTreeSet::new(),
            modules: HashMap::new(),
            variables: HashMap::new(),
        };

        parser.parse_file(&entry_file.display().to_string())?;
        if let Some(vhost_root) = &options.vhost_root {
            let pattern = normalize_path(vhost_root).join("*.conf");
            parser.parse_file(&pattern.display().to_string())?;
        }

        parser.parse_load_modules()?;
        parser.loc = parser.resolve_locations()?;

        tracing::debug!(
            root = %parser.root.display(),
            entry = %parser.entry_file.display(),
            "configuration root resolved"
        );
        Ok(parser)
    }

    /// Normalized configuration root directory.
    pub fn server_root(&self) -> &Path {
        &self.root
    }

    pub fn locations(&self) -> &Locations {
        &self.loc
    }

    pub fn modules(&self) -> &HashMap<String, Option<PathBuf>> {
        &self.modules
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Files and wildcard patterns currently loaded into the tree.
    pub fn parsed_files(&self) -> &BTreeSet<String> {
        &self.parsed_files
    }

    /// Load a file (or wildcard pattern) into the tree, following its
    /// `Include`/`IncludeOptional` directives transitively. Paths already
    /// loaded, or covered by a previously loaded wildcard, are skipped.
    pub fn parse_file(&mut self, path_or_glob: &str) -> Result<(), ParserError> {
        if self.is_covered(path_or_glob) {
            return Ok(());
        }
        tracing::debug!(path = path_or_glob, "loading configuration file");
        self.parsed_files.insert(path_or_glob.to_string());

        let fresh = self.adapter.load(path_or_glob)?;
        for file in fresh {
            self.parsed_files.insert(file.display().to_string());
            self.follow_includes(&file)?;
        }
        Ok(())
    }

    /// Whether a path is already in the parsed set, directly or through a
    /// wildcard member covering it.
    pub(crate) fn is_covered(&self, candidate: &str) -> bool {
        if self.parsed_files.contains(candidate) {
            return true;
        }
        self.parsed_files.iter().any(|member| {
            member.contains('*')
                && Pattern::new(member)
                    .map(|p| p.matches(candidate))
                    .unwrap_or(false)
        })
    }

    fn follow_includes(&mut self, file: &Path) -> Result<(), ParserError> {
        let file_addr = files_path(file);
        let mut targets = Vec::new();
        for addr in self.adapter.match_descendants(&file_addr, "directive")? {
            let Some(name) = self.adapter.get(&addr)? else {
                continue;
            };
            let lower = name.to_ascii_lowercase();
            if lower != "include" && lower != "includeoptional" {
                continue;
            }
            let args = self.adapter.match_children(&addr, "arg")?;
            let Some(first) = args.first() else {
                tracing::debug!(address = %addr, "include directive carries no target");
                continue;
            };
            if let Some(raw) = self.adapter.get(first)? {
                if let Some(target) = self.resolve_include_target(&raw) {
                    targets.push(target);
                }
            }
        }
        for target in targets {
            self.parse_file(&target)?;
        }
        Ok(())
    }

    /// Turn an include directive argument into a loadable absolute path or
    /// pattern: dequote, resolve against the server root, normalize, and
    /// widen directories to every file inside them.
    pub(crate) fn resolve_include_target(&self, raw: &str) -> Option<String> {
        let arg = strip_quotes(raw);
        if arg.is_empty() {
            return None;
        }
        let path = if Path::new(arg).is_absolute() {
            PathBuf::from(arg)
        } else {
            self.root.join(arg)
        };
        let mut path = normalize_lexically(&path);
        if !path.display().to_string().contains('*') && path.is_dir() {
            path = path.join("*");
        }
        Some(path.display().to_string())
    }

    fn resolve_locations(&self) -> Result<Locations, ParserError> {
        let default = self.entry_file.clone();
        let listen = self
            .unique_directive_file("Listen")?
            .unwrap_or_else(|| default.clone());
        let name = self
            .unique_directive_file("ServerName")?
            .unwrap_or_else(|| default.clone());
        Ok(Locations {
            default,
            listen,
            name,
        })
    }

    /// The single file holding every site of `name`, when unambiguous.
    fn unique_directive_file(&self, name: &str) -> Result<Option<PathBuf>, ParserError> {
        let matches = self.find_directives(name, None, None)?;
        let files: BTreeSet<PathBuf> = matches
            .iter()
            .filter_map(|addr| self.adapter.owning_file(addr))
            .collect();
        if files.len() == 1 {
            Ok(files.into_iter().next())
        } else {
            Ok(None)
        }
    }

    /// Files with unsaved in-memory modifications.
    pub fn pending_files(&mut self) -> Result<BTreeSet<PathBuf>, ParserError> {
        Ok(self.adapter.check()?.saved.into_iter().collect())
    }

    /// Flush every pending modification through the adapter. Per-file save
    /// failures aggregate into a single error naming the offending files.
    pub fn save(&mut self) -> Result<(), ParserError> {
        let report = self.adapter.save()?;
        if !report.is_clean() {
            let failures: Vec<String> = report
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.file.display(), e.message))
                .collect();
            return Err(ParserError::config(format!(
                "unable to save modified configuration files: {}",
                failures.join(", ")
            )));
        }
        tracing::debug!(files = report.saved.len(), "configuration changes saved");
        Ok(())
    }
}

/// Normalize a server root and locate its entry file without loading
/// anything. Returns `(normalized_root, entry_file)`.
pub fn probe_installation(
    server_root: &Path,
    options: &ParserOptions,
) -> Result<(PathBuf, PathBuf), ParserError> {
    let root = normalize_path(server_root);
    if !root.is_dir() {
        return Err(ParserError::NoInstallation {
            path: root,
            reason: "configuration directory does not exist".to_string(),
        });
    }
    let entry_file = find_entry_file(&root, &options.entry_files)?;
    Ok((root, entry_file))
}

fn find_entry_file(root: &Path, candidates: &[String]) -> Result<PathBuf, ParserError> {
    for candidate in candidates {
        let path = root.join(candidate);
        if path.is_file() {
            return Ok(path);
        }
    }
    Err(ParserError::NoInstallation {
        path: root.to_path_buf(),
        reason: format!("no entry file found (tried {})", candidates.join(", ")),
    })
}

/// Canonicalize a root path without touching the filesystem: absolutize
/// against the process working directory, collapse duplicate separators,
/// resolve `.`/`..` segments and strip any trailing separator. Idempotent
/// and independent of the input form.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };
    normalize_lexically(&absolute)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

pub(crate) fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalization_collapses_all_input_forms() {
        let canonical = PathBuf::from("/etc/apache2");
        assert_eq!(normalize_path(Path::new("/etc/apache2")), canonical);
        assert_eq!(normalize_path(Path::new("/etc//apache2///")), canonical);
        assert_eq!(normalize_path(Path::new("/etc/../etc/apache2")), canonical);
        assert_eq!(normalize_path(Path::new("/etc/./apache2/.")), canonical);
    }

    #[test]
    fn normalization_absolutizes_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            normalize_path(Path::new("conf/httpd")),
            normalize_lexically(&cwd.join("conf/httpd"))
        );
    }

    #[test]
    fn parent_segments_stop_at_the_filesystem_root() {
        assert_eq!(
            normalize_path(Path::new("/../../etc/apache2")),
            PathBuf::from("/etc/apache2")
        );
    }

    #[test]
    fn quote_stripping_is_single_layer_and_matched() {
        assert_eq!(strip_quotes("\"/srv/www\""), "/srv/www");
        assert_eq!(strip_quotes("'/srv/www'"), "/srv/www");
        assert_eq!(strip_quotes("\"unbalanced'"), "\"unbalanced'");
        assert_eq!(strip_quotes("plain"), "plain");
        assert_eq!(strip_quotes("\"\""), "");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(segments in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let path = PathBuf::from(format!("/{}", segments.join("/")));
            let once = normalize_path(&path);
            prop_assert_eq!(normalize_path(&once), once.clone());
        }

        #[test]
        fn separator_noise_never_changes_the_result(segments in proptest::collection::vec("[a-z]{1,8}", 1..6)) {
            let clean = PathBuf::from(format!("/{}", segments.join("/")));
            let noisy = PathBuf::from(format!("//{}///", segments.join("//")));
            prop_assert_eq!(normalize_path(&clean), normalize_path(&noisy));
        }
    }
}
