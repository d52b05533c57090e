//! Deterministic in-memory tree engine.
//!
//! Implements [`TreeEngine`] over documents registered as structured
//! [`Node`] values. No httpd syntax is ever parsed here; fixtures and
//! dry-run embedders build trees through the node constructors, which
//! mirror the shape the real engine produces for parsed files. Save
//! failures and unparseable files are injectable, so every error path of
//! the adapter and parser can be exercised without a live installation.

use super::{EngineError, FileError, SaveReport, TreeEngine};
use glob::Pattern;
use semver::Version;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// One node of a registered document.
///
/// Directive nodes carry the label `directive`, the directive name as value
/// and one `arg` child per argument. Section nodes carry the section name
/// as label, their arguments as leading `arg` children and the enclosed
/// nodes after them. Comment nodes carry the label `#comment` with the
/// comment text as value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    label: String,
    value: Option<String>,
    children: Vec<Node>,
}

impl Node {
    pub fn directive(name: &str, args: &[&str]) -> Node {
        Node {
            label: "directive".to_string(),
            value: Some(name.to_string()),
            children: args.iter().map(|a| Node::arg(a)).collect(),
        }
    }

    pub fn section(name: &str, args: &[&str], mut body: Vec<Node>) -> Node {
        let mut children: Vec<Node> = args.iter().map(|a| Node::arg(a)).collect();
        children.append(&mut body);
        Node {
            label: name.to_string(),
            value: None,
            children,
        }
    }

    pub fn comment(text: &str) -> Node {
        Node {
            label: "#comment".to_string(),
            value: Some(text.to_string()),
            children: Vec::new(),
        }
    }

    fn arg(value: &str) -> Node {
        Node {
            label: "arg".to_string(),
            value: Some(value.to_string()),
            children: Vec::new(),
        }
    }

    fn new_empty(label: &str) -> Node {
        Node {
            label: label.to_string(),
            value: None,
            children: Vec::new(),
        }
    }
}

/// Index selector inside one address segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Index {
    /// Explicit 1-based position among same-label siblings.
    Nth(usize),
    /// `last()`
    Last,
    /// `last()+1`
    AfterLast,
    /// No selector given. Means "first, creating if needed" for writes and
    /// "every index" for pattern matching.
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    label: String,
    index: Index,
}

fn parse_segment(raw: &str, address: &str) -> Result<Segment, EngineError> {
    let bad = |message: &str| EngineError::BadAddress {
        address: address.to_string(),
        message: message.to_string(),
    };

    if raw.is_empty() {
        return Err(bad("empty path segment"));
    }

    let (label, index) = match raw.find('[') {
        None => (raw, Index::Unspecified),
        Some(open) => {
            if !raw.ends_with(']') {
                return Err(bad("unterminated index selector"));
            }
            let label = &raw[..open];
            let sel = &raw[open + 1..raw.len() - 1];
            let index = match sel {
                "last()" => Index::Last,
                "last()+1" | "last() + 1" => Index::AfterLast,
                digits => {
                    let n: usize = digits
                        .parse()
                        .map_err(|_| bad("index selector is not a number"))?;
                    if n == 0 {
                        return Err(bad("index selectors are 1-based"));
                    }
                    Index::Nth(n)
                }
            };
            (label, index)
        }
    };

    if label.is_empty() {
        return Err(bad("empty node label"));
    }

    Ok(Segment {
        label: label.to_string(),
        index,
    })
}

/// Strip the `/files` namespace and split the remainder into raw segments.
fn strip_namespace<'a>(address: &'a str) -> Result<Vec<&'a str>, EngineError> {
    let rest = address
        .strip_prefix("/files/")
        .ok_or_else(|| EngineError::BadAddress {
            address: address.to_string(),
            message: "address must start with /files/".to_string(),
        })?;
    if rest.is_empty() {
        return Err(EngineError::BadAddress {
            address: address.to_string(),
            message: "address names no file".to_string(),
        });
    }
    Ok(rest.split('/').collect())
}

fn label_index(siblings: &[Node], position: usize) -> usize {
    let label = &siblings[position].label;
    siblings[..=position]
        .iter()
        .filter(|n| &n.label == label)
        .count()
}

/// In-memory [`TreeEngine`].
#[derive(Debug, Default)]
pub struct MemoryEngine {
    version: Option<Version>,
    documents: BTreeMap<PathBuf, Vec<Node>>,
    loaded: BTreeSet<PathBuf>,
    dirty: BTreeSet<PathBuf>,
    save_failures: BTreeMap<PathBuf, String>,
    load_failures: BTreeMap<PathBuf, String>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine::default()
    }

    pub fn with_version(version: Version) -> Self {
        MemoryEngine {
            version: Some(version),
            ..MemoryEngine::default()
        }
    }

    /// Register a document under an absolute path. The document only enters
    /// the tree once `load` covers its path.
    pub fn register(&mut self, path: impl AsRef<Path>, nodes: Vec<Node>) {
        self.documents.insert(path.as_ref().to_path_buf(), nodes);
    }

    /// Make every future save of `path` report a per-file error.
    pub fn fail_save(&mut self, path: impl AsRef<Path>, message: &str) {
        self.save_failures
            .insert(path.as_ref().to_path_buf(), message.to_string());
    }

    /// Make `path` unloadable, as a structurally broken file would be.
    pub fn fail_load(&mut self, path: impl AsRef<Path>, message: &str) {
        self.load_failures
            .insert(path.as_ref().to_path_buf(), message.to_string());
    }

    fn file_segments(path: &Path) -> Vec<String> {
        path.components()
            .filter_map(|c| match c {
                std::path::Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    /// Resolve the owning file for an exact (non-pattern) address. Returns
    /// the longest loaded file whose path prefixes the address on a segment
    /// boundary, plus the remaining node segments.
    fn resolve_file<'a>(&self, raw_segments: &[&'a str]) -> Option<(PathBuf, Vec<&'a str>)> {
        let mut best: Option<(PathBuf, Vec<&'a str>)> = None;
        for file in &self.loaded {
            let file_segs = Self::file_segments(file);
            if file_segs.len() > raw_segments.len() {
                continue;
            }
            if file_segs
                .iter()
                .zip(raw_segments)
                .all(|(fs, rs)| fs == rs)
            {
                let better = match &best {
                    Some((prev, _)) => Self::file_segments(prev).len() < file_segs.len(),
                    None => true,
                };
                if better {
                    best = Some((file.clone(), raw_segments[file_segs.len()..].to_vec()));
                }
            }
        }
        best
    }

    /// Every loaded file matching the (possibly wildcarded) leading
    /// segments of a pattern, with the per-file remainder of the pattern.
    fn resolve_file_pattern<'a>(
        &self,
        raw_segments: &[&'a str],
        pattern: &str,
    ) -> Result<Vec<(PathBuf, Vec<&'a str>)>, EngineError> {
        let mut out = Vec::new();
        for file in &self.loaded {
            let file_segs = Self::file_segments(file);
            // A pattern shorter than the file path is a directory prefix:
            // it selects the file root, like `/files/etc/httpd//label`.
            let compared = file_segs.len().min(raw_segments.len());
            let mut all = true;
            for (fs, rs) in file_segs.iter().take(compared).zip(raw_segments) {
                let matched = if rs.contains('*') || rs.contains('?') || rs.contains('[') {
                    Pattern::new(rs)
                        .map_err(|e| EngineError::BadAddress {
                            address: pattern.to_string(),
                            message: e.to_string(),
                        })?
                        .matches(fs)
                } else {
                    fs == rs
                };
                if !matched {
                    all = false;
                    break;
                }
            }
            if all {
                let rest = if raw_segments.len() > file_segs.len() {
                    raw_segments[file_segs.len()..].to_vec()
                } else {
                    Vec::new()
                };
                out.push((file.clone(), rest));
            }
        }
        Ok(out)
    }

    fn node_at<'a>(&'a self, file: &Path, segments: &[Segment]) -> Option<&'a Node> {
        let mut children: &'a [Node] = self.documents.get(file)?;
        let mut current: Option<&'a Node> = None;
        for seg in segments {
            let same: Vec<&'a Node> = children.iter().filter(|n| n.label == seg.label).collect();
            let picked = match seg.index {
                Index::Nth(n) => same.get(n - 1).copied(),
                Index::Unspecified => same.first().copied(),
                Index::Last => same.last().copied(),
                Index::AfterLast => None,
            }?;
            current = Some(picked);
            children = &picked.children;
        }
        current
    }

    fn mark_dirty(&mut self, file: &PathBuf) {
        self.dirty.insert(file.clone());
    }
}

/// Created nodes always land as the last child of their parent; selectors
/// only pick positions among existing nodes.
fn attach_new(children: &mut Vec<Node>, node: Node) -> usize {
    children.push(node);
    children.len() - 1
}

fn walk_create<'a>(
    children: &'a mut Vec<Node>,
    segments: &[Segment],
    address: &str,
) -> Result<&'a mut Node, EngineError> {
    let seg = &segments[0];
    let positions: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, n)| n.label == seg.label)
        .map(|(i, _)| i)
        .collect();

    let position = match seg.index {
        Index::Nth(n) => {
            if n <= positions.len() {
                positions[n - 1]
            } else if n == positions.len() + 1 {
                attach_new(children, Node::new_empty(&seg.label))
            } else {
                return Err(EngineError::BadAddress {
                    address: address.to_string(),
                    message: format!("index {n} skips over missing siblings"),
                });
            }
        }
        Index::Last => positions
            .last()
            .copied()
            .unwrap_or_else(|| attach_new(children, Node::new_empty(&seg.label))),
        Index::Unspecified => positions
            .first()
            .copied()
            .unwrap_or_else(|| attach_new(children, Node::new_empty(&seg.label))),
        Index::AfterLast => attach_new(children, Node::new_empty(&seg.label)),
    };

    let node = &mut children[position];
    if segments.len() == 1 {
        Ok(node)
    } else {
        walk_create(&mut node.children, &segments[1..], address)
    }
}

impl TreeEngine for MemoryEngine {
    fn version(&self) -> Result<Version, EngineError> {
        Ok(self
            .version
            .clone()
            .unwrap_or_else(|| Version::new(1, 14, 1)))
    }

    fn load(&mut self, path_or_glob: &str) -> Result<Vec<PathBuf>, EngineError> {
        let is_pattern = path_or_glob.contains('*') || path_or_glob.contains('?');
        let mut fresh = Vec::new();

        if is_pattern {
            let pattern = Pattern::new(path_or_glob).map_err(|e| EngineError::Load {
                path: path_or_glob.to_string(),
                message: e.to_string(),
            })?;
            let matching: Vec<PathBuf> = self
                .documents
                .keys()
                .filter(|p| pattern.matches(&p.to_string_lossy()))
                .cloned()
                .collect();
            for path in matching {
                if let Some(message) = self.load_failures.get(&path) {
                    return Err(EngineError::Load {
                        path: path.to_string_lossy().into_owned(),
                        message: message.clone(),
                    });
                }
                if self.loaded.insert(path.clone()) {
                    fresh.push(path);
                }
            }
        } else {
            let path = PathBuf::from(path_or_glob);
            if let Some(message) = self.load_failures.get(&path) {
                return Err(EngineError::Load {
                    path: path_or_glob.to_string(),
                    message: message.clone(),
                });
            }
            // Unregistered exact paths load nothing, matching the lenient
            // engine behavior for files that are absent at load time.
            if self.documents.contains_key(&path) && self.loaded.insert(path.clone()) {
                fresh.push(path);
            }
        }

        Ok(fresh)
    }

    fn loaded(&self) -> Vec<PathBuf> {
        self.loaded.iter().cloned().collect()
    }

    fn matches(&self, pattern: &str) -> Result<Vec<String>, EngineError> {
        let (context_part, descendant_label) = match pattern.find("//") {
            Some(pos) => {
                let right = &pattern[pos + 2..];
                if right.is_empty() || right.contains('/') {
                    return Err(EngineError::BadAddress {
                        address: pattern.to_string(),
                        message: "descendant pattern must end in a single label".to_string(),
                    });
                }
                (&pattern[..pos], Some(right))
            }
            None => (pattern, None),
        };

        let raw_segments = strip_namespace(context_part)?;
        let mut results = Vec::new();

        for (file, node_raw) in self.resolve_file_pattern(&raw_segments, pattern)? {
            let segments = node_raw
                .iter()
                .map(|raw| parse_segment(raw, pattern))
                .collect::<Result<Vec<_>, _>>()?;
            let file_addr = format!("/files{}", file.to_string_lossy());
            let Some(children) = self.documents.get(&file) else {
                continue;
            };
            collect_matches(
                children,
                &segments,
                &file_addr,
                descendant_label,
                &mut results,
            );
        }

        Ok(results)
    }

    fn get(&self, address: &str) -> Result<Option<String>, EngineError> {
        if !address.starts_with('/') {
            return Err(EngineError::BadAddress {
                address: address.to_string(),
                message: "address must be absolute".to_string(),
            });
        }
        // Addresses outside the /files namespace exist in the engine's
        // wider tree but never resolve to configuration nodes; selector
        // syntax is still checked.
        if !address.starts_with("/files/") {
            for raw in address.trim_start_matches('/').split('/') {
                parse_segment(raw, address)?;
            }
            return Ok(None);
        }
        let raw_segments = strip_namespace(address)?;
        let Some((file, node_raw)) = self.resolve_file(&raw_segments) else {
            return Ok(None);
        };
        let segments = node_raw
            .iter()
            .map(|raw| parse_segment(raw, address))
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Ok(None);
        }
        Ok(self
            .node_at(&file, &segments)
            .and_then(|n| n.value.clone()))
    }

    fn set(&mut self, address: &str, value: &str) -> Result<(), EngineError> {
        let raw_segments = strip_namespace(address)?;
        let Some((file, node_raw)) = self.resolve_file(&raw_segments) else {
            return Err(EngineError::Unloaded {
                address: address.to_string(),
            });
        };
        let segments = node_raw
            .iter()
            .map(|raw| parse_segment(raw, address))
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Err(EngineError::BadAddress {
                address: address.to_string(),
                message: "file roots carry no value".to_string(),
            });
        }
        let children = self.documents.get_mut(&file).ok_or(EngineError::Unloaded {
            address: address.to_string(),
        })?;
        let node = walk_create(children, &segments, address)?;
        node.value = Some(value.to_string());
        self.mark_dirty(&file);
        Ok(())
    }

    fn insert(&mut self, sibling: &str, label: &str, before: bool) -> Result<(), EngineError> {
        let raw_segments = strip_namespace(sibling)?;
        let Some((file, node_raw)) = self.resolve_file(&raw_segments) else {
            return Err(EngineError::Unloaded {
                address: sibling.to_string(),
            });
        };
        let segments = node_raw
            .iter()
            .map(|raw| parse_segment(raw, sibling))
            .collect::<Result<Vec<_>, _>>()?;
        if segments.is_empty() {
            return Err(EngineError::BadAddress {
                address: sibling.to_string(),
                message: "cannot insert a sibling of a file root".to_string(),
            });
        }

        let children = self.documents.get_mut(&file).ok_or(EngineError::Unloaded {
            address: sibling.to_string(),
        })?;
        let parent_children = if segments.len() == 1 {
            children
        } else {
            &mut walk_lookup(children, &segments[..segments.len() - 1], sibling)?.children
        };

        let seg = &segments[segments.len() - 1];
        let positions: Vec<usize> = parent_children
            .iter()
            .enumerate()
            .filter(|(_, n)| n.label == seg.label)
            .map(|(i, _)| i)
            .collect();
        let anchor = match seg.index {
            Index::Nth(n) => positions.get(n - 1).copied(),
            Index::Unspecified => positions.first().copied(),
            Index::Last => positions.last().copied(),
            Index::AfterLast => None,
        }
        .ok_or_else(|| EngineError::BadAddress {
            address: sibling.to_string(),
            message: "insertion anchor does not exist".to_string(),
        })?;

        let position = if before { anchor } else { anchor + 1 };
        parent_children.insert(position, Node::new_empty(label));
        self.mark_dirty(&file);
        Ok(())
    }

    fn check(&mut self) -> Result<SaveReport, EngineError> {
        Ok(SaveReport {
            saved: self.dirty.iter().cloned().collect(),
            errors: self
                .dirty
                .iter()
                .filter_map(|f| {
                    self.save_failures.get(f).map(|m| FileError {
                        file: f.clone(),
                        message: m.clone(),
                    })
                })
                .collect(),
        })
    }

    fn save(&mut self) -> Result<SaveReport, EngineError> {
        let mut report = SaveReport::default();
        let dirty: Vec<PathBuf> = self.dirty.iter().cloned().collect();
        for file in dirty {
            match self.save_failures.get(&file) {
                Some(message) => report.errors.push(FileError {
                    message: message.clone(),
                    file,
                }),
                None => {
                    self.dirty.remove(&file);
                    report.saved.push(file);
                }
            }
        }
        Ok(report)
    }
}

/// Walk an exact (already parsed) node path without creating anything.
fn walk_lookup<'a>(
    children: &'a mut Vec<Node>,
    segments: &[Segment],
    address: &str,
) -> Result<&'a mut Node, EngineError> {
    let seg = &segments[0];
    let position = {
        let positions: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, n)| n.label == seg.label)
            .map(|(i, _)| i)
            .collect();
        match seg.index {
            Index::Nth(n) => positions.get(n - 1).copied(),
            Index::Unspecified => positions.first().copied(),
            Index::Last => positions.last().copied(),
            Index::AfterLast => None,
        }
    }
    .ok_or_else(|| EngineError::BadAddress {
        address: address.to_string(),
        message: format!("no node matches segment '{}'", seg.label),
    })?;

    let node = &mut children[position];
    if segments.len() == 1 {
        Ok(node)
    } else {
        walk_lookup(&mut node.children, &segments[1..], address)
    }
}

/// Resolve the context segments, then emit either the context nodes
/// themselves or all their matching descendants, in document order.
fn collect_matches(
    children: &[Node],
    segments: &[Segment],
    parent_addr: &str,
    descendant_label: Option<&str>,
    results: &mut Vec<String>,
) {
    if segments.is_empty() {
        match descendant_label {
            None => results.push(parent_addr.to_string()),
            Some(label) => collect_descendants(children, parent_addr, label, results),
        }
        return;
    }

    let seg = &segments[0];
    for (position, node) in children.iter().enumerate() {
        if seg.label != "*" && node.label != seg.label {
            continue;
        }
        let nth = label_index(children, position);
        let keep = match seg.index {
            Index::Unspecified => true,
            Index::Nth(n) => nth == n,
            Index::Last => {
                children
                    .iter()
                    .filter(|n| n.label == node.label)
                    .count()
                    == nth
            }
            Index::AfterLast => false,
        };
        if !keep {
            continue;
        }
        let addr = format!("{parent_addr}/{}[{nth}]", node.label);
        collect_matches(
            &node.children,
            &segments[1..],
            &addr,
            descendant_label,
            results,
        );
    }
}

fn collect_descendants(children: &[Node], parent_addr: &str, label: &str, results: &mut Vec<String>) {
    for (position, node) in children.iter().enumerate() {
        let nth = label_index(children, position);
        let addr = format!("{parent_addr}/{}[{nth}]", node.label);
        if label == "*" || node.label == label {
            results.push(addr.clone());
        }
        collect_descendants(&node.children, &addr, label, results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_file() -> (MemoryEngine, String) {
        let mut engine = MemoryEngine::new();
        engine.register(
            "/etc/httpd/httpd.conf",
            vec![
                Node::comment("managed"),
                Node::directive("Listen", &["80"]),
                Node::section(
                    "VirtualHost",
                    &["*:80"],
                    vec![Node::directive("ServerName", &["example.org"])],
                ),
            ],
        );
        engine.load("/etc/httpd/httpd.conf").unwrap();
        (engine, "/files/etc/httpd/httpd.conf".to_string())
    }

    #[test]
    fn load_reports_fresh_files_once() {
        let (mut engine, _) = engine_with_file();
        assert_eq!(engine.load("/etc/httpd/httpd.conf").unwrap().len(), 0);
        assert_eq!(engine.loaded().len(), 1);
    }

    #[test]
    fn load_glob_activates_registered_documents() {
        let mut engine = MemoryEngine::new();
        engine.register("/etc/httpd/sites/a.conf", vec![]);
        engine.register("/etc/httpd/sites/b.conf", vec![]);
        engine.register("/etc/httpd/other.conf", vec![]);
        let fresh = engine.load("/etc/httpd/sites/*.conf").unwrap();
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn get_resolves_values_and_misses_quietly() {
        let (engine, root) = engine_with_file();
        assert_eq!(
            engine.get(&format!("{root}/directive[1]")).unwrap(),
            Some("Listen".to_string())
        );
        assert_eq!(
            engine.get(&format!("{root}/directive[1]/arg[1]")).unwrap(),
            Some("80".to_string())
        );
        assert_eq!(engine.get("/files/whatever/nonexistent").unwrap(), None);
        // Well-formed addresses outside the /files namespace miss quietly.
        assert_eq!(engine.get("/nonexistent/path").unwrap(), None);
    }

    #[test]
    fn get_rejects_malformed_addresses() {
        let (engine, root) = engine_with_file();
        assert!(engine.get("not-an-address").is_err());
        assert!(engine.get(&format!("{root}/directive[zero]")).is_err());
    }

    #[test]
    fn set_appends_with_after_last_selector() {
        let (mut engine, root) = engine_with_file();
        engine
            .set(&format!("{root}/directive[last()+1]"), "ServerAdmin")
            .unwrap();
        engine
            .set(&format!("{root}/directive[last()]/arg"), "root@example.org")
            .unwrap();
        assert_eq!(
            engine.get(&format!("{root}/directive[2]")).unwrap(),
            Some("ServerAdmin".to_string())
        );
        assert_eq!(
            engine.get(&format!("{root}/directive[2]/arg[1]")).unwrap(),
            Some("root@example.org".to_string())
        );
    }

    #[test]
    fn set_creates_intermediate_sections() {
        let (mut engine, root) = engine_with_file();
        engine
            .set(&format!("{root}/IfModule[last()+1]/arg"), "ssl_module")
            .unwrap();
        let hits = engine.matches(&format!("{root}/IfModule")).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn set_on_unloaded_path_fails_fast() {
        let (mut engine, _) = engine_with_file();
        let err = engine.set("/files/etc/httpd/extra.conf/directive[1]", "X");
        assert!(matches!(err, Err(EngineError::Unloaded { .. })));
    }

    #[test]
    fn insert_before_first_child() {
        let (mut engine, root) = engine_with_file();
        let first = engine.matches(&format!("{root}/*")).unwrap()[0].clone();
        engine.insert(&first, "directive", true).unwrap();
        engine.set(&format!("{root}/directive[1]"), "First").unwrap();
        let all = engine.matches(&format!("{root}/*")).unwrap();
        assert!(all[0].contains("directive[1]"));
        assert_eq!(
            engine.get(&format!("{root}/directive[1]")).unwrap(),
            Some("First".to_string())
        );
        // Previous top comment slid to overall position two.
        assert!(all[1].contains("#comment[1]"));
    }

    #[test]
    fn descendant_matches_in_document_order() {
        let (engine, root) = engine_with_file();
        let hits = engine.matches(&format!("{root}//directive")).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].ends_with("/directive[1]"));
        assert!(hits[1].contains("VirtualHost[1]"));
    }

    #[test]
    fn pattern_file_segments_may_be_globs() {
        let mut engine = MemoryEngine::new();
        engine.register(
            "/etc/httpd/sites/a.conf",
            vec![Node::directive("DocumentRoot", &["/srv/a"])],
        );
        engine.register(
            "/etc/httpd/sites/b.conf",
            vec![Node::directive("DocumentRoot", &["/srv/b"])],
        );
        engine.load("/etc/httpd/sites/*.conf").unwrap();
        let hits = engine
            .matches("/files/etc/httpd/sites/*//directive")
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn dirty_tracking_and_save_failures() {
        let (mut engine, root) = engine_with_file();
        engine.fail_save("/etc/httpd/httpd.conf", "Permission denied");
        engine
            .set(&format!("{root}/directive[last()+1]"), "ServerAdmin")
            .unwrap();

        let check = engine.check().unwrap();
        assert_eq!(check.saved.len(), 1);
        assert_eq!(check.errors.len(), 1);

        let report = engine.save().unwrap();
        assert!(report.saved.is_empty());
        assert_eq!(report.errors[0].message, "Permission denied");
        // The failed file keeps its pending state.
        assert_eq!(engine.check().unwrap().saved.len(), 1);
    }

    #[test]
    fn version_defaults_and_overrides() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.version().unwrap(), Version::new(1, 14, 1));
        let engine = MemoryEngine::with_version(Version::new(0, 9, 0));
        assert_eq!(engine.version().unwrap(), Version::new(0, 9, 0));
    }
}
