//! Shared fixture: a Debian-style configuration layout registered into
//! the in-memory engine, plus canned runtime report sources.

#![allow(dead_code)]

use httpd_confedit::{
    DumpKind, HttpdParser, MemoryEngine, Node, ParserError, ParserOptions, RuntimeSource,
};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub root: PathBuf,
}

/// Lay out `apache2/` under a fresh temp directory. The entry file and its
/// relatives exist on disk (root resolution probes the filesystem); their
/// parsed shape lives in the engine via [`populate`].
pub fn debian_layout() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("apache2");
    for sub in ["mods-enabled", "sites-enabled", "sites-available"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    for file in [
        "apache2.conf",
        "ports.conf",
        "mods-enabled/ssl.load",
        "sites-enabled/site1.conf",
        "sites-enabled/site2.conf",
        "sites-enabled/site3.conf",
        "sites-enabled/site4.conf",
        "sites-available/disabled.conf",
    ] {
        fs::write(root.join(file), b"# fixture\n").unwrap();
    }
    Fixture { dir, root }
}

pub const MOD_SSL_PATH: &str = "/usr/lib/apache2/modules/mod_ssl.so";

/// Register the parsed shape of the layout into an engine.
pub fn populate(engine: &mut MemoryEngine, root: &Path) {
    engine.register(
        root.join("apache2.conf"),
        vec![
            Node::comment("Debian default configuration"),
            Node::directive("ServerName", &["localhost"]),
            Node::directive("Include", &["ports.conf"]),
            Node::directive("Include", &["mods-enabled/*.load"]),
            Node::directive("IncludeOptional", &["sites-enabled/*.conf"]),
        ],
    );
    engine.register(
        root.join("ports.conf"),
        vec![
            Node::directive("Listen", &["80"]),
            Node::section(
                "IfModule",
                &["ssl_module"],
                vec![Node::directive("Listen", &["443"])],
            ),
            Node::section(
                "IfModule",
                &["rewrite_module"],
                vec![Node::directive("Listen", &["8080"])],
            ),
            Node::section(
                "IfDefine",
                &["TLS_DEV"],
                vec![Node::directive("Listen", &["9443"])],
            ),
        ],
    );
    engine.register(
        root.join("mods-enabled/ssl.load"),
        vec![Node::directive("LoadModule", &["ssl_module", MOD_SSL_PATH])],
    );
    for i in 1..=4 {
        let site_a = format!("a{i}.example.org");
        let site_b = format!("b{i}.example.org");
        let root_a = format!("/srv/a{i}");
        let root_b = format!("/srv/b{i}");
        engine.register(
            root.join(format!("sites-enabled/site{i}.conf")),
            vec![
                Node::section(
                    "VirtualHost",
                    &["*:80"],
                    vec![
                        Node::directive("ServerName", &[site_a.as_str()]),
                        Node::directive("DocumentRoot", &[root_a.as_str()]),
                    ],
                ),
                Node::section(
                    "VirtualHost",
                    &["*:80"],
                    vec![
                        Node::directive("ServerName", &[site_b.as_str()]),
                        Node::directive("DocumentRoot", &[root_b.as_str()]),
                    ],
                ),
            ],
        );
    }
    // Present on disk and in the engine, but no enabled path includes it.
    engine.register(
        root.join("sites-available/disabled.conf"),
        vec![
            Node::directive("Listen", &["80"]),
            Node::directive("DocumentRoot", &["/srv/disabled"]),
        ],
    );
}

pub fn engine_for(fixture: &Fixture) -> MemoryEngine {
    let mut engine = MemoryEngine::new();
    populate(&mut engine, &fixture.root);
    engine
}

#[derive(Debug, Default)]
pub struct Reports {
    pub run_cfg: String,
    pub includes: String,
    pub modules: String,
}

/// Canned runtime reports behind a shared handle, so tests can swap dump
/// content between reconcile calls.
pub struct StaticRuntime {
    reports: Rc<RefCell<Reports>>,
}

impl StaticRuntime {
    pub fn new() -> (Self, Rc<RefCell<Reports>>) {
        let reports = Rc::new(RefCell::new(Reports::default()));
        (
            StaticRuntime {
                reports: Rc::clone(&reports),
            },
            reports,
        )
    }
}

impl RuntimeSource for StaticRuntime {
    fn dump(&self, kind: DumpKind) -> Result<String, ParserError> {
        let reports = self.reports.borrow();
        Ok(match kind {
            DumpKind::RunCfg => reports.run_cfg.clone(),
            DumpKind::Includes => reports.includes.clone(),
            DumpKind::Modules => reports.modules.clone(),
        })
    }
}

/// A server whose control binary cannot be run at all.
pub struct BrokenRuntime;

impl RuntimeSource for BrokenRuntime {
    fn dump(&self, kind: DumpKind) -> Result<String, ParserError> {
        Err(ParserError::Misconfiguration {
            command: format!("apache2ctl -t -D {}", kind.flag()),
            detail: "No such file or directory".to_string(),
        })
    }
}

pub fn parser_with(
    fixture: &Fixture,
    engine: MemoryEngine,
    runtime: impl RuntimeSource + 'static,
) -> Result<HttpdParser, ParserError> {
    HttpdParser::new(
        Box::new(engine),
        Box::new(runtime),
        &fixture.root,
        &ParserOptions::default(),
    )
}

/// Ready parser over the standard layout with empty runtime reports.
pub fn parser_for(fixture: &Fixture) -> HttpdParser {
    let (runtime, _) = StaticRuntime::new();
    parser_with(fixture, engine_for(fixture), runtime).unwrap()
}
