//! httpd-confedit: Apache httpd configuration tree editing with
//! live-server reconciliation
//!
//! A parser and mutation engine for the httpd configuration tree, built
//! for certificate automation that must read, query, and safely rewrite a
//! running server's declarative configuration.
//!
//! # Architecture
//!
//! The configuration language itself is owned by an external Augeas-style
//! engine behind the [`TreeEngine`] trait; all addressing strings live in
//! the [`adapter`]. On top of that, [`HttpdParser`] resolves the
//! configuration root, discovers canonical insertion locations, and
//! exposes the search/insert/guard/comment primitives automation depends
//! on. [`HttpdParser::reconcile`] keeps the in-memory model synchronized
//! with the live server's own resolved state via its diagnostic dumps.
//!
//! # Safety
//!
//! - Mutations only touch files already loaded into the tree
//! - Guard and comment insertion are idempotent (search first, create if absent)
//! - Reconciliation commits all-or-nothing; malformed dumps change nothing
//! - Save failures aggregate into one error naming every offending file
//!
//! # Example
//!
//! ```no_run
//! use httpd_confedit::{HttpdCtl, HttpdParser, MemoryEngine, ParserOptions};
//!
//! let options = ParserOptions::default();
//! let mut parser = HttpdParser::new(
//!     Box::new(MemoryEngine::new()),
//!     Box::new(HttpdCtl::new(&options.ctl)),
//!     "/etc/apache2",
//!     &options,
//! )?;
//!
//! parser.reconcile()?;
//! let listens = parser.find_directives("Listen", Some("80"), None)?;
//! println!("{} Listen 80 sites", listens.len());
//! # Ok::<(), httpd_confedit::ParserError>(())
//! ```

pub mod adapter;
pub mod engine;
pub mod errors;
pub mod options;
pub mod parser;
pub mod runtime;

// Re-exports
pub use adapter::{files_path, TreeAdapter};
pub use engine::memory::{MemoryEngine, Node};
pub use engine::{EngineError, FileError, SaveReport, TreeEngine};
pub use errors::ParserError;
pub use options::{load_from_path, load_from_str, OptionsError, ParserOptions};
pub use parser::{HttpdParser, Locations};
pub use runtime::{
    parse_defines, parse_includes, parse_modules, DumpKind, HttpdCtl, RuntimeModule, RuntimeSource,
};
