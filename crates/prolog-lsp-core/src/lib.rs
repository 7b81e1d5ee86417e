//! Transport-agnostic predicate indexing for Prolog sources.
//!
//! This crate holds the pure half of the language server: the typed
//! syntax tree the external analyzer produces, the transformer that
//! turns one file's tree into a predicate index, and the in-memory
//! cache that answers cross-file queries. It has no async or protocol
//! dependencies.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      prolog-lsp-core                        │
//! │  syntax tree -> FileIndex transformer, AnalysisCache,       │
//! │  position/range geometry, document store                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        prolog-lsp                           │
//! │  analysis pipeline (debounce, single-flight), external      │
//! │  analyzer subprocess, tower-lsp server                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use prolog_lsp_core::{build_file_index, AnalysisCache, SyntaxTree};
//! use std::sync::Arc;
//!
//! let tree: SyntaxTree = serde_json::from_str(
//!     r#"{"items": [{"kind": "fact",
//!                    "head": {"kind": "compound", "name": "greets",
//!                             "arguments": [{"kind": "atom", "name": "world"}],
//!                             "position": {"line": 1, "column": 0}},
//!                    "line": 1, "column": 0}]}"#,
//! )
//! .unwrap();
//!
//! let index = build_file_index("file:///hello.pl", &tree);
//! assert_eq!(index.predicates[0].indicator(), "greets/1");
//!
//! let mut cache = AnalysisCache::new();
//! cache.set("file:///hello.pl", Arc::new(index));
//! assert!(cache.find_definition("greets", 1).is_some());
//! ```

pub mod cache;
pub mod document;
pub mod index;
pub mod syntax;
pub mod types;

// Re-export main types and functions for convenience
pub use cache::{AnalysisCache, Definition, EnclosingPredicate, PositionHit, Reference};
pub use document::{Document, DocumentStore};
pub use index::{build_file_index, CallSite, FileIndex, PredicateRecord};
pub use syntax::{Item, NodePosition, NodeSpan, SyntaxTree, Term};
pub use types::{Diagnostic, DiagnosticSeverity, Position, Range};
