//! Prolog Language Server Protocol implementation.
//!
//! This crate wraps `prolog-lsp-core` with the tower-lsp framework:
//! the external analyzer subprocess, the debounced analysis pipeline,
//! and the JSON-RPC/stdio server.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         prolog-lsp                           │
//! │                                                              │
//! │  ┌───────────┐   ┌─────────────┐   ┌──────────────────────┐  │
//! │  │ server.rs │   │ pipeline.rs │   │     analyzer.rs      │  │
//! │  │ tower-lsp │──▶│  debounce,  │──▶│  swipl subprocess,   │  │
//! │  │  surface  │   │single-flight│   │  JSON syntax trees   │  │
//! │  └───────────┘   └──────┬──────┘   └──────────────────────┘  │
//! │                         │                                    │
//! │  ┌──────────────────────▼───────────────────────────────┐    │
//! │  │                  prolog-lsp-core                     │    │
//! │  │  tree -> index transformer, cross-file query cache   │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! prolog_lsp::run_server().await;
//! ```

pub mod analyzer;
pub mod capabilities;
pub mod convert;
pub mod pipeline;
pub mod server;
pub mod settings;

pub use server::run_server;
