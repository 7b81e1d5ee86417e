//! The external syntax analyzer boundary.
//!
//! The server never parses Prolog itself; it hands the source text to
//! an external analyzer process (SWI-Prolog by default) that prints a
//! JSON syntax tree on stdout. By contract this boundary is
//! infallible: tool-level failures — missing executable, spawn error,
//! non-zero exit, unreadable output — surface as diagnostics in an
//! [`AnalyzerOutput::Failed`], never as errors.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use prolog_lsp_core::{Diagnostic, Item, SyntaxTree};

use crate::settings::AnalyzerSettings;

/// Default analyzer executable looked up on `PATH`.
const DEFAULT_EXECUTABLE: &str = "swipl";

/// The outcome of one analyzer invocation.
#[derive(Debug, Clone)]
pub enum AnalyzerOutput {
    /// The analyzer produced a syntax tree (possibly alongside
    /// tool-reported diagnostics for the source).
    Parsed {
        tree: SyntaxTree,
        diagnostics: Vec<Diagnostic>,
    },
    /// The analyzer could not produce a tree; the diagnostics say why.
    Failed { diagnostics: Vec<Diagnostic> },
}

/// Produces a syntax tree for one file's source text.
#[async_trait]
pub trait SyntaxAnalyzer: Send + Sync {
    /// Analyze one file. Must not fail: tool failures become
    /// [`AnalyzerOutput::Failed`] diagnostics.
    async fn analyze(
        &self,
        file_path: &str,
        source: &str,
        settings: &AnalyzerSettings,
    ) -> AnalyzerOutput;
}

#[derive(Debug, Error)]
enum InvokeError {
    #[error("analyzer executable not found: {0}")]
    ExecutableNotFound(#[from] which::Error),

    #[error("failed to run analyzer: {0}")]
    Io(#[from] std::io::Error),

    #[error("analyzer exited with {status}: {stderr}")]
    NonZeroExit {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("unreadable analyzer output: {0}")]
    MalformedOutput(#[from] serde_json::Error),
}

/// What the analyzer prints on stdout.
///
/// `items` present means the tree was produced; absent means the
/// analyzer turned its own failure into diagnostics.
#[derive(Debug, Deserialize)]
struct WireOutput {
    #[serde(default)]
    items: Option<Vec<Item>>,
    #[serde(default)]
    diagnostics: Vec<Diagnostic>,
}

/// Subprocess-backed analyzer.
///
/// The source text is written to a temporary file and the executable
/// is invoked with the configured extra arguments plus that path.
/// There is no timeout and no cancellation: an invocation runs to
/// completion of the process.
#[derive(Debug, Default)]
pub struct SwiplAnalyzer;

impl SwiplAnalyzer {
    /// Create a new subprocess-backed analyzer.
    pub fn new() -> Self {
        Self
    }

    fn resolve_executable(settings: &AnalyzerSettings) -> Result<PathBuf, InvokeError> {
        match &settings.executable {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(which::which(DEFAULT_EXECUTABLE)?),
        }
    }

    async fn invoke(
        &self,
        source: &str,
        settings: &AnalyzerSettings,
    ) -> Result<AnalyzerOutput, InvokeError> {
        let executable = Self::resolve_executable(settings)?;

        let temp = tempfile::Builder::new()
            .prefix("prolog-lsp-")
            .suffix(".pl")
            .tempfile()?;
        tokio::fs::write(temp.path(), source).await?;

        let output = tokio::process::Command::new(&executable)
            .args(&settings.arguments)
            .arg(temp.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(InvokeError::NonZeroExit {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let wire: WireOutput = serde_json::from_slice(&output.stdout)?;
        Ok(match wire.items {
            Some(items) => AnalyzerOutput::Parsed {
                tree: SyntaxTree { items },
                diagnostics: wire.diagnostics,
            },
            None => AnalyzerOutput::Failed {
                diagnostics: wire.diagnostics,
            },
        })
    }
}

#[async_trait]
impl SyntaxAnalyzer for SwiplAnalyzer {
    async fn analyze(
        &self,
        file_path: &str,
        source: &str,
        settings: &AnalyzerSettings,
    ) -> AnalyzerOutput {
        match self.invoke(source, settings).await {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(file = %file_path, "analyzer invocation failed: {err}");
                AnalyzerOutput::Failed {
                    diagnostics: vec![Diagnostic::error(1, 0, format!("analyzer failed: {err}"))],
                }
            }
        }
    }
}
