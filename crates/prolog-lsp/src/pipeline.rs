//! The document analysis pipeline.
//!
//! Converts file-lifecycle events (open, change, save, close,
//! configuration change) into cache updates, with two scheduling
//! rules:
//!
//! - **Debounce**: a content change arms a per-document timer; only
//!   the last change inside the window triggers analysis. Timers are
//!   explicit cancellable tasks (`CancellationToken` + `select!`),
//!   superseded by the next change for the same document.
//! - **Single-flight**: at most one analysis runs per document at a
//!   time. A trigger that arrives while one is pending is dropped;
//!   on-demand requesters share the pending run through a watch
//!   channel instead of starting another.
//!
//! Results computed from outdated text are discarded: every analysis
//! captures the document's revision up front and skips installation
//! if the document changed (or closed) while the external analyzer
//! ran, then immediately re-triggers itself against the fresher text.
//! A slower analysis can therefore never overwrite a faster one.
//!
//! Nothing above the pipeline observes a raw error. Analyzer-level
//! failures arrive as diagnostics by contract; an internal failure
//! evicts the document's cache entry and publishes one synthetic
//! error diagnostic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use prolog_lsp_core::{
    build_file_index, AnalysisCache, Definition, Diagnostic, Document, DocumentStore, FileIndex,
    Position, PositionHit, Reference,
};

use crate::analyzer::{AnalyzerOutput, SyntaxAnalyzer};
use crate::settings::SettingsProvider;

/// Sink for per-document diagnostics.
///
/// Diagnostics for a document are fully replaced on every analysis
/// and fully cleared when the document closes.
#[async_trait]
pub trait DiagnosticsPublisher: Send + Sync {
    /// Publish the complete set of diagnostics for a document.
    async fn publish(&self, uri: &str, diagnostics: Vec<Diagnostic>);
}

/// Internal pipeline failure. Never propagated to callers; converted
/// into a synthetic diagnostic at the pipeline boundary.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("index construction failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What an analysis run decided about its own result.
enum RunOutcome {
    /// Result installed (or nothing to do).
    Settled,
    /// Result discarded because the document moved on; run again.
    Stale,
}

/// Scheduling layer between editor events and the analysis cache.
pub struct AnalysisPipeline {
    documents: RwLock<DocumentStore>,
    cache: RwLock<AnalysisCache>,
    /// At most one entry per document: the in-flight analysis other
    /// requesters can await.
    pending: Mutex<HashMap<String, watch::Receiver<()>>>,
    /// Armed debounce timers, one per document.
    timers: Mutex<HashMap<String, CancellationToken>>,
    analyzer: Arc<dyn SyntaxAnalyzer>,
    settings: Arc<dyn SettingsProvider>,
    publisher: Arc<dyn DiagnosticsPublisher>,
}

impl AnalysisPipeline {
    /// Create a new pipeline around the given collaborators.
    pub fn new(
        analyzer: Arc<dyn SyntaxAnalyzer>,
        settings: Arc<dyn SettingsProvider>,
        publisher: Arc<dyn DiagnosticsPublisher>,
    ) -> Arc<Self> {
        Arc::new(Self {
            documents: RwLock::new(DocumentStore::new()),
            cache: RwLock::new(AnalysisCache::new()),
            pending: Mutex::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
            analyzer,
            settings,
            publisher,
        })
    }

    // ------------------------------------------------------------------
    // Lifecycle triggers
    // ------------------------------------------------------------------

    /// A document was opened: analyze immediately.
    pub async fn open(self: &Arc<Self>, uri: &str, text: impl Into<String>, version: i32) {
        self.documents.write().await.open(uri, text, version);
        self.trigger(uri).await;
    }

    /// A document changed: restart its debounce timer. Only the last
    /// change inside the window fires an analysis.
    pub async fn change(self: &Arc<Self>, uri: &str, text: impl Into<String>, version: i32) {
        self.documents.write().await.change(uri, text, version);

        let delay = self.settings.settings(uri).debounce_ms;
        let token = CancellationToken::new();
        {
            let mut timers = self.timers.lock().await;
            if let Some(previous) = timers.insert(uri.to_string(), token.clone()) {
                previous.cancel();
            }
        }

        let this = Arc::clone(self);
        let uri = uri.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {
                    this.trigger(&uri).await;
                }
            }
        });
    }

    /// A document was saved: analyze immediately, bypassing any
    /// debounce window.
    pub async fn save(self: &Arc<Self>, uri: &str) {
        self.trigger(uri).await;
    }

    /// A document was closed: drop its state and clear its published
    /// diagnostics.
    pub async fn close(self: &Arc<Self>, uri: &str) {
        if let Some(timer) = self.timers.lock().await.remove(uri) {
            timer.cancel();
        }
        // Held across delete and clear: an in-flight install waits on
        // the same lock, so it orders strictly before or after the
        // close instead of racing it.
        let mut documents = self.documents.write().await;
        documents.close(uri);
        self.cache.write().await.delete(uri);
        self.publisher.publish(uri, Vec::new()).await;
    }

    /// Settings changed: re-trigger every open document independently.
    pub async fn reanalyze_all(self: &Arc<Self>) {
        let uris: Vec<String> = self
            .documents
            .read()
            .await
            .uris()
            .map(str::to_string)
            .collect();
        for uri in uris {
            self.trigger(&uri).await;
        }
    }

    /// Drop every cache entry (session reset).
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The cached index for a document, if one exists.
    pub async fn cached(&self, uri: &str) -> Option<Arc<FileIndex>> {
        self.cache.read().await.get(uri)
    }

    /// On-demand access to a document's index.
    ///
    /// Returns the cached entry if present; otherwise joins the
    /// in-flight analysis if one exists; otherwise starts one and
    /// awaits it. Any number of logical requesters share at most one
    /// physical analysis per document.
    pub async fn analyze_document(self: &Arc<Self>, uri: &str) -> Option<Arc<FileIndex>> {
        if let Some(index) = self.cache.read().await.get(uri) {
            return Some(index);
        }
        if !self.documents.read().await.contains(uri) {
            return None;
        }
        let mut done = self.ensure_analysis(uri).await;
        // Settles on completion signal or on sender drop; both mean
        // the run is over.
        let _ = done.changed().await;
        self.cache.read().await.get(uri)
    }

    /// First definition of `name/arity` across all cached files.
    pub async fn find_definition(&self, name: &str, arity: u32) -> Option<Definition> {
        self.cache.read().await.find_definition(name, arity)
    }

    /// Every call site referencing `name/arity` across all cached files.
    pub async fn find_references(&self, name: &str, arity: u32) -> Vec<Reference> {
        self.cache.read().await.find_references(name, arity)
    }

    /// Resolve what sits at a position within one document.
    pub async fn find_element_at_position(
        &self,
        uri: &str,
        position: Position,
    ) -> Option<PositionHit> {
        self.cache.read().await.find_element_at_position(uri, position)
    }

    // ------------------------------------------------------------------
    // Scheduling internals
    // ------------------------------------------------------------------

    /// Fire-and-forget analysis trigger, subject to single-flight.
    async fn trigger(self: &Arc<Self>, uri: &str) {
        let _ = self.ensure_analysis(uri).await;
    }

    /// Start an analysis for `uri` unless one is already pending, and
    /// return a receiver that settles when the (new or existing) run
    /// finishes.
    async fn ensure_analysis(self: &Arc<Self>, uri: &str) -> watch::Receiver<()> {
        let mut pending = self.pending.lock().await;
        if let Some(existing) = pending.get(uri) {
            // Single-flight: the trigger is dropped, not queued.
            tracing::trace!(uri, "analysis already pending, trigger dropped");
            return existing.clone();
        }
        let (tx, rx) = watch::channel(());
        pending.insert(uri.to_string(), rx.clone());
        drop(pending);

        let this = Arc::clone(self);
        let uri = uri.to_string();
        tokio::spawn(async move {
            // A stale outcome means the document moved on while we
            // analyzed; rerun against the fresher text. The pending
            // slot stays occupied for the whole chain, so concurrent
            // triggers are still dropped and requesters settle once.
            while matches!(this.run_analysis(&uri).await, RunOutcome::Stale) {
                tracing::trace!(uri, "rerunning analysis against fresher text");
            }
            this.pending.lock().await.remove(&uri);
            let _ = tx.send(());
        });
        rx
    }

    /// One analysis run, with the internal-error boundary.
    async fn run_analysis(&self, uri: &str) -> RunOutcome {
        match self.perform_analysis(uri).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(uri, "internal analysis failure: {err}");
                self.cache.write().await.delete(uri);
                self.publisher
                    .publish(
                        uri,
                        vec![Diagnostic::error(0, 0, format!("internal analysis error: {err}"))],
                    )
                    .await;
                RunOutcome::Settled
            }
        }
    }

    async fn perform_analysis(&self, uri: &str) -> Result<RunOutcome, PipelineError> {
        let (text, revision) = {
            let documents = self.documents.read().await;
            match documents.get(uri) {
                Some(doc) => (doc.content().to_string(), doc.revision()),
                None => {
                    // Closed before we got to it; nothing to analyze.
                    tracing::trace!(uri, "document closed before analysis started");
                    return Ok(RunOutcome::Settled);
                }
            }
        };

        let settings = self.settings.settings(uri);
        let output = self.analyzer.analyze(uri, &text, &settings).await;

        match output {
            AnalyzerOutput::Parsed { tree, diagnostics } => {
                let owned_uri = uri.to_string();
                let index =
                    tokio::task::spawn_blocking(move || build_file_index(&owned_uri, &tree))
                        .await?;

                let mut combined = diagnostics;
                combined.extend(index.diagnostics.iter().cloned());

                // Install and publish under the store lock, checked
                // after every suspension is behind us. A concurrent
                // close either already emptied the store (caught
                // here) or waits on this lock and deletes the entry
                // afterwards; a closed document can never be
                // resurrected by this install.
                let documents = self.documents.read().await;
                if let Some(outcome) = Self::superseded(&documents, uri, revision) {
                    return Ok(outcome);
                }
                self.cache.write().await.set(uri, Arc::new(index));
                self.publisher.publish(uri, combined).await;
            }
            AnalyzerOutput::Failed { diagnostics } => {
                // Tool-level failure: cache entry left absent/unchanged.
                let documents = self.documents.read().await;
                if let Some(outcome) = Self::superseded(&documents, uri, revision) {
                    return Ok(outcome);
                }
                self.publisher.publish(uri, diagnostics).await;
            }
        }
        Ok(RunOutcome::Settled)
    }

    /// Whether the document moved on since `revision` was captured.
    /// `None` means the result is still current and may be installed.
    fn superseded(documents: &DocumentStore, uri: &str, revision: u64) -> Option<RunOutcome> {
        match documents.get(uri).map(Document::revision) {
            None => {
                tracing::trace!(uri, "document closed during analysis, result dropped");
                Some(RunOutcome::Settled)
            }
            Some(now) if now != revision => {
                tracing::trace!(uri, "document changed during analysis, result discarded");
                Some(RunOutcome::Stale)
            }
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use prolog_lsp_core::{Item, NodePosition, SyntaxTree, Term};

    use crate::settings::{AnalyzerSettings, SharedSettings};

    /// Fake analyzer: each line `name.` becomes a fact `name/0`.
    /// Optionally sleeps to simulate a slow external process.
    struct ScriptedAnalyzer {
        invocations: AtomicUsize,
        delay_ms: u64,
        fail_with: Option<Vec<Diagnostic>>,
    }

    impl ScriptedAnalyzer {
        fn instant() -> Arc<Self> {
            Arc::new(Self {
                invocations: AtomicUsize::new(0),
                delay_ms: 0,
                fail_with: None,
            })
        }

        fn slow(delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                invocations: AtomicUsize::new(0),
                delay_ms,
                fail_with: None,
            })
        }

        fn failing(diagnostics: Vec<Diagnostic>) -> Arc<Self> {
            Arc::new(Self {
                invocations: AtomicUsize::new(0),
                delay_ms: 0,
                fail_with: Some(diagnostics),
            })
        }

        fn count(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyntaxAnalyzer for ScriptedAnalyzer {
        async fn analyze(
            &self,
            _file_path: &str,
            source: &str,
            _settings: &AnalyzerSettings,
        ) -> AnalyzerOutput {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if let Some(diagnostics) = &self.fail_with {
                return AnalyzerOutput::Failed {
                    diagnostics: diagnostics.clone(),
                };
            }

            let items = source
                .lines()
                .enumerate()
                .filter_map(|(i, line)| {
                    let name = line.trim().strip_suffix('.')?;
                    if name.is_empty() {
                        return None;
                    }
                    Some(Item::Fact {
                        head: Term::Compound {
                            name: name.to_string(),
                            arguments: vec![],
                            position: Some(NodePosition::new(i as u32 + 1, 0)),
                        },
                        line: i as u32 + 1,
                        column: 0,
                        span: None,
                    })
                })
                .collect();
            AnalyzerOutput::Parsed {
                tree: SyntaxTree { items },
                diagnostics: Vec::new(),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, Vec<Diagnostic>)>>,
    }

    impl RecordingPublisher {
        async fn last_for(&self, uri: &str) -> Option<Vec<Diagnostic>> {
            self.published
                .lock()
                .await
                .iter()
                .rev()
                .find(|(u, _)| u == uri)
                .map(|(_, d)| d.clone())
        }
    }

    #[async_trait]
    impl DiagnosticsPublisher for RecordingPublisher {
        async fn publish(&self, uri: &str, diagnostics: Vec<Diagnostic>) {
            self.published
                .lock()
                .await
                .push((uri.to_string(), diagnostics));
        }
    }

    fn pipeline_with(
        analyzer: Arc<ScriptedAnalyzer>,
    ) -> (Arc<AnalysisPipeline>, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let settings = SharedSettings::new();
        let pipeline = AnalysisPipeline::new(analyzer, settings, publisher.clone());
        (pipeline, publisher)
    }

    const URI: &str = "file:///test.pl";

    #[tokio::test(start_paused = true)]
    async fn open_analyzes_and_installs_index() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, publisher) = pipeline_with(analyzer.clone());

        pipeline.open(URI, "p.\nq.", 1).await;
        let index = pipeline.analyze_document(URI).await.expect("index cached");

        assert_eq!(index.predicates.len(), 2);
        assert!(index.predicates.iter().any(|p| p.name == "p"));
        assert_eq!(analyzer.count(), 1);

        // Diagnostics were published (empty set for a clean file).
        assert_eq!(publisher.last_for(URI).await, Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_predicate_file_caches_empty_index() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, _) = pipeline_with(analyzer);

        pipeline.open(URI, "", 1).await;
        let index = pipeline.analyze_document(URI).await.expect("present");
        assert!(index.predicates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn single_flight_two_triggers_one_invocation() {
        let analyzer = ScriptedAnalyzer::slow(100);
        let (pipeline, _) = pipeline_with(analyzer.clone());

        pipeline.open(URI, "p.", 1).await;
        // Second trigger while the first analysis is still in flight.
        pipeline.save(URI).await;

        let index = pipeline.analyze_document(URI).await.expect("index cached");
        assert_eq!(index.predicates.len(), 1);
        assert_eq!(analyzer.count(), 1, "concurrent trigger must be dropped");
    }

    #[tokio::test(start_paused = true)]
    async fn on_demand_requesters_share_one_run() {
        let analyzer = ScriptedAnalyzer::slow(100);
        let (pipeline, _) = pipeline_with(analyzer.clone());

        pipeline.open(URI, "p.", 1).await;
        let (a, b) = tokio::join!(pipeline.analyze_document(URI), pipeline.analyze_document(URI));
        assert!(a.is_some());
        assert!(b.is_some());
        assert_eq!(analyzer.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn analyze_document_of_unopened_file_is_absent() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, _) = pipeline_with(analyzer.clone());

        assert!(pipeline.analyze_document("file:///never.pl").await.is_none());
        assert_eq!(analyzer.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn changes_are_debounced_and_coalesced() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, _) = pipeline_with(analyzer.clone());

        pipeline.open(URI, "p.", 1).await;
        pipeline.analyze_document(URI).await;
        assert_eq!(analyzer.count(), 1);

        // Three rapid edits: only the last one should fire.
        pipeline.change(URI, "p.\na.", 2).await;
        pipeline.change(URI, "p.\nab.", 3).await;
        pipeline.change(URI, "p.\nabc.", 4).await;

        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(analyzer.count(), 2, "burst of edits coalesces to one run");
        let index = pipeline.cached(URI).await.expect("index cached");
        assert!(index.predicates.iter().any(|p| p.name == "abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn close_drops_cache_and_clears_diagnostics() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, publisher) = pipeline_with(analyzer);

        pipeline.open(URI, "p.", 1).await;
        pipeline.analyze_document(URI).await;
        assert!(pipeline.find_definition("p", 0).await.is_some());

        pipeline.close(URI).await;

        assert!(pipeline.cached(URI).await.is_none());
        assert!(pipeline.find_definition("p", 0).await.is_none());
        assert!(pipeline.find_references("p", 0).await.is_empty());
        assert_eq!(publisher.last_for(URI).await, Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn close_during_analysis_is_not_resurrected() {
        let analyzer = ScriptedAnalyzer::slow(100);
        let (pipeline, publisher) = pipeline_with(analyzer.clone());

        pipeline.open(URI, "p.", 1).await;
        // Let the run reach the analyzer, then close mid-flight.
        tokio::time::sleep(Duration::from_millis(10)).await;
        pipeline.close(URI).await;

        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(analyzer.count(), 1);
        assert!(
            pipeline.cached(URI).await.is_none(),
            "in-flight analysis must not resurrect a closed document"
        );
        assert!(pipeline.find_definition("p", 0).await.is_none());
        // The clearing empty set is the last thing published.
        assert_eq!(publisher.last_for(URI).await, Some(Vec::new()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_analysis_leaves_cache_absent_and_publishes() {
        let diagnostic = Diagnostic::error(1, 0, "analyzer failed: no executable");
        let analyzer = ScriptedAnalyzer::failing(vec![diagnostic.clone()]);
        let (pipeline, publisher) = pipeline_with(analyzer.clone());

        pipeline.open(URI, "p.", 1).await;
        let result = pipeline.analyze_document(URI).await;

        assert!(result.is_none(), "failure must not install an index");
        assert_eq!(analyzer.count(), 1);
        assert_eq!(publisher.last_for(URI).await, Some(vec![diagnostic]));
    }

    #[tokio::test(start_paused = true)]
    async fn reanalyze_all_triggers_every_open_document() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, _) = pipeline_with(analyzer.clone());

        pipeline.open("file:///a.pl", "a.", 1).await;
        pipeline.open("file:///b.pl", "b.", 1).await;
        pipeline.analyze_document("file:///a.pl").await;
        pipeline.analyze_document("file:///b.pl").await;
        assert_eq!(analyzer.count(), 2);

        pipeline.reanalyze_all().await;
        pipeline.analyze_document("file:///a.pl").await;
        pipeline.analyze_document("file:///b.pl").await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(analyzer.count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_is_discarded_and_rerun_sees_fresh_text() {
        let analyzer = ScriptedAnalyzer::slow(100);
        let (pipeline, _) = pipeline_with(analyzer.clone());

        // First analysis starts against "one." ...
        pipeline.open(URI, "one.", 1).await;
        // ... and the document changes while it is in flight.
        pipeline.change(URI, "two.", 2).await;

        tokio::time::sleep(Duration::from_millis(1000)).await;

        let index = pipeline.cached(URI).await.expect("index cached");
        assert!(
            index.predicates.iter().any(|p| p.name == "two"),
            "cache must reflect the newer text"
        );
        assert!(
            !index.predicates.iter().any(|p| p.name == "one"),
            "stale result must not be installed"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn diagnostics_replaced_on_each_analysis() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, publisher) = pipeline_with(analyzer);

        pipeline.open(URI, "p.", 1).await;
        pipeline.analyze_document(URI).await;
        pipeline.save(URI).await;
        pipeline.analyze_document(URI).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let count = publisher
            .published
            .lock()
            .await
            .iter()
            .filter(|(u, _)| u == URI)
            .count();
        assert!(count >= 2, "each analysis publishes a full replacement set");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_all_entries() {
        let analyzer = ScriptedAnalyzer::instant();
        let (pipeline, _) = pipeline_with(analyzer);

        pipeline.open("file:///a.pl", "a.", 1).await;
        pipeline.analyze_document("file:///a.pl").await;
        assert!(pipeline.cached("file:///a.pl").await.is_some());

        pipeline.clear().await;
        assert!(pipeline.cached("file:///a.pl").await.is_none());
    }
}
