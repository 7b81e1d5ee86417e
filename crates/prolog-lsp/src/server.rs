//! LSP server implementation using tower-lsp.

use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use prolog_lsp_core::PositionHit;

use crate::analyzer::SwiplAnalyzer;
use crate::capabilities::server_capabilities;
use crate::convert;
use crate::pipeline::{AnalysisPipeline, DiagnosticsPublisher};
use crate::settings::{AnalyzerSettings, SharedSettings};

/// Publishes pipeline diagnostics through the LSP client.
struct ClientPublisher {
    client: Client,
}

#[async_trait::async_trait]
impl DiagnosticsPublisher for ClientPublisher {
    async fn publish(&self, uri: &str, diagnostics: Vec<prolog_lsp_core::Diagnostic>) {
        let url = match Url::parse(uri) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(uri, "cannot publish diagnostics for unparseable uri: {err}");
                return;
            }
        };
        let diagnostics = diagnostics.iter().map(convert::diagnostic_to_lsp).collect();
        self.client.publish_diagnostics(url, diagnostics, None).await;
    }
}

/// The Prolog language server.
pub struct PrologLanguageServer {
    /// The LSP client for sending notifications.
    client: Client,
    /// Writer side of the analyzer configuration.
    settings: Arc<SharedSettings>,
    /// Analysis scheduling and the cross-file index cache.
    pipeline: Arc<AnalysisPipeline>,
}

impl PrologLanguageServer {
    /// Create a new language server instance.
    pub fn new(client: Client) -> Self {
        let settings = SharedSettings::new();
        let pipeline = AnalysisPipeline::new(
            Arc::new(SwiplAnalyzer::new()),
            settings.clone(),
            Arc::new(ClientPublisher {
                client: client.clone(),
            }),
        );
        Self {
            client,
            settings,
            pipeline,
        }
    }

    /// Resolve the predicate under the cursor to its name/arity,
    /// whether the cursor sits on a definition or on a call site.
    async fn predicate_at(&self, uri: &str, position: Position) -> Option<(String, u32)> {
        let position = convert::position_from_lsp(&position);
        self.pipeline.analyze_document(uri).await?;
        match self.pipeline.find_element_at_position(uri, position).await? {
            PositionHit::Definition(record) => Some((record.name, record.arity)),
            PositionHit::Call { call, .. } => Some((call.name, call.arity)),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for PrologLanguageServer {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: server_capabilities(),
            server_info: Some(ServerInfo {
                name: "prolog-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Prolog LSP server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.pipeline
            .open(
                uri.as_str(),
                params.text_document.text,
                params.text_document.version,
            )
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full document sync, so only the last change matters.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.pipeline
                .change(uri.as_str(), change.text, version)
                .await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.pipeline.save(params.text_document.uri.as_str()).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.pipeline.close(params.text_document.uri.as_str()).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        // Editors nest our settings under a "prolog" section; accept
        // the bare payload too.
        let value = params.settings;
        let section = value.get("prolog").cloned().unwrap_or(value);
        self.settings.update(AnalyzerSettings::from_json(section));
        self.pipeline.reanalyze_all().await;
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let core_position = convert::position_from_lsp(&position);
        if self.pipeline.analyze_document(uri.as_str()).await.is_none() {
            return Ok(None);
        }
        let Some(hit) = self
            .pipeline
            .find_element_at_position(uri.as_str(), core_position)
            .await
        else {
            return Ok(None);
        };

        match hit {
            // Already on a definition: its own location is the answer.
            PositionHit::Definition(record) => Ok(Some(GotoDefinitionResponse::Scalar(
                Location::new(uri, convert::range_to_lsp(&record.definition_range)),
            ))),
            PositionHit::Call { call, .. } => {
                let Some(definition) =
                    self.pipeline.find_definition(&call.name, call.arity).await
                else {
                    return Ok(None);
                };
                let Ok(target) = Url::parse(&definition.file) else {
                    return Ok(None);
                };
                Ok(Some(GotoDefinitionResponse::Scalar(Location::new(
                    target,
                    convert::range_to_lsp(&definition.predicate.definition_range),
                ))))
            }
        }
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some((name, arity)) = self.predicate_at(uri.as_str(), position).await else {
            return Ok(None);
        };

        let mut locations = Vec::new();
        if params.context.include_declaration {
            if let Some(definition) = self.pipeline.find_definition(&name, arity).await {
                if let Ok(url) = Url::parse(&definition.file) {
                    locations.push(Location::new(
                        url,
                        convert::range_to_lsp(&definition.predicate.definition_range),
                    ));
                }
            }
        }
        for reference in self.pipeline.find_references(&name, arity).await {
            if let Ok(url) = Url::parse(&reference.file) {
                locations.push(Location::new(
                    url,
                    convert::range_to_lsp(&reference.call.location),
                ));
            }
        }

        Ok(if locations.is_empty() {
            None
        } else {
            Some(locations)
        })
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(index) = self.pipeline.analyze_document(uri.as_str()).await else {
            return Ok(None);
        };

        // Flat outline: one symbol per predicate, in clause order.
        let symbols = index
            .predicates
            .iter()
            .map(|predicate| {
                #[allow(deprecated)]
                DocumentSymbol {
                    name: predicate.indicator(),
                    detail: None,
                    kind: SymbolKind::FUNCTION,
                    tags: None,
                    deprecated: None,
                    range: convert::range_to_lsp(&predicate.full_range),
                    selection_range: convert::range_to_lsp(&predicate.definition_range),
                    children: None,
                }
            })
            .collect();
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }
}

/// Run the LSP server over stdio.
pub async fn run_server() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(PrologLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
