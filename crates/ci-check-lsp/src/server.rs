use crate::config::CheckConfig;
use crate::document::OpenDocuments;
use crate::search::FsTextSearch;
use crate::sink::LspDiagnosticSink;
use crate::workspace::LspWorkspace;
use ci_check_core::{DiagnosticStore, DiagnosticsReader, Root, Workspace, has_code};
use ci_check_travis::{
    COLLECTION_NAME, CodeActionRequest, OPEN_URL_COMMAND, StatusScope, TRAVIS_GO_CODE,
    TravisGoCheck,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_lsp_server::jsonrpc::{Error, Result};
use tower_lsp_server::ls_types::{
    CodeActionKind, CodeActionOptions, CodeActionOrCommand, CodeActionParams,
    CodeActionProviderCapability, CodeActionResponse, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, ExecuteCommandOptions,
    ExecuteCommandParams, InitializeParams, InitializeResult, InitializedParams, MessageType,
    ServerCapabilities, ServerInfo, ShowDocumentParams, TextDocumentSyncCapability,
    TextDocumentSyncKind, Uri,
};
use tower_lsp_server::{Client, LanguageServer};

/// Replaces the active root set. Arguments: repository URIs.
pub const SET_SCOPE_COMMAND: &str = "ci-check.setScope";

/// Returns the current status. Optional argument: a repository URI.
pub const STATUS_COMMAND: &str = "ci-check.status";

/// How long a status request waits for the first snapshot.
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Backend {
    client: Client,
    store: Arc<DiagnosticStore>,
    documents: Arc<OpenDocuments>,
    workspace: Arc<LspWorkspace>,
    config: RwLock<CheckConfig>,
    search_roots: RwLock<Vec<PathBuf>>,
    check: RwLock<Option<TravisGoCheck<LspWorkspace>>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let documents = Arc::new(OpenDocuments::new());
        Self {
            client,
            store: Arc::new(DiagnosticStore::new()),
            workspace: Arc::new(LspWorkspace::new(Arc::clone(&documents))),
            documents,
            config: RwLock::new(CheckConfig::default()),
            search_roots: RwLock::new(Vec::new()),
            check: RwLock::new(None),
        }
    }

    fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
                code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
                ..Default::default()
            })),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: vec![
                    SET_SCOPE_COMMAND.into(),
                    STATUS_COMMAND.into(),
                    OPEN_URL_COMMAND.into(),
                ],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Search roots: the configured repositories root, else the workspace
    /// folders.
    fn search_roots(config: &CheckConfig, params: &InitializeParams) -> Vec<PathBuf> {
        if let Some(root) = &config.repositories_root {
            return vec![root.clone()];
        }
        params
            .workspace_folders
            .iter()
            .flatten()
            .filter_map(|folder| folder.uri.to_file_path().map(|p| p.to_path_buf()))
            .collect()
    }

    async fn register_check(&self) {
        let config = self.config.read().await.travis_go.clone();
        let roots = self.search_roots.read().await.clone();
        tracing::info!(roots = ?roots, "registering travis-go check");

        let sink = LspDiagnosticSink::new(self.client.clone(), self.store.collection(COLLECTION_NAME));
        let check = TravisGoCheck::register(
            FsTextSearch::new(roots),
            Arc::clone(&self.workspace),
            Arc::clone(&self.store) as Arc<dyn DiagnosticsReader>,
            sink,
            config,
        );
        *self.check.write().await = Some(check);
    }

    async fn set_scope(&self, arguments: Vec<Value>) -> Result<Option<Value>> {
        let roots = arguments
            .into_iter()
            .map(|arg| serde_json::from_value::<Uri>(arg).map(Root::new))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::invalid_params(format!("expected repository URIs: {e}")))?;
        self.workspace.set_scope(roots);
        Ok(None)
    }

    async fn status(&self, arguments: Vec<Value>) -> Result<Option<Value>> {
        let scope = match arguments.into_iter().next() {
            Some(arg) => StatusScope::Repository(
                serde_json::from_value(arg)
                    .map_err(|e| Error::invalid_params(format!("expected repository URI: {e}")))?,
            ),
            None => StatusScope::Global,
        };

        let guard = self.check.read().await;
        let Some(check) = guard.as_ref() else {
            return Ok(None);
        };

        let mut statuses = check.status(scope);
        let status = match statuses.latest() {
            Some(status) => status,
            None => match tokio::time::timeout(STATUS_TIMEOUT, statuses.next()).await {
                Ok(Some(Ok(status))) => status,
                Ok(Some(Err(e))) => {
                    let mut error = Error::internal_error();
                    error.message = e.to_string().into();
                    return Err(error);
                }
                Ok(None) | Err(_) => return Ok(None),
            },
        };

        serde_json::to_value(status).map(Some).map_err(|e| {
            let mut error = Error::internal_error();
            error.message = e.to_string().into();
            error
        })
    }

    async fn open_url(&self, arguments: Vec<Value>) -> Result<Option<Value>> {
        let Some(arg) = arguments.into_iter().next() else {
            return Err(Error::invalid_params("expected a URL"));
        };
        let uri: Uri = serde_json::from_value(arg)
            .map_err(|e| Error::invalid_params(format!("expected a URL: {e}")))?;

        let shown = self
            .client
            .show_document(ShowDocumentParams {
                uri: uri.clone(),
                external: Some(true),
                take_focus: Some(true),
                selection: None,
            })
            .await?;
        if !shown {
            tracing::warn!("client declined to open {}", uri.as_str());
        }
        Ok(None)
    }
}

impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("initializing ci-check-lsp server");

        let config = CheckConfig::from_init_options(params.initialization_options.clone());
        *self.search_roots.write().await = Self::search_roots(&config, &params);
        *self.config.write().await = config;

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "ci-check-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("ci-check-lsp server initialized");
        self.register_check().await;
        self.client
            .log_message(MessageType::INFO, "ci-check-lsp ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutting down ci-check-lsp server");
        if let Some(check) = self.check.write().await.take() {
            check.unregister().await;
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("document opened: {}", uri.as_str());
        self.documents.update(uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents.update(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("document closed: {}", uri.as_str());
        self.documents.close(&uri);
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let diagnostics = params.context.diagnostics;
        if !diagnostics.iter().any(|d| has_code(d, TRAVIS_GO_CODE)) {
            return Ok(None);
        }

        let guard = self.check.read().await;
        let Some(check) = guard.as_ref() else {
            return Ok(None);
        };

        let uri = params.text_document.uri;
        let document = match self.workspace.open_document(&uri).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("code action on unreadable document {}: {}", uri.as_str(), e);
                return Ok(None);
            }
        };

        let request = CodeActionRequest::new(document, params.range, diagnostics);
        match check.code_actions(request).await {
            Ok(actions) => Ok(Some(
                actions
                    .into_iter()
                    .map(CodeActionOrCommand::CodeAction)
                    .collect(),
            )),
            Err(e) => {
                tracing::error!("failed to compute code actions: {}", e);
                self.client
                    .show_message(MessageType::ERROR, format!("ci-check: {e}"))
                    .await;
                Ok(None)
            }
        }
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        tracing::debug!("execute command: {}", params.command);
        match params.command.as_str() {
            SET_SCOPE_COMMAND => self.set_scope(params.arguments).await,
            STATUS_COMMAND => self.status(params.arguments).await,
            OPEN_URL_COMMAND => self.open_url(params.arguments).await,
            other => Err(Error::invalid_params(format!("unknown command: {other}"))),
        }
    }
}
