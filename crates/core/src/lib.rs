pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use models::{
    config::ScannerConfig,
    receipt::ReceiptData,
    state::{ExtractionState, ExtractionStatus, InFlight},
    upload::ReceiptFile,
};
use services::extraction_client::ReceiptExtractionClient;
#[cfg(not(target_arch = "wasm32"))]
use storage::backend::FileStorage;
use storage::backend::StorageBackend;
use storage::history::ExtractionHistoryStore;
use tracing::debug;

use errors::CoreError;

/// Main entry point for the Receipt Scanner core library.
///
/// Drives one extraction at a time through
/// `Idle → Validating → Extracting → Succeeded | Failed`, records successes
/// in the history store, and exposes the current state to the presentation
/// layer. The client and the storage are injected, never global.
#[must_use]
pub struct ReceiptScanner {
    client: ReceiptExtractionClient,
    history: ExtractionHistoryStore,
    state: ExtractionState,
    default_country: Option<String>,
}

impl std::fmt::Debug for ReceiptScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptScanner")
            .field("status", &self.state.status)
            .field("progress", &self.state.progress)
            .field("history", &self.history.len())
            .field("initialized", &self.client.is_initialized())
            .finish()
    }
}

impl ReceiptScanner {
    /// Build a scanner from an explicit client and storage backend.
    /// History is loaded from `storage` immediately.
    pub fn new(client: ReceiptExtractionClient, storage: Box<dyn StorageBackend>) -> Self {
        Self {
            client,
            history: ExtractionHistoryStore::open(storage),
            state: ExtractionState::new(),
            default_country: None,
        }
    }

    /// Gemini client plus file-backed history, as described by `config`.
    /// Initializes the client when an API key can be resolved.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_config(config: &ScannerConfig) -> Result<Self, CoreError> {
        let client = ReceiptExtractionClient::from_config(config);
        let storage = FileStorage::new(config.resolved_history_dir());
        let mut scanner = Self::new(client, Box::new(storage));
        scanner.default_country = config.default_country.clone();
        if let Some(key) = config.resolve_api_key() {
            scanner.initialize(&key)?;
        }
        Ok(scanner)
    }

    /// Country hint used when `extract` is called without one.
    pub fn set_default_country(&mut self, country: Option<String>) {
        self.default_country = country.filter(|c| !c.trim().is_empty());
    }

    // ── API Key ─────────────────────────────────────────────────────

    pub fn initialize(&mut self, api_key: &str) -> Result<(), CoreError> {
        self.client.initialize(api_key)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.client.is_initialized()
    }

    /// Re-initialize with `api_key` and check the model answers.
    pub async fn test_api_key(&mut self, api_key: &str) -> bool {
        self.client.test_api_key(api_key).await
    }

    // ── Extraction ──────────────────────────────────────────────────

    /// Run one extraction.
    ///
    /// On success the result becomes the current extraction and is added to
    /// history. On failure the message is stored as the current error and
    /// the previous result and history are left as they were.
    pub async fn extract(
        &mut self,
        file: &ReceiptFile,
        country_hint: Option<&str>,
    ) -> Result<ReceiptData, CoreError> {
        if self.state.is_loading() {
            return Err(CoreError::InvalidInput(
                "An extraction is already in progress".into(),
            ));
        }

        let hint = country_hint
            .filter(|c| !c.trim().is_empty())
            .or(self.default_country.as_deref());
        let client = &self.client;
        let guard = InFlight::begin(&mut self.state);
        debug!(status = %guard.state.status, "extraction started");

        let result = client
            .extract_receipt_data_with_progress(file, hint, |stage| {
                guard.state.advance(stage);
                debug!(status = %guard.state.status, "extraction advanced");
            })
            .await;

        match result {
            Ok(receipt) => {
                self.history.add(receipt.clone());
                guard.state.succeed(receipt.clone());
                debug!(status = %guard.state.status, "extraction finished");
                Ok(receipt)
            }
            Err(e) => {
                guard.state.fail(e.to_string());
                debug!(status = %guard.state.status, error = %e, "extraction finished");
                Err(e)
            }
        }
    }

    // ── State ───────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &ExtractionState {
        &self.state
    }

    #[must_use]
    pub fn status(&self) -> ExtractionStatus {
        self.state.status
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        self.state.progress
    }

    #[must_use]
    pub fn current_extraction(&self) -> Option<&ReceiptData> {
        self.state.current.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// Discard the displayed result without touching history.
    pub fn clear_current_extraction(&mut self) {
        self.state.clear_current();
    }

    /// Back to `Idle`: no result, no error, no progress. History is kept.
    pub fn reset_state(&mut self) {
        self.state.reset();
    }

    // ── History ─────────────────────────────────────────────────────

    /// Newest first.
    #[must_use]
    pub fn history(&self) -> &[ReceiptData] {
        self.history.entries()
    }

    #[must_use]
    pub fn history_page(&self, index: usize, per_page: usize) -> &[ReceiptData] {
        self.history.page(index, per_page)
    }

    #[must_use]
    pub fn history_entry(&self, id: &str) -> Option<&ReceiptData> {
        self.history.get(id)
    }

    /// Remove history records for `file_name`. The current extraction is
    /// cleared only if it is one of the removed records.
    pub fn remove_from_history(&mut self, file_name: &str) -> usize {
        let removed = self.history.remove(file_name);
        let is_current = self
            .state
            .current
            .as_ref()
            .is_some_and(|c| c.file_name == file_name);
        if removed > 0 && is_current {
            self.state.clear_current();
        }
        removed
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Reload history from storage (e.g. after another process wrote it).
    pub fn reload_history(&mut self) -> &[ReceiptData] {
        self.history.load()
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Export the history list as pretty-printed JSON.
    pub fn export_history_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self.history.entries())
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize history: {e}")))
    }
}
