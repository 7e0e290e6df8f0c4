use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::config::ScannerConfig;
use crate::models::receipt::ReceiptData;
use crate::models::state::ExtractionStage;
use crate::models::upload::ReceiptFile;
use crate::providers::gemini::GeminiConnector;
use crate::providers::traits::{InlineImage, ModelConnector, VisionModel};
use super::prompts::{extraction_prompt, CONNECTION_TEST_PROMPT, VALIDATION_PROMPT};
use super::response_parser::{parse_extraction_response, parse_validation_verdict};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs the two-stage receipt protocol against a vision model.
///
/// 1. **Validate**: ask the model whether the image is a readable receipt.
/// 2. **Extract**: only if it is, ask for the structured JSON and parse it.
///
/// Splitting the stages gives a clean rejection point for non-receipt
/// images instead of hallucinated line items.
///
/// Every model call is bounded by a timeout. There is no retry.
pub struct ReceiptExtractionClient {
    connector: Box<dyn ModelConnector>,
    model: Option<Box<dyn VisionModel>>,
    timeout: Duration,
}

impl ReceiptExtractionClient {
    /// An uninitialized client; call [`initialize`](Self::initialize) before extracting.
    pub fn new(connector: Box<dyn ModelConnector>) -> Self {
        Self {
            connector,
            model: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Gemini-backed client configured from `config`.
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(Box::new(GeminiConnector::from_config(config))).with_timeout(config.request_timeout())
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the model handle for `api_key`, replacing any previous one.
    /// On failure the client is left uninitialized.
    pub fn initialize(&mut self, api_key: &str) -> Result<(), CoreError> {
        self.model = None;
        if api_key.trim().is_empty() {
            return Err(CoreError::MissingApiKey);
        }
        let model = self.connector.connect(api_key)?;
        info!(backend = model.name(), "extraction client initialized");
        self.model = Some(model);
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    /// Extract structured data from a receipt file.
    pub async fn extract_receipt_data(
        &self,
        file: &ReceiptFile,
        country_hint: Option<&str>,
    ) -> Result<ReceiptData, CoreError> {
        self.extract_receipt_data_with_progress(file, country_hint, |_| {}).await
    }

    /// Like [`extract_receipt_data`](Self::extract_receipt_data), reporting
    /// each stage to `on_stage` as it starts.
    pub async fn extract_receipt_data_with_progress<F>(
        &self,
        file: &ReceiptFile,
        country_hint: Option<&str>,
        mut on_stage: F,
    ) -> Result<ReceiptData, CoreError>
    where
        F: FnMut(ExtractionStage) + Send,
    {
        file.validate()?;
        let model = self.model.as_deref().ok_or(CoreError::NotInitialized)?;

        info!(
            file = %file.file_name,
            mime = %file.mime_type,
            bytes = file.size(),
            "starting receipt extraction"
        );
        let image = InlineImage::from_file(file);

        on_stage(ExtractionStage::Validating);
        self.validate_image(model, &image).await?;

        on_stage(ExtractionStage::Extracting);
        let prompt = extraction_prompt(country_hint);
        let reply = self.generate(model, &prompt, Some(&image)).await?;
        debug!(chars = reply.len(), "extraction reply received");

        let extracted = parse_extraction_response(&reply, country_hint).inspect_err(|e| {
            warn!(file = %file.file_name, error = %e, "model reply failed schema checks");
        })?;

        let receipt = ReceiptData::new(extracted, file.file_name.clone());
        info!(
            id = %receipt.id,
            items = receipt.items.len(),
            currency = %receipt.currency,
            "receipt extracted"
        );
        Ok(receipt)
    }

    async fn validate_image(&self, model: &dyn VisionModel, image: &InlineImage) -> Result<(), CoreError> {
        let reply = self.generate(model, VALIDATION_PROMPT, Some(image)).await?;
        debug!(chars = reply.len(), "validation reply received");
        match parse_validation_verdict(&reply) {
            Ok(()) => {
                info!("image accepted as a receipt");
                Ok(())
            }
            Err(reason) => {
                warn!(?reason, "image rejected by validation stage");
                Err(CoreError::ValidationRejected(reason))
            }
        }
    }

    /// Loose liveness check: re-initialize with `api_key` and see whether the
    /// model answers at all. Never returns an error.
    pub async fn test_api_key(&mut self, api_key: &str) -> bool {
        if let Err(e) = self.initialize(api_key) {
            warn!(error = %e, "API key test failed to initialize");
            return false;
        }
        let Some(model) = self.model.as_deref() else {
            return false;
        };
        match self.generate(model, CONNECTION_TEST_PROMPT, None).await {
            Ok(reply) => !reply.trim().is_empty(),
            Err(e) => {
                warn!(error = %e, "API key test request failed");
                false
            }
        }
    }

    async fn generate(
        &self,
        model: &dyn VisionModel,
        prompt: &str,
        image: Option<&InlineImage>,
    ) -> Result<String, CoreError> {
        match tokio::time::timeout(self.timeout, model.generate(prompt, image)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

impl std::fmt::Debug for ReceiptExtractionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptExtractionClient")
            .field("initialized", &self.is_initialized())
            .field("timeout", &self.timeout)
            .finish()
    }
}
