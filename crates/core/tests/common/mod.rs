// ═══════════════════════════════════════════════════════════════════
// Shared test helpers — scripted vision model, fixtures
// ═══════════════════════════════════════════════════════════════════

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use receipt_scanner_core::errors::CoreError;
use receipt_scanner_core::models::upload::ReceiptFile;
use receipt_scanner_core::providers::traits::{InlineImage, ModelConnector, VisionModel};
use receipt_scanner_core::services::extraction_client::ReceiptExtractionClient;

pub const COFFEE_JSON: &str =
    r#"{"items":[{"name":"Coffee","quantity":"2","price":"6.00"}],"total":"6.00","currency":"USD"}"#;

/// A recorded model call: prompt text and whether an image was attached.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

/// Replies handed out in order; shared between the connector and every
/// model it creates so tests can inspect calls afterwards.
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<VecDeque<Result<String, CoreError>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    connects: Arc<AtomicUsize>,
    keys: Arc<Mutex<Vec<String>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, err: CoreError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

pub struct ScriptedModel(Script);

#[async_trait]
impl VisionModel for ScriptedModel {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, CoreError> {
        self.0.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            image: image.cloned(),
        });
        self.0
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

pub struct ScriptedConnector(pub Script);

impl ModelConnector for ScriptedConnector {
    fn connect(&self, api_key: &str) -> Result<Box<dyn VisionModel>, CoreError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        self.0.keys.lock().unwrap().push(api_key.to_string());
        Ok(Box::new(ScriptedModel(self.0.clone())))
    }
}

/// A model that never answers within any reasonable timeout.
pub struct HangingModel;

#[async_trait]
impl VisionModel for HangingModel {
    fn name(&self) -> &str {
        "Hanging"
    }

    async fn generate(&self, _prompt: &str, _image: Option<&InlineImage>) -> Result<String, CoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("VALID_RECEIPT".into())
    }
}

pub struct HangingConnector;

impl ModelConnector for HangingConnector {
    fn connect(&self, _api_key: &str) -> Result<Box<dyn VisionModel>, CoreError> {
        Ok(Box::new(HangingModel))
    }
}

/// Initialized client driven by `script`.
pub fn scripted_client(script: &Script) -> ReceiptExtractionClient {
    let mut client = ReceiptExtractionClient::new(Box::new(ScriptedConnector(script.clone())));
    client.initialize("test-key").unwrap();
    client
}

pub fn jpeg(name: &str) -> ReceiptFile {
    ReceiptFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3])
}
