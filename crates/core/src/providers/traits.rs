use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::errors::CoreError;
use crate::models::upload::ReceiptFile;

/// An image sent inline with a prompt: base64 payload plus declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no data-URL prefix.
    pub data: String,
}

impl InlineImage {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn from_file(file: &ReceiptFile) -> Self {
        Self::from_bytes(file.mime_type.trim().to_ascii_lowercase(), &file.bytes)
    }
}

/// Narrow capability interface over a vision-capable language model.
///
/// The extraction pipeline only ever needs "prompt (+ image) in, text out",
/// so fakes can script replies without any network access.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait VisionModel: Send + Sync {
    /// Human-readable name of this model backend (for logs/errors).
    fn name(&self) -> &str;

    /// Send `prompt`, optionally with an inline image, and return the reply text.
    /// An empty string means the model produced no text.
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, CoreError>;
}

/// Builds a [`VisionModel`] handle from an API key.
pub trait ModelConnector: Send + Sync {
    fn connect(&self, api_key: &str) -> Result<Box<dyn VisionModel>, CoreError>;
}
