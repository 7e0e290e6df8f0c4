use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::errors::CoreError;
use crate::models::config::{ScannerConfig, DEFAULT_API_BASE_URL, DEFAULT_MODEL};
use super::traits::{InlineImage, ModelConnector, VisionModel};

const PROVIDER: &str = "Gemini";

/// Google Gemini `generateContent` backend.
///
/// - **Auth**: API key sent in the `x-goog-api-key` header (never in the URL).
/// - **Endpoint**: `POST {base}/models/{model}:generateContent`
/// - **Images**: sent as `inline_data` parts (base64 + MIME type).
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: String, model: String, base_url: String, timeout: Duration) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(timeout);
        #[cfg(target_arch = "wasm32")]
        let _ = timeout;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn into_text(self) -> Result<String, CoreError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Request was blocked by the model ({reason})"),
            });
        }
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        Ok(text)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl VisionModel for GeminiModel {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, CoreError> {
        let mut parts = vec![Part::Text { text: prompt }];
        if let Some(img) = image {
            parts.push(Part::Inline {
                inline_data: InlineData {
                    mime_type: &img.mime_type,
                    data: &img.data,
                },
            });
        }
        let body = GenerateRequest {
            contents: vec![Content { parts }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&raw) {
                Ok(env) => match env.error.status {
                    Some(s) => format!("{s}: {}", env.error.message),
                    None => env.error.message,
                },
                Err(_) if raw.is_empty() => format!("HTTP {status}"),
                Err(_) => format!("HTTP {status}: {raw}"),
            };
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message,
            });
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse response from {}: {e}", self.model),
        })?;

        let text = parsed.into_text()?;
        debug!(model = %self.model, chars = text.len(), "model responded");
        Ok(text)
    }
}

/// Connects [`GeminiModel`] handles using settings from [`ScannerConfig`].
#[derive(Debug, Clone)]
pub struct GeminiConnector {
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiConnector {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ScannerConfig) -> Self {
        Self::new(&config.model, &config.api_base_url, config.request_timeout())
    }
}

impl Default for GeminiConnector {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL, DEFAULT_API_BASE_URL, Duration::from_secs(60))
    }
}

impl ModelConnector for GeminiConnector {
    fn connect(&self, api_key: &str) -> Result<Box<dyn VisionModel>, CoreError> {
        let key = api_key.trim();
        if key.is_empty() {
            return Err(CoreError::MissingApiKey);
        }
        Ok(Box::new(GeminiModel::new(
            key.to_string(),
            self.model.clone(),
            self.base_url.clone(),
            self.timeout,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_inline_data() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "hi" },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAAA",
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AAAA");
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"VALID_"},{"text":"RECEIPT"}]}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.into_text().unwrap(), "VALID_RECEIPT");
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let resp: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.into_text().unwrap(), "");
    }

    #[test]
    fn blocked_prompt_is_an_api_error() {
        let raw = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let resp: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(resp.into_text(), Err(CoreError::Api { .. })));
    }

    #[test]
    fn connector_rejects_blank_key() {
        let connector = GeminiConnector::default();
        assert!(matches!(connector.connect("  "), Err(CoreError::MissingApiKey)));
        assert!(connector.connect("abc").is_ok());
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let m = GeminiModel::new("k".into(), "gemini-x".into(), "https://host/v1/".into(), Duration::from_secs(5));
        assert_eq!(m.endpoint(), "https://host/v1/models/gemini-x:generateContent");
    }
}
