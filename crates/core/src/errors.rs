use thiserror::Error;

/// Why the validation stage refused to hand an image to the extraction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The model judged the image to be something other than a receipt.
    NotReceipt,
    /// The model saw a receipt but could not read it reliably.
    UnclearImage,
    /// The model answered with none of the expected verdict tokens (or nothing at all).
    Inconclusive,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::NotReceipt => write!(
                f,
                "The uploaded image does not appear to be a receipt. Please upload a photo or scan of a purchase receipt."
            ),
            RejectionReason::UnclearImage => write!(
                f,
                "The receipt image is too blurry or unclear to read. Please upload a clearer photo."
            ),
            RejectionReason::Inconclusive => write!(
                f,
                "Could not analyze the image. Please try again with a different photo."
            ),
        }
    }
}

/// Coarse classification of a [`CoreError`], used by callers that only need
/// to know which class of failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Auth,
    ValidationRejected,
    Transport,
    Schema,
    Persistence,
}

/// Unified error type for the entire receipt-scanner-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input ───────────────────────────────────────────────────────
    #[error("{0}")]
    InvalidInput(String),

    // ── Auth ────────────────────────────────────────────────────────
    #[error("API key is missing. Please provide a valid API key.")]
    MissingApiKey,

    #[error("Extraction client is not initialized. Please set an API key first.")]
    NotInitialized,

    // ── Validation stage ────────────────────────────────────────────
    #[error("{0}")]
    ValidationRejected(RejectionReason),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("The model did not respond within {seconds} seconds")]
    Timeout { seconds: u64 },

    // ── Model payload ───────────────────────────────────────────────
    #[error("Invalid receipt data from model: {0}")]
    Schema(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Persistence ─────────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

impl CoreError {
    /// Which failure class this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::InvalidInput(_) => ErrorCategory::Input,
            CoreError::MissingApiKey | CoreError::NotInitialized => ErrorCategory::Auth,
            CoreError::ValidationRejected(_) => ErrorCategory::ValidationRejected,
            CoreError::Api { .. } | CoreError::Network(_) | CoreError::Timeout { .. } => {
                ErrorCategory::Transport
            }
            CoreError::Schema(_) | CoreError::Deserialization(_) => ErrorCategory::Schema,
            CoreError::Serialization(_) | CoreError::Storage(_) | CoreError::FileIO(_) => {
                ErrorCategory::Persistence
            }
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often contain full URLs; strip query parameters so
        // credentials passed that way never end up in a log or the UI.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        if e.is_timeout() {
            CoreError::Network(format!("request timed out: {sanitized}"))
        } else {
            CoreError::Network(sanitized)
        }
    }
}
