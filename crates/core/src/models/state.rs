use super::receipt::ReceiptData;

/// Progress reported when a new extraction starts.
pub const PROGRESS_START: u8 = 10;
/// Progress once the image has been accepted as a receipt.
pub const PROGRESS_VALIDATED: u8 = 40;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Error recorded when an in-flight extraction is abandoned by its caller.
pub const CANCELLED_MESSAGE: &str = "The extraction was cancelled before it finished.";

/// Stage reported by the extraction client while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// First model call: is this a readable receipt?
    Validating,
    /// Second model call: pull structured fields.
    Extracting,
}

/// Lifecycle of the current extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionStatus {
    #[default]
    Idle,
    Validating,
    Extracting,
    Succeeded,
    Failed,
}

impl ExtractionStatus {
    /// Validating and Extracting together form the "loading" state.
    #[must_use]
    pub fn is_loading(self) -> bool {
        matches!(self, ExtractionStatus::Validating | ExtractionStatus::Extracting)
    }
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStatus::Idle => write!(f, "Idle"),
            ExtractionStatus::Validating => write!(f, "Validating"),
            ExtractionStatus::Extracting => write!(f, "Extracting"),
            ExtractionStatus::Succeeded => write!(f, "Succeeded"),
            ExtractionStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Everything the presentation layer reads about the current request.
#[derive(Debug, Clone, Default)]
pub struct ExtractionState {
    pub status: ExtractionStatus,
    /// 0–100.
    pub progress: u8,
    pub current: Option<ReceiptData>,
    pub error: Option<String>,
}

impl ExtractionState {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// Enter loading. The previous result stays visible until replaced.
    pub(crate) fn begin(&mut self) {
        self.status = ExtractionStatus::Validating;
        self.progress = PROGRESS_START;
        self.error = None;
    }

    pub(crate) fn advance(&mut self, stage: ExtractionStage) {
        match stage {
            ExtractionStage::Validating => {
                self.status = ExtractionStatus::Validating;
                self.progress = PROGRESS_START;
            }
            ExtractionStage::Extracting => {
                self.status = ExtractionStatus::Extracting;
                self.progress = PROGRESS_VALIDATED;
            }
        }
    }

    pub(crate) fn succeed(&mut self, receipt: ReceiptData) {
        self.status = ExtractionStatus::Succeeded;
        self.progress = PROGRESS_COMPLETE;
        self.current = Some(receipt);
        self.error = None;
    }

    /// A failed attempt leaves `current` untouched.
    pub(crate) fn fail(&mut self, message: String) {
        self.status = ExtractionStatus::Failed;
        self.progress = 0;
        self.error = Some(message);
    }

    pub(crate) fn clear_current(&mut self) {
        self.current = None;
        if self.status == ExtractionStatus::Succeeded {
            self.status = ExtractionStatus::Idle;
            self.progress = 0;
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Holds the state in loading for the lifetime of one request.
///
/// Dropping the guard while still loading (the request future was dropped
/// by a timeout or `select!`) records a cancellation so the next request
/// is not refused.
pub(crate) struct InFlight<'a> {
    pub(crate) state: &'a mut ExtractionState,
}

impl<'a> InFlight<'a> {
    pub(crate) fn begin(state: &'a mut ExtractionState) -> Self {
        state.begin();
        Self { state }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.state.is_loading() {
            self.state.fail(CANCELLED_MESSAGE.to_string());
        }
    }
}
