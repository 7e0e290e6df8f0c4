use tracing::{debug, warn};

use crate::models::receipt::ReceiptData;
use super::backend::StorageBackend;

/// Storage key holding the serialized history list.
pub const HISTORY_KEY: &str = "receipt_history";

/// Maximum number of extractions kept.
pub const MAX_HISTORY_ENTRIES: usize = 10;

/// Capped, newest-first list of past extractions.
///
/// Persistence is best-effort: history is a convenience cache, so read and
/// write failures are logged and swallowed rather than returned.
pub struct ExtractionHistoryStore {
    backend: Box<dyn StorageBackend>,
    entries: Vec<ReceiptData>,
}

impl ExtractionHistoryStore {
    /// Open the store and load whatever the backend holds.
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        let mut store = Self {
            backend,
            entries: Vec::new(),
        };
        store.load();
        store
    }

    /// Re-read from storage. Missing or corrupt data yields an empty list.
    pub fn load(&mut self) -> &[ReceiptData] {
        self.entries = match self.backend.read(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ReceiptData>>(&raw) {
                Ok(mut list) => {
                    list.truncate(MAX_HISTORY_ENTRIES);
                    list
                }
                Err(e) => {
                    warn!(error = %e, "stored history is corrupt; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read history; starting empty");
                Vec::new()
            }
        };
        debug!(entries = self.entries.len(), "history loaded");
        &self.entries
    }

    /// Prepend `record`, evicting the oldest entries beyond the cap.
    pub fn add(&mut self, record: ReceiptData) {
        self.entries.insert(0, record);
        self.entries.truncate(MAX_HISTORY_ENTRIES);
        self.persist();
    }

    /// Drop every record whose `fileName` equals `file_name`.
    /// Returns how many were removed; zero is not an error.
    pub fn remove(&mut self, file_name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|r| r.file_name != file_name);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Err(e) = self.backend.delete(HISTORY_KEY) {
            warn!(error = %e, "failed to clear persisted history");
        }
    }

    /// Newest first.
    #[must_use]
    pub fn entries(&self) -> &[ReceiptData] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero-based page of at most `per_page` records; empty past the end.
    #[must_use]
    pub fn page(&self, index: usize, per_page: usize) -> &[ReceiptData] {
        if per_page == 0 {
            return &[];
        }
        let start = index.saturating_mul(per_page).min(self.entries.len());
        let end = start.saturating_add(per_page).min(self.entries.len());
        &self.entries[start..end]
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ReceiptData> {
        self.entries.iter().find(|r| r.id == id)
    }

    #[must_use]
    pub fn find_by_file_name(&self, file_name: &str) -> Option<&ReceiptData> {
        self.entries.iter().find(|r| r.file_name == file_name)
    }

    /// Serialized list, as written to storage.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    fn persist(&self) {
        let json = match self.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize history");
                return;
            }
        };
        if let Err(e) = self.backend.write(HISTORY_KEY, &json) {
            warn!(error = %e, "failed to persist history");
        }
    }
}

impl std::fmt::Debug for ExtractionHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionHistoryStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
