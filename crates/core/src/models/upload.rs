use std::path::Path;

use crate::errors::CoreError;

/// Largest upload accepted, in bytes (10 MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Content types the vision model is asked to read.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "application/pdf"];

/// A receipt file handed in by the caller, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptFile {
    /// Original file name; becomes the history record's lookup key.
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ReceiptFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::InvalidInput(format!("Not a file: {}", path.display())))?;
        let mime_type = mime_type_for(path).unwrap_or("application/octet-stream");

        // Refuse oversized files before reading them into memory.
        let len = std::fs::metadata(path)?.len();
        if len > MAX_FILE_SIZE as u64 {
            return Err(too_large(len));
        }

        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name, mime_type, bytes))
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Local checks run before any network call.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mime = self.mime_type.trim().to_ascii_lowercase();
        if !ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(CoreError::InvalidInput(format!(
                "Unsupported file type '{}'. Please upload a JPEG, PNG or PDF file.",
                self.mime_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(CoreError::InvalidInput("The selected file is empty.".into()));
        }
        if self.bytes.len() > MAX_FILE_SIZE {
            return Err(too_large(self.bytes.len() as u64));
        }
        Ok(())
    }
}

fn too_large(len: u64) -> CoreError {
    CoreError::InvalidInput(format!(
        "File is too large ({:.1} MB). Maximum size is 10 MB.",
        len as f64 / (1024.0 * 1024.0)
    ))
}

/// Content type for a receipt path, by extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}
