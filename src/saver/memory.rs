use std::sync::{Mutex, PoisonError};

use anyhow::Result;

use super::{FileSaver, SavedFile};

/// Keeps saved files in memory. For tests and previews.
#[derive(Debug, Default)]
pub struct MemorySaver {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(name, bytes)` pair saved so far, in order.
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FileSaver for MemorySaver {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedFile> {
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);
        saved.push((file_name.to_string(), bytes.to_vec()));
        Ok(SavedFile {
            name: file_name.to_string(),
            location: format!("memory:{}", saved.len()),
            bytes: bytes.len(),
        })
    }
}
