pub mod fs;
pub mod memory;

use anyhow::Result;
use serde::Serialize;

/// Where a saved file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    pub name: String,
    pub location: String,
    pub bytes: usize,
}

/// The platform's "save these bytes as a file" capability.
pub trait FileSaver: Send + Sync {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<SavedFile>;
}
