//! Project-wide constants.

use std::path::PathBuf;

/// File name used when saving the processed image.
pub const DEFAULT_DOWNLOAD_NAME: &str = "processed-image.png";

/// MIME prefix every accepted upload must carry.
pub const IMAGE_MIME_PREFIX: &str = "image/";

/// Accept filter advertised by the file picker.
pub const ACCEPT: &str = "image/*";

/// MIME type of every processed result.
pub const PROCESSED_MIME: &str = "image/png";

/// Fallback when a file's type cannot be determined.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

pub const MSG_NOT_AN_IMAGE: &str = "Please upload an image file";
pub const MSG_PROCESSED: &str = "Background removed successfully!";
pub const MSG_PROCESSING_FAILED: &str = "Failed to process image. Please try again.";

/// Default database path: `~/.cutout/cutout.db`.
/// Holds persistent settings only; images are never stored.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".cutout")
        .join("cutout.db")
}

/// Where downloads land when no directory is configured:
/// the user's download folder, or the current directory.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}
