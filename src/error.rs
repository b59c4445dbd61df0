//! The two failure kinds an upload cycle can surface.
//!
//! Neither escapes the workflow: both are reported through
//! [`SubmitOutcome`](crate::workflow::SubmitOutcome) and a toast.

use std::time::Duration;

use thiserror::Error;

/// The file was refused before any work started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("not an image file (type: {mime})")]
    NotAnImage { mime: String },
}

/// Decoding or background removal failed after the file was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessingError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("background removal failed: {0}")]
    Removal(String),
    #[error("background removal timed out after {0:?}")]
    Timeout(Duration),
}
