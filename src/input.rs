//! Ways a file gets into the workflow.
//!
//! [`DropZone`] and [`FilePicker`] are interchangeable adapters: both take
//! whatever list of files the platform delivered, keep the first one, and
//! hand it to [`UploadWorkflow::submit_file`].

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::consts::{ACCEPT, IMAGE_MIME_PREFIX, UNKNOWN_MIME};
use crate::workflow::{SubmitOutcome, UploadWorkflow};

/// A file as delivered by the platform: name, declared type, contents.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, typing it by its contents.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mime = sniff_mime(&bytes);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(file = %name, %mime, "read upload from disk");
        Ok(Self::new(name, mime, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with(IMAGE_MIME_PREFIX)
    }
}

/// MIME type from magic bytes, or `application/octet-stream`.
pub fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type())
        .unwrap_or(UNKNOWN_MIME)
        .to_string()
}

/// The drag-and-drop target.
pub struct DropZone {
    workflow: Arc<UploadWorkflow>,
}

impl DropZone {
    pub fn new(workflow: Arc<UploadWorkflow>) -> Self {
        Self { workflow }
    }

    pub fn drag_enter(&self) {
        self.workflow.set_highlight(true);
    }

    pub fn drag_over(&self) {
        self.workflow.set_highlight(true);
    }

    pub fn drag_leave(&self) {
        self.workflow.set_highlight(false);
    }

    /// Clear the highlight and submit the first dropped file.
    /// `None` when nothing was dropped.
    pub async fn drop_files(&self, files: Vec<UploadFile>) -> Option<SubmitOutcome> {
        self.workflow.set_highlight(false);
        let file = files.into_iter().next()?;
        Some(self.workflow.submit_file(file).await)
    }
}

/// The hidden file-input fallback.
pub struct FilePicker {
    workflow: Arc<UploadWorkflow>,
}

impl FilePicker {
    pub fn new(workflow: Arc<UploadWorkflow>) -> Self {
        Self { workflow }
    }

    /// Accept filter shown to the platform's file dialog.
    pub fn accept(&self) -> &'static str {
        ACCEPT
    }

    /// Submit the first selected file. `None` when the dialog was cancelled.
    pub async fn select(&self, files: Vec<UploadFile>) -> Option<SubmitOutcome> {
        let file = files.into_iter().next()?;
        Some(self.workflow.submit_file(file).await)
    }
}
