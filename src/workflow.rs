//! The upload-to-preview state machine.
//!
//! [`UploadWorkflow`] owns one upload cycle at a time: it validates a file,
//! keeps the original image, hands it to the injected decoder and
//! [`BackgroundRemover`], and exposes the processed result for download.
//! Every failure is recovered here and surfaced as a toast plus a
//! [`SubmitOutcome`]; nothing propagates to the caller as an error.
//!
//! Each removal call is tagged with a generation number. Only the most
//! recent submission may settle the workflow; older results are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::consts::{
    DEFAULT_DOWNLOAD_NAME, IMAGE_MIME_PREFIX, MSG_NOT_AN_IMAGE, MSG_PROCESSED,
    MSG_PROCESSING_FAILED, PROCESSED_MIME,
};
use crate::decoder::ImageDecoder;
use crate::error::{ProcessingError, ValidationError};
use crate::events::{Event, EventBus, Toast};
use crate::handle::{HandleRegistry, ImageHandle, ImageView};
use crate::input::UploadFile;
use crate::remover::BackgroundRemover;
use crate::saver::{FileSaver, SavedFile};

/// Lifecycle stage of one upload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// No file selected.
    Empty,
    /// Original held, removal not started.
    Loaded,
    /// Original held, removal in flight.
    Processing,
    /// Original and processed both held.
    Done,
    /// Original held, last removal failed.
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Empty => "empty",
            UploadState::Loaded => "loaded",
            UploadState::Processing => "processing",
            UploadState::Done => "done",
            UploadState::Failed => "failed",
        }
    }
}

/// How a single `submit_file` or `process` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The file was refused; state untouched.
    Rejected(ValidationError),
    /// The file was accepted and is waiting for [`UploadWorkflow::process`].
    Loaded,
    /// Background removed; state is `Done`.
    Completed,
    /// Decoding or removal failed; state is `Failed`.
    Failed(ProcessingError),
    /// A newer submission (or a reset) arrived first; this result was discarded.
    Superseded,
}

pub struct WorkflowConfig {
    /// Start removal as soon as a file is accepted.
    pub auto_process: bool,
    /// Give up on the remover after this long. `None` waits forever.
    pub removal_timeout: Option<Duration>,
    /// File name handed to the saver on download.
    pub download_name: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            auto_process: true,
            removal_timeout: None,
            download_name: DEFAULT_DOWNLOAD_NAME.to_string(),
        }
    }
}

/// Everything a renderer needs, copied out from under the lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: UploadState,
    pub is_processing: bool,
    pub is_dragging: bool,
    pub file_name: Option<String>,
    pub original: Option<ImageView>,
    pub processed: Option<ImageView>,
    pub last_error: Option<ProcessingError>,
}

struct Inner {
    state: UploadState,
    dragging: bool,
    source: Option<UploadFile>,
    original: Option<ImageHandle>,
    processed: Option<ImageHandle>,
    last_error: Option<ProcessingError>,
    generation: u64,
}

/// Wires together a decoder, a remover, a saver and the event bus.
pub struct UploadWorkflow {
    inner: Mutex<Inner>,
    decoder: Arc<dyn ImageDecoder>,
    remover: Arc<dyn BackgroundRemover>,
    saver: Arc<dyn FileSaver>,
    handles: Arc<HandleRegistry>,
    events: Arc<EventBus>,
    config: WorkflowConfig,
}

impl UploadWorkflow {
    pub fn new(
        decoder: Arc<dyn ImageDecoder>,
        remover: Arc<dyn BackgroundRemover>,
        saver: Arc<dyn FileSaver>,
        events: Arc<EventBus>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: UploadState::Empty,
                dragging: false,
                source: None,
                original: None,
                processed: None,
                last_error: None,
                generation: 0,
            }),
            decoder,
            remover,
            saver,
            handles: HandleRegistry::new(),
            events,
            config,
        }
    }

    /// Registry backing this workflow's image handles.
    pub fn handles(&self) -> &Arc<HandleRegistry> {
        &self.handles
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn state(&self) -> UploadState {
        self.lock().state
    }

    pub fn is_processing(&self) -> bool {
        self.lock().state == UploadState::Processing
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            state: inner.state,
            is_processing: inner.state == UploadState::Processing,
            is_dragging: inner.dragging,
            file_name: inner.source.as_ref().map(|f| f.name.clone()),
            original: inner.original.as_ref().map(ImageHandle::view),
            processed: inner.processed.as_ref().map(ImageHandle::view),
            last_error: inner.last_error.clone(),
        }
    }

    /// Toggle the drop-target highlight. Never touches the upload state.
    pub fn set_highlight(&self, active: bool) {
        let mut inner = self.lock();
        if inner.dragging != active {
            inner.dragging = active;
            self.events.emit(Event::Highlight { active });
        }
    }

    /// Accept a file and, unless configured otherwise, remove its background.
    ///
    /// Resolves once this submission settles. A call made while another is
    /// still in flight supersedes it.
    pub async fn submit_file(&self, file: UploadFile) -> SubmitOutcome {
        if !file.mime.starts_with(IMAGE_MIME_PREFIX) {
            warn!(file = %file.name, mime = %file.mime, "rejected upload");
            self.events.emit(Event::Toast(Toast::error(MSG_NOT_AN_IMAGE)));
            return SubmitOutcome::Rejected(ValidationError::NotAnImage { mime: file.mime });
        }

        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.processed = None;
            inner.original = Some(self.handles.create(&file.mime, Arc::clone(&file.bytes)));
            inner.source = Some(file.clone());
            inner.last_error = None;

            info!(file = %file.name, mime = %file.mime, bytes = file.bytes.len(), "accepted upload");

            if !self.config.auto_process {
                self.transition(&mut inner, UploadState::Loaded);
                return SubmitOutcome::Loaded;
            }
            self.transition(&mut inner, UploadState::Processing);
            inner.generation
        };

        self.run(generation, file).await
    }

    /// Start removal for the held file. Valid from `Loaded`, or from `Failed`
    /// as a user-initiated retry. Returns `None` when there is nothing to do.
    pub async fn process(&self) -> Option<SubmitOutcome> {
        let (generation, file) = {
            let mut inner = self.lock();
            if !matches!(inner.state, UploadState::Loaded | UploadState::Failed) {
                return None;
            }
            let file = inner.source.clone()?;
            inner.generation += 1;
            inner.last_error = None;
            self.transition(&mut inner, UploadState::Processing);
            (inner.generation, file)
        };

        Some(self.run(generation, file).await)
    }

    /// Hand the processed image to the saver. `Ok(None)` when there is
    /// nothing to save.
    pub fn download(&self) -> Result<Option<SavedFile>> {
        let bytes = {
            let inner = self.lock();
            match (&inner.state, &inner.processed) {
                (UploadState::Done, Some(processed)) => processed.view().bytes,
                _ => {
                    debug!(state = inner.state.as_str(), "nothing to download");
                    return Ok(None);
                }
            }
        };

        let saved = self.saver.save(&self.config.download_name, &bytes)?;
        info!(location = %saved.location, bytes = bytes.len(), "saved processed image");
        Ok(Some(saved))
    }

    /// Drop both images and return to `Empty`. Any call still in flight
    /// will be discarded when it settles.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.original = None;
        inner.processed = None;
        inner.source = None;
        inner.last_error = None;
        self.transition(&mut inner, UploadState::Empty);
    }

    async fn run(&self, generation: u64, file: UploadFile) -> SubmitOutcome {
        let result = self.remove_background(&file).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                file = %file.name,
                generation,
                latest = inner.generation,
                "discarding superseded result"
            );
            return SubmitOutcome::Superseded;
        }

        match result {
            Ok(bytes) => {
                inner.processed = Some(self.handles.create(PROCESSED_MIME, bytes));
                self.transition(&mut inner, UploadState::Done);
                info!(file = %file.name, "background removed");
                self.events.emit(Event::Toast(Toast::success(MSG_PROCESSED)));
                SubmitOutcome::Completed
            }
            Err(e) => {
                error!(file = %file.name, error = %e, "failed to process image");
                inner.last_error = Some(e.clone());
                self.transition(&mut inner, UploadState::Failed);
                self.events
                    .emit(Event::Toast(Toast::error(MSG_PROCESSING_FAILED)));
                SubmitOutcome::Failed(e)
            }
        }
    }

    async fn remove_background(&self, file: &UploadFile) -> Result<Vec<u8>, ProcessingError> {
        // Decoding a large upload takes a while; keep it off the runtime threads.
        let decoder = Arc::clone(&self.decoder);
        let upload = file.clone();
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&upload))
            .await
            .map_err(|e| ProcessingError::Decode(format!("decoder task failed: {e}")))?
            .map_err(|e| ProcessingError::Decode(format!("{e:#}")))?;

        debug!(
            remover = self.remover.name(),
            width = decoded.image.width(),
            height = decoded.image.height(),
            "dispatching background removal"
        );

        let removal = self.remover.remove(&decoded);
        let result = match self.config.removal_timeout {
            Some(limit) => tokio::time::timeout(limit, removal)
                .await
                .map_err(|_| ProcessingError::Timeout(limit))?,
            None => removal.await,
        };

        result.map_err(|e| ProcessingError::Removal(format!("{e:#}")))
    }

    fn transition(&self, inner: &mut Inner, to: UploadState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        debug!(from = from.as_str(), to = to.as_str(), "state changed");
        self.events.emit(Event::StateChanged { from, to });
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
