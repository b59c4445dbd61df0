//! Scoped references to in-memory image bytes.
//!
//! An [`ImageHandle`] is the object-URI of this crate: it names one image
//! held in memory and is registered with a [`HandleRegistry`] for as long
//! as it lives. Dropping the handle releases the URI, so whoever owns the
//! handle owns the resource. The workflow keeps at most one original and
//! one processed handle, and replacing either drops (releases) the old one.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tracing::trace;

/// Tracks which handle URIs are currently live.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next_id: AtomicU64,
    live: Mutex<HashSet<String>>,
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register bytes and hand back the owning handle.
    pub fn create(self: &Arc<Self>, mime: &str, bytes: impl Into<Arc<[u8]>>) -> ImageHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let uri = format!("blob:cutout/{id:08x}");
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.clone());
        trace!(%uri, mime, "created image handle");

        ImageHandle {
            uri,
            mime: mime.to_string(),
            bytes: bytes.into(),
            registry: Arc::clone(self),
        }
    }

    /// Whether the URI still refers to a held image.
    pub fn is_live(&self, uri: &str) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(uri)
    }

    /// Number of handles not yet released.
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, uri: &str) {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri);
        trace!(%uri, "released image handle");
    }
}

/// Sole owner of one registered image. Not `Clone`: there is exactly one
/// release per creation.
pub struct ImageHandle {
    uri: String,
    mime: String,
    bytes: Arc<[u8]>,
    registry: Arc<HandleRegistry>,
}

impl ImageHandle {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// A read-only copy for rendering. Holding a view does not keep the
    /// handle registered.
    pub fn view(&self) -> ImageView {
        ImageView {
            uri: self.uri.clone(),
            mime: self.mime.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        self.registry.release(&self.uri);
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("uri", &self.uri)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What a renderer gets to see of a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub uri: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl ImageView {
    /// Hex SHA-256 of the image bytes.
    pub fn digest(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }

    /// `data:` URI for embedding in an HTML page.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}
