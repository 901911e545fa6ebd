//! Media library: a blob store paired with a handle registry

use uuid::Uuid;

use super::handles::{HandleRegistry, MediaHandle};
use super::reference::{MediaRef, MediaView};
use super::store::{MediaBlob, MediaStore};
use crate::error::MediaError;

/// Generate an id for a new blob
pub fn new_media_id() -> String {
    Uuid::new_v4().to_string()
}

/// View of a stored reference, given the outcome of fetching it
pub(crate) fn stored_view(id: &str, fetched: Result<Option<MediaHandle>, MediaError>) -> MediaView {
    match fetched {
        Ok(Some(handle)) => MediaView::Stored(handle),
        Ok(None) => MediaView::Failed {
            media_id: id.to_string(),
            reason: "Media not found".to_string(),
        },
        Err(e) => {
            log::error!("Error loading media {}: {}", id, e);
            MediaView::Failed {
                media_id: id.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Store operations plus resolution of element content into handles
pub struct MediaLibrary<S: MediaStore> {
    store: S,
    handles: HandleRegistry,
}

impl<S: MediaStore> MediaLibrary<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handles: HandleRegistry::new(),
        }
    }

    /// Store `blob` under `id` and return the id
    pub fn save(&mut self, id: &str, blob: MediaBlob) -> Result<String, MediaError> {
        let size = blob.size();
        self.store.put(id, blob)?;
        log::info!("Media saved: {}, size: {} bytes", id, size);
        Ok(id.to_string())
    }

    /// Store `blob` under a freshly generated id
    pub fn save_new(&mut self, blob: MediaBlob) -> Result<String, MediaError> {
        let id = new_media_id();
        self.save(&id, blob)
    }

    /// Resolve `id` into a new handle; `None` when nothing is stored under it
    pub fn get(&self, id: &str) -> Result<Option<MediaHandle>, MediaError> {
        match self.store.fetch(id)? {
            Some(blob) => Ok(Some(self.handles.acquire(id, blob)?)),
            None => {
                log::warn!("Media not found: {}", id);
                Ok(None)
            }
        }
    }

    /// Remove the blob; outstanding handles keep working until released
    pub fn delete(&mut self, id: &str) -> Result<(), MediaError> {
        self.store.remove(id)?;
        log::info!("Media deleted: {}", id);
        Ok(())
    }

    pub fn exists(&self, id: &str) -> Result<bool, MediaError> {
        self.store.contains(id)
    }

    pub fn list_ids(&self) -> Result<Vec<String>, MediaError> {
        self.store.ids()
    }

    /// Total stored bytes, for quota reporting
    pub fn total_size(&self) -> Result<u64, MediaError> {
        self.store.total_size()
    }

    pub fn clear(&mut self) -> Result<(), MediaError> {
        self.store.clear()?;
        log::info!("All media cleared");
        Ok(())
    }

    /// Turn element content into something renderable
    ///
    /// Storage failures are logged and become `MediaView::Failed`.
    pub fn resolve(&self, content: &str) -> MediaView {
        match MediaRef::parse(content) {
            MediaRef::Direct(url) => MediaView::Direct(url.to_string()),
            MediaRef::Stored(id) => stored_view(id, self.get(id)),
        }
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
