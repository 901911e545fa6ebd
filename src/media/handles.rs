//! Transient dereferenceable handles for stored media
//!
//! Every `get` on the media library mints a new handle URL. In the browser
//! build the URL is an object URL backed by a `Blob`; natively it is a
//! `blob:media/<uuid>` string the registry can dereference back to the bytes.
//! A handle is revoked when its `MediaHandle` guard is dropped, or, for URLs
//! handed to JavaScript with `detach`, when `HandleRegistry::release` is
//! called.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::store::MediaBlob;
use crate::error::MediaError;

#[derive(Debug)]
struct LiveHandle {
    media_id: String,
    #[cfg(not(target_arch = "wasm32"))]
    blob: MediaBlob,
}

/// Book-keeping for every handle that has been minted and not yet revoked
#[derive(Clone, Debug, Default)]
pub struct HandleRegistry {
    live: Arc<Mutex<HashMap<String, LiveHandle>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, LiveHandle>> {
        // Poison is ignored: every critical section is a single insert or remove
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mint a new handle for `blob`
    pub fn acquire(&self, media_id: &str, blob: MediaBlob) -> Result<MediaHandle, MediaError> {
        let url = mint_url(&blob)?;
        let live = LiveHandle {
            media_id: media_id.to_string(),
            #[cfg(not(target_arch = "wasm32"))]
            blob,
        };
        self.table().insert(url.clone(), live);

        log::debug!("Media handle acquired: {} -> {}", media_id, url);
        Ok(MediaHandle {
            url,
            media_id: media_id.to_string(),
            registry: Some(self.clone()),
        })
    }

    /// Revoke a handle URL; false if it was unknown or already revoked
    pub fn release(&self, url: &str) -> bool {
        let removed = self.table().remove(url);
        match removed {
            Some(live) => {
                revoke_url(url);
                log::debug!("Media handle released: {} ({})", url, live.media_id);
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.table().contains_key(url)
    }

    /// Number of handles not yet released
    pub fn live_count(&self) -> usize {
        self.table().len()
    }

    /// Live handles minted for one media id
    pub fn live_count_for(&self, media_id: &str) -> usize {
        self.table()
            .values()
            .filter(|live| live.media_id == media_id)
            .count()
    }

    /// Follow a live handle back to its payload
    #[cfg(not(target_arch = "wasm32"))]
    pub fn dereference(&self, url: &str) -> Option<MediaBlob> {
        self.table().get(url).map(|live| live.blob.clone())
    }
}

/// Scoped acquisition of a handle URL; revokes on drop
#[derive(Debug)]
pub struct MediaHandle {
    url: String,
    media_id: String,
    registry: Option<HandleRegistry>,
}

impl MediaHandle {
    /// URL to hand to a rendering element
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Id of the stored blob; compare handles by this, never by URL
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// Give up the guard; the caller now owns the URL and must release it
    pub fn detach(mut self) -> String {
        self.registry = None;
        std::mem::take(&mut self.url)
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.release(&self.url);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn mint_url(_blob: &MediaBlob) -> Result<String, MediaError> {
    Ok(format!("blob:media/{}", uuid::Uuid::new_v4()))
}

#[cfg(not(target_arch = "wasm32"))]
fn revoke_url(_url: &str) {}

/// Copy `blob` into a browser `Blob` carrying its MIME type
#[cfg(target_arch = "wasm32")]
pub(crate) fn to_js_blob(blob: &MediaBlob) -> Result<web_sys::Blob, wasm_bindgen::JsValue> {
    let bytes = js_sys::Uint8Array::from(blob.bytes.as_slice());
    let parts = js_sys::Array::of1(&bytes);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(&blob.mime);
    web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
}

#[cfg(target_arch = "wasm32")]
fn mint_url(blob: &MediaBlob) -> Result<String, MediaError> {
    let js_blob = to_js_blob(blob).map_err(|e| MediaError::Handle(format!("{:?}", e)))?;
    web_sys::Url::create_object_url_with_blob(&js_blob)
        .map_err(|e| MediaError::Handle(format!("{:?}", e)))
}

#[cfg(target_arch = "wasm32")]
fn revoke_url(url: &str) {
    if let Err(e) = web_sys::Url::revoke_object_url(url) {
        log::warn!("Failed to revoke object URL {}: {:?}", url, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob() -> MediaBlob {
        MediaBlob::new("image/png", vec![9, 8, 7])
    }

    #[test]
    fn test_each_acquire_mints_a_new_url() {
        let registry = HandleRegistry::new();
        let a = registry.acquire("m1", blob()).unwrap();
        let b = registry.acquire("m1", blob()).unwrap();

        assert_ne!(a.url(), b.url());
        assert_eq!(a.media_id(), b.media_id());
        assert_eq!(registry.live_count_for("m1"), 2);
    }

    #[test]
    fn test_drop_revokes() {
        let registry = HandleRegistry::new();
        let url = {
            let handle = registry.acquire("m1", blob()).unwrap();
            assert!(registry.is_live(handle.url()));
            handle.url().to_string()
        };
        assert!(!registry.is_live(&url));
        assert!(registry.dereference(&url).is_none());
    }

    #[test]
    fn test_detached_handle_survives_until_released() {
        let registry = HandleRegistry::new();
        let url = registry.acquire("m1", blob()).unwrap().detach();

        assert!(registry.is_live(&url));
        assert_eq!(registry.dereference(&url), Some(blob()));

        assert!(registry.release(&url));
        assert!(!registry.release(&url));
        assert_eq!(registry.live_count(), 0);
    }
}
