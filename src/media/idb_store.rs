//! IndexedDB media store for the browser build
//!
//! Blobs live in the `media` object store of a versioned database, keyed by
//! media id, with the value a browser `Blob` whose `type` carries the MIME
//! type. Every IndexedDB request is event based; `request_done` and
//! `transaction_done` turn the events into futures. Writes resolve only once
//! their transaction has completed.
//!
//! The store is `Clone` and cheap to clone, so an async task can own a copy
//! while the editor keeps serving synchronous calls.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransaction, IdbTransactionMode};

use super::handles::{to_js_blob, HandleRegistry, MediaHandle};
use super::library::{new_media_id, stored_view};
use super::reference::{MediaRef, MediaView};
use super::store::MediaBlob;
use crate::error::MediaError;

const DB_VERSION: u32 = 1;
const STORE_NAME: &str = "media";
const FALLBACK_MIME: &str = "application/octet-stream";

fn backend(error: impl std::fmt::Debug) -> MediaError {
    MediaError::Backend(format!("{:?}", error))
}

/// Resolve once `request` fires `success`; reject on `error`
async fn request_done(request: &IdbRequest) -> Result<JsValue, MediaError> {
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let on_success = Closure::once_into_js(move || {
            resolve.call0(&JsValue::NULL).ok();
        });
        let on_error = Closure::once_into_js(move || {
            reject.call0(&JsValue::NULL).ok();
        });
        request.set_onsuccess(Some(on_success.unchecked_ref()));
        request.set_onerror(Some(on_error.unchecked_ref()));
    });

    if JsFuture::from(promise).await.is_err() {
        return Err(backend(request.error()));
    }
    request.result().map_err(backend)
}

/// Resolve once `transaction` commits; reject when it errors or aborts
async fn transaction_done(transaction: &IdbTransaction) -> Result<(), MediaError> {
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let on_complete = Closure::once_into_js(move || {
            resolve.call0(&JsValue::NULL).ok();
        });
        let on_abort = Closure::once_into_js(move || {
            reject.call0(&JsValue::NULL).ok();
        });
        transaction.set_oncomplete(Some(on_complete.unchecked_ref()));
        // An error that is not handled aborts the transaction, so `abort`
        // covers both outcomes
        transaction.set_onabort(Some(on_abort.unchecked_ref()));
    });

    JsFuture::from(promise)
        .await
        .map(|_| ())
        .map_err(|_| backend(transaction.error()))
}

async fn open_database(name: &str) -> Result<IdbDatabase, MediaError> {
    let factory = web_sys::window()
        .ok_or_else(|| MediaError::Backend("no window".to_string()))?
        .indexed_db()
        .map_err(backend)?
        .ok_or_else(|| MediaError::Backend("IndexedDB is not available".to_string()))?;
    let request = factory.open_with_u32(name, DB_VERSION).map_err(backend)?;

    let upgrading = request.clone();
    let on_upgrade = Closure::once_into_js(move || {
        let db = match upgrading.result().and_then(|value| value.dyn_into::<IdbDatabase>()) {
            Ok(db) => db,
            Err(e) => {
                log::error!("Media database upgrade failed: {:?}", e);
                return;
            }
        };
        if !db.object_store_names().contains(STORE_NAME) {
            if let Err(e) = db.create_object_store(STORE_NAME) {
                log::error!("Could not create object store {}: {:?}", STORE_NAME, e);
            }
        }
    });
    request.set_onupgradeneeded(Some(on_upgrade.unchecked_ref()));

    let db = request_done(&request).await?;
    log::debug!("Media database {} opened", name);
    db.dyn_into::<IdbDatabase>().map_err(backend)
}

/// `MediaStore` counterpart over IndexedDB; every operation is async
#[derive(Clone, Debug)]
pub struct IdbMediaStore {
    name: String,
    db: Rc<RefCell<Option<IdbDatabase>>>,
}

impl IdbMediaStore {
    /// Store backed by the database `name`; opened on first use
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db: Rc::new(RefCell::new(None)),
        }
    }

    async fn database(&self) -> Result<IdbDatabase, MediaError> {
        let cached = self.db.borrow().clone();
        if let Some(db) = cached {
            return Ok(db);
        }
        let db = open_database(&self.name).await?;
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    async fn objects(
        &self,
        mode: IdbTransactionMode,
    ) -> Result<(IdbTransaction, IdbObjectStore), MediaError> {
        let db = self.database().await?;
        let transaction = db
            .transaction_with_str_and_mode(STORE_NAME, mode)
            .map_err(backend)?;
        let store = transaction.object_store(STORE_NAME).map_err(backend)?;
        Ok((transaction, store))
    }

    /// Store `blob` under `id`, replacing any previous payload
    pub async fn put(&self, id: &str, blob: &MediaBlob) -> Result<(), MediaError> {
        if id.is_empty() {
            return Err(MediaError::InvalidId(id.to_string()));
        }
        let value = to_js_blob(blob).map_err(backend)?;
        let (transaction, store) = self.objects(IdbTransactionMode::Readwrite).await?;
        store
            .put_with_key(&value, &JsValue::from_str(id))
            .map_err(backend)?;
        transaction_done(&transaction).await
    }

    pub async fn fetch(&self, id: &str) -> Result<Option<MediaBlob>, MediaError> {
        let (_transaction, store) = self.objects(IdbTransactionMode::Readonly).await?;
        let request = store.get(&JsValue::from_str(id)).map_err(backend)?;
        let value = request_done(&request).await?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }

        let stored: web_sys::Blob = value
            .dyn_into()
            .map_err(|_| MediaError::Backend(format!("Value stored under {} is not a Blob", id)))?;
        let buffer = JsFuture::from(stored.array_buffer()).await.map_err(backend)?;
        let bytes = js_sys::Uint8Array::new(&buffer).to_vec();

        let mime = match stored.type_() {
            mime if mime.is_empty() => FALLBACK_MIME.to_string(),
            mime => mime,
        };
        Ok(Some(MediaBlob { mime, bytes }))
    }

    /// Remove `id`; removing a missing id is not an error
    pub async fn remove(&self, id: &str) -> Result<(), MediaError> {
        let (transaction, store) = self.objects(IdbTransactionMode::Readwrite).await?;
        store.delete(&JsValue::from_str(id)).map_err(backend)?;
        transaction_done(&transaction).await
    }

    /// All stored ids, sorted
    pub async fn ids(&self) -> Result<Vec<String>, MediaError> {
        let (_transaction, store) = self.objects(IdbTransactionMode::Readonly).await?;
        let request = store.get_all_keys().map_err(backend)?;
        let keys: js_sys::Array = request_done(&request).await?.unchecked_into();

        let mut ids: Vec<String> = keys.iter().filter_map(|key| key.as_string()).collect();
        ids.sort();
        Ok(ids)
    }

    pub async fn contains(&self, id: &str) -> Result<bool, MediaError> {
        let (_transaction, store) = self.objects(IdbTransactionMode::Readonly).await?;
        let request = store
            .count_with_key(&JsValue::from_str(id))
            .map_err(backend)?;
        let count = request_done(&request).await?.as_f64().unwrap_or(0.0);
        Ok(count > 0.0)
    }

    /// Sum of stored `Blob` sizes in bytes
    pub async fn total_size(&self) -> Result<u64, MediaError> {
        let (_transaction, store) = self.objects(IdbTransactionMode::Readonly).await?;
        let request = store.get_all().map_err(backend)?;
        let values: js_sys::Array = request_done(&request).await?.unchecked_into();

        let total = values
            .iter()
            .filter_map(|value| value.dyn_into::<web_sys::Blob>().ok())
            .map(|blob| blob.size() as u64)
            .sum();
        Ok(total)
    }

    pub async fn clear(&self) -> Result<(), MediaError> {
        let (transaction, store) = self.objects(IdbTransactionMode::Readwrite).await?;
        store.clear().map_err(backend)?;
        transaction_done(&transaction).await
    }
}

/// Async `MediaLibrary` over IndexedDB, as used by the browser editor
#[derive(Clone, Debug)]
pub struct IdbMediaLibrary {
    store: IdbMediaStore,
    handles: HandleRegistry,
}

impl IdbMediaLibrary {
    pub fn new(store: IdbMediaStore) -> Self {
        Self {
            store,
            handles: HandleRegistry::new(),
        }
    }

    /// Store `blob` under a freshly generated id
    pub async fn save_new(&self, blob: MediaBlob) -> Result<String, MediaError> {
        let id = new_media_id();
        self.store.put(&id, &blob).await?;
        log::info!("Media saved: {}, size: {} bytes", id, blob.size());
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<Option<MediaHandle>, MediaError> {
        match self.store.fetch(id).await? {
            Some(blob) => Ok(Some(self.handles.acquire(id, blob)?)),
            None => {
                log::warn!("Media not found: {}", id);
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, id: &str) -> Result<(), MediaError> {
        self.store.remove(id).await?;
        log::info!("Media deleted: {}", id);
        Ok(())
    }

    pub async fn exists(&self, id: &str) -> Result<bool, MediaError> {
        self.store.contains(id).await
    }

    pub async fn list_ids(&self) -> Result<Vec<String>, MediaError> {
        self.store.ids().await
    }

    pub async fn total_size(&self) -> Result<u64, MediaError> {
        self.store.total_size().await
    }

    pub async fn clear(&self) -> Result<(), MediaError> {
        self.store.clear().await?;
        log::info!("All media cleared");
        Ok(())
    }

    pub async fn resolve(&self, content: &str) -> MediaView {
        match MediaRef::parse(content) {
            MediaRef::Direct(url) => MediaView::Direct(url.to_string()),
            MediaRef::Stored(id) => stored_view(id, self.get(id).await),
        }
    }

    pub fn handles(&self) -> &HandleRegistry {
        &self.handles
    }
}
