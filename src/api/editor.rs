//! `BoardEditor`: the JavaScript-facing handle on the whole board core
//!
//! One instance owns the board registry, the edit session and the media
//! library. Structured values (boards, slides, patches) cross the boundary as
//! plain JSON-compatible objects; indices and ids cross as numbers and strings.
//!
//! In the browser, media lives in IndexedDB and every media method returns a
//! `Promise`. The session is shared with those pending tasks; an upload that
//! finishes after its session closed is dropped and its blob removed.
//! Native hosts get synchronous media methods over any `MediaStore`.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use super::helpers::{deserialize, deserialize_or_default, js_error, serialize};
use crate::config::BoardConfig;
use crate::media::MediaView;
use crate::models::{CellKey, Element, ElementPatch};
use crate::registry::{BoardRegistry, BoardStorage, CellActivation, MemoryStorage};
use crate::session::{CloseOutcome, CommitOutcome, EditSession};

#[cfg(not(target_arch = "wasm32"))]
use crate::error::{MediaError, UploadError};
#[cfg(not(target_arch = "wasm32"))]
use crate::media::{MediaLibrary, MediaStore, MemoryMediaStore};

#[cfg(target_arch = "wasm32")]
use super::helpers::js_message;
#[cfg(target_arch = "wasm32")]
use crate::config::MEDIA_DATABASE_NAME;
#[cfg(target_arch = "wasm32")]
use crate::error::UploadError;
#[cfg(target_arch = "wasm32")]
use crate::media::{IdbMediaLibrary, IdbMediaStore, MediaBlob};
#[cfg(target_arch = "wasm32")]
use crate::session::PendingMedia;
#[cfg(target_arch = "wasm32")]
use js_sys::Promise;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen_futures::future_to_promise;

/// Entry of the board picker
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BoardSummary<'a> {
    id: &'a str,
    name: &'a str,
    rows: usize,
    columns: usize,
    updated_at: i64,
    active: bool,
}

/// Outcome of `activateCell`
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ActivationResult {
    action: &'static str,
    row: Option<usize>,
    col: Option<usize>,
}

impl From<CellActivation> for ActivationResult {
    fn from(activation: CellActivation) -> Self {
        let (action, key) = match activation {
            CellActivation::Edit(key) => ("edit", Some(key)),
            CellActivation::Play(key) => ("play", Some(key)),
            CellActivation::AlreadyUsed(key) => ("alreadyUsed", Some(key)),
            CellActivation::Missing => ("missing", None),
        };
        Self {
            action,
            row: key.map(|k| k.row),
            col: key.map(|k| k.col),
        }
    }
}

/// Media element content resolved for rendering
#[cfg(any(target_arch = "wasm32", test))]
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResolvedMedia {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[cfg(any(target_arch = "wasm32", test))]
impl From<MediaView> for ResolvedMedia {
    fn from(view: MediaView) -> Self {
        match view {
            MediaView::Direct(url) => Self {
                status: "direct",
                url: Some(url),
                media_id: None,
                message: None,
            },
            MediaView::Stored(handle) => {
                let media_id = handle.media_id().to_string();
                Self {
                    status: "stored",
                    url: Some(handle.detach()),
                    media_id: Some(media_id),
                    message: None,
                }
            }
            MediaView::Failed { media_id, reason } => Self {
                status: "failed",
                url: None,
                media_id: Some(media_id),
                message: Some(reason),
            },
        }
    }
}

#[cfg(target_arch = "wasm32")]
type EditorMedia = IdbMediaLibrary;

#[cfg(not(target_arch = "wasm32"))]
type EditorMedia = MediaLibrary<Box<dyn MediaStore>>;

#[cfg(target_arch = "wasm32")]
fn default_storage() -> Box<dyn BoardStorage> {
    match crate::registry::LocalStorage::open() {
        Ok(storage) => Box::new(storage),
        Err(e) => {
            log::warn!("localStorage unavailable, boards will not survive a reload: {}", e);
            Box::new(MemoryStorage::new())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_storage() -> Box<dyn BoardStorage> {
    Box::new(MemoryStorage::new())
}

#[cfg(target_arch = "wasm32")]
fn default_media() -> EditorMedia {
    IdbMediaLibrary::new(IdbMediaStore::new(MEDIA_DATABASE_NAME))
}

#[cfg(not(target_arch = "wasm32"))]
fn default_media() -> EditorMedia {
    MediaLibrary::new(Box::new(MemoryMediaStore::new()))
}

#[wasm_bindgen]
pub struct BoardEditor {
    registry: BoardRegistry,
    session: Rc<RefCell<EditSession>>,
    media: EditorMedia,
}

impl BoardEditor {
    fn from_parts(storage: Box<dyn BoardStorage>, media: EditorMedia, config: BoardConfig) -> Self {
        Self {
            registry: BoardRegistry::open(storage, config),
            session: Rc::new(RefCell::new(EditSession::new())),
            media,
        }
    }

    /// Editor over explicit board and media backends
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_storage(
        storage: Box<dyn BoardStorage>,
        media: Box<dyn MediaStore>,
        config: BoardConfig,
    ) -> Self {
        Self::from_parts(storage, MediaLibrary::new(media), config)
    }

    /// Editor over explicit board storage and media database
    #[cfg(target_arch = "wasm32")]
    pub fn with_storage(storage: Box<dyn BoardStorage>, media: IdbMediaStore, config: BoardConfig) -> Self {
        Self::from_parts(storage, IdbMediaLibrary::new(media), config)
    }

    pub fn registry(&self) -> &BoardRegistry {
        &self.registry
    }

    pub fn session(&self) -> Ref<'_, EditSession> {
        self.session.borrow()
    }
}

#[wasm_bindgen]
impl BoardEditor {
    /// Create an editor; `config` is an optional `BoardConfig` object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<BoardEditor, JsValue> {
        let config: BoardConfig = deserialize_or_default(config, "Invalid board config")?;
        Ok(Self::from_parts(default_storage(), default_media(), config))
    }

    // ========================================================================
    // Board collection
    // ========================================================================

    #[wasm_bindgen(js_name = listBoards)]
    pub fn list_boards(&self) -> Result<JsValue, JsValue> {
        let active_id = self.registry.active_id();
        let summaries: Vec<BoardSummary> = self
            .registry
            .boards()
            .iter()
            .map(|b| BoardSummary {
                id: &b.id,
                name: &b.name,
                rows: b.rows,
                columns: b.columns,
                updated_at: b.updated_at,
                active: b.id == active_id,
            })
            .collect();
        serialize(&summaries, "Board list serialization failed")
    }

    #[wasm_bindgen(js_name = activeBoard)]
    pub fn active_board(&self) -> Result<JsValue, JsValue> {
        serialize(self.registry.active(), "Board serialization failed")
    }

    #[wasm_bindgen(js_name = activeBoardId)]
    pub fn active_board_id(&self) -> String {
        self.registry.active_id().to_string()
    }

    #[wasm_bindgen(js_name = createBoard)]
    pub fn create_board(&mut self, name: &str) -> String {
        self.registry.create(name)
    }

    #[wasm_bindgen(js_name = renameBoard)]
    pub fn rename_board(&mut self, id: &str, name: &str) -> bool {
        self.registry.rename(id, name)
    }

    #[wasm_bindgen(js_name = deleteBoard)]
    pub fn delete_board(&mut self, id: &str) -> bool {
        self.registry.delete(id)
    }

    #[wasm_bindgen(js_name = setActiveBoard)]
    pub fn set_active_board(&mut self, id: &str) -> bool {
        self.registry.set_active(id)
    }

    #[wasm_bindgen(js_name = overwriteBoard)]
    pub fn overwrite_board(&mut self, target_id: &str) -> bool {
        self.registry.overwrite(target_id)
    }

    /// Check the active board's grid invariants
    #[wasm_bindgen(js_name = validateBoard)]
    pub fn validate_board(&self) -> Result<(), JsValue> {
        self.registry
            .active()
            .validate()
            .map_err(|e| js_error("Board is inconsistent", e))
    }

    // ========================================================================
    // Grid structure
    // ========================================================================

    #[wasm_bindgen(js_name = addRow)]
    pub fn add_row(&mut self) {
        self.registry.add_row();
    }

    #[wasm_bindgen(js_name = removeRow)]
    pub fn remove_row(&mut self) -> bool {
        self.registry.remove_row()
    }

    #[wasm_bindgen(js_name = addColumn)]
    pub fn add_column(&mut self) {
        self.registry.add_column();
    }

    #[wasm_bindgen(js_name = removeColumn)]
    pub fn remove_column(&mut self) -> bool {
        self.registry.remove_column()
    }

    #[wasm_bindgen(js_name = addRowAt)]
    pub fn add_row_at(&mut self, index: usize) {
        self.registry.add_row_at(index);
    }

    #[wasm_bindgen(js_name = removeRowAt)]
    pub fn remove_row_at(&mut self, index: usize) -> bool {
        self.registry.remove_row_at(index)
    }

    #[wasm_bindgen(js_name = addColumnAt)]
    pub fn add_column_at(&mut self, index: usize) {
        self.registry.add_column_at(index);
    }

    #[wasm_bindgen(js_name = removeColumnAt)]
    pub fn remove_column_at(&mut self, index: usize) -> bool {
        self.registry.remove_column_at(index)
    }

    #[wasm_bindgen(js_name = setCategory)]
    pub fn set_category(&mut self, index: usize, value: &str) -> bool {
        self.registry.set_category_at(index, value)
    }

    #[wasm_bindgen(js_name = setCellPoints)]
    pub fn set_cell_points(&mut self, row: usize, col: usize, points: u32) -> bool {
        self.registry.set_cell_points(row, col, points)
    }

    // ========================================================================
    // Play / edit flow
    // ========================================================================

    #[wasm_bindgen(js_name = isEditMode)]
    pub fn is_edit_mode(&self) -> bool {
        self.registry.edit_mode()
    }

    #[wasm_bindgen(js_name = setEditMode)]
    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.registry.set_edit_mode(edit_mode);
    }

    /// Select a cell; pass `undefined` for either coordinate to clear the selection
    #[wasm_bindgen(js_name = selectCell)]
    pub fn select_cell(&mut self, row: Option<usize>, col: Option<usize>) {
        let key = row.zip(col).map(|(row, col)| CellKey::new(row, col));
        self.registry.select_cell(key);
    }

    #[wasm_bindgen(js_name = selectedCell)]
    pub fn selected_cell(&self) -> Result<JsValue, JsValue> {
        serialize(&self.registry.selected_cell(), "Cell serialization failed")
    }

    #[wasm_bindgen(js_name = activateCell)]
    pub fn activate_cell(&mut self, row: usize, col: usize) -> Result<JsValue, JsValue> {
        let result = ActivationResult::from(self.registry.activate_cell(row, col));
        serialize(&result, "Activation serialization failed")
    }

    #[wasm_bindgen(js_name = markCellUsed)]
    pub fn mark_cell_used(&mut self, row: usize, col: usize) -> bool {
        self.registry.mark_cell_used(row, col)
    }

    #[wasm_bindgen(js_name = resetPlayedCells)]
    pub fn reset_played_cells(&mut self) -> usize {
        self.registry.reset_played_cells()
    }

    // ========================================================================
    // Edit session
    // ========================================================================

    #[wasm_bindgen(js_name = openCell)]
    pub fn open_cell(&mut self, row: usize, col: usize) -> bool {
        self.session.borrow_mut().open(self.registry.active(), row, col)
    }

    #[wasm_bindgen(js_name = isEditing)]
    pub fn is_editing(&self) -> bool {
        self.session.borrow().is_editing()
    }

    #[wasm_bindgen(js_name = isDirty)]
    pub fn is_dirty(&self) -> bool {
        self.session.borrow().is_dirty()
    }

    /// Returns "committed", "stale" or "notEditing"
    pub fn commit(&mut self) -> String {
        let status = match self.session.borrow_mut().commit(&mut self.registry) {
            CommitOutcome::Committed(_) => "committed",
            CommitOutcome::Stale(_) => "stale",
            CommitOutcome::NotEditing => "notEditing",
        };
        status.to_string()
    }

    pub fn discard(&mut self) -> bool {
        self.session.borrow_mut().discard()
    }

    /// Returns "closed" or "confirmDiscard"
    #[wasm_bindgen(js_name = requestClose)]
    pub fn request_close(&mut self) -> String {
        match self.session.borrow_mut().request_close() {
            CloseOutcome::Closed => "closed".to_string(),
            CloseOutcome::ConfirmDiscard => "confirmDiscard".to_string(),
        }
    }

    #[wasm_bindgen(js_name = draftSlides)]
    pub fn draft_slides(&self) -> Result<JsValue, JsValue> {
        serialize(&self.session.borrow().slides(), "Slide serialization failed")
    }

    #[wasm_bindgen(js_name = currentSlideIndex)]
    pub fn current_slide_index(&self) -> Option<usize> {
        self.session.borrow().current_slide_index()
    }

    #[wasm_bindgen(js_name = setCurrentSlide)]
    pub fn set_current_slide(&mut self, index: usize) -> bool {
        self.session.borrow_mut().set_current_slide(index)
    }

    #[wasm_bindgen(js_name = nextSlide)]
    pub fn next_slide(&mut self) -> bool {
        self.session.borrow_mut().next_slide()
    }

    #[wasm_bindgen(js_name = previousSlide)]
    pub fn previous_slide(&mut self) -> bool {
        self.session.borrow_mut().previous_slide()
    }

    #[wasm_bindgen(js_name = addSlide)]
    pub fn add_slide(&mut self, after_index: usize) -> Option<usize> {
        self.session.borrow_mut().add_slide(after_index)
    }

    #[wasm_bindgen(js_name = removeSlide)]
    pub fn remove_slide(&mut self, index: usize) -> bool {
        self.session.borrow_mut().remove_slide(index)
    }

    #[wasm_bindgen(js_name = addTextElement)]
    pub fn add_text_element(&mut self, slide: usize) -> Option<String> {
        self.session.borrow_mut().add_text_element(slide)
    }

    /// Append an element object; its `id` is replaced with a fresh one
    #[wasm_bindgen(js_name = addElement)]
    pub fn add_element(&mut self, slide: usize, element: JsValue) -> Result<Option<String>, JsValue> {
        let element: Element = deserialize(element, "Invalid element")?;
        Ok(self.session.borrow_mut().add_element(slide, element))
    }

    #[wasm_bindgen(js_name = updateElement)]
    pub fn update_element(&mut self, slide: usize, id: &str, patch: JsValue) -> Result<bool, JsValue> {
        let patch: ElementPatch = deserialize(patch, "Invalid element patch")?;
        Ok(self.session.borrow_mut().update_element(slide, id, &patch))
    }

    #[wasm_bindgen(js_name = removeElement)]
    pub fn remove_element(&mut self, slide: usize, id: &str) -> bool {
        self.session.borrow_mut().remove_element(slide, id)
    }

    #[wasm_bindgen(js_name = adjustFontSize)]
    pub fn adjust_font_size(&mut self, slide: usize, id: &str, delta: f64) -> Option<f64> {
        self.session.borrow_mut().adjust_font_size(slide, id, delta)
    }

    #[wasm_bindgen(js_name = increaseFontSize)]
    pub fn increase_font_size(&mut self, slide: usize, id: &str) -> Option<f64> {
        self.session.borrow_mut().increase_font_size(slide, id)
    }

    #[wasm_bindgen(js_name = decreaseFontSize)]
    pub fn decrease_font_size(&mut self, slide: usize, id: &str) -> Option<f64> {
        self.session.borrow_mut().decrease_font_size(slide, id)
    }

    /// Revoke a handle URL returned by `resolveMedia`
    #[wasm_bindgen(js_name = releaseMedia)]
    pub fn release_media(&self, url: &str) -> bool {
        self.media.handles().release(url)
    }
}

/// Save `blob`, then place it through the pending upload
///
/// A blob whose placement fails (session closed, slide removed meanwhile) is
/// deleted again so it does not linger unreferenced.
#[cfg(target_arch = "wasm32")]
fn store_and_place(
    session: Rc<RefCell<EditSession>>,
    media: IdbMediaLibrary,
    prepared: Result<PendingMedia, UploadError>,
    blob: MediaBlob,
) -> Promise {
    future_to_promise(async move {
        let pending = prepared.map_err(js_message)?;
        let media_id = media
            .save_new(blob)
            .await
            .map_err(|e| js_error("Error saving media", e))?;

        let placed = session.borrow_mut().place_media(&pending, &media_id);
        match placed {
            Ok(element_id) => Ok(JsValue::from_str(&element_id)),
            Err(e) => {
                if let Err(cleanup) = media.delete(&media_id).await {
                    log::warn!("Could not remove unplaced media {}: {}", media_id, cleanup);
                }
                Err(js_message(e))
            }
        }
    })
}

// ========================================================================
// Media (browser): IndexedDB, every call returns a Promise
// ========================================================================

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl BoardEditor {
    /// Store an uploaded file and place it on `slide`
    ///
    /// Resolves to the new element id. Rejects with the user-facing policy
    /// message for oversized or unsupported files, before anything is stored.
    #[wasm_bindgen(js_name = uploadMedia)]
    pub fn upload_media(&self, slide: usize, mime: String, bytes: Vec<u8>) -> Promise {
        let prepared = self
            .session
            .borrow()
            .prepare_upload(slide, &mime, bytes.len() as u64);
        store_and_place(
            Rc::clone(&self.session),
            self.media.clone(),
            prepared,
            MediaBlob::new(mime, bytes),
        )
    }

    /// Like `uploadMedia` for clipboard images; any `image/*` type is accepted
    #[wasm_bindgen(js_name = pasteImage)]
    pub fn paste_image(&self, slide: usize, mime: String, bytes: Vec<u8>) -> Promise {
        let prepared = self
            .session
            .borrow()
            .prepare_paste(slide, &mime, bytes.len() as u64);
        store_and_place(
            Rc::clone(&self.session),
            self.media.clone(),
            prepared,
            MediaBlob::new(mime, bytes),
        )
    }

    /// Resolve element content for rendering
    ///
    /// `{ status: "stored", url }` carries a handle URL owned by the caller,
    /// who must pass it to `releaseMedia` once the element stops rendering.
    #[wasm_bindgen(js_name = resolveMedia)]
    pub fn resolve_media(&self, content: String) -> Promise {
        let media = self.media.clone();
        future_to_promise(async move {
            let resolved = ResolvedMedia::from(media.resolve(&content).await);
            serialize(&resolved, "Media serialization failed")
        })
    }

    #[wasm_bindgen(js_name = deleteMedia)]
    pub fn delete_media(&self, id: String) -> Promise {
        let media = self.media.clone();
        future_to_promise(async move {
            media
                .delete(&id)
                .await
                .map_err(|e| js_error("Error deleting media", e))?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = mediaExists)]
    pub fn media_exists(&self, id: String) -> Promise {
        let media = self.media.clone();
        future_to_promise(async move {
            let exists = media
                .exists(&id)
                .await
                .map_err(|e| js_error("Error checking media", e))?;
            Ok(JsValue::from_bool(exists))
        })
    }

    #[wasm_bindgen(js_name = listMediaIds)]
    pub fn list_media_ids(&self) -> Promise {
        let media = self.media.clone();
        future_to_promise(async move {
            let ids = media
                .list_ids()
                .await
                .map_err(|e| js_error("Error listing media", e))?;
            serialize(&ids, "Media id serialization failed")
        })
    }

    #[wasm_bindgen(js_name = mediaTotalSize)]
    pub fn media_total_size(&self) -> Promise {
        let media = self.media.clone();
        future_to_promise(async move {
            let size = media
                .total_size()
                .await
                .map_err(|e| js_error("Error computing media size", e))?;
            Ok(JsValue::from_f64(size as f64))
        })
    }

    #[wasm_bindgen(js_name = clearMedia)]
    pub fn clear_media(&self) -> Promise {
        let media = self.media.clone();
        future_to_promise(async move {
            media
                .clear()
                .await
                .map_err(|e| js_error("Error clearing media", e))?;
            Ok(JsValue::UNDEFINED)
        })
    }
}

// ========================================================================
// Media (native): synchronous over the injected store
// ========================================================================

#[cfg(not(target_arch = "wasm32"))]
impl BoardEditor {
    /// Store an uploaded file and place it on `slide`; returns the element id
    pub fn upload_media(&mut self, slide: usize, mime: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        self.session
            .borrow_mut()
            .upload_media(&mut self.media, slide, mime, bytes)
    }

    pub fn paste_image(&mut self, slide: usize, mime: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        self.session
            .borrow_mut()
            .paste_image(&mut self.media, slide, mime, bytes)
    }

    /// Resolve element content; a stored view holds its handle until dropped
    pub fn resolve_media(&self, content: &str) -> MediaView {
        self.media.resolve(content)
    }

    pub fn delete_media(&mut self, id: &str) -> Result<(), MediaError> {
        self.media.delete(id)
    }

    pub fn media_exists(&self, id: &str) -> Result<bool, MediaError> {
        self.media.exists(id)
    }

    pub fn list_media_ids(&self) -> Result<Vec<String>, MediaError> {
        self.media.list_ids()
    }

    pub fn media_total_size(&self) -> Result<u64, MediaError> {
        self.media.total_size()
    }

    pub fn clear_media(&mut self) -> Result<(), MediaError> {
        self.media.clear()
    }
}
