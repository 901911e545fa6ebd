//! Staged-cell edit session
//!
//! Opening a cell deep-copies its slides into a private draft. Every slide
//! and element edit lands on the draft only; the board changes exactly once,
//! on `commit`. `discard` drops the draft. A dirty flag tracks unsaved edits
//! so the caller can confirm before throwing them away.
//!
//! ```text
//! Idle --open--> Editing --commit/discard--> Idle
//! ```

use crate::config::FONT_SIZE_STEP;
use crate::error::UploadError;
use crate::media::{
    check_paste, check_upload, stored_ref, MediaBlob, MediaKind, MediaLibrary, MediaStore,
};
use crate::models::{Board, CellKey, Element, ElementPatch, Slide};
use crate::registry::BoardRegistry;

/// Identifies one open/close cycle of the session
///
/// Work that completes asynchronously (a media read, an upload) captures a
/// ticket when it starts and checks `EditSession::is_current` before applying
/// its result, so late results for a closed editor are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTicket(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Draft written to the board
    Committed(CellKey),

    /// Target cell (or board) no longer exists; nothing written
    Stale(CellKey),

    NotEditing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Session is idle
    Closed,

    /// Draft has unsaved edits; call `discard` to confirm or `commit` to keep them
    ConfirmDiscard,
}

/// Media that passed the policy and is waiting for its blob to be stored
///
/// Produced by `prepare_upload`/`prepare_paste` and consumed by
/// `place_media` once the store has assigned an id. The store write may
/// complete after the session has moved on; placement then fails with
/// `UploadError::SessionClosed`.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingMedia {
    ticket: SessionTicket,
    slide: usize,
    kind: MediaKind,
    size: f64,
}

impl PendingMedia {
    pub fn ticket(&self) -> SessionTicket {
        self.ticket
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

#[derive(Debug)]
struct Draft {
    board_id: String,
    key: CellKey,
    slides: Vec<Slide>,
    current: usize,
    dirty: bool,
}

impl Draft {
    fn slide_mut(&mut self, index: usize) -> Option<&mut Slide> {
        self.slides.get_mut(index)
    }
}

#[derive(Debug, Default)]
pub struct EditSession {
    draft: Option<Draft>,
    generation: u64,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.draft.as_ref().is_some_and(|d| d.dirty)
    }

    /// Cell being edited
    pub fn target(&self) -> Option<CellKey> {
        self.draft.as_ref().map(|d| d.key)
    }

    pub fn slides(&self) -> Option<&[Slide]> {
        self.draft.as_ref().map(|d| d.slides.as_slice())
    }

    pub fn current_slide_index(&self) -> Option<usize> {
        self.draft.as_ref().map(|d| d.current)
    }

    pub fn current_slide(&self) -> Option<&Slide> {
        self.draft.as_ref().and_then(|d| d.slides.get(d.current))
    }

    pub fn ticket(&self) -> Option<SessionTicket> {
        self.draft.as_ref().map(|_| SessionTicket(self.generation))
    }

    pub fn is_current(&self, ticket: SessionTicket) -> bool {
        self.draft.is_some() && ticket.0 == self.generation
    }

    /// Start editing the cell at `(row, col)` of `board`
    ///
    /// Refused while another draft is open or when the cell does not exist.
    pub fn open(&mut self, board: &Board, row: usize, col: usize) -> bool {
        if self.draft.is_some() {
            log::warn!("Edit session already open on {:?}", self.target());
            return false;
        }
        let Some(cell) = board.cell(row, col) else {
            return false;
        };

        let mut slides = cell.slides.clone();
        if slides.is_empty() {
            slides.push(Slide::with_default_text());
        }
        let rekeyed: usize = slides.iter_mut().map(Slide::rekey_elements).sum();
        if rekeyed > 0 {
            log::warn!("Assigned ids to {} elements of {}", rekeyed, cell.key());
        }

        self.generation += 1;
        self.draft = Some(Draft {
            board_id: board.id.clone(),
            key: cell.key(),
            slides,
            current: 0,
            dirty: false,
        });
        log::debug!("Edit session {} opened on {}", self.generation, cell.key());
        true
    }

    /// Apply `f` to the draft; a `Some` result marks it dirty
    fn edit<R>(&mut self, f: impl FnOnce(&mut Draft) -> Option<R>) -> Option<R> {
        let draft = self.draft.as_mut()?;
        let result = f(draft);
        if result.is_some() {
            draft.dirty = true;
        }
        result
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn set_current_slide(&mut self, index: usize) -> bool {
        match self.draft.as_mut() {
            Some(draft) if index < draft.slides.len() => {
                draft.current = index;
                true
            }
            _ => false,
        }
    }

    pub fn next_slide(&mut self) -> bool {
        match self.current_slide_index() {
            Some(current) => self.set_current_slide(current + 1),
            None => false,
        }
    }

    pub fn previous_slide(&mut self) -> bool {
        match self.current_slide_index() {
            Some(current) if current > 0 => self.set_current_slide(current - 1),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Slides
    // ------------------------------------------------------------------

    /// Insert a default slide after `after_index` (clamped) and make it current
    pub fn add_slide(&mut self, after_index: usize) -> Option<usize> {
        self.edit(|draft| {
            let index = (after_index + 1).min(draft.slides.len());
            draft.slides.insert(index, Slide::with_default_text());
            draft.current = index;
            Some(index)
        })
    }

    /// Remove a slide; the last remaining slide cannot be removed
    pub fn remove_slide(&mut self, index: usize) -> bool {
        self.edit(|draft| {
            if draft.slides.len() <= 1 || index >= draft.slides.len() {
                return None;
            }
            draft.slides.remove(index);
            if draft.current >= draft.slides.len() {
                draft.current = draft.slides.len() - 1;
            }
            Some(())
        })
        .is_some()
    }

    // ------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------

    /// Append `element` to a slide under a fresh id
    pub fn add_element(&mut self, slide: usize, element: Element) -> Option<String> {
        self.edit(|draft| Some(draft.slide_mut(slide)?.push_element(element)))
    }

    /// Append an empty text box
    pub fn add_text_element(&mut self, slide: usize) -> Option<String> {
        self.add_element(slide, Element::text(100.0, 100.0, 200.0, 100.0))
    }

    /// Merge `patch` into an element; an empty patch only reports whether
    /// the element exists and leaves the draft clean
    pub fn update_element(&mut self, slide: usize, id: &str, patch: &ElementPatch) -> bool {
        if patch.is_empty() {
            return self
                .slides()
                .and_then(|slides| slides.get(slide))
                .is_some_and(|s| s.element(id).is_some());
        }
        self.edit(|draft| {
            draft
                .slide_mut(slide)?
                .update_element(id, patch)
                .then_some(())
        })
        .is_some()
    }

    pub fn remove_element(&mut self, slide: usize, id: &str) -> bool {
        self.edit(|draft| draft.slide_mut(slide)?.remove_element(id).then_some(()))
            .is_some()
    }

    /// Grow or shrink a text element's font; returns the new size
    pub fn adjust_font_size(&mut self, slide: usize, id: &str, delta: f64) -> Option<f64> {
        self.edit(|draft| {
            let element = draft.slide_mut(slide)?.element_mut(id)?;
            Some(element.adjust_font_size(delta))
        })
    }

    /// A+ control
    pub fn increase_font_size(&mut self, slide: usize, id: &str) -> Option<f64> {
        self.adjust_font_size(slide, id, FONT_SIZE_STEP)
    }

    /// A- control
    pub fn decrease_font_size(&mut self, slide: usize, id: &str) -> Option<f64> {
        self.adjust_font_size(slide, id, -FONT_SIZE_STEP)
    }

    // ------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------

    fn pending(&self, slide: usize, kind: MediaKind, size: f64) -> Result<PendingMedia, UploadError> {
        let draft = self.draft.as_ref().ok_or(UploadError::NotEditing)?;
        if slide >= draft.slides.len() {
            return Err(UploadError::NoSuchSlide(slide));
        }
        Ok(PendingMedia {
            ticket: SessionTicket(self.generation),
            slide,
            kind,
            size,
        })
    }

    /// Check an upload of `len` bytes against the session and the policy
    ///
    /// Nothing may be written to the store unless this succeeds.
    pub fn prepare_upload(&self, slide: usize, mime: &str, len: u64) -> Result<PendingMedia, UploadError> {
        if !self.is_editing() {
            return Err(UploadError::NotEditing);
        }
        let kind = check_upload(mime, len)?;
        self.pending(slide, kind, 200.0)
    }

    /// Like `prepare_upload`, for clipboard images
    pub fn prepare_paste(&self, slide: usize, mime: &str, len: u64) -> Result<PendingMedia, UploadError> {
        if !self.is_editing() {
            return Err(UploadError::NotEditing);
        }
        let kind = check_paste(mime, len)?;
        self.pending(slide, kind, 300.0)
    }

    /// Add an element referencing the stored blob `media_id` at (50, 50)
    pub fn place_media(&mut self, pending: &PendingMedia, media_id: &str) -> Result<String, UploadError> {
        if !self.is_current(pending.ticket) {
            log::warn!("Media {} finished after its edit session closed", media_id);
            return Err(UploadError::SessionClosed);
        }
        let element = Element::media(
            pending.kind.element_kind(),
            stored_ref(media_id),
            50.0,
            50.0,
            pending.size,
            pending.size,
        );
        self.add_element(pending.slide, element)
            .ok_or(UploadError::NoSuchSlide(pending.slide))
    }

    /// Validate and store an uploaded file, then place it on `slide`
    ///
    /// Nothing is written to the store unless the session is open, the slide
    /// exists and the upload passes the policy.
    pub fn upload_media<S: MediaStore>(
        &mut self,
        library: &mut MediaLibrary<S>,
        slide: usize,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let pending = self.prepare_upload(slide, mime, bytes.len() as u64)?;
        let media_id = library.save_new(MediaBlob::new(mime, bytes))?;
        self.place_media(&pending, &media_id)
    }

    /// Store a pasted image (any `image/*` type) and place it on `slide`
    pub fn paste_image<S: MediaStore>(
        &mut self,
        library: &mut MediaLibrary<S>,
        slide: usize,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<String, UploadError> {
        let pending = self.prepare_paste(slide, mime, bytes.len() as u64)?;
        let media_id = library.save_new(MediaBlob::new(mime, bytes))?;
        let id = self.place_media(&pending, &media_id)?;
        log::info!("Image pasted successfully: {}", media_id);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Commit / discard
    // ------------------------------------------------------------------

    /// Write the draft into the registry's active board and return to idle
    pub fn commit(&mut self, registry: &mut BoardRegistry) -> CommitOutcome {
        let Some(draft) = self.draft.take() else {
            return CommitOutcome::NotEditing;
        };

        let live = if registry.active_id() == draft.board_id {
            registry.active().cell(draft.key.row, draft.key.col).cloned()
        } else {
            None
        };
        let Some(mut cell) = live else {
            log::warn!(
                "Stale commit: cell {} of board {} no longer exists, draft dropped",
                draft.key,
                draft.board_id
            );
            return CommitOutcome::Stale(draft.key);
        };

        cell.slides = draft.slides;
        if registry.update_cell(cell) {
            log::info!("Committed cell {}", draft.key);
            CommitOutcome::Committed(draft.key)
        } else {
            CommitOutcome::Stale(draft.key)
        }
    }

    /// Drop the draft without touching the board
    pub fn discard(&mut self) -> bool {
        let discarded = self.draft.take();
        if let Some(draft) = &discarded {
            log::debug!("Discarded draft for {} (dirty: {})", draft.key, draft.dirty);
        }
        discarded.is_some()
    }

    /// Close unless there are unsaved edits
    pub fn request_close(&mut self) -> CloseOutcome {
        if self.is_dirty() {
            return CloseOutcome::ConfirmDiscard;
        }
        self.draft = None;
        CloseOutcome::Closed
    }
}
