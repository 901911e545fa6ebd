//! Element content references
//!
//! A media element's `content` is either something a renderer can use as-is
//! (an http URL, a data URI) or a store reference `idb://<media id>`. Only
//! store references touch the media store.

use super::handles::MediaHandle;

/// Prefix marking a reference into the media store
pub const MEDIA_REF_PREFIX: &str = "idb://";

/// Build the content string for a stored blob
pub fn stored_ref(media_id: &str) -> String {
    format!("{}{}", MEDIA_REF_PREFIX, media_id)
}

/// Parsed form of a media element's content
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaRef<'a> {
    /// Renderable as-is
    Direct(&'a str),

    /// Id of a blob in the media store
    Stored(&'a str),
}

impl<'a> MediaRef<'a> {
    pub fn parse(content: &'a str) -> Self {
        match content.strip_prefix(MEDIA_REF_PREFIX) {
            Some(id) => MediaRef::Stored(id),
            None => MediaRef::Direct(content),
        }
    }

    pub fn media_id(&self) -> Option<&'a str> {
        match self {
            MediaRef::Stored(id) => Some(id),
            MediaRef::Direct(_) => None,
        }
    }
}

/// What a renderer should show for a media element
#[derive(Debug)]
pub enum MediaView {
    /// Content used directly as the source
    Direct(String),

    /// Stored blob behind a live handle; dropping the view revokes it
    Stored(MediaHandle),

    /// Blob missing or unreadable; render a failure placeholder
    Failed { media_id: String, reason: String },
}

impl MediaView {
    /// Source URL to render, if any
    pub fn source(&self) -> Option<&str> {
        match self {
            MediaView::Direct(url) => Some(url),
            MediaView::Stored(handle) => Some(handle.url()),
            MediaView::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MediaView::Failed { .. })
    }
}
