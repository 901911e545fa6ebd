//! Upload policy: which MIME types are accepted and how large they may be

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PolicyViolation;
use crate::models::ElementKind;

const MB: u64 = 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];
const AUDIO_TYPES: &[&str] = &["audio/mpeg", "audio/wav", "audio/ogg"];
const VIDEO_TYPES: &[&str] = &["video/mp4", "video/webm"];

/// Category of an accepted media upload
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Audio, MediaKind::Video];

    /// Largest accepted payload for this kind
    pub fn max_bytes(&self) -> u64 {
        match self {
            MediaKind::Image => 30 * MB,
            MediaKind::Audio | MediaKind::Video => 100 * MB,
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => IMAGE_TYPES,
            MediaKind::Audio => AUDIO_TYPES,
            MediaKind::Video => VIDEO_TYPES,
        }
    }

    /// Classify a MIME type; parameters (`; charset=...`) and case are ignored
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.allowed_mime_types().contains(&essence.as_str()))
    }

    /// Element kind used to render media of this kind
    pub fn element_kind(&self) -> ElementKind {
        match self {
            MediaKind::Image => ElementKind::Image,
            MediaKind::Audio => ElementKind::Audio,
            MediaKind::Video => ElementKind::Video,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check an upload against the policy before anything is written
pub fn check_upload(mime: &str, size: u64) -> Result<MediaKind, PolicyViolation> {
    let kind = MediaKind::from_mime(mime)
        .ok_or_else(|| PolicyViolation::UnsupportedType(mime.to_string()))?;

    if size > kind.max_bytes() {
        return Err(PolicyViolation::TooLarge {
            kind,
            size,
            max_mb: kind.max_bytes() / MB,
        });
    }

    Ok(kind)
}

/// Check a clipboard image before anything is written
///
/// Pastes accept any `image/*` type, not just the upload allowlist, under the
/// image size cap.
pub fn check_paste(mime: &str, size: u64) -> Result<MediaKind, PolicyViolation> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    let subtype = essence.strip_prefix("image/").unwrap_or("");
    if subtype.is_empty() {
        return Err(PolicyViolation::UnsupportedType(mime.to_string()));
    }

    let kind = MediaKind::Image;
    if size > kind.max_bytes() {
        return Err(PolicyViolation::TooLarge {
            kind,
            size,
            max_mb: kind.max_bytes() / MB,
        });
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowed_types() {
        assert_eq!(check_upload("image/png", 10), Ok(MediaKind::Image));
        assert_eq!(check_upload("audio/mpeg", 10), Ok(MediaKind::Audio));
        assert_eq!(check_upload("video/mp4", 10), Ok(MediaKind::Video));
        assert_eq!(check_upload("Image/JPEG; foo=bar", 10), Ok(MediaKind::Image));
    }

    #[test]
    fn test_rejects_unknown_types() {
        assert!(matches!(
            check_upload("image/svg+xml", 10),
            Err(PolicyViolation::UnsupportedType(_))
        ));
        assert!(matches!(
            check_upload("", 0),
            Err(PolicyViolation::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_size_limits_are_inclusive() {
        assert!(check_upload("image/gif", 30 * MB).is_ok());
        assert_eq!(
            check_upload("image/gif", 30 * MB + 1),
            Err(PolicyViolation::TooLarge {
                kind: MediaKind::Image,
                size: 30 * MB + 1,
                max_mb: 30,
            })
        );
        assert!(check_upload("video/webm", 100 * MB).is_ok());
        assert!(check_upload("audio/wav", 100 * MB + 1).is_err());
    }

    #[test]
    fn test_paste_accepts_any_image_subtype() {
        assert_eq!(check_paste("image/bmp", 10), Ok(MediaKind::Image));
        assert_eq!(check_paste("IMAGE/SVG+XML", 10), Ok(MediaKind::Image));
        assert_eq!(check_paste("image/png", 30 * MB), Ok(MediaKind::Image));
    }

    #[test]
    fn test_paste_rejects_non_images_and_oversize() {
        for mime in ["audio/wav", "video/mp4", "image/", "text/plain", ""] {
            assert!(
                matches!(check_paste(mime, 1), Err(PolicyViolation::UnsupportedType(_))),
                "mime {:?}",
                mime
            );
        }
        assert!(matches!(
            check_paste("image/tiff", 30 * MB + 1),
            Err(PolicyViolation::TooLarge { max_mb: 30, .. })
        ));
    }
}
