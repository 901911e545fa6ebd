//! Directory-backed media store
//!
//! Each blob is two files under the root: `<id>.bin` with the payload and
//! `<id>.mime` with the declared type. Both are written to `.tmp` staging
//! files before either is renamed into place, payload first. A failed write
//! leaves no sidecar and no partial payload behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::store::{MediaBlob, MediaStore};
use crate::error::MediaError;

const PAYLOAD_EXT: &str = "bin";
const MIME_EXT: &str = "mime";
const STAGING_EXT: &str = "tmp";
const FALLBACK_MIME: &str = "application/octet-stream";

pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, MediaError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn payload_path(&self, id: &str) -> Result<PathBuf, MediaError> {
        validate_id(id)?;
        Ok(self.root.join(format!("{}.{}", id, PAYLOAD_EXT)))
    }

    fn mime_path(&self, id: &str) -> Result<PathBuf, MediaError> {
        validate_id(id)?;
        Ok(self.root.join(format!("{}.{}", id, MIME_EXT)))
    }
}

/// Ids become file names, so only a safe character set is accepted
fn validate_id(id: &str) -> Result<(), MediaError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(MediaError::InvalidId(id.to_string()))
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(STAGING_EXT);
    PathBuf::from(name)
}

/// Write `bytes` next to `path` without touching `path` itself
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf, MediaError> {
    let staging = staging_path(path);
    if let Err(e) = fs::write(&staging, bytes) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(staging)
}

fn remove_if_present(path: &Path) -> Result<(), MediaError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl MediaStore for FsMediaStore {
    fn put(&mut self, id: &str, blob: MediaBlob) -> Result<(), MediaError> {
        let payload = self.payload_path(id)?;
        let mime = self.mime_path(id)?;

        let staged_payload = stage(&payload, &blob.bytes)?;
        let staged_mime = match stage(&mime, blob.mime.as_bytes()) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&staged_payload);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staged_payload, &payload) {
            let _ = fs::remove_file(&staged_payload);
            let _ = fs::remove_file(&staged_mime);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&staged_mime, &mime) {
            let _ = fs::remove_file(&staged_mime);
            let _ = fs::remove_file(&payload);
            return Err(e.into());
        }
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<MediaBlob>, MediaError> {
        let bytes = match fs::read(self.payload_path(id)?) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mime = match fs::read_to_string(self.mime_path(id)?) {
            Ok(mime) => mime.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => FALLBACK_MIME.to_string(),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(MediaBlob { mime, bytes }))
    }

    fn remove(&mut self, id: &str) -> Result<(), MediaError> {
        remove_if_present(&self.payload_path(id)?)?;
        remove_if_present(&self.mime_path(id)?)
    }

    fn ids(&self) -> Result<Vec<String>, MediaError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PAYLOAD_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn contains(&self, id: &str) -> Result<bool, MediaError> {
        Ok(self.payload_path(id)?.is_file())
    }

    fn total_size(&self) -> Result<u64, MediaError> {
        let mut total = 0;
        for id in self.ids()? {
            total += fs::metadata(self.payload_path(&id)?)?.len();
        }
        Ok(total)
    }
}
