//! Blob store backends

use std::collections::BTreeMap;

use crate::error::MediaError;

/// A stored payload and its declared MIME type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl MediaBlob {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Keyed binary storage
///
/// Backends do no validation of size or type; callers check the upload
/// policy before writing. Each id has a single writer.
pub trait MediaStore {
    /// Store `blob` under `id`, replacing any previous payload
    fn put(&mut self, id: &str, blob: MediaBlob) -> Result<(), MediaError>;

    /// Read the payload stored under `id`
    fn fetch(&self, id: &str) -> Result<Option<MediaBlob>, MediaError>;

    /// Remove `id`; removing a missing id is not an error
    fn remove(&mut self, id: &str) -> Result<(), MediaError>;

    /// All stored ids, sorted
    fn ids(&self) -> Result<Vec<String>, MediaError>;

    fn contains(&self, id: &str) -> Result<bool, MediaError> {
        Ok(self.fetch(id)?.is_some())
    }

    /// Sum of stored payload sizes in bytes
    fn total_size(&self) -> Result<u64, MediaError> {
        let mut total = 0;
        for id in self.ids()? {
            if let Some(blob) = self.fetch(&id)? {
                total += blob.size();
            }
        }
        Ok(total)
    }

    fn clear(&mut self) -> Result<(), MediaError> {
        for id in self.ids()? {
            self.remove(&id)?;
        }
        Ok(())
    }
}

/// Lets hosts pick the backend at runtime (`Box<dyn MediaStore>`)
impl<S: MediaStore + ?Sized> MediaStore for Box<S> {
    fn put(&mut self, id: &str, blob: MediaBlob) -> Result<(), MediaError> {
        (**self).put(id, blob)
    }

    fn fetch(&self, id: &str) -> Result<Option<MediaBlob>, MediaError> {
        (**self).fetch(id)
    }

    fn remove(&mut self, id: &str) -> Result<(), MediaError> {
        (**self).remove(id)
    }

    fn ids(&self) -> Result<Vec<String>, MediaError> {
        (**self).ids()
    }

    fn contains(&self, id: &str) -> Result<bool, MediaError> {
        (**self).contains(id)
    }

    fn total_size(&self) -> Result<u64, MediaError> {
        (**self).total_size()
    }

    fn clear(&mut self) -> Result<(), MediaError> {
        (**self).clear()
    }
}

/// Process-local store, used by tests and by hosts without durable storage
#[derive(Clone, Debug, Default)]
pub struct MemoryMediaStore {
    blobs: BTreeMap<String, MediaBlob>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl MediaStore for MemoryMediaStore {
    fn put(&mut self, id: &str, blob: MediaBlob) -> Result<(), MediaError> {
        self.blobs.insert(id.to_string(), blob);
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<MediaBlob>, MediaError> {
        Ok(self.blobs.get(id).cloned())
    }

    fn remove(&mut self, id: &str) -> Result<(), MediaError> {
        self.blobs.remove(id);
        Ok(())
    }

    fn ids(&self) -> Result<Vec<String>, MediaError> {
        Ok(self.blobs.keys().cloned().collect())
    }

    fn contains(&self, id: &str) -> Result<bool, MediaError> {
        Ok(self.blobs.contains_key(id))
    }

    fn total_size(&self) -> Result<u64, MediaError> {
        Ok(self.blobs.values().map(MediaBlob::size).sum())
    }

    fn clear(&mut self) -> Result<(), MediaError> {
        self.blobs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basics() {
        let mut store = MemoryMediaStore::new();
        store.put("b", MediaBlob::new("image/png", vec![1, 2, 3])).unwrap();
        store.put("a", MediaBlob::new("audio/ogg", vec![4])).unwrap();

        assert_eq!(store.ids().unwrap(), vec!["a", "b"]);
        assert_eq!(store.total_size().unwrap(), 4);
        assert!(store.contains("a").unwrap());

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(!store.contains("a").unwrap());
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(store.is_empty());
    }
}
