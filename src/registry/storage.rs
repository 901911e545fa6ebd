//! Durable key/value storage for the board collection
//!
//! The registry serializes itself to JSON strings and writes them under fixed
//! keys, the same shape as browser `localStorage`. Backends:
//!
//! - `MemoryStorage`: shared in-process map (tests, headless hosts)
//! - `FileStorage`: one JSON file per key in a directory (native builds)
//! - `LocalStorage`: the browser's `window.localStorage` (wasm32 builds)

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StorageError;

pub trait BoardStorage {
    /// Value stored under `key`, if any
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage; clones share the same entries
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl BoardStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::BoardStorage;
    use crate::error::StorageError;

    /// One `<key>.json` file per key under a directory
    #[derive(Clone, Debug)]
    pub struct FileStorage {
        dir: PathBuf,
    }

    impl FileStorage {
        pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
            let dir = dir.into();
            fs::create_dir_all(&dir)?;
            Ok(Self { dir })
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }

        fn path_for(&self, key: &str) -> PathBuf {
            self.dir.join(format!("{}.json", key))
        }
    }

    impl BoardStorage for FileStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            match fs::read_to_string(self.path_for(key)) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            let path = self.path_for(key);
            let staging = path.with_extension("json.tmp");
            fs::write(&staging, value)?;
            fs::rename(&staging, &path)?;
            Ok(())
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::BoardStorage;
    use crate::error::StorageError;

    /// `window.localStorage`
    pub struct LocalStorage {
        storage: web_sys::Storage,
    }

    impl LocalStorage {
        pub fn open() -> Result<Self, StorageError> {
            let window = web_sys::window()
                .ok_or_else(|| StorageError::Unavailable("no global window".to_string()))?;
            let storage = window
                .local_storage()
                .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))?
                .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;
            Ok(Self { storage })
        }
    }

    impl BoardStorage for LocalStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.storage
                .get_item(key)
                .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.storage
                .set_item(key, value)
                .map_err(|e| StorageError::Unavailable(format!("{:?}", e)))
        }
    }
}
