//! Media storage for slide elements
//!
//! Large payloads (images, audio, video) never live inside the serialized
//! board. They are saved in a `MediaStore` under a generated id, and the
//! element's `content` holds a `idb://<id>` reference. At render time the
//! reference is resolved into a transient handle that its holder must
//! release.
//!
//! # Module Structure
//!
//! - `store`: the `MediaStore` backend trait and the in-memory backend
//! - `fs_store`: directory-backed backend (native builds)
//! - `idb_store`: IndexedDB backend and async library (browser builds)
//! - `handles`: transient dereferenceable handles and their registry
//! - `library`: the store plus handle registry, as used by the editor
//! - `policy`: upload type/size policy
//! - `reference`: parsing element content into direct or stored references

pub mod handles;
pub mod library;
pub mod policy;
pub mod reference;
pub mod store;

#[cfg(not(target_arch = "wasm32"))]
pub mod fs_store;

#[cfg(target_arch = "wasm32")]
pub mod idb_store;

pub use handles::{HandleRegistry, MediaHandle};
pub use library::{new_media_id, MediaLibrary};
pub use policy::{check_paste, check_upload, MediaKind};
pub use reference::{stored_ref, MediaRef, MediaView, MEDIA_REF_PREFIX};
pub use store::{MediaBlob, MediaStore, MemoryMediaStore};

#[cfg(not(target_arch = "wasm32"))]
pub use fs_store::FsMediaStore;

#[cfg(target_arch = "wasm32")]
pub use idb_store::{IdbMediaLibrary, IdbMediaStore};
