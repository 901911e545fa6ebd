#![cfg(not(target_arch = "wasm32"))]

use std::cell::Cell as Counter;
use std::rc::Rc;

use trivia_board_wasm::api::BoardEditor;
use trivia_board_wasm::config::BoardConfig;
use trivia_board_wasm::error::{MediaError, PolicyViolation, UploadError};
use trivia_board_wasm::media::{
    stored_ref, FsMediaStore, MediaBlob, MediaLibrary, MediaStore, MediaView, MemoryMediaStore,
};
use trivia_board_wasm::models::ElementKind;
use trivia_board_wasm::registry::{BoardRegistry, FileStorage};
use trivia_board_wasm::session::EditSession;

const MB: usize = 1024 * 1024;

/// Memory store that counts writes
struct CountingStore {
    inner: MemoryMediaStore,
    puts: Rc<Counter<usize>>,
}

impl MediaStore for CountingStore {
    fn put(&mut self, id: &str, blob: MediaBlob) -> Result<(), MediaError> {
        self.puts.set(self.puts.get() + 1);
        self.inner.put(id, blob)
    }

    fn fetch(&self, id: &str) -> Result<Option<MediaBlob>, MediaError> {
        self.inner.fetch(id)
    }

    fn remove(&mut self, id: &str) -> Result<(), MediaError> {
        self.inner.remove(id)
    }

    fn ids(&self) -> Result<Vec<String>, MediaError> {
        self.inner.ids()
    }
}

fn counting_library() -> (MediaLibrary<CountingStore>, Rc<Counter<usize>>) {
    let puts = Rc::new(Counter::new(0));
    let store = CountingStore {
        inner: MemoryMediaStore::new(),
        puts: Rc::clone(&puts),
    };
    (MediaLibrary::new(store), puts)
}

fn roundtrip<S: MediaStore>(library: &mut MediaLibrary<S>) {
    let bytes: Vec<u8> = (0..=255).collect();
    library
        .save("clip-1", MediaBlob::new("audio/mpeg", bytes.clone()))
        .unwrap();

    let first = library.get("clip-1").unwrap().unwrap();
    let second = library.get("clip-1").unwrap().unwrap();
    assert_ne!(first.url(), second.url());
    assert_eq!(first.media_id(), second.media_id());

    let blob = library.handles().dereference(first.url()).unwrap();
    assert_eq!(blob.bytes, bytes);
    assert_eq!(blob.mime, "audio/mpeg");
    assert_eq!(library.total_size().unwrap(), 256);

    library.delete("clip-1").unwrap();
    assert!(library.get("clip-1").unwrap().is_none());
    assert!(!library.exists("clip-1").unwrap());
}

#[test]
fn test_memory_store_roundtrip() {
    roundtrip(&mut MediaLibrary::new(MemoryMediaStore::new()));
}

#[test]
fn test_fs_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    roundtrip(&mut MediaLibrary::new(FsMediaStore::open(dir.path()).unwrap()));
}

#[test]
fn test_fs_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let mut library = MediaLibrary::new(FsMediaStore::open(dir.path()).unwrap());
        library.save_new(MediaBlob::new("image/webp", vec![9; 10])).unwrap()
    };

    let library = MediaLibrary::new(FsMediaStore::open(dir.path()).unwrap());
    assert_eq!(library.list_ids().unwrap(), vec![id.clone()]);
    let handle = library.get(&id).unwrap().unwrap();
    assert_eq!(library.handles().dereference(handle.url()).unwrap().bytes, vec![9; 10]);
}

#[test]
fn test_oversized_image_is_rejected_before_the_store() {
    let registry = BoardRegistry::in_memory(BoardConfig::default());
    let (mut library, puts) = counting_library();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);
    let draft_before = session.slides().unwrap().to_vec();
    let board_before = registry.active().clone();

    let result = session.upload_media(&mut library, 0, "image/png", vec![0; 40 * MB]);

    match result {
        Err(UploadError::Policy(violation)) => {
            assert_eq!(violation.to_string(), "File too large. Max for image: 30MB");
        }
        other => panic!("expected a policy violation, got {:?}", other),
    }
    assert_eq!(puts.get(), 0);
    assert_eq!(session.slides().unwrap(), draft_before.as_slice());
    assert!(!session.is_dirty());

    assert!(session.discard());
    assert_eq!(registry.active(), &board_before);
}

#[test]
fn test_unsupported_type_is_rejected_before_the_store() {
    let registry = BoardRegistry::in_memory(BoardConfig::default());
    let (mut library, puts) = counting_library();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);

    let result = session.upload_media(&mut library, 0, "application/pdf", vec![1, 2, 3]);
    assert!(matches!(
        result,
        Err(UploadError::Policy(PolicyViolation::UnsupportedType(_)))
    ));
    assert_eq!(puts.get(), 0);
}

#[test]
fn test_upload_places_a_stored_reference() {
    let mut registry = BoardRegistry::in_memory(BoardConfig::default());
    let (mut library, puts) = counting_library();
    let mut session = EditSession::new();
    session.open(registry.active(), 1, 2);

    let element_id = session
        .upload_media(&mut library, 0, "video/mp4", vec![7; 1024])
        .unwrap();
    assert_eq!(puts.get(), 1);

    let element = session.slides().unwrap()[0].element(&element_id).unwrap().clone();
    assert_eq!(element.kind, ElementKind::Video);
    assert_eq!((element.x, element.y, element.width, element.height), (50.0, 50.0, 200.0, 200.0));

    let media_id = library.list_ids().unwrap().remove(0);
    assert_eq!(element.content, stored_ref(&media_id));

    session.commit(&mut registry);
    let committed = &registry.active().cell(1, 2).unwrap().slides[0];
    assert!(committed.element(&element_id).is_some());
}

#[test]
fn test_paste_accepts_images_only() {
    let registry = BoardRegistry::in_memory(BoardConfig::default());
    let (mut library, puts) = counting_library();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);

    assert!(session
        .paste_image(&mut library, 0, "audio/wav", vec![1])
        .is_err());
    assert_eq!(puts.get(), 0);

    let id = session
        .paste_image(&mut library, 0, "image/gif", vec![1])
        .unwrap();
    let element = session.slides().unwrap()[0].element(&id).unwrap();
    assert_eq!(element.kind, ElementKind::Image);
    assert_eq!((element.width, element.height), (300.0, 300.0));
}

#[test]
fn test_paste_takes_image_types_outside_the_upload_list() {
    let registry = BoardRegistry::in_memory(BoardConfig::default());
    let (mut library, puts) = counting_library();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);

    for mime in ["image/bmp", "image/svg+xml"] {
        let id = session.paste_image(&mut library, 0, mime, vec![1, 2]).unwrap();
        let element = session.slides().unwrap()[0].element(&id).unwrap();
        assert_eq!(element.kind, ElementKind::Image, "{}", mime);
    }
    assert_eq!(puts.get(), 2);

    // The upload path keeps its allowlist
    assert!(matches!(
        session.upload_media(&mut library, 0, "image/bmp", vec![1]),
        Err(UploadError::Policy(PolicyViolation::UnsupportedType(_)))
    ));
    assert_eq!(puts.get(), 2);
}

#[test]
fn test_editor_media_survives_reopen_on_disk() {
    let boards = tempfile::tempdir().unwrap();
    let blobs = tempfile::tempdir().unwrap();
    let open_editor = || {
        BoardEditor::with_storage(
            Box::new(FileStorage::open(boards.path()).unwrap()),
            Box::new(FsMediaStore::open(blobs.path()).unwrap()),
            BoardConfig::default(),
        )
    };

    let element_id = {
        let mut editor = open_editor();
        assert!(editor.open_cell(0, 0));
        let id = editor.upload_media(0, "image/png", vec![5; 64]).unwrap();
        assert_eq!(editor.commit(), "committed");
        id
    };

    let editor = open_editor();
    let slide = &editor.registry().active().cell(0, 0).unwrap().slides[0];
    let content = slide.element(&element_id).unwrap().content.clone();
    let media_id = content.strip_prefix("idb://").unwrap();

    assert_eq!(editor.list_media_ids().unwrap(), vec![media_id.to_string()]);
    assert!(editor.media_exists(media_id).unwrap());
    match editor.resolve_media(&content) {
        MediaView::Stored(handle) => assert_eq!(handle.media_id(), media_id),
        other => panic!("expected a stored view, got {:?}", other),
    }
    assert_eq!(editor.media_total_size().unwrap(), 64);
}

#[test]
fn test_placement_after_session_change_is_refused() {
    let registry = BoardRegistry::in_memory(BoardConfig::default());
    let (mut library, _) = counting_library();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);

    let pending = session.prepare_paste(0, "image/png", 3).unwrap();
    let media_id = library.save_new(MediaBlob::new("image/png", vec![1, 2, 3])).unwrap();
    session.discard();

    assert!(matches!(
        session.place_media(&pending, &media_id),
        Err(UploadError::SessionClosed)
    ));
    session.open(registry.active(), 0, 0);
    assert!(matches!(
        session.place_media(&pending, &media_id),
        Err(UploadError::SessionClosed)
    ));
    assert!(!session.is_dirty());
}

#[test]
fn test_upload_without_open_session() {
    let (mut library, puts) = counting_library();
    let mut session = EditSession::new();

    let result = session.upload_media(&mut library, 0, "image/png", vec![1]);
    assert!(matches!(result, Err(UploadError::NotEditing)));
    assert_eq!(puts.get(), 0);
}

#[test]
fn test_dropped_handles_are_revoked_and_detached_ones_are_not() {
    let mut library = MediaLibrary::new(MemoryMediaStore::new());
    let id = library.save_new(MediaBlob::new("image/png", vec![1, 2, 3])).unwrap();

    let scoped = library.get(&id).unwrap().unwrap();
    let scoped_url = scoped.url().to_string();
    let detached = library.get(&id).unwrap().unwrap().detach();
    assert_eq!(library.handles().live_count_for(&id), 2);

    drop(scoped);
    assert!(!library.handles().is_live(&scoped_url));
    assert!(library.handles().is_live(&detached));

    assert!(library.handles().release(&detached));
    assert!(!library.handles().release(&detached));
    assert_eq!(library.handles().live_count(), 0);
}
