use trivia_board_wasm::config::BoardConfig;
use trivia_board_wasm::models::{CellKey, Element, ElementKind, ElementPatch, Slide};
use trivia_board_wasm::registry::BoardRegistry;
use trivia_board_wasm::session::{CloseOutcome, CommitOutcome, EditSession};

fn registry() -> BoardRegistry {
    BoardRegistry::in_memory(BoardConfig::default())
}

/// Put a recognisable marker into the first slide of a cell
fn tag_cell(registry: &mut BoardRegistry, row: usize, col: usize) {
    let mut cell = registry.active().cell(row, col).unwrap().clone();
    let mut text = Element::text(0.0, 0.0, 10.0, 10.0);
    text.content = format!("r{}c{}", row, col);
    cell.slides = vec![Slide { elements: vec![text] }];
    assert!(registry.update_cell(cell));
}

fn first_content(registry: &BoardRegistry, row: usize, col: usize) -> String {
    registry.active().cell(row, col).unwrap().slides[0].elements[0].content.clone()
}

#[test]
fn test_close_without_commit_keeps_original_elements() {
    let registry = registry();
    let original = registry.active().cell(1, 1).unwrap().clone();
    let mut session = EditSession::new();

    assert!(session.open(registry.active(), 1, 1));
    session.add_text_element(0).unwrap();
    assert_eq!(session.request_close(), CloseOutcome::ConfirmDiscard);
    session.discard();

    assert!(session.open(registry.active(), 1, 1));
    let slides = session.slides().unwrap();
    assert_eq!(slides, original.slides.as_slice());
    assert!(!session.is_dirty());
}

#[test]
fn test_draft_edits_never_reach_the_board_before_commit() {
    let registry = registry();
    let before = registry.active().clone();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);

    let first_id = session.slides().unwrap()[0].elements[0].id.clone();
    session.update_element(0, &first_id, &ElementPatch::content("What is Rust?"));
    session.add_slide(0);
    session.add_text_element(1);
    session.adjust_font_size(0, &first_id, 4.0);
    session.remove_slide(0);

    assert!(session.is_dirty());
    assert_eq!(registry.active(), &before);
}

#[test]
fn test_commit_writes_draft_and_advances_updated_at() {
    let mut registry = registry();
    let stamp = registry.active().updated_at;
    let mut session = EditSession::new();
    session.open(registry.active(), 2, 3);

    let first_id = session.slides().unwrap()[0].elements[0].id.clone();
    session.update_element(0, &first_id, &ElementPatch::content("Answer"));
    session.add_slide(0);
    let draft = session.slides().unwrap().to_vec();

    assert_eq!(session.commit(&mut registry), CommitOutcome::Committed(CellKey::new(2, 3)));
    assert!(!session.is_editing());

    let board = registry.active();
    assert_eq!(board.cell(2, 3).unwrap().slides, draft);
    assert_eq!(board.cell(2, 3).unwrap().slides[0].elements[0].content, "Answer");
    assert!(board.updated_at > stamp);
}

#[test]
fn test_commit_is_stale_after_edited_row_is_removed() {
    let mut registry = registry();
    let mut session = EditSession::new();
    session.open(registry.active(), 4, 0);
    session.add_text_element(0);

    assert!(registry.remove_row());
    let before = registry.active().clone();

    assert_eq!(session.commit(&mut registry), CommitOutcome::Stale(CellKey::new(4, 0)));
    assert!(!session.is_editing());
    assert_eq!(registry.active(), &before);
}

#[test]
fn test_commit_follows_position_after_row_inserted_above() {
    let mut registry = registry();
    tag_cell(&mut registry, 1, 0);
    tag_cell(&mut registry, 2, 0);

    let mut session = EditSession::new();
    session.open(registry.active(), 2, 0);
    let id = session.slides().unwrap()[0].elements[0].id.clone();
    session.update_element(0, &id, &ElementPatch::content("draft"));

    registry.add_row_at(0);

    // The draft lands on whatever cell now sits at (2, 0): the former (1, 0)
    assert_eq!(session.commit(&mut registry), CommitOutcome::Committed(CellKey::new(2, 0)));
    let target = registry.active().cell(2, 0).unwrap();
    assert_eq!(target.slides[0].elements[0].content, "draft");
    assert_eq!(target.points, 200);

    // The cell that was opened moved down and is untouched
    let moved = registry.active().cell(3, 0).unwrap();
    assert_eq!(first_content(&registry, 3, 0), "r2c0");
    assert_eq!(moved.points, 300);
    assert_eq!(first_content(&registry, 0, 0), "");
}

#[test]
fn test_commit_follows_position_after_column_removed_before() {
    let mut registry = registry();
    tag_cell(&mut registry, 0, 2);
    tag_cell(&mut registry, 0, 3);

    let mut session = EditSession::new();
    session.open(registry.active(), 0, 2);
    let id = session.slides().unwrap()[0].elements[0].id.clone();
    session.update_element(0, &id, &ElementPatch::content("draft"));

    assert!(registry.remove_column_at(0));

    assert_eq!(session.commit(&mut registry), CommitOutcome::Committed(CellKey::new(0, 2)));
    assert_eq!(first_content(&registry, 0, 2), "draft");
    assert_eq!(first_content(&registry, 0, 1), "r0c2");
}

#[test]
fn test_commit_keeps_points_changed_while_editing() {
    let mut registry = registry();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);
    session.add_text_element(0);

    registry.set_cell_points(0, 0, 750);
    session.commit(&mut registry);

    let cell = registry.active().cell(0, 0).unwrap();
    assert_eq!(cell.points, 750);
    assert_eq!(cell.slides[0].elements.len(), 2);
}

#[test]
fn test_text_box_defaults() {
    let registry = registry();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);

    let id = session.add_text_element(0).unwrap();
    let element = session.slides().unwrap()[0].element(&id).unwrap().clone();
    assert_eq!(element.kind, ElementKind::Text);
    assert_eq!((element.x, element.y), (100.0, 100.0));
    assert_eq!((element.width, element.height), (200.0, 100.0));
    assert_eq!(element.effective_font_size(), 16.0);

    assert_eq!(session.adjust_font_size(0, &id, -100.0), Some(8.0));
}

#[test]
fn test_drag_and_resize_patches() {
    let registry = registry();
    let mut session = EditSession::new();
    session.open(registry.active(), 0, 0);
    let id = session.slides().unwrap()[0].elements[0].id.clone();

    assert!(session.update_element(0, &id, &ElementPatch::position(40.0, 60.0)));
    assert!(session.update_element(0, &id, &ElementPatch::bounds(30.0, 50.0, 320.0, 90.0)));

    let element = session.slides().unwrap()[0].element(&id).unwrap();
    assert_eq!((element.x, element.y, element.width, element.height), (30.0, 50.0, 320.0, 90.0));
}
