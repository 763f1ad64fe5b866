use pageflow::{
    parse_html, to_html, Block, Document, EditError, EditorState, LogicalPosition, Mark, MarkSet,
    Outline, Page, Selection,
};

fn two_pages() -> Document {
    Document::new(vec![
        Page::new(vec![Block::heading(1, "Title"), Block::paragraph("hello")]),
        Page::new(vec![Block::paragraph("world")]),
    ])
}

fn text_pos(doc: &Document, page: usize, block: usize, offset: usize) -> usize {
    doc.block_pos(page, block).expect("block") + 1 + offset
}

#[test]
fn typing_with_marks_survives_html_export() {
    let mut state = EditorState::new(two_pages());
    let end_of_hello = text_pos(state.doc(), 0, 1, 5);
    state.set_selection(Selection::cursor(end_of_hello));

    state
        .insert_text(" there", MarkSet::from_marks([Mark::Bold]))
        .expect("insert");
    assert_eq!(state.version(), 1);
    assert_eq!(state.doc().pages[0].blocks[1].text(), "hello there");
    assert_eq!(state.selection(), Selection::cursor(end_of_hello + 6));

    let html = to_html(state.doc());
    assert!(html.contains("hello<strong> there</strong>"));
    assert_eq!(&parse_html(&html).expect("parse"), state.doc());
}

#[test]
fn selection_on_a_later_page_follows_earlier_edits() {
    let mut state = EditorState::new(two_pages());
    let in_world = text_pos(state.doc(), 1, 0, 2);
    state.set_selection(Selection::cursor(in_world));

    let mut tr = state.transaction();
    let start_of_hello = text_pos(tr.doc(), 0, 1, 0);
    tr.insert_text(start_of_hello, "Oh, ", MarkSet::new())
        .expect("insert");
    state.apply(tr).expect("apply");

    assert_eq!(state.selection(), Selection::cursor(in_world + 4));
    assert_eq!(state.doc().text_content(), "TitleOh, helloworld");
}

#[test]
fn stale_transactions_are_rejected() {
    let mut state = EditorState::new(two_pages());
    let mut first = state.transaction();
    let mut second = state.transaction();
    let pos = text_pos(state.doc(), 0, 1, 0);
    first.insert_text(pos, "a", MarkSet::new()).expect("insert");
    second.insert_text(pos, "b", MarkSet::new()).expect("insert");

    state.apply(first).expect("apply");
    let before = state.doc().clone();
    assert!(matches!(
        state.apply(second),
        Err(EditError::StaleTransaction { .. })
    ));
    assert_eq!(state.doc(), &before);
    assert_eq!(state.version(), 1);
}

#[test]
fn invalid_steps_leave_the_document_untouched() {
    let mut state = EditorState::new(two_pages());
    let before = state.doc().clone();
    let mut tr = state.transaction();
    let second_page = tr.doc().page_start(1).expect("page");
    tr.delete(second_page, tr.doc().content_size())
        .expect("delete page");
    // A page cannot be inserted inside a textblock.
    let inside_text = text_pos(tr.doc(), 0, 1, 2);
    assert!(tr.insert(inside_text, Page::seeded()).is_err());
    drop(tr);

    assert_eq!(state.doc(), &before);
    assert_eq!(state.version(), 0);

    let mut tr = state.transaction();
    tr.delete(0, tr.doc().content_size()).expect_err("all pages");
}

#[test]
fn outline_tracks_headings_after_edits() {
    let mut state = EditorState::new(two_pages());
    let mut tr = state.transaction();
    let top_of_page_two = tr.doc().block_pos(1, 0).expect("block");
    tr.insert(top_of_page_two, Block::heading(2, "Part"))
        .expect("insert");
    state.apply(tr).expect("apply");

    let outline = Outline::from_document(state.doc());
    assert_eq!(outline.len(), 2);
    let flat = outline.flat();
    assert_eq!(flat[1].0, 1);
    assert_eq!(flat[1].1.text, "Part");
    assert_eq!(flat[1].1.page_index, 1);
    assert_eq!(flat[1].1.pos, state.doc().block_pos(1, 0).expect("block"));
    assert_eq!(outline.on_page(0).count(), 1);
}

#[test]
fn logical_positions_survive_moving_text_between_pages() {
    let mut state = EditorState::new(two_pages());
    let pos = text_pos(state.doc(), 0, 1, 3);
    let logical = LogicalPosition::capture(state.doc(), pos);

    let mut tr = state.transaction();
    let from = tr.doc().block_pos(0, 1).expect("block");
    let hello = tr.doc().block(0, 1).cloned().expect("hello");
    tr.delete(from, from + hello.node_size()).expect("delete");
    let top_of_page_two = tr.doc().block_pos(1, 0).expect("block");
    tr.insert(top_of_page_two, hello).expect("insert");
    state.apply(tr).expect("apply");

    let resolved = logical.resolve(state.doc());
    assert_eq!(resolved, text_pos(state.doc(), 1, 0, 3));
}
