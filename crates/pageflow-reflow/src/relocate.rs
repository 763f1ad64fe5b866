//! Moving blocks between pages and reclaiming empty pages.
//!
//! Every helper re-derives positions from the transaction's working document
//! after each step; no position survives a mutation.

use pageflow::{Block, EditorState, Page, Transaction};

use crate::error::ReflowError;
use crate::measure::BlockRef;

/// Result of a committed relocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Page that received the blocks.
    pub target_page: usize,
    pub blocks_moved: usize,
    pub page_created: bool,
}

/// Delete block `at` and every block after it on the same page from `tr`,
/// returning them in order.
pub(crate) fn take_tail(tr: &mut Transaction, at: BlockRef) -> Result<Vec<Block>, ReflowError> {
    let page = tr
        .doc()
        .page(at.page)
        .ok_or(ReflowError::UnknownPage { index: at.page })?;
    if at.block >= page.blocks.len() {
        return Err(ReflowError::UnknownBlock {
            page: at.page,
            block: at.block,
        });
    }
    let blocks = page.blocks[at.block..].to_vec();
    remove_blocks(tr, at, blocks.len())?;
    Ok(blocks)
}

fn remove_blocks(tr: &mut Transaction, at: BlockRef, count: usize) -> Result<(), ReflowError> {
    let unknown = ReflowError::UnknownBlock {
        page: at.page,
        block: at.block,
    };
    let from = tr.doc().block_pos(at.page, at.block).ok_or(unknown.clone())?;
    let to = match tr.doc().block_pos(at.page, at.block + count) {
        Some(pos) => pos,
        None => tr.doc().page_content_end(at.page).ok_or(unknown)?,
    };
    tr.delete(from, to)?;
    Ok(())
}

/// Insert `blocks` in order at the start of the page after `page_index`.
///
/// A missing next page is created seeded with an empty paragraph, and the
/// seed is removed again once the blocks are in. Returns whether a page was
/// created.
pub(crate) fn insert_at_next_page_start(
    tr: &mut Transaction,
    page_index: usize,
    blocks: Vec<Block>,
) -> Result<bool, ReflowError> {
    let next = page_index + 1;
    let created = next >= tr.doc().page_count();
    if created {
        let end = tr.doc().content_size();
        tr.insert(end, Page::seeded())?;
    }
    let count = blocks.len();
    for (idx, block) in blocks.into_iter().enumerate() {
        let pos = match tr.doc().block_pos(next, idx) {
            Some(pos) => pos,
            None => tr
                .doc()
                .page_content_end(next)
                .ok_or(ReflowError::UnknownPage { index: next })?,
        };
        tr.insert(pos, block)?;
    }
    if created && count > 0 {
        remove_blocks(tr, BlockRef::new(next, count), 1)?;
    }
    Ok(created)
}

/// Move one block to the start of the next page.
pub fn move_block_down(state: &mut EditorState, at: BlockRef) -> Result<MoveOutcome, ReflowError> {
    let block = state
        .doc()
        .block(at.page, at.block)
        .cloned()
        .ok_or(ReflowError::UnknownBlock {
            page: at.page,
            block: at.block,
        })?;
    let mut tr = state.transaction();
    remove_blocks(&mut tr, at, 1)?;
    let page_created = insert_at_next_page_start(&mut tr, at.page, vec![block])?;
    state.apply(tr)?;
    log::debug!(
        "[REFLOW] moved block down page={} block={} created_page={}",
        at.page,
        at.block,
        page_created
    );
    Ok(MoveOutcome {
        target_page: at.page + 1,
        blocks_moved: 1,
        page_created,
    })
}

/// Move block `at` together with every later block of its page to the start
/// of the next page, keeping their order.
pub fn move_blocks_down(state: &mut EditorState, at: BlockRef) -> Result<MoveOutcome, ReflowError> {
    let mut tr = state.transaction();
    let blocks = take_tail(&mut tr, at)?;
    let blocks_moved = blocks.len();
    let page_created = insert_at_next_page_start(&mut tr, at.page, blocks)?;
    state.apply(tr)?;
    log::debug!(
        "[REFLOW] moved {} block(s) down page={} from_block={} created_page={}",
        blocks_moved,
        at.page,
        at.block,
        page_created
    );
    Ok(MoveOutcome {
        target_page: at.page + 1,
        blocks_moved,
        page_created,
    })
}

/// Move the block at `from` to the end of page `to_page`.
pub fn move_block_up(
    state: &mut EditorState,
    from: BlockRef,
    to_page: usize,
) -> Result<MoveOutcome, ReflowError> {
    if state.doc().page(to_page).is_none() {
        return Err(ReflowError::UnknownPage { index: to_page });
    }
    let block = state
        .doc()
        .block(from.page, from.block)
        .cloned()
        .ok_or(ReflowError::UnknownBlock {
            page: from.page,
            block: from.block,
        })?;
    let mut tr = state.transaction();
    remove_blocks(&mut tr, from, 1)?;
    let end = tr
        .doc()
        .page_content_end(to_page)
        .ok_or(ReflowError::UnknownPage { index: to_page })?;
    tr.insert(end, block)?;
    state.apply(tr)?;
    log::debug!(
        "[REFLOW] moved block up page={} block={} to_page={}",
        from.page,
        from.block,
        to_page
    );
    Ok(MoveOutcome {
        target_page: to_page,
        blocks_moved: 1,
        page_created: false,
    })
}

/// Delete effectively empty pages, back to front.
///
/// Pages listed in `protected` (those holding the selection ends) and the
/// last remaining page are always kept. Returns the number of pages removed.
pub fn reclaim_empty_pages(
    state: &mut EditorState,
    protected: &[usize],
) -> Result<usize, ReflowError> {
    let mut tr = state.transaction();
    let mut removed = 0usize;
    for idx in (0..state.doc().page_count()).rev() {
        if tr.doc().page_count() <= 1 {
            break;
        }
        if protected.contains(&idx) {
            continue;
        }
        let Some(page) = tr.doc().page(idx) else {
            continue;
        };
        if !page.is_effectively_empty() {
            continue;
        }
        let size = page.node_size();
        let from = tr
            .doc()
            .page_start(idx)
            .ok_or(ReflowError::UnknownPage { index: idx })?;
        tr.delete(from, from + size)?;
        removed += 1;
    }
    if removed > 0 {
        state.apply(tr)?;
        log::debug!(
            "[REFLOW] reclaimed {} empty page(s) protected={:?}",
            removed,
            protected
        );
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageflow::{Document, Selection};

    fn pages(blocks: Vec<Vec<Block>>) -> EditorState {
        EditorState::new(Document::new(blocks.into_iter().map(Page::new).collect()))
    }

    #[test]
    fn move_down_into_existing_page_lands_first() {
        let mut state = pages(vec![
            vec![Block::paragraph("a"), Block::paragraph("b")],
            vec![Block::paragraph("c")],
        ]);
        let outcome = move_block_down(&mut state, BlockRef::new(0, 1)).expect("move");
        assert!(!outcome.page_created);
        let doc = state.doc();
        assert_eq!(doc.pages[0].text(), "a");
        assert_eq!(doc.pages[1].blocks[0].text(), "b");
        assert_eq!(doc.pages[1].blocks[1].text(), "c");
        assert_eq!(state.version(), 1);
    }

    #[test]
    fn move_down_creates_page_holding_exactly_the_block() {
        let mut state = pages(vec![vec![
            Block::paragraph("a"),
            Block::image("big", Some(200.0)),
        ]]);
        let outcome = move_block_down(&mut state, BlockRef::new(0, 1)).expect("move");
        assert!(outcome.page_created);
        assert_eq!(state.doc().page_count(), 2);
        assert_eq!(
            state.doc().pages[1].blocks,
            vec![Block::image("big", Some(200.0))]
        );
    }

    #[test]
    fn move_tail_keeps_order() {
        let mut state = pages(vec![vec![
            Block::paragraph("a"),
            Block::paragraph("b"),
            Block::paragraph("c"),
        ]]);
        let outcome = move_blocks_down(&mut state, BlockRef::new(0, 1)).expect("move");
        assert_eq!(outcome.blocks_moved, 2);
        let doc = state.doc();
        assert_eq!(doc.pages[0].text(), "a");
        assert_eq!(doc.pages[1].blocks.len(), 2);
        assert_eq!(doc.pages[1].text(), "bc");
    }

    #[test]
    fn move_up_appends_to_previous_page() {
        let mut state = pages(vec![
            vec![Block::paragraph("a")],
            vec![Block::paragraph("b"), Block::paragraph("c")],
        ]);
        move_block_up(&mut state, BlockRef::new(1, 0), 0).expect("move");
        let doc = state.doc();
        assert_eq!(doc.pages[0].text(), "ab");
        assert_eq!(doc.pages[1].text(), "c");
        assert!(matches!(
            move_block_up(&mut state, BlockRef::new(1, 5), 0),
            Err(ReflowError::UnknownBlock { page: 1, block: 5 })
        ));
    }

    #[test]
    fn reclaim_keeps_active_and_last_page() {
        let mut state = pages(vec![
            vec![Block::paragraph("a")],
            vec![],
            vec![Block::empty_paragraph()],
            vec![Block::paragraph("d")],
            vec![Block::empty_paragraph()],
        ]);
        // Cursor inside the seeded page at index 2.
        let pos = state.doc().block_pos(2, 0).expect("pos") + 1;
        state.set_selection(Selection::cursor(pos));
        let removed = reclaim_empty_pages(&mut state, &[2]).expect("reclaim");
        assert_eq!(removed, 2);
        let doc = state.doc();
        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.text_content(), "ad");
        assert!(doc.pages[1].is_effectively_empty());
    }

    #[test]
    fn reclaim_never_removes_the_last_page() {
        let mut state = pages(vec![vec![], vec![Block::empty_paragraph()]]);
        let removed = reclaim_empty_pages(&mut state, &[99]).expect("reclaim");
        assert_eq!(removed, 1);
        assert_eq!(state.doc().page_count(), 1);
    }

    #[test]
    fn reclaim_keeps_every_protected_page() {
        let mut state = pages(vec![
            vec![Block::empty_paragraph()],
            vec![Block::paragraph("b")],
            vec![],
            vec![Block::empty_paragraph()],
        ]);
        let removed = reclaim_empty_pages(&mut state, &[0, 3]).expect("reclaim");
        assert_eq!(removed, 1);
        let doc = state.doc();
        assert_eq!(doc.page_count(), 3);
        assert!(doc.pages[0].is_effectively_empty());
        assert!(doc.pages[2].is_effectively_empty());
    }
}
