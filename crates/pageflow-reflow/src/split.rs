//! Paragraph splitting across a page boundary.

use pageflow::{Block, Document, EditorState};

use crate::error::ReflowError;
use crate::measure::{BlockRef, MeasurementProvider};
use crate::relocate::{insert_at_next_page_start, take_tail};

/// Why a block cannot be split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotSplittable {
    /// Only paragraphs are split; everything else moves whole.
    NotParagraph,
    /// The provider reported no overflow point (or could not measure).
    NoOverflowPoint,
    /// The offset would leave an empty fragment on one side.
    EmptyFragment { offset: usize, text_len: usize },
}

/// Outcome of looking for a split point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitDecision {
    Split { offset: usize },
    NotSplittable(NotSplittable),
}

/// Result of a committed split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Page now starting with the continuation fragment.
    pub target_page: usize,
    pub page_created: bool,
    /// Blocks after the split paragraph that moved along with the continuation.
    pub tail_blocks: usize,
}

/// Find where to split the paragraph at `at` so its first part ends at or
/// above `max_bottom`.
pub fn find_split_offset(
    provider: &dyn MeasurementProvider,
    doc: &Document,
    at: BlockRef,
    max_bottom: f32,
) -> SplitDecision {
    let Some(block) = doc.block(at.page, at.block) else {
        return SplitDecision::NotSplittable(NotSplittable::NotParagraph);
    };
    if !block.is_paragraph() {
        return SplitDecision::NotSplittable(NotSplittable::NotParagraph);
    }
    let text_len = block.text_len();
    match provider.text_split_offset(doc, at, max_bottom) {
        None => SplitDecision::NotSplittable(NotSplittable::NoOverflowPoint),
        Some(offset) if offset == 0 || offset >= text_len => {
            SplitDecision::NotSplittable(NotSplittable::EmptyFragment { offset, text_len })
        }
        Some(offset) => SplitDecision::Split { offset },
    }
}

/// Split the paragraph at `at` and move the continuation to the start of the
/// next page, creating it if needed.
///
/// The first fragment stays in place. Blocks that followed the paragraph on
/// its page move after the continuation so document order is kept. The whole
/// edit is one transaction.
pub fn split_paragraph_across_pages(
    state: &mut EditorState,
    at: BlockRef,
    offset: usize,
) -> Result<SplitOutcome, ReflowError> {
    let doc = state.doc();
    let block = doc.block(at.page, at.block).ok_or(ReflowError::UnknownBlock {
        page: at.page,
        block: at.block,
    })?;
    let invalid = ReflowError::InvalidSplit {
        page: at.page,
        block: at.block,
        offset,
    };
    if !block.is_paragraph() || offset == 0 || offset >= block.text_len() {
        return Err(invalid);
    }
    let (before, after) = block.split_at(offset).ok_or(invalid)?;

    let mut tr = state.transaction();
    let mut moved: Vec<Block> = take_tail(&mut tr, at)?;
    let tail_blocks = moved.len().saturating_sub(1);
    // The paragraph itself is replaced by its two fragments.
    if let Some(first) = moved.first_mut() {
        *first = after;
    }
    let end = tr
        .doc()
        .page_content_end(at.page)
        .ok_or(ReflowError::UnknownPage { index: at.page })?;
    tr.insert(end, before)?;
    let page_created = insert_at_next_page_start(&mut tr, at.page, moved)?;
    state.apply(tr)?;

    log::debug!(
        "[REFLOW] split page={} block={} offset={} tail={} created_page={}",
        at.page,
        at.block,
        offset,
        tail_blocks,
        page_created
    );
    Ok(SplitOutcome {
        target_page: at.page + 1,
        page_created,
        tail_blocks,
    })
}
