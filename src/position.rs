//! Global position addressing over a [`Document`].
//!
//! Positions are recomputed from the current tree on every call; nothing in
//! this module caches offsets, so callers must re-resolve after each edit.

use crate::model::{Block, Document, Page, TextRun};

/// Where a resolved position sits in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PosContext {
    /// Between pages: `index` pages precede the position.
    BetweenPages { index: usize },
    /// Between blocks of a page: `index` blocks of `page` precede the position.
    BetweenBlocks { page: usize, index: usize },
    /// Inside the content of a textblock, `offset` characters from its start.
    Text { page: usize, block: usize, offset: usize },
}

/// Position resolved against one document state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// Owning page (the page after the position for page boundaries, clamped).
    pub page_index: usize,
    pub context: PosContext,
}

impl ResolvedPos {
    /// Block that contains the position, if it sits in text.
    pub fn block_index(&self) -> Option<usize> {
        match self.context {
            PosContext::Text { block, .. } => Some(block),
            _ => None,
        }
    }

    /// Character offset in the containing textblock.
    pub fn text_offset(&self) -> Option<usize> {
        match self.context {
            PosContext::Text { offset, .. } => Some(offset),
            _ => None,
        }
    }
}

/// Node found at a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeRef<'a> {
    Page {
        index: usize,
        page: &'a Page,
    },
    Block {
        page: usize,
        index: usize,
        block: &'a Block,
    },
    Text {
        page: usize,
        block: usize,
        run_index: usize,
        run: &'a TextRun,
        /// Character offset inside the run.
        offset_in_run: usize,
    },
}

/// Content range of one textblock in the position space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextblockSpan {
    pub page: usize,
    pub block: usize,
    /// First content position (block position + 1).
    pub content_start: usize,
    /// Text length in characters; content ends at `content_start + len`.
    pub len: usize,
}

impl TextblockSpan {
    pub fn content_end(&self) -> usize {
        self.content_start + self.len
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.content_start && pos <= self.content_end()
    }
}

impl Document {
    /// Absolute start position of a page.
    pub fn page_start(&self, page_index: usize) -> Option<usize> {
        if page_index >= self.pages.len() {
            return None;
        }
        Some(self.pages[..page_index].iter().map(Page::node_size).sum())
    }

    /// Absolute position of a block inside a page.
    pub fn block_pos(&self, page_index: usize, block_index: usize) -> Option<usize> {
        let start = self.page_start(page_index)?;
        let page = &self.pages[page_index];
        if block_index >= page.blocks.len() {
            return None;
        }
        let before: usize = page.blocks[..block_index]
            .iter()
            .map(Block::node_size)
            .sum();
        Some(start + 1 + before)
    }

    /// Position just inside a page's closing boundary (append point).
    pub fn page_content_end(&self, page_index: usize) -> Option<usize> {
        let start = self.page_start(page_index)?;
        Some(start + self.pages[page_index].node_size() - 1)
    }

    /// Index of the page whose range `[start, start + size)` holds `pos`.
    ///
    /// Falls back to page 0 when nothing matches.
    pub fn page_index_at(&self, pos: usize) -> usize {
        let mut start = 0usize;
        for (idx, page) in self.pages.iter().enumerate() {
            let end = start + page.node_size();
            if pos >= start && pos < end {
                return idx;
            }
            start = end;
        }
        0
    }

    /// Resolve a position into its tree context.
    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        let mut page_start = 0usize;
        for (page_idx, page) in self.pages.iter().enumerate() {
            if pos == page_start {
                return Some(ResolvedPos {
                    pos,
                    page_index: page_idx,
                    context: PosContext::BetweenPages { index: page_idx },
                });
            }
            let page_end = page_start + page.node_size();
            if pos < page_end {
                let mut block_start = page_start + 1;
                for (block_idx, block) in page.blocks.iter().enumerate() {
                    if pos == block_start {
                        return Some(ResolvedPos {
                            pos,
                            page_index: page_idx,
                            context: PosContext::BetweenBlocks {
                                page: page_idx,
                                index: block_idx,
                            },
                        });
                    }
                    let block_end = block_start + block.node_size();
                    if pos < block_end {
                        // Only textblocks have interior positions.
                        return Some(ResolvedPos {
                            pos,
                            page_index: page_idx,
                            context: PosContext::Text {
                                page: page_idx,
                                block: block_idx,
                                offset: pos - block_start - 1,
                            },
                        });
                    }
                    block_start = block_end;
                }
                return Some(ResolvedPos {
                    pos,
                    page_index: page_idx,
                    context: PosContext::BetweenBlocks {
                        page: page_idx,
                        index: page.blocks.len(),
                    },
                });
            }
            page_start = page_end;
        }
        if pos == page_start {
            return Some(ResolvedPos {
                pos,
                page_index: self.pages.len().saturating_sub(1),
                context: PosContext::BetweenPages {
                    index: self.pages.len(),
                },
            });
        }
        None
    }

    /// Node that starts at `pos`, or the text run covering it.
    pub fn node_at(&self, pos: usize) -> Option<NodeRef<'_>> {
        let resolved = self.resolve(pos)?;
        match resolved.context {
            PosContext::BetweenPages { index } => self.pages.get(index).map(|page| NodeRef::Page {
                index,
                page,
            }),
            PosContext::BetweenBlocks { page, index } => {
                let block = self.block(page, index)?;
                Some(NodeRef::Block { page, index, block })
            }
            PosContext::Text {
                page,
                block,
                offset,
            } => {
                let runs = self.block(page, block)?.runs()?;
                let mut consumed = 0usize;
                for (run_index, run) in runs.iter().enumerate() {
                    let len = run.len();
                    if offset < consumed + len {
                        return Some(NodeRef::Text {
                            page,
                            block,
                            run_index,
                            run,
                            offset_in_run: offset - consumed,
                        });
                    }
                    consumed += len;
                }
                None
            }
        }
    }

    /// Content spans of every textblock in document order.
    pub fn textblock_spans(&self) -> Vec<TextblockSpan> {
        let mut out = Vec::with_capacity(self.block_count());
        let mut page_start = 0usize;
        for (page_idx, page) in self.pages.iter().enumerate() {
            let mut block_start = page_start + 1;
            for (block_idx, block) in page.blocks.iter().enumerate() {
                if block.is_textblock() {
                    out.push(TextblockSpan {
                        page: page_idx,
                        block: block_idx,
                        content_start: block_start + 1,
                        len: block.text_len(),
                    });
                }
                block_start += block.node_size();
            }
            page_start += page.node_size();
        }
        out
    }

    /// Closest valid cursor position (inside a textblock) to `pos`.
    ///
    /// Ties prefer the later position. Documents without any textblock clamp
    /// `pos` into the document.
    pub fn nearest_text_position(&self, pos: usize) -> usize {
        let mut best: Option<(usize, usize)> = None;
        for span in self.textblock_spans() {
            if span.contains(pos) {
                return pos;
            }
            let candidate = if pos < span.content_start {
                span.content_start
            } else {
                span.content_end()
            };
            let distance = candidate.abs_diff(pos);
            match best {
                Some((best_distance, _)) if distance > best_distance => {}
                _ => best = Some((distance, candidate)),
            }
            if span.content_start > pos {
                // Later spans only get further away.
                break;
            }
        }
        best.map(|(_, candidate)| candidate)
            .unwrap_or_else(|| pos.min(self.content_size()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mark, MarkSet};

    // Page 0: [P "abc"] [Image] ; Page 1: [P ""] [H "xy"]
    fn sample() -> Document {
        Document::new(vec![
            Page::new(vec![Block::paragraph("abc"), Block::image("i.png", None)]),
            Page::new(vec![Block::empty_paragraph(), Block::heading(2, "xy")]),
        ])
    }

    #[test]
    fn page_and_block_positions() {
        let doc = sample();
        // page 0 size = 2 + 5 + 1 = 8
        assert_eq!(doc.page_start(0), Some(0));
        assert_eq!(doc.page_start(1), Some(8));
        assert_eq!(doc.page_start(2), None);
        assert_eq!(doc.block_pos(0, 0), Some(1));
        assert_eq!(doc.block_pos(0, 1), Some(6));
        assert_eq!(doc.block_pos(1, 1), Some(11));
        assert_eq!(doc.block_pos(1, 2), None);
        assert_eq!(doc.page_content_end(0), Some(7));
        assert_eq!(doc.content_size(), 8 + 8);
    }

    #[test]
    fn page_index_defaults_to_zero() {
        let doc = sample();
        assert_eq!(doc.page_index_at(0), 0);
        assert_eq!(doc.page_index_at(7), 0);
        assert_eq!(doc.page_index_at(8), 1);
        assert_eq!(doc.page_index_at(15), 1);
        assert_eq!(doc.page_index_at(16), 0);
        assert_eq!(doc.page_index_at(999), 0);
    }

    #[test]
    fn resolve_distinguishes_boundaries_and_text() {
        let doc = sample();
        assert_eq!(
            doc.resolve(0).map(|r| r.context),
            Some(PosContext::BetweenPages { index: 0 })
        );
        assert_eq!(
            doc.resolve(1).map(|r| r.context),
            Some(PosContext::BetweenBlocks { page: 0, index: 0 })
        );
        assert_eq!(
            doc.resolve(2).map(|r| r.context),
            Some(PosContext::Text {
                page: 0,
                block: 0,
                offset: 0
            })
        );
        assert_eq!(doc.resolve(5).and_then(|r| r.text_offset()), Some(3));
        assert_eq!(
            doc.resolve(6).map(|r| r.context),
            Some(PosContext::BetweenBlocks { page: 0, index: 1 })
        );
        assert_eq!(
            doc.resolve(7).map(|r| r.context),
            Some(PosContext::BetweenBlocks { page: 0, index: 2 })
        );
        assert_eq!(
            doc.resolve(16).map(|r| r.context),
            Some(PosContext::BetweenPages { index: 2 })
        );
        assert!(doc.resolve(17).is_none());
    }

    #[test]
    fn node_at_finds_pages_blocks_and_runs() {
        let bold = MarkSet::from_marks([Mark::Bold]);
        let doc = Document::from_blocks(vec![Block::paragraph_with_runs(vec![
            TextRun::new("ab"),
            TextRun::with_marks("cd", bold.clone()),
        ])]);
        assert!(matches!(doc.node_at(0), Some(NodeRef::Page { index: 0, .. })));
        assert!(matches!(doc.node_at(1), Some(NodeRef::Block { index: 0, .. })));
        match doc.node_at(5) {
            Some(NodeRef::Text {
                run_index,
                run,
                offset_in_run,
                ..
            }) => {
                assert_eq!(run_index, 1);
                assert_eq!(run.marks, bold);
                assert_eq!(offset_in_run, 1);
            }
            other => panic!("unexpected node {:?}", other),
        }
        // End of the paragraph content has no node after it.
        assert!(doc.node_at(6).is_none());
    }

    #[test]
    fn nearest_text_position_snaps_to_closest_textblock() {
        let doc = sample();
        assert_eq!(doc.nearest_text_position(3), 3);
        // Page start snaps into the first paragraph.
        assert_eq!(doc.nearest_text_position(0), 2);
        // Between the image and the page end: closest is end of "abc" (5)
        // at distance 2 vs empty paragraph content at 10 (distance 3).
        assert_eq!(doc.nearest_text_position(7), 5);
        assert_eq!(doc.nearest_text_position(9), 10);
        assert_eq!(doc.nearest_text_position(100), 14);
    }

    #[test]
    fn nearest_text_position_prefers_later_candidate_on_ties() {
        // [P "a"] [Image] [Image] [P "b"]: position 5 is two units from
        // the end of "a" (3) and from the start of "b" (7).
        let doc = Document::from_blocks(vec![
            Block::paragraph("a"),
            Block::image("x", None),
            Block::image("y", None),
            Block::paragraph("b"),
        ]);
        assert_eq!(doc.nearest_text_position(5), 7);
    }

    #[test]
    fn nearest_text_position_without_textblocks_clamps() {
        let doc = Document::from_blocks(vec![Block::image("x", None)]);
        assert_eq!(doc.nearest_text_position(1), 1);
        assert_eq!(doc.nearest_text_position(50), doc.content_size());
    }
}
