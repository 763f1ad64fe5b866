//! Structure-independent cursor positions.
//!
//! A [`LogicalPosition`] counts the characters before a cursor, so it
//! survives edits that only move text between blocks and pages. Positions
//! with the same character count (end of one block, start of the next) are
//! told apart by their rank in that group.

use serde::{Deserialize, Serialize};

use crate::model::Document;

/// Cursor location expressed in text characters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalPosition {
    /// Characters of textblock content before the cursor.
    pub chars_before: usize,
    /// Rank among the cursor positions sharing `chars_before`.
    pub index_in_group: usize,
    /// The cursor was the last position of its group.
    pub last_in_group: bool,
}

impl LogicalPosition {
    /// Capture the logical position of `pos`, snapping it to text first.
    pub fn capture(doc: &Document, pos: usize) -> Self {
        let pos = doc.nearest_text_position(pos);
        let mut prefix = 0usize;
        let mut chars_before = None;
        for span in doc.textblock_spans() {
            if span.contains(pos) {
                chars_before = Some(prefix + (pos - span.content_start));
                break;
            }
            prefix += span.len;
        }
        let Some(chars_before) = chars_before else {
            return Self::default();
        };

        let group = candidates(doc, chars_before);
        let index_in_group = group.iter().position(|p| *p == pos).unwrap_or(0);
        Self {
            chars_before,
            index_in_group,
            last_in_group: index_in_group + 1 >= group.len(),
        }
    }

    /// Global position of this logical position in `doc`.
    ///
    /// A cursor that was last in its group goes to the last candidate, so a
    /// cursor at a split point follows the text into the continuation.
    pub fn resolve(&self, doc: &Document) -> usize {
        let group = candidates(doc, self.chars_before);
        if group.is_empty() {
            return doc.nearest_text_position(doc.content_size());
        }
        let idx = if self.last_in_group {
            group.len() - 1
        } else {
            self.index_in_group.min(group.len() - 1)
        };
        group[idx]
    }
}

/// Cursor positions with exactly `chars` characters before them, in order.
fn candidates(doc: &Document, chars: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut prefix = 0usize;
    for span in doc.textblock_spans() {
        if prefix > chars {
            break;
        }
        if chars <= prefix + span.len {
            out.push(span.content_start + (chars - prefix));
        }
        prefix += span.len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Page};

    #[test]
    fn capture_counts_characters_across_blocks() {
        // [P "abc"] [P "def"]: end of "abc" is 5, start of "def" is 7.
        let doc = Document::from_blocks(vec![Block::paragraph("abc"), Block::paragraph("def")]);
        let end_of_first = LogicalPosition::capture(&doc, 5);
        assert_eq!(end_of_first.chars_before, 3);
        assert_eq!(end_of_first.index_in_group, 0);
        assert!(!end_of_first.last_in_group);

        let start_of_second = LogicalPosition::capture(&doc, 7);
        assert_eq!(start_of_second.chars_before, 3);
        assert_eq!(start_of_second.index_in_group, 1);
        assert!(start_of_second.last_in_group);

        assert_eq!(end_of_first.resolve(&doc), 5);
        assert_eq!(start_of_second.resolve(&doc), 7);
    }

    #[test]
    fn cursor_at_split_point_follows_continuation() {
        let before = Document::from_blocks(vec![Block::paragraph("abcdef")]);
        // Between "c" and "d".
        let logical = LogicalPosition::capture(&before, 5);
        assert!(logical.last_in_group);

        let after = Document::new(vec![
            Page::new(vec![Block::paragraph("abc")]),
            Page::new(vec![Block::paragraph("def")]),
        ]);
        // Page 1 starts at 7; "def" content starts at 9.
        assert_eq!(logical.resolve(&after), 9);
    }

    #[test]
    fn interior_position_survives_page_moves() {
        let before = Document::new(vec![
            Page::new(vec![Block::paragraph("ab"), Block::paragraph("cdef")]),
            Page::seeded(),
        ]);
        // "cdef" content starts at 6; cursor after "cd".
        let logical = LogicalPosition::capture(&before, 8);
        assert_eq!(logical.chars_before, 4);

        let after = Document::new(vec![
            Page::new(vec![Block::paragraph("ab")]),
            Page::new(vec![Block::paragraph("cdef")]),
        ]);
        // Page 1 starts at 6; "cdef" content starts at 8.
        assert_eq!(logical.resolve(&after), 10);
    }

    #[test]
    fn resolve_clamps_past_the_end() {
        let doc = Document::from_blocks(vec![Block::paragraph("abcdef")]);
        let logical = LogicalPosition::capture(&doc, 8);
        let shorter = Document::from_blocks(vec![Block::paragraph("ab")]);
        assert_eq!(logical.resolve(&shorter), 4);
    }
}
