//! Heading outline and page labels for navigation UIs.

use serde::{Deserialize, Serialize};

use crate::model::{Block, Document};

/// One heading in document order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEntry {
    /// Heading level (1..=6).
    pub level: u8,
    pub text: String,
    /// Global position of the heading block.
    pub pos: usize,
    /// Page holding the heading.
    pub page_index: usize,
}

/// Headings of a document, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub entries: Vec<HeadingEntry>,
}

impl Outline {
    /// Collect every heading of `doc`.
    pub fn from_document(doc: &Document) -> Self {
        let mut entries = Vec::new();
        let mut page_start = 0usize;
        for (page_index, page) in doc.pages.iter().enumerate() {
            let mut pos = page_start + 1;
            for block in &page.blocks {
                if let Block::Heading { level, .. } = block {
                    entries.push(HeadingEntry {
                        level: *level,
                        text: block.text(),
                        pos,
                        page_index,
                    });
                }
                pos += block.node_size();
            }
            page_start += page.node_size();
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries paired with their nesting depth.
    ///
    /// A heading nests under the closest preceding heading of a lower level;
    /// skipped levels do not add depth.
    pub fn flat(&self) -> Vec<(usize, &HeadingEntry)> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut open_levels: Vec<u8> = Vec::new();
        for entry in &self.entries {
            while open_levels.last().is_some_and(|level| *level >= entry.level) {
                open_levels.pop();
            }
            out.push((open_levels.len(), entry));
            open_levels.push(entry.level);
        }
        out
    }

    /// Headings placed on one page.
    pub fn on_page(&self, page_index: usize) -> impl Iterator<Item = &HeadingEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.page_index == page_index)
    }
}

/// Human page label, e.g. `"Page 2 of 5"` for index 1.
pub fn page_label(page_index: usize, total: usize) -> String {
    format!("Page {} of {}", page_index + 1, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Page;

    fn doc() -> Document {
        Document::new(vec![
            Page::new(vec![Block::heading(1, "Intro"), Block::paragraph("text")]),
            Page::new(vec![
                Block::heading(3, "Detail"),
                Block::heading(2, "Section"),
                Block::heading(1, "Next"),
            ]),
        ])
    }

    #[test]
    fn outline_records_positions_and_pages() {
        let outline = Outline::from_document(&doc());
        assert_eq!(outline.len(), 4);
        assert_eq!(outline.entries[0].pos, 1);
        assert_eq!(outline.entries[0].text, "Intro");
        // Page 0 size = 2 + 7 + 6 = 15; first heading of page 1 at 16.
        assert_eq!(outline.entries[1].pos, 16);
        assert_eq!(outline.entries[1].page_index, 1);
        assert_eq!(outline.on_page(1).count(), 3);
    }

    #[test]
    fn flat_nests_by_level() {
        let outline = Outline::from_document(&doc());
        let depths: Vec<usize> = outline.flat().iter().map(|(depth, _)| *depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 0]);
    }

    #[test]
    fn page_labels_are_one_based() {
        assert_eq!(page_label(0, 3), "Page 1 of 3");
        assert_eq!(page_label(2, 3), "Page 3 of 3");
    }

    #[test]
    fn empty_outline() {
        let outline = Outline::from_document(&Document::default());
        assert!(outline.is_empty());
        assert!(outline.flat().is_empty());
    }
}
