//! Measurement seam between the reflow engine and whatever renders pages.
//!
//! The engine never computes geometry itself. A [`MeasurementProvider`]
//! reports where blocks sit on their page, and answers `None` for anything it
//! has not rendered yet; the paginator then skips that page instead of
//! guessing.

use pageflow::{Block, Document};
use serde::{Deserialize, Serialize};

/// Address of a block: page index plus index within the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub page: usize,
    pub block: usize,
}

impl BlockRef {
    pub fn new(page: usize, block: usize) -> Self {
        Self { page, block }
    }
}

/// Vertical extent of a rendered block, relative to its page's top edge.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockGeometry {
    pub top: f32,
    pub bottom: f32,
}

impl BlockGeometry {
    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }
}

/// Rendered geometry queries.
pub trait MeasurementProvider {
    /// Rendered page height, if the renderer knows it.
    ///
    /// Default defers to the reflow configuration.
    fn page_content_height(&self, _doc: &Document, _page_index: usize) -> Option<f32> {
        None
    }

    /// Geometry of a block, or `None` if it is not rendered.
    fn block_geometry(&self, doc: &Document, block: BlockRef) -> Option<BlockGeometry>;

    /// Bottom edge (relative to the page top) of the first `chars`
    /// characters of a textblock as rendered in place.
    ///
    /// Must be monotonic in `chars`.
    fn text_prefix_bottom(&self, doc: &Document, block: BlockRef, chars: usize) -> Option<f32>;

    /// Character offset at which the text of `block` first pushes past
    /// `max_bottom`, i.e. the longest prefix that still fits.
    ///
    /// Returns `None` if the whole text fits or the block cannot be measured.
    /// The default binary-searches [`Self::text_prefix_bottom`].
    fn text_split_offset(&self, doc: &Document, block: BlockRef, max_bottom: f32) -> Option<usize> {
        let len = doc.block(block.page, block.block)?.text_len();
        if self.text_prefix_bottom(doc, block, len)? <= max_bottom {
            return None;
        }
        // Smallest prefix length that no longer fits.
        let (mut lo, mut hi) = (1usize, len);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.text_prefix_bottom(doc, block, mid)? > max_bottom {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Some(lo.saturating_sub(1))
    }
}

/// Fixed metrics for [`HeuristicMeasurer`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicMetrics {
    /// Characters that fit on one line.
    pub chars_per_line: usize,
    /// Line height of paragraphs and list items.
    pub line_height: f32,
    /// Line heights of heading levels 1 through 6.
    pub heading_line_heights: [f32; 6],
    /// Vertical gap between consecutive blocks.
    pub block_gap: f32,
    /// Offset of the first block from the page top.
    pub page_padding_top: f32,
    /// Height of an image without a height attribute.
    pub atom_height: f32,
    /// Height of a page-break marker.
    pub page_break_height: f32,
    /// Page height reported to the detector; `None` defers to the config.
    pub page_height: Option<f32>,
}

impl Default for HeuristicMetrics {
    fn default() -> Self {
        Self {
            chars_per_line: 40,
            line_height: 20.0,
            heading_line_heights: [36.0, 30.0, 26.0, 24.0, 22.0, 20.0],
            block_gap: 0.0,
            page_padding_top: 0.0,
            atom_height: 60.0,
            page_break_height: 20.0,
            page_height: None,
        }
    }
}

impl HeuristicMetrics {
    /// Defaults reporting a fixed page height.
    pub fn for_page_height(page_height: f32) -> Self {
        Self {
            page_height: Some(page_height),
            ..Self::default()
        }
    }

    fn line_height_for(&self, block: &Block) -> f32 {
        match block {
            Block::Heading { level, .. } => {
                let idx = usize::from((*level).clamp(1, 6)) - 1;
                self.heading_line_heights[idx]
            }
            _ => self.line_height,
        }
    }

    /// Lines taken by `chars` characters; empty text still takes one line.
    fn lines_for(&self, chars: usize) -> usize {
        let per_line = self.chars_per_line.max(1);
        chars.div_ceil(per_line).max(1)
    }

    /// Rendered height of a block.
    pub fn block_height(&self, block: &Block) -> f32 {
        match block {
            Block::PageBreak => self.page_break_height,
            Block::Image { height, .. } => height.unwrap_or(self.atom_height),
            _ => self.lines_for(block.text_len()) as f32 * self.line_height_for(block),
        }
    }
}

/// Deterministic provider that lays text out at a fixed number of
/// characters per line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeuristicMeasurer {
    metrics: HeuristicMetrics,
}

impl HeuristicMeasurer {
    pub fn new(metrics: HeuristicMetrics) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> HeuristicMetrics {
        self.metrics
    }

    fn block_top(&self, doc: &Document, at: BlockRef) -> Option<f32> {
        let page = doc.page(at.page)?;
        if at.block >= page.blocks.len() {
            return None;
        }
        let mut top = self.metrics.page_padding_top;
        for block in &page.blocks[..at.block] {
            top += self.metrics.block_height(block) + self.metrics.block_gap;
        }
        Some(top)
    }
}

impl MeasurementProvider for HeuristicMeasurer {
    fn page_content_height(&self, _doc: &Document, _page_index: usize) -> Option<f32> {
        self.metrics.page_height
    }

    fn block_geometry(&self, doc: &Document, at: BlockRef) -> Option<BlockGeometry> {
        let top = self.block_top(doc, at)?;
        let block = doc.block(at.page, at.block)?;
        Some(BlockGeometry {
            top,
            bottom: top + self.metrics.block_height(block),
        })
    }

    fn text_prefix_bottom(&self, doc: &Document, at: BlockRef, chars: usize) -> Option<f32> {
        let block = doc.block(at.page, at.block)?;
        if !block.is_textblock() {
            return None;
        }
        let top = self.block_top(doc, at)?;
        let chars = chars.min(block.text_len());
        Some(top + self.metrics.lines_for(chars) as f32 * self.metrics.line_height_for(block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageflow::Page;

    fn doc() -> Document {
        Document::new(vec![Page::new(vec![
            Block::heading(1, "Title"),
            Block::paragraph("x".repeat(90)),
            Block::image("a.png", Some(300.0)),
            Block::image("b.png", None),
            Block::page_break(),
            Block::empty_paragraph(),
        ])])
    }

    #[test]
    fn heuristic_geometry_stacks_blocks() {
        let m = HeuristicMeasurer::default();
        let doc = doc();
        let geo = |b| m.block_geometry(&doc, BlockRef::new(0, b)).expect("geometry");
        assert_eq!(geo(0), BlockGeometry { top: 0.0, bottom: 36.0 });
        // 90 chars at 40 per line: 3 lines.
        assert_eq!(geo(1), BlockGeometry { top: 36.0, bottom: 96.0 });
        assert_eq!(geo(2).height(), 300.0);
        assert_eq!(geo(3).height(), 60.0);
        assert_eq!(geo(4).height(), 20.0);
        assert_eq!(geo(5).height(), 20.0);
        assert!(m.block_geometry(&doc, BlockRef::new(0, 6)).is_none());
        assert!(m.block_geometry(&doc, BlockRef::new(1, 0)).is_none());
    }

    #[test]
    fn prefix_bottom_grows_by_line() {
        let m = HeuristicMeasurer::default();
        let doc = doc();
        let at = BlockRef::new(0, 1);
        assert_eq!(m.text_prefix_bottom(&doc, at, 0), Some(56.0));
        assert_eq!(m.text_prefix_bottom(&doc, at, 40), Some(56.0));
        assert_eq!(m.text_prefix_bottom(&doc, at, 41), Some(76.0));
        assert_eq!(m.text_prefix_bottom(&doc, at, 500), Some(96.0));
        assert!(m.text_prefix_bottom(&doc, BlockRef::new(0, 2), 1).is_none());
    }

    #[test]
    fn default_split_offset_finds_longest_fitting_prefix() {
        let m = HeuristicMeasurer::default();
        let doc = doc();
        let at = BlockRef::new(0, 1);
        // Two lines fit below 76: 80 characters.
        assert_eq!(m.text_split_offset(&doc, at, 76.0), Some(80));
        assert_eq!(m.text_split_offset(&doc, at, 80.0), Some(80));
        assert_eq!(m.text_split_offset(&doc, at, 56.0), Some(40));
        // Nothing fits: offset 0.
        assert_eq!(m.text_split_offset(&doc, at, 40.0), Some(0));
        // Whole text fits.
        assert_eq!(m.text_split_offset(&doc, at, 96.0), None);
    }

    #[test]
    fn metrics_can_report_page_height() {
        let m = HeuristicMeasurer::new(HeuristicMetrics::for_page_height(900.0));
        assert_eq!(m.page_content_height(&doc(), 0), Some(900.0));
        assert_eq!(HeuristicMeasurer::default().page_content_height(&doc(), 0), None);
    }
}
