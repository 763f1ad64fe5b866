//! Per-page overflow/underflow classification.

use pageflow::Document;

use crate::config::ReflowConfig;
use crate::measure::{BlockRef, MeasurementProvider};

/// Why a block has to leave its page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowReason {
    /// Its bottom edge is past the usable page height.
    Height,
    /// It follows an explicit page break on the same page.
    ForcedBreak,
}

/// Classification of one page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PageStatus {
    /// Nothing to do.
    Stable,
    /// `block` is the first block that does not belong on this page.
    Overflow { block: usize, reason: OverflowReason },
    /// The first block of the next page fits into the free space.
    Underflow { available: f32, candidate_height: f32 },
    /// `block` could not be measured; the page is skipped this pass.
    Unmeasurable { block: usize },
}

/// Walks a page's blocks against the usable height.
pub struct Detector<'a> {
    provider: &'a dyn MeasurementProvider,
    config: ReflowConfig,
}

impl<'a> Detector<'a> {
    pub fn new(provider: &'a dyn MeasurementProvider, config: ReflowConfig) -> Self {
        Self { provider, config }
    }

    /// Usable height of a page: page height minus the header/footer reserve.
    pub fn max_height(&self, doc: &Document, page_index: usize) -> f32 {
        let page_height = self
            .provider
            .page_content_height(doc, page_index)
            .unwrap_or(self.config.page_height);
        self.config.max_content_height(page_height)
    }

    /// Classify `page_index` of `doc`.
    pub fn classify(&self, doc: &Document, page_index: usize) -> PageStatus {
        let Some(page) = doc.page(page_index) else {
            return PageStatus::Stable;
        };
        let max = self.max_height(doc, page_index);
        let mut used = 0.0f32;

        for (idx, block) in page.blocks.iter().enumerate() {
            if idx > 0 && page.blocks[idx - 1].is_page_break() {
                log::trace!(
                    "[REFLOW] page={} block={} follows page break",
                    page_index,
                    idx
                );
                return PageStatus::Overflow {
                    block: idx,
                    reason: OverflowReason::ForcedBreak,
                };
            }
            let Some(geometry) = self
                .provider
                .block_geometry(doc, BlockRef::new(page_index, idx))
            else {
                return PageStatus::Unmeasurable { block: idx };
            };
            if geometry.bottom > max {
                log::trace!(
                    "[REFLOW] page={} block={} {} overflows bottom={} max={}",
                    page_index,
                    idx,
                    block.kind_name(),
                    geometry.bottom,
                    max
                );
                return PageStatus::Overflow {
                    block: idx,
                    reason: OverflowReason::Height,
                };
            }
            used = geometry.bottom;
        }

        self.underflow(doc, page_index, max - used)
    }

    fn underflow(&self, doc: &Document, page_index: usize, available: f32) -> PageStatus {
        let Some(page) = doc.page(page_index) else {
            return PageStatus::Stable;
        };
        if page.blocks.last().is_some_and(|block| block.is_page_break()) {
            return PageStatus::Stable;
        }
        let next = page_index + 1;
        let has_candidate = doc.page(next).is_some_and(|p| !p.blocks.is_empty());
        if !has_candidate {
            return PageStatus::Stable;
        }
        let Some(candidate) = self.provider.block_geometry(doc, BlockRef::new(next, 0)) else {
            return PageStatus::Stable;
        };
        let candidate_height = candidate.height();
        if candidate_height + self.config.underflow_margin <= available {
            log::trace!(
                "[REFLOW] page={} underflow available={} candidate={}",
                page_index,
                available,
                candidate_height
            );
            return PageStatus::Underflow {
                available,
                candidate_height,
            };
        }
        PageStatus::Stable
    }
}
