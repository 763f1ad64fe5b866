#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use pageflow::{Block, Document, EditorState, Page};
use pageflow_reflow::{
    BlockGeometry, BlockRef, HeuristicMeasurer, MeasurementProvider, Paginator, ReflowConfig,
    ReflowDiagnostic,
};

/// Config whose usable height is exactly 1000.
pub fn config_1000() -> ReflowConfig {
    ReflowConfig::for_page_height(1080.0)
}

pub fn state_with_pages(pages: Vec<Vec<Block>>) -> EditorState {
    EditorState::new(Document::new(pages.into_iter().map(Page::new).collect()))
}

/// `len` characters cycling through the alphabet, starting at `seed`.
pub fn letters(seed: usize, len: usize) -> String {
    (0..len)
        .map(|i| char::from(b'a' + ((seed + i) % 26) as u8))
        .collect()
}

pub fn collect_diagnostics(paginator: &mut Paginator) -> Rc<RefCell<Vec<ReflowDiagnostic>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    paginator.set_diagnostic_sink(move |diag| sink.borrow_mut().push(diag));
    seen
}

/// Image sources and page breaks in document order.
pub fn atoms(doc: &Document) -> Vec<String> {
    doc.pages
        .iter()
        .flat_map(|page| page.blocks.iter())
        .filter_map(|block| match block {
            Block::Image { src, .. } => Some(src.clone()),
            Block::PageBreak => Some("<break>".to_string()),
            _ => None,
        })
        .collect()
}

/// Heuristic layout that reports some pages as not rendered yet.
pub struct HiddenPages {
    pub inner: HeuristicMeasurer,
    pub hidden: Vec<usize>,
}

impl MeasurementProvider for HiddenPages {
    fn page_content_height(&self, doc: &Document, page_index: usize) -> Option<f32> {
        self.inner.page_content_height(doc, page_index)
    }

    fn block_geometry(&self, doc: &Document, block: BlockRef) -> Option<BlockGeometry> {
        if self.hidden.contains(&block.page) {
            return None;
        }
        self.inner.block_geometry(doc, block)
    }

    fn text_prefix_bottom(&self, doc: &Document, block: BlockRef, chars: usize) -> Option<f32> {
        if self.hidden.contains(&block.page) {
            return None;
        }
        self.inner.text_prefix_bottom(doc, block, chars)
    }
}
