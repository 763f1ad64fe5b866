use serde::Serialize;

/// Runtime diagnostics from reflow passes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReflowDiagnostic {
    /// The pass stopped at the iteration cap before reaching a fixed point.
    IterationCapReached { iterations: usize },
    /// A block could not be measured; its page was skipped for this pass.
    PageUnmeasurable { page_index: usize, block_index: usize },
    /// The provider's split offset was unusable; the block moved whole.
    SplitRejected {
        page_index: usize,
        block_index: usize,
        offset: Option<usize>,
        text_len: usize,
    },
    /// The first block of a page is taller than the page on its own.
    OversizedBlock { page_index: usize, block_index: usize },
    /// A relocation or split transaction failed and was skipped.
    EditRejected {
        page_index: usize,
        operation: &'static str,
        error: String,
    },
    /// Change notifications arrived mid-pass; a follow-up pass is scheduled.
    PassCoalesced { notifications: usize },
}

pub(crate) type DiagnosticSink = Option<Box<dyn FnMut(ReflowDiagnostic)>>;
