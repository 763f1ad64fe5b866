//! Pagination and reflow for `pageflow` documents.
//!
//! After each rendered frame the [`Paginator`] asks a [`MeasurementProvider`]
//! where every block sits, then splits paragraphs, moves blocks between
//! pages and deletes empty pages until every page fits its usable height.
//! All edits go through [`pageflow::EditorState`] transactions, and the
//! selection keeps its place in the text across them.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod config;
mod detect;
mod diagnostic;
mod error;
mod measure;
mod paginator;
mod relocate;
mod split;

pub use config::{
    ReflowConfig, DEFAULT_HEADER_FOOTER_RESERVE, DEFAULT_MAX_ITERATIONS, DEFAULT_PAGE_HEIGHT,
    DEFAULT_UNDERFLOW_MARGIN,
};
pub use detect::{Detector, OverflowReason, PageStatus};
pub use diagnostic::ReflowDiagnostic;
pub use error::ReflowError;
pub use measure::{
    BlockGeometry, BlockRef, HeuristicMeasurer, HeuristicMetrics, MeasurementProvider,
};
pub use paginator::{Paginator, ReflowPhase, ReflowReport, ReflowTrigger};
pub use relocate::{
    move_block_down, move_block_up, move_blocks_down, reclaim_empty_pages, MoveOutcome,
};
pub use split::{
    find_split_offset, split_paragraph_across_pages, NotSplittable, SplitDecision, SplitOutcome,
};
