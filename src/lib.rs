//! Paged rich-text document model for `pageflow`.
//!
//! A [`Document`] is an ordered list of [`Page`]s, each holding [`Block`]s
//! with inline [`TextRun`]s. Every node occupies a range of one global
//! position space (see [`position`]), and all edits are expressed as
//! [`Transaction`]s committed through an [`EditorState`].
//!
//! Layout and reflow live in the `pageflow-reflow` crate.

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

pub mod error;
#[cfg(feature = "html")]
pub mod html;
pub mod logical;
pub mod model;
pub mod outline;
pub mod position;
pub mod state;
pub mod transaction;

#[cfg(feature = "html")]
pub use error::HtmlError;
pub use error::EditError;
#[cfg(feature = "html")]
pub use html::{parse_html, to_html};
pub use logical::LogicalPosition;
pub use model::{
    split_runs, Block, Document, ListKind, Mark, MarkSet, Page, TextAlign, TextRun,
};
pub use outline::{page_label, HeadingEntry, Outline};
pub use position::{NodeRef, PosContext, ResolvedPos, TextblockSpan};
pub use state::{EditorState, Selection};
pub use transaction::{Node, Step, StepMap, Transaction};
