//! Indivisible edits expressed as delete/insert steps.
//!
//! A [`Transaction`] carries a working copy of the document. Every step is
//! validated and applied to that copy immediately, so the positions of a
//! later step always refer to the document produced by the earlier steps.
//! Nothing reaches the editor state until [`crate::EditorState::apply`]
//! commits the whole transaction.

use crate::error::EditError;
use crate::model::{Block, Document, MarkSet, Page};
use crate::position::PosContext;
use crate::state::Selection;

/// Node payload of an insert step.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Page(Page),
    Block(Block),
}

impl Node {
    pub fn node_size(&self) -> usize {
        match self {
            Self::Page(page) => page.node_size(),
            Self::Block(block) => block.node_size(),
        }
    }
}

impl From<Page> for Node {
    fn from(value: Page) -> Self {
        Self::Page(value)
    }
}

impl From<Block> for Node {
    fn from(value: Block) -> Self {
        Self::Block(value)
    }
}

/// One primitive edit.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Remove whole pages, whole blocks of one page, or text of one textblock.
    Delete { from: usize, to: usize },
    /// Insert a page at a page boundary or a block at a block boundary.
    Insert { pos: usize, node: Node },
    /// Insert text inside a textblock.
    InsertText {
        pos: usize,
        text: String,
        marks: MarkSet,
    },
}

impl Step {
    /// Apply to `doc`, leaving it untouched on error.
    pub fn apply(&self, doc: &mut Document) -> Result<StepMap, EditError> {
        match self {
            Self::Delete { from, to } => apply_delete(doc, *from, *to),
            Self::Insert { pos, node } => apply_insert(doc, *pos, node),
            Self::InsertText { pos, text, marks } => apply_insert_text(doc, *pos, text, marks),
        }
    }
}

fn apply_delete(doc: &mut Document, from: usize, to: usize) -> Result<StepMap, EditError> {
    let invalid = EditError::InvalidRange { from, to };
    if from >= to {
        return Err(invalid);
    }
    let start = doc.resolve(from).ok_or(invalid.clone())?;
    let end = doc.resolve(to).ok_or(invalid.clone())?;

    match (start.context, end.context) {
        (PosContext::BetweenPages { index: first }, PosContext::BetweenPages { index: last }) => {
            if last - first >= doc.pages.len() {
                return Err(EditError::EmptyDocument);
            }
            doc.pages.drain(first..last);
        }
        (
            PosContext::BetweenBlocks {
                page,
                index: first,
            },
            PosContext::BetweenBlocks {
                page: end_page,
                index: last,
            },
        ) if page == end_page => {
            doc.pages[page].blocks.drain(first..last);
        }
        (
            PosContext::Text {
                page,
                block,
                offset: first,
            },
            PosContext::Text {
                page: end_page,
                block: end_block,
                offset: last,
            },
        ) if page == end_page && block == end_block => {
            let target = doc.pages[page]
                .blocks
                .get_mut(block)
                .ok_or(invalid.clone())?;
            if !target.delete_text(first, last) {
                return Err(invalid);
            }
        }
        _ => return Err(invalid),
    }

    Ok(StepMap {
        start: from,
        old_size: to - from,
        new_size: 0,
    })
}

fn apply_insert(doc: &mut Document, pos: usize, node: &Node) -> Result<StepMap, EditError> {
    let resolved = doc.resolve(pos);
    match (node, resolved.map(|r| r.context)) {
        (Node::Page(page), Some(PosContext::BetweenPages { index })) => {
            doc.pages.insert(index, page.clone());
        }
        (Node::Block(block), Some(PosContext::BetweenBlocks { page, index })) => {
            doc.pages[page].blocks.insert(index, block.clone());
        }
        (Node::Page(_), _) => {
            return Err(EditError::InvalidPosition {
                pos,
                expected: "a page boundary",
            })
        }
        (Node::Block(_), _) => {
            return Err(EditError::InvalidPosition {
                pos,
                expected: "a block boundary inside a page",
            })
        }
    }
    Ok(StepMap {
        start: pos,
        old_size: 0,
        new_size: node.node_size(),
    })
}

fn apply_insert_text(
    doc: &mut Document,
    pos: usize,
    text: &str,
    marks: &MarkSet,
) -> Result<StepMap, EditError> {
    let not_text = EditError::InvalidPosition {
        pos,
        expected: "inside a textblock",
    };
    let Some(PosContext::Text {
        page,
        block,
        offset,
    }) = doc.resolve(pos).map(|r| r.context)
    else {
        return Err(not_text);
    };
    let target = doc.pages[page].blocks.get_mut(block).ok_or(not_text.clone())?;
    if !target.insert_text(offset, text, marks) {
        return Err(not_text);
    }
    Ok(StepMap {
        start: pos,
        old_size: 0,
        new_size: text.chars().count(),
    })
}

/// Position shift produced by one step: `old_size` units at `start` were
/// replaced by `new_size` units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    /// Map a position from before the step to after it.
    ///
    /// Positions inside a deleted range collapse to its end side; a position
    /// exactly at an insertion point moves past the inserted content.
    pub fn map(&self, pos: usize) -> usize {
        if pos < self.start {
            return pos;
        }
        let end = self.start + self.old_size;
        if pos > end {
            return pos - self.old_size + self.new_size;
        }
        if self.old_size > 0 && pos == self.start {
            return self.start;
        }
        self.start + self.new_size
    }
}

/// Ordered steps applied as one indivisible edit.
#[derive(Clone, Debug)]
pub struct Transaction {
    base_version: u64,
    doc: Document,
    steps: Vec<Step>,
    maps: Vec<StepMap>,
    selection: Option<Selection>,
}

impl Transaction {
    pub(crate) fn new(base_version: u64, doc: Document) -> Self {
        Self {
            base_version,
            doc,
            steps: Vec::with_capacity(4),
            maps: Vec::with_capacity(4),
            selection: None,
        }
    }

    /// Document as it looks after the steps added so far.
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Explicit post-edit selection, if one was set.
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Validate and apply a step to the working document.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, EditError> {
        let map = step.apply(&mut self.doc)?;
        self.steps.push(step);
        self.maps.push(map);
        Ok(self)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, EditError> {
        self.step(Step::Delete { from, to })
    }

    pub fn insert(&mut self, pos: usize, node: impl Into<Node>) -> Result<&mut Self, EditError> {
        self.step(Step::Insert {
            pos,
            node: node.into(),
        })
    }

    pub fn insert_text(
        &mut self,
        pos: usize,
        text: &str,
        marks: MarkSet,
    ) -> Result<&mut Self, EditError> {
        self.step(Step::InsertText {
            pos,
            text: text.to_string(),
            marks,
        })
    }

    /// Replace the node range `from..to` with `node`.
    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        node: impl Into<Node>,
    ) -> Result<&mut Self, EditError> {
        self.delete(from, to)?;
        self.insert(from, node)
    }

    /// Set the selection to install when the transaction commits.
    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection);
        self
    }

    /// Map a position from the base document through every step.
    pub fn map(&self, pos: usize) -> usize {
        self.maps.iter().fold(pos, |acc, map| map.map(acc))
    }

    pub(crate) fn into_parts(self) -> (u64, Document, Vec<Step>, Option<Selection>) {
        (self.base_version, self.doc, self.steps, self.selection)
    }
}
