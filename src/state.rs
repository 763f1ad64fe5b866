//! Editor state: the current document, selection and version counter.

use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::model::{Document, MarkSet};
use crate::position::{NodeRef, ResolvedPos};
use crate::transaction::{Step, Transaction};

/// Anchor/head pair of global positions. A collapsed selection is a cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Map both ends through a transaction's steps.
    pub fn map(&self, tr: &Transaction) -> Self {
        Self {
            anchor: tr.map(self.anchor),
            head: tr.map(self.head),
        }
    }

    /// Move both ends onto valid cursor positions of `doc`.
    pub fn snapped(&self, doc: &Document) -> Self {
        Self {
            anchor: doc.nearest_text_position(self.anchor),
            head: doc.nearest_text_position(self.head),
        }
    }
}

/// Single owner of the document being edited.
///
/// All changes go through [`EditorState::apply`]; each committed transaction
/// bumps [`EditorState::version`].
#[derive(Clone, Debug)]
pub struct EditorState {
    doc: Document,
    selection: Selection,
    version: u64,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl EditorState {
    /// New state with the cursor at the first valid text position.
    pub fn new(doc: Document) -> Self {
        let selection = Selection::cursor(doc.nearest_text_position(0));
        Self {
            doc,
            selection,
            version: 0,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Number of committed document-changing transactions.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Start a transaction against the current document.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.version, self.doc.clone())
    }

    /// Commit a transaction.
    ///
    /// Fails with [`EditError::StaleTransaction`] if another transaction was
    /// committed after this one was started. Without an explicit selection
    /// the current one is mapped through the steps.
    pub fn apply(&mut self, tr: Transaction) -> Result<(), EditError> {
        if tr.base_version() != self.version {
            return Err(EditError::StaleTransaction {
                expected: tr.base_version(),
                actual: self.version,
            });
        }
        let mapped = tr.selection().unwrap_or_else(|| self.selection.map(&tr));
        let (_, doc, steps, _) = tr.into_parts();
        if !steps.is_empty() {
            self.doc = doc;
            self.version += 1;
            log::trace!(
                "[EDIT] committed {} step(s) version={} pages={}",
                steps.len(),
                self.version,
                self.doc.page_count()
            );
        }
        self.selection = mapped.snapped(&self.doc);
        Ok(())
    }

    /// Build and commit a transaction from raw steps.
    pub fn apply_steps<I>(
        &mut self,
        steps: I,
        selection: Option<Selection>,
    ) -> Result<(), EditError>
    where
        I: IntoIterator<Item = Step>,
    {
        let mut tr = self.transaction();
        for step in steps {
            tr.step(step)?;
        }
        if let Some(selection) = selection {
            tr.set_selection(selection);
        }
        self.apply(tr)
    }

    /// Replace the selection without touching the document.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.snapped(&self.doc);
    }

    pub fn resolve_position(&self, pos: usize) -> Option<ResolvedPos> {
        self.doc.resolve(pos)
    }

    pub fn node_at(&self, pos: usize) -> Option<NodeRef<'_>> {
        self.doc.node_at(pos)
    }

    /// Type text at the cursor, replacing a selection inside one textblock.
    pub fn insert_text(&mut self, text: &str, marks: MarkSet) -> Result<(), EditError> {
        let mut tr = self.transaction();
        let mut at = self.selection.head;
        if !self.selection.is_empty() {
            tr.delete(self.selection.from(), self.selection.to())?;
            at = self.selection.from();
        }
        tr.insert_text(at, text, marks)?;
        let end = at + text.chars().count();
        tr.set_selection(Selection::cursor(end));
        self.apply(tr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Page};

    fn state() -> EditorState {
        EditorState::new(Document::new(vec![
            Page::new(vec![Block::paragraph("hello")]),
            Page::new(vec![Block::paragraph("world")]),
        ]))
    }

    #[test]
    fn new_state_places_cursor_in_first_textblock() {
        let state = state();
        assert_eq!(state.selection(), Selection::cursor(2));
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn apply_bumps_version_and_maps_selection() {
        let mut state = state();
        // Cursor inside "world" (page 1 starts at 9, text at 11).
        state.set_selection(Selection::cursor(13));
        let mut tr = state.transaction();
        tr.insert_text(2, ">>", MarkSet::new()).expect("insert");
        state.apply(tr).expect("commit");
        assert_eq!(state.version(), 1);
        assert_eq!(state.selection(), Selection::cursor(15));
        assert_eq!(state.doc().pages[0].blocks[0].text(), ">>hello");
    }

    #[test]
    fn stale_transactions_are_rejected() {
        let mut state = state();
        let first = state.transaction();
        let mut second = state.transaction();
        second
            .insert_text(2, "x", MarkSet::new())
            .expect("insert");
        state.apply(second).expect("commit");
        assert_eq!(
            state.apply(first).err(),
            Some(EditError::StaleTransaction {
                expected: 0,
                actual: 1
            })
        );
    }

    #[test]
    fn failed_step_leaves_state_untouched() {
        let mut state = state();
        let before = state.doc().clone();
        let result = state.apply_steps(
            [
                Step::InsertText {
                    pos: 2,
                    text: "ok".into(),
                    marks: MarkSet::new(),
                },
                Step::Delete { from: 3, to: 12 },
            ],
            None,
        );
        assert!(result.is_err());
        assert_eq!(state.doc(), &before);
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn set_selection_snaps_and_keeps_version() {
        let mut state = state();
        state.set_selection(Selection::new(0, 9));
        assert_eq!(state.selection(), Selection::new(2, 11));
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn typing_replaces_selected_text() {
        let mut state = state();
        state.set_selection(Selection::new(2, 7));
        state.insert_text("bye", MarkSet::new()).expect("type");
        assert_eq!(state.doc().pages[0].blocks[0].text(), "bye");
        assert_eq!(state.selection(), Selection::cursor(5));
    }
}
