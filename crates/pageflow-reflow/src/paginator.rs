//! Reflow scheduling and the convergence loop.
//!
//! Hosts call [`ReflowTrigger::notify_document_changed`] after every
//! committed edit and [`Paginator::on_frame`] once per rendered frame, after
//! layout, so the measurement provider sees current geometry. A pass runs to
//! completion synchronously inside `on_frame`.

use core::fmt;
use std::cell::Cell;
use std::rc::Rc;

use pageflow::{EditorState, LogicalPosition, Selection};
use serde::{Deserialize, Serialize};

use crate::config::ReflowConfig;
use crate::detect::{Detector, OverflowReason, PageStatus};
use crate::diagnostic::{DiagnosticSink, ReflowDiagnostic};
use crate::error::ReflowError;
use crate::measure::{BlockRef, HeuristicMeasurer, MeasurementProvider};
use crate::relocate::{move_block_down, move_block_up, move_blocks_down, reclaim_empty_pages};
use crate::split::{find_split_offset, split_paragraph_across_pages, NotSplittable, SplitDecision};

/// Scheduler state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflowPhase {
    #[default]
    Idle,
    /// A pass will run on the next frame.
    Scheduled,
    Running,
}

#[derive(Debug, Default)]
struct TriggerState {
    phase: Cell<ReflowPhase>,
    pending: Cell<bool>,
    notifications: Cell<usize>,
}

/// Shared handle used to request reflow passes.
///
/// Clones share state. Requests made while a pass is running are coalesced
/// into one follow-up pass.
#[derive(Clone, Debug, Default)]
pub struct ReflowTrigger {
    inner: Rc<TriggerState>,
}

impl ReflowTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ReflowPhase {
        self.inner.phase.get()
    }

    pub fn is_scheduled(&self) -> bool {
        self.phase() == ReflowPhase::Scheduled
    }

    /// Record that the document changed.
    pub fn notify_document_changed(&self) {
        match self.phase() {
            ReflowPhase::Idle => {
                self.inner.phase.set(ReflowPhase::Scheduled);
                log::trace!("[REFLOW] pass scheduled");
            }
            ReflowPhase::Scheduled => {}
            ReflowPhase::Running => {
                self.inner.pending.set(true);
                self.inner
                    .notifications
                    .set(self.inner.notifications.get() + 1);
            }
        }
    }

    fn begin(&self) -> bool {
        if self.phase() == ReflowPhase::Running {
            return false;
        }
        self.inner.phase.set(ReflowPhase::Running);
        self.inner.pending.set(false);
        self.inner.notifications.set(0);
        true
    }

    fn request_follow_up(&self) {
        self.inner.pending.set(true);
    }

    /// Leave `Running`; returns the number of coalesced notifications.
    fn finish(&self) -> usize {
        let next = if self.inner.pending.replace(false) {
            ReflowPhase::Scheduled
        } else {
            ReflowPhase::Idle
        };
        self.inner.phase.set(next);
        self.inner.notifications.replace(0)
    }
}

/// Summary of one reflow pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflowReport {
    /// Detect/resolve iterations run.
    pub iterations: usize,
    pub splits: usize,
    /// Blocks moved to a following page.
    pub moves_down: usize,
    /// Blocks pulled up to fill underflow.
    pub moves_up: usize,
    pub pages_created: usize,
    pub pages_reclaimed: usize,
    /// The last iteration found nothing to change.
    pub converged: bool,
    /// Pages skipped because they could not be measured.
    pub skipped_pages: Vec<usize>,
    /// The pass committed at least one transaction.
    pub mutated: bool,
}

/// Reflow orchestrator.
pub struct Paginator {
    config: ReflowConfig,
    provider: Rc<dyn MeasurementProvider>,
    trigger: ReflowTrigger,
    diagnostic_sink: DiagnosticSink,
}

impl fmt::Debug for Paginator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Paginator")
            .field("config", &self.config)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(ReflowConfig::default())
    }
}

impl Paginator {
    /// Create a paginator measuring with [`HeuristicMeasurer`] defaults.
    pub fn new(config: ReflowConfig) -> Self {
        Self {
            config,
            provider: Rc::new(HeuristicMeasurer::default()),
            trigger: ReflowTrigger::new(),
            diagnostic_sink: None,
        }
    }

    /// Replace the measurement provider.
    pub fn with_measurement_provider(mut self, provider: Rc<dyn MeasurementProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Share an existing trigger handle.
    pub fn with_trigger(mut self, trigger: ReflowTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_diagnostic_sink<F>(mut self, sink: F) -> Self
    where
        F: FnMut(ReflowDiagnostic) + 'static,
    {
        self.set_diagnostic_sink(sink);
        self
    }

    /// Register or replace the diagnostics sink.
    pub fn set_diagnostic_sink<F>(&mut self, sink: F)
    where
        F: FnMut(ReflowDiagnostic) + 'static,
    {
        self.diagnostic_sink = Some(Box::new(sink));
    }

    fn emit_diagnostic(&mut self, diagnostic: ReflowDiagnostic) {
        if let Some(sink) = self.diagnostic_sink.as_mut() {
            sink(diagnostic);
        }
    }

    pub fn config(&self) -> ReflowConfig {
        self.config
    }

    /// Handle for editing code to report changes.
    pub fn trigger(&self) -> ReflowTrigger {
        self.trigger.clone()
    }

    /// Frame-boundary callback: runs a pass only if one is scheduled.
    pub fn on_frame(&mut self, state: &mut EditorState) -> Option<ReflowReport> {
        if !self.trigger.is_scheduled() {
            return None;
        }
        self.run_pass(state)
    }

    /// Run one pass now. Returns `None` if a pass is already running; the
    /// request is then folded into the pending follow-up.
    pub fn run_pass(&mut self, state: &mut EditorState) -> Option<ReflowReport> {
        if !self.trigger.begin() {
            log::debug!("[REFLOW] pass requested while running; coalesced");
            self.trigger.notify_document_changed();
            return None;
        }
        let report = self.reflow(state);
        let notifications = self.trigger.finish();
        if notifications > 0 {
            log::debug!(
                "[REFLOW] {} change notification(s) during pass; follow-up scheduled",
                notifications
            );
            self.emit_diagnostic(ReflowDiagnostic::PassCoalesced { notifications });
        }
        Some(report)
    }

    /// Schedule a pass and keep running frames until the scheduler is idle
    /// or `max_frames` passes ran.
    pub fn run_until_idle(
        &mut self,
        state: &mut EditorState,
        max_frames: usize,
    ) -> Vec<ReflowReport> {
        self.trigger.notify_document_changed();
        let mut reports = Vec::new();
        for _ in 0..max_frames {
            match self.on_frame(state) {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        reports
    }

    fn reflow(&mut self, state: &mut EditorState) -> ReflowReport {
        let start_version = state.version();
        let selection = state.selection();
        let anchor = LogicalPosition::capture(state.doc(), selection.anchor);
        let head = LogicalPosition::capture(state.doc(), selection.head);

        let mut report = ReflowReport::default();
        let mut oversized: Vec<BlockRef> = Vec::new();
        let cap = self.config.iteration_cap();
        let mut changed = true;
        while changed && report.iterations < cap {
            report.iterations += 1;
            changed = self.fix_first_issue(state, &mut report, &mut oversized);
        }
        report.converged = !changed;
        if changed {
            log::warn!(
                "[REFLOW] iteration cap reached after {} iterations; scheduling follow-up",
                report.iterations
            );
            self.emit_diagnostic(ReflowDiagnostic::IterationCapReached {
                iterations: report.iterations,
            });
            self.trigger.request_follow_up();
        }

        restore_selection(state, anchor, head);
        let restored = state.selection();
        let active_page = state.doc().page_index_at(restored.anchor);
        let head_page = state.doc().page_index_at(restored.head);
        match reclaim_empty_pages(state, &[active_page, head_page]) {
            Ok(removed) => {
                report.pages_reclaimed = removed;
                if removed > 0 {
                    // Pages that were apart are now neighbours and may underflow.
                    self.trigger.request_follow_up();
                }
            }
            Err(err) => self.edit_rejected(active_page, "reclaim", &err),
        }
        restore_selection(state, anchor, head);

        report.mutated = state.version() != start_version;
        log::debug!(
            "[REFLOW] pass done iterations={} splits={} down={} up={} created={} reclaimed={} converged={} pages={}",
            report.iterations,
            report.splits,
            report.moves_down,
            report.moves_up,
            report.pages_created,
            report.pages_reclaimed,
            report.converged,
            state.doc().page_count()
        );
        report
    }

    /// One scan over all pages: resolve the first overflow, else fill the
    /// first underflow. Returns whether the document changed.
    fn fix_first_issue(
        &mut self,
        state: &mut EditorState,
        report: &mut ReflowReport,
        oversized: &mut Vec<BlockRef>,
    ) -> bool {
        let provider = Rc::clone(&self.provider);
        let detector = Detector::new(provider.as_ref(), self.config);
        let mut underflow_pages = Vec::new();

        for page in 0..state.doc().page_count() {
            match detector.classify(state.doc(), page) {
                PageStatus::Overflow { block, reason } => {
                    let at = BlockRef::new(page, block);
                    if self.resolve_overflow(state, &detector, at, reason, report, oversized) {
                        return true;
                    }
                }
                PageStatus::Underflow { .. } => underflow_pages.push(page),
                PageStatus::Unmeasurable { block } => {
                    if !report.skipped_pages.contains(&page) {
                        report.skipped_pages.push(page);
                        log::warn!(
                            "[REFLOW] page={} block={} not measurable; skipping page",
                            page,
                            block
                        );
                        self.emit_diagnostic(ReflowDiagnostic::PageUnmeasurable {
                            page_index: page,
                            block_index: block,
                        });
                    }
                }
                PageStatus::Stable => {}
            }
        }

        for page in underflow_pages {
            match move_block_up(state, BlockRef::new(page + 1, 0), page) {
                Ok(_) => {
                    report.moves_up += 1;
                    return true;
                }
                Err(err) => self.edit_rejected(page, "move_up", &err),
            }
        }
        false
    }

    fn resolve_overflow(
        &mut self,
        state: &mut EditorState,
        detector: &Detector<'_>,
        at: BlockRef,
        reason: OverflowReason,
        report: &mut ReflowReport,
        oversized: &mut Vec<BlockRef>,
    ) -> bool {
        if reason == OverflowReason::ForcedBreak {
            return self.relocate(state, at, report);
        }

        let max = detector.max_height(state.doc(), at.page);
        let decision = find_split_offset(self.provider.as_ref(), state.doc(), at, max);
        match decision {
            SplitDecision::Split { offset } => {
                match split_paragraph_across_pages(state, at, offset) {
                    Ok(outcome) => {
                        report.splits += 1;
                        report.moves_down += outcome.tail_blocks;
                        if outcome.page_created {
                            report.pages_created += 1;
                        }
                        return true;
                    }
                    Err(err) => {
                        self.edit_rejected(at.page, "split", &err);
                        return false;
                    }
                }
            }
            SplitDecision::NotSplittable(NotSplittable::EmptyFragment { offset, text_len }) => {
                self.split_rejected(at, Some(offset), text_len);
            }
            SplitDecision::NotSplittable(NotSplittable::NoOverflowPoint) => {
                let text_len = state
                    .doc()
                    .block(at.page, at.block)
                    .map(|block| block.text_len())
                    .unwrap_or(0);
                self.split_rejected(at, None, text_len);
            }
            SplitDecision::NotSplittable(NotSplittable::NotParagraph) => {}
        }

        if at.block > 0 {
            return self.relocate(state, at, report);
        }

        // The first block alone is taller than the page: keep it and push
        // whatever follows it instead.
        if !oversized.contains(&at) {
            oversized.push(at);
            log::warn!(
                "[REFLOW] page={} first block exceeds usable height {}; leaving it alone",
                at.page,
                max
            );
            self.emit_diagnostic(ReflowDiagnostic::OversizedBlock {
                page_index: at.page,
                block_index: at.block,
            });
        }
        let has_followers = state
            .doc()
            .page(at.page)
            .is_some_and(|page| page.blocks.len() > 1);
        if has_followers {
            return self.relocate(state, BlockRef::new(at.page, 1), report);
        }
        false
    }

    /// Move `at` (and anything after it on the page) to the next page.
    fn relocate(
        &mut self,
        state: &mut EditorState,
        at: BlockRef,
        report: &mut ReflowReport,
    ) -> bool {
        let is_last = state
            .doc()
            .page(at.page)
            .is_some_and(|page| at.block + 1 == page.blocks.len());
        let result = if is_last {
            move_block_down(state, at)
        } else {
            move_blocks_down(state, at)
        };
        match result {
            Ok(outcome) => {
                report.moves_down += outcome.blocks_moved;
                if outcome.page_created {
                    report.pages_created += 1;
                }
                true
            }
            Err(err) => {
                self.edit_rejected(at.page, "move_down", &err);
                false
            }
        }
    }

    fn split_rejected(&mut self, at: BlockRef, offset: Option<usize>, text_len: usize) {
        log::debug!(
            "[REFLOW] page={} block={} split rejected offset={:?} len={}; moving whole block",
            at.page,
            at.block,
            offset,
            text_len
        );
        self.emit_diagnostic(ReflowDiagnostic::SplitRejected {
            page_index: at.page,
            block_index: at.block,
            offset,
            text_len,
        });
    }

    fn edit_rejected(&mut self, page_index: usize, operation: &'static str, err: &ReflowError) {
        log::warn!(
            "[REFLOW] {} on page {} rejected: {}",
            operation,
            page_index,
            err
        );
        self.emit_diagnostic(ReflowDiagnostic::EditRejected {
            page_index,
            operation,
            error: err.to_string(),
        });
    }
}

fn restore_selection(state: &mut EditorState, anchor: LogicalPosition, head: LogicalPosition) {
    let doc = state.doc();
    let selection = Selection::new(anchor.resolve(doc), head.resolve(doc));
    state.set_selection(selection);
}
