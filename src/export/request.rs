//! Run requests and the shared values polled by the caller.
//!
//! A run's worker is the single writer of the progress counter and message
//! queue; the caller polls them through cloned handles. Monotonicity of the
//! progress counter is enforced by the cell itself, not by caller
//! discipline.

use crate::models::{LogMessage, Project};
use crate::{Error, Result};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// Shared progress counter, 0–100.
///
/// Writes go through `fetch_max`, so observed values form a non-decreasing
/// sequence no matter what the units report.
#[derive(Clone, Debug, Default)]
pub struct ProgressCell(Arc<AtomicU8>);

impl ProgressCell {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    /// Raises the counter to `value` (never lowers it). Values above 100 are
    /// clamped.
    pub fn advance_to(&self, value: u8) {
        self.0.fetch_max(value.min(100), Ordering::AcqRel);
    }

    /// Forces the counter to 100 so pollers unblock.
    pub fn force_complete(&self) {
        self.advance_to(100);
    }
}

/// Ordered, thread-safe message queue drained destructively by the caller.
#[derive(Clone, Debug, Default)]
pub struct MessageQueue(Arc<Mutex<VecDeque<LogMessage>>>);

impl MessageQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message, preserving emission order.
    pub fn push(&self, message: LogMessage) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push_back(message);
        }
    }

    /// Removes and returns all queued messages, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<LogMessage> {
        self.0
            .lock()
            .map_or_else(|_| Vec::new(), |mut queue| queue.drain(..).collect())
    }

    /// Returns true if no messages are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_ok_and(|queue| queue.is_empty())
    }
}

/// Explicit cooperative cancellation token.
///
/// Units check it at every blocking boundary (per document, per archive
/// entry); cancellation is advisory and observed eventually, not instantly.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns [`Error::Cancelled`] once cancellation was signalled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress span allocated to the currently running unit.
#[derive(Clone, Copy, Debug, Default)]
struct ProgressSpan {
    floor: u8,
    weight: u8,
}

/// Request driving one export run.
///
/// Created by the caller, threaded through every unit, polled until the run
/// reaches a terminal state.
pub struct ExportRequest {
    /// The project to export.
    pub project: Project,
    /// Requested secondary-export format id, or [`crate::FORMAT_AUTO`].
    pub format: String,
    /// Whether `CURATION_IN_PROGRESS` documents are included next to the
    /// finished ones.
    pub include_in_progress: bool,
    progress: ProgressCell,
    messages: MessageQueue,
    cancel: CancelToken,
    span: Cell<ProgressSpan>,
}

impl ExportRequest {
    /// Creates a request for `project` with the given format selection.
    #[must_use]
    pub fn new(project: Project, format: impl Into<String>, include_in_progress: bool) -> Self {
        Self {
            project,
            format: format.into(),
            include_in_progress,
            progress: ProgressCell::new(),
            messages: MessageQueue::new(),
            cancel: CancelToken::new(),
            span: Cell::new(ProgressSpan::default()),
        }
    }

    /// Current overall progress, 0–100.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    /// Appends a message to the run's queue.
    pub fn add_message(&self, message: LogMessage) {
        self.messages.push(message);
    }

    /// Clones the progress handle for polling.
    #[must_use]
    pub fn progress_handle(&self) -> ProgressCell {
        self.progress.clone()
    }

    /// Clones the message-queue handle for draining.
    #[must_use]
    pub fn message_queue(&self) -> MessageQueue {
        self.messages.clone()
    }

    /// Clones the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns [`Error::Cancelled`] once the run was cancelled; units call
    /// this at every blocking boundary.
    pub fn check_cancelled(&self) -> Result<()> {
        self.cancel.check()
    }

    /// Rebinds the request's shared values to a controller's handles, so the
    /// controller the caller already holds stays authoritative for polling.
    #[must_use]
    pub(crate) fn with_channels(
        mut self,
        progress: ProgressCell,
        messages: MessageQueue,
        cancel: CancelToken,
    ) -> Self {
        self.progress = progress;
        self.messages = messages;
        self.cancel = cancel;
        self
    }

    /// Allocates the progress span for the next unit. Called by the pipeline
    /// before each unit runs.
    pub(crate) fn begin_unit_span(&self, weight: u8) {
        self.span.set(ProgressSpan {
            floor: self.progress.get(),
            weight,
        });
    }

    /// Reports that `done` of `total` work items of the current unit are
    /// finished.
    ///
    /// Progress becomes `floor + ceil(done / total * weight)`. With
    /// `total == 0` the update is skipped entirely, keeping the counter
    /// monotonic.
    pub fn update_unit_progress(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let span = self.span.get();
        let weight = usize::from(span.weight);
        let step = (done.min(total) * weight).div_ceil(total);
        // step <= weight <= 100, so the sum stays within u8 range.
        self.progress.advance_to(span.floor.saturating_add(step as u8));
    }

    /// Closes the current unit's span, raising progress to its upper bound.
    pub(crate) fn finish_unit_span(&self) {
        let span = self.span.get();
        self.progress.advance_to(span.floor.saturating_add(span.weight));
    }
}

/// Request driving one import run.
pub struct ImportRequest {
    messages: MessageQueue,
    cancel: CancelToken,
}

impl ImportRequest {
    /// Creates an import request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: MessageQueue::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Appends a message to the run's queue.
    pub fn add_message(&self, message: LogMessage) {
        self.messages.push(message);
    }

    /// Clones the message-queue handle for draining.
    #[must_use]
    pub fn message_queue(&self) -> MessageQueue {
        self.messages.clone()
    }

    /// Clones the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns [`Error::Cancelled`] once the run was cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        self.cancel.check()
    }
}

impl Default for ImportRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FORMAT_AUTO;

    fn request() -> ExportRequest {
        ExportRequest::new(Project::new("p1"), FORMAT_AUTO, false)
    }

    #[test]
    fn test_progress_cell_is_monotonic() {
        let cell = ProgressCell::new();
        cell.advance_to(40);
        cell.advance_to(10);
        assert_eq!(cell.get(), 40);
        cell.advance_to(200);
        assert_eq!(cell.get(), 100);
    }

    #[test]
    fn test_unit_progress_formula() {
        let req = request();
        req.begin_unit_span(10);

        let mut observed = Vec::new();
        for done in 1..=4 {
            req.update_unit_progress(done, 4);
            observed.push(req.progress());
        }

        // ceil(1/4*10)=3, ceil(2/4*10)=5, ceil(3/4*10)=8, ceil(4/4*10)=10
        assert_eq!(observed, vec![3, 5, 8, 10]);
    }

    #[test]
    fn test_unit_progress_skips_empty_unit() {
        let req = request();
        req.begin_unit_span(50);
        req.update_unit_progress(0, 0);
        assert_eq!(req.progress(), 0);

        req.finish_unit_span();
        assert_eq!(req.progress(), 50);
    }

    #[test]
    fn test_spans_stack_across_units() {
        let req = request();
        req.begin_unit_span(30);
        req.update_unit_progress(2, 2);
        req.finish_unit_span();
        assert_eq!(req.progress(), 30);

        req.begin_unit_span(70);
        req.update_unit_progress(1, 2);
        assert_eq!(req.progress(), 65);
        req.finish_unit_span();
        assert_eq!(req.progress(), 100);
    }

    #[test]
    fn test_message_queue_drains_fifo() {
        let queue = MessageQueue::new();
        queue.push(crate::models::LogMessage::info("first"));
        queue.push(crate::models::LogMessage::warn("second"));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "first");
        assert_eq!(drained[1].message, "second");
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        token.cancel();
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }
}
