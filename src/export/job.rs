//! Cancellable background export jobs.
//!
//! One controller drives at most one export run. The worker is the single
//! writer of the job state, progress counter and message queue; the caller
//! polls them until a terminal state is observed. Terminal state and 100%
//! progress always become visible together, so a poll loop needs no
//! separate "done" flag.

use super::request::{CancelToken, ExportRequest, MessageQueue, ProgressCell};
use super::service::ProjectExportService;
use crate::models::LogMessage;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Observable state of an export job.
///
/// Transitions are forward-only: `NotStarted → Running` and
/// `Running → {Completed, Cancelled, Failed}`. No state is re-entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// The controller exists but `start` was not called yet.
    NotStarted,
    /// The worker is executing the pipeline.
    Running,
    /// The run finished; the archive path is available.
    Completed,
    /// The run observed the cancellation signal.
    Cancelled,
    /// The run failed; a diagnostic message was queued.
    Failed,
}

impl JobState {
    /// Returns true for `Completed`, `Cancelled` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Job-state cell enforcing the forward-only transition rules.
#[derive(Debug)]
struct StateCell(Mutex<JobState>);

impl StateCell {
    const fn new() -> Self {
        Self(Mutex::new(JobState::NotStarted))
    }

    fn get(&self) -> JobState {
        self.0.lock().map_or(JobState::Failed, |state| *state)
    }

    /// Applies `next` if it is a legal forward transition; returns whether
    /// the transition happened.
    fn advance(&self, next: JobState) -> bool {
        let Ok(mut state) = self.0.lock() else {
            return false;
        };
        let legal = matches!(
            (*state, next),
            (JobState::NotStarted, JobState::Running)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Cancelled)
                | (JobState::Running, JobState::Failed)
        );
        if legal {
            *state = next;
        }
        legal
    }
}

struct JobShared {
    state: StateCell,
    progress: ProgressCell,
    messages: MessageQueue,
    cancel: CancelToken,
    result: Mutex<Option<PathBuf>>,
}

/// Asynchronous controller around one project export run.
///
/// Spawns exactly one blocking worker per controller instance; the
/// foreground caller never blocks beyond enqueueing start/cancel and
/// polling.
pub struct ExportJob {
    service: Arc<ProjectExportService>,
    shared: Arc<JobShared>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ExportJob {
    /// Creates an idle controller for `service`.
    #[must_use]
    pub fn new(service: Arc<ProjectExportService>) -> Self {
        Self {
            service,
            shared: Arc::new(JobShared {
                state: StateCell::new(),
                progress: ProgressCell::new(),
                messages: MessageQueue::new(),
                cancel: CancelToken::new(),
                result: Mutex::new(None),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Starts the export worker for `request`.
    ///
    /// Must be called from within a tokio runtime. The state transitions to
    /// [`JobState::Running`] before any I/O happens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobAlreadyActive`] if this controller already ran a
    /// job (running or terminal).
    pub fn start(&self, mut request: ExportRequest) -> Result<()> {
        if !self.shared.state.advance(JobState::Running) {
            return Err(Error::JobAlreadyActive);
        }

        request = request.with_channels(
            self.shared.progress.clone(),
            self.shared.messages.clone(),
            self.shared.cancel.clone(),
        );

        let service = Arc::clone(&self.service);
        let shared = Arc::clone(&self.shared);
        let worker = tokio::task::spawn_blocking(move || run_worker(&service, &request, &shared));

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(worker);
        }
        Ok(())
    }

    /// Signals cancellation.
    ///
    /// Idempotent: cancelling twice, before start, or after a terminal state
    /// is a no-op. The worker observes the signal at its next blocking
    /// boundary; callers poll [`Self::state`] for the eventual
    /// [`JobState::Cancelled`].
    pub fn cancel(&self) {
        if self.state() == JobState::Running {
            self.shared.cancel.cancel();
        }
    }

    /// Current job state.
    #[must_use]
    pub fn state(&self) -> JobState {
        self.shared.state.get()
    }

    /// Current progress, 0–100. Reaches 100 exactly when the state turns
    /// terminal.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.shared.progress.get()
    }

    /// Removes and returns all queued messages, oldest first.
    #[must_use]
    pub fn drain_messages(&self) -> Vec<LogMessage> {
        self.shared.messages.drain()
    }

    /// Path of the produced archive, available once the state is
    /// [`JobState::Completed`].
    #[must_use]
    pub fn result_path(&self) -> Option<PathBuf> {
        self.shared
            .result
            .lock()
            .map_or(None, |result| result.clone())
    }

    /// Waits for the worker to finish and returns the terminal state.
    ///
    /// Callers that poll instead of awaiting never need this.
    pub async fn wait(&self) -> JobState {
        let handle = self.handle.lock().map_or(None, |mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.state()
    }
}

/// Worker body: one pipeline invocation, with every failure path guaranteed
/// to reach a terminal state and force progress to 100.
fn run_worker(service: &ProjectExportService, request: &ExportRequest, shared: &JobShared) {
    match service.export_project(request) {
        Ok(path) => {
            if let Ok(mut result) = shared.result.lock() {
                *result = Some(path);
            }
            shared.progress.force_complete();
            shared.state.advance(JobState::Completed);
        }
        Err(Error::Cancelled) => {
            shared
                .messages
                .push(LogMessage::info("Project export cancelled"));
            shared.progress.force_complete();
            shared.state.advance(JobState::Cancelled);
        }
        Err(err) => {
            tracing::error!(error = %err, "unexpected error during project export");
            shared.messages.push(LogMessage::error(format!(
                "Unexpected error during project export: {err}"
            )));
            shared.progress.force_complete();
            shared.state.advance(JobState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_is_forward_only() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), JobState::NotStarted);

        assert!(!cell.advance(JobState::Completed));
        assert!(cell.advance(JobState::Running));
        assert!(cell.advance(JobState::Cancelled));
        assert_eq!(cell.get(), JobState::Cancelled);

        // Terminal states are never left again.
        assert!(!cell.advance(JobState::Running));
        assert!(!cell.advance(JobState::Failed));
        assert_eq!(cell.get(), JobState::Cancelled);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::NotStarted.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn test_job_state_display() {
        assert_eq!(JobState::NotStarted.to_string(), "NOT_STARTED");
        assert_eq!(JobState::Cancelled.to_string(), "CANCELLED");
    }
}
