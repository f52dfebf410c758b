//! Synchronous pipeline execution over resolved unit orders.

use super::manifest::ExportedProjectManifest;
use super::request::{ExportRequest, ImportRequest};
use super::resolver::{self, Direction};
use super::unit::ProjectExporter;
use crate::archive::ProjectArchive;
use crate::models::Project;
use crate::Result;
use std::path::Path;
use std::sync::Arc;

/// State of one pipeline run.
///
/// Forward-only: `Pending → Running → {Succeeded, Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet started.
    Pending,
    /// Units are executing.
    Running,
    /// All units completed.
    Succeeded,
    /// A unit raised an unrecoverable error (or the run was cancelled).
    Failed,
}

/// Allocates each of `count` units a share of the 0–100 progress range.
///
/// Shares sum to exactly 100; the remainder of the division goes to the
/// earliest units.
fn progress_weights(count: usize) -> Vec<u8> {
    if count == 0 {
        return Vec::new();
    }
    let base = 100 / count;
    let remainder = 100 % count;
    (0..count)
        .map(|index| {
            let weight = base + usize::from(index < remainder);
            // count >= 1, so each share fits in a u8.
            weight as u8
        })
        .collect()
}

/// One export run: resolves the unit order, then executes units strictly in
/// order against a staging tree.
pub struct ExportPipeline {
    units: Vec<Arc<dyn ProjectExporter>>,
    state: RunState,
}

impl ExportPipeline {
    /// Creates a pending run over the selected units.
    #[must_use]
    pub fn new(units: Vec<Arc<dyn ProjectExporter>>) -> Self {
        Self {
            units,
            state: RunState::Pending,
        }
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Runs all units in resolved order.
    ///
    /// Configuration errors (dependency cycles) are reported before any unit
    /// executes. The first unit error stops the run; already staged files
    /// are left for the caller to discard wholesale. The progress counter is
    /// guaranteed to reach 100 on success and on terminal failure.
    pub fn run(
        &mut self,
        request: &ExportRequest,
        manifest: &mut ExportedProjectManifest,
        stage: &Path,
    ) -> Result<()> {
        let ordered = resolver::resolve_order(&self.units, Direction::Export)?;
        let weights = progress_weights(ordered.len());
        self.state = RunState::Running;

        for (unit, weight) in ordered.iter().zip(weights) {
            if let Err(err) = request
                .check_cancelled()
                .and_then(|()| {
                    tracing::debug!(unit = unit.id(), "running exporter");
                    request.begin_unit_span(weight);
                    unit.export_data(request, manifest, stage)
                })
            {
                self.state = RunState::Failed;
                request.progress_handle().force_complete();
                return Err(err);
            }
            request.finish_unit_span();
        }

        self.state = RunState::Succeeded;
        request.progress_handle().force_complete();
        Ok(())
    }
}

/// One import run: the mirror image of [`ExportPipeline`], consuming an
/// opened archive.
pub struct ImportPipeline {
    units: Vec<Arc<dyn ProjectExporter>>,
    state: RunState,
}

impl ImportPipeline {
    /// Creates a pending run over the selected units.
    #[must_use]
    pub fn new(units: Vec<Arc<dyn ProjectExporter>>) -> Self {
        Self {
            units,
            state: RunState::Pending,
        }
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Runs all units in resolved import order against `archive`.
    pub fn run(
        &mut self,
        request: &ImportRequest,
        project: &Project,
        manifest: &ExportedProjectManifest,
        archive: &mut ProjectArchive,
    ) -> Result<()> {
        let ordered = resolver::resolve_order(&self.units, Direction::Import)?;
        self.state = RunState::Running;

        for unit in ordered {
            if let Err(err) = request.check_cancelled().and_then(|()| {
                tracing::debug!(unit = unit.id(), "running importer");
                unit.import_data(request, project, manifest, archive)
            }) {
                self.state = RunState::Failed;
                return Err(err);
            }
        }

        self.state = RunState::Succeeded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::unit::UnitId;
    use crate::models::LogMessage;
    use crate::{Error, FORMAT_AUTO};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

    struct RecordingUnit {
        id: UnitId,
        fail: bool,
    }

    impl RecordingUnit {
        fn new(id: UnitId, fail: bool) -> Arc<dyn ProjectExporter> {
            Arc::new(Self { id, fail })
        }
    }

    impl ProjectExporter for RecordingUnit {
        fn id(&self) -> UnitId {
            self.id
        }

        fn export_data(
            &self,
            request: &ExportRequest,
            _manifest: &mut ExportedProjectManifest,
            _stage: &Path,
        ) -> Result<()> {
            let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst);
            request.add_message(LogMessage::info(format!("{}:{seq}", self.id)));
            if self.fail {
                return Err(Error::ExportAborted("boom".to_string()));
            }
            Ok(())
        }

        fn import_data(
            &self,
            _request: &ImportRequest,
            _project: &Project,
            _manifest: &ExportedProjectManifest,
            _archive: &mut ProjectArchive,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn request() -> ExportRequest {
        ExportRequest::new(Project::new("p1"), FORMAT_AUTO, false)
    }

    #[test]
    fn test_progress_weights_sum_to_100() {
        for count in 1..=12 {
            let weights = progress_weights(count);
            assert_eq!(weights.len(), count);
            assert_eq!(weights.iter().map(|&w| u32::from(w)).sum::<u32>(), 100);
        }
        assert!(progress_weights(0).is_empty());
    }

    #[test]
    fn test_successful_run_reaches_100() {
        let stage = tempfile::tempdir().unwrap();
        let req = request();
        let mut manifest = ExportedProjectManifest::new("p1");
        let mut pipeline = ExportPipeline::new(vec![
            RecordingUnit::new("one", false),
            RecordingUnit::new("two", false),
        ]);

        assert_eq!(pipeline.state(), RunState::Pending);
        pipeline.run(&req, &mut manifest, stage.path()).unwrap();
        assert_eq!(pipeline.state(), RunState::Succeeded);
        assert_eq!(req.progress(), 100);
    }

    #[test]
    fn test_failure_stops_the_run_and_forces_100() {
        let stage = tempfile::tempdir().unwrap();
        let req = request();
        let mut manifest = ExportedProjectManifest::new("p1");
        let mut pipeline = ExportPipeline::new(vec![
            RecordingUnit::new("first", true),
            RecordingUnit::new("second", false),
        ]);

        let err = pipeline.run(&req, &mut manifest, stage.path()).unwrap_err();
        assert!(matches!(err, Error::ExportAborted(_)));
        assert_eq!(pipeline.state(), RunState::Failed);
        assert_eq!(req.progress(), 100);

        // Only the failing unit ran; emission order preserved.
        let messages = req.message_queue().drain();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].message.starts_with("first:"));
    }

    #[test]
    fn test_cycle_fails_before_any_unit_runs() {
        struct CyclicUnit(UnitId, UnitId);
        impl ProjectExporter for CyclicUnit {
            fn id(&self) -> UnitId {
                self.0
            }
            fn export_dependencies(&self) -> Vec<UnitId> {
                vec![self.1]
            }
            fn export_data(
                &self,
                _request: &ExportRequest,
                _manifest: &mut ExportedProjectManifest,
                _stage: &Path,
            ) -> Result<()> {
                panic!("must not run");
            }
            fn import_data(
                &self,
                _request: &ImportRequest,
                _project: &Project,
                _manifest: &ExportedProjectManifest,
                _archive: &mut ProjectArchive,
            ) -> Result<()> {
                Ok(())
            }
        }

        let stage = tempfile::tempdir().unwrap();
        let req = request();
        let mut manifest = ExportedProjectManifest::new("p1");
        let mut pipeline = ExportPipeline::new(vec![
            Arc::new(CyclicUnit("a", "b")),
            Arc::new(CyclicUnit("b", "a")),
        ]);

        let err = pipeline.run(&req, &mut manifest, stage.path()).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { .. }));
        assert_eq!(pipeline.state(), RunState::Pending);
    }

    #[test]
    fn test_cancelled_request_stops_between_units() {
        let stage = tempfile::tempdir().unwrap();
        let req = request();
        req.cancel_token().cancel();
        let mut manifest = ExportedProjectManifest::new("p1");
        let mut pipeline = ExportPipeline::new(vec![RecordingUnit::new("one", false)]);

        let err = pipeline.run(&req, &mut manifest, stage.path()).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(req.progress(), 100);
    }
}
