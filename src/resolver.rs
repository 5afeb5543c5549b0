//! Turns `"<from> to <to>"` path names into path-follow steps.
//!
//! Resolution is fail-open: a missing or broken path becomes a no-op step and a
//! diagnostic report, never an error for the caller. One bad path name must not
//! keep the rest of the routine from being assembled.

use crate::path::{PathError, PathLibrary};
use crate::step::{PathFollower, PathStep, RoutineStep};
use std::backtrace::Backtrace;
use std::sync::Arc;
use tracing::{debug, error};

/// Prefix of every resolution failure report.
pub const FAILURE_PREFIX: &str = "Big oops: ";

/// Separator between the two location ids of a path name.
pub const PATH_NAME_SEPARATOR: &str = " to ";

/// Where resolution failures are reported. Advisory only.
pub trait DiagnosticsSink: Send + Sync {
    fn report_error(&self, message: &str, backtrace: &Backtrace);
}

/// Reports through `tracing` at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report_error(&self, message: &str, backtrace: &Backtrace) {
        error!(%backtrace, "{message}");
    }
}

/// Builds the lookup key for the leg from `from_id` to `to_id`.
pub fn path_name(from_id: &str, to_id: &str) -> String {
    format!("{from_id}{PATH_NAME_SEPARATOR}{to_id}")
}

/// Resolves path names against a [`PathLibrary`] into steps driven by a [`PathFollower`].
#[derive(Clone)]
pub struct PathStepResolver {
    library: Arc<dyn PathLibrary>,
    follower: Arc<dyn PathFollower>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl PathStepResolver {
    /// Creates a resolver that reports failures through [`TracingDiagnostics`].
    pub fn new(library: Arc<dyn PathLibrary>, follower: Arc<dyn PathFollower>) -> Self {
        Self {
            library,
            follower,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// Replaces the diagnostics sink (builder pattern).
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Strict variant of [`resolve`](Self::resolve): the lookup error is returned.
    pub fn try_resolve(&self, from_id: &str, to_id: &str) -> Result<RoutineStep, PathError> {
        let name = path_name(from_id, to_id);
        let path = self.library.load(&name)?;
        debug!(path = %name, length = path.length(), "Resolved path");
        Ok(RoutineStep::FollowPath(PathStep::new(
            path,
            Arc::clone(&self.follower),
        )))
    }

    /// Returns a step following the path from `from_id` to `to_id`.
    ///
    /// On any lookup failure, reports `"Big oops: <reason>"` with a backtrace to
    /// the diagnostics sink and returns [`RoutineStep::None`].
    pub fn resolve(&self, from_id: &str, to_id: &str) -> RoutineStep {
        match self.try_resolve(from_id, to_id) {
            Ok(step) => step,
            Err(err) => {
                let message = format!("{FAILURE_PREFIX}{err}");
                self.diagnostics
                    .report_error(&message, &Backtrace::capture());
                RoutineStep::None
            }
        }
    }
}
