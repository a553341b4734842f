// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the execution engine.

use thiserror::Error;

/// A `DagScheduler::run` validation failure (§4.3). Returned before any
/// vertex task runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("missing vertex: {0}")]
    MissingVertex(String),
    #[error("dependency cycle detected")]
    Cycle,
}

/// A single step body's failure cause, recorded on `RunState` via its
/// rendered `Display` output (§10.2) rather than carried as a trait object.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("gate closed")]
    GateClosed,
    #[error(transparent)]
    Stream(#[from] cx_collab::StreamError),
    #[error(transparent)]
    Engine(#[from] cx_collab::EngineError),
}

/// One contributor to an aggregated `RunError`.
#[derive(Debug, Error)]
pub enum RunErrorEntry {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] ScheduleError),
    #[error("setup error: {0}")]
    Setup(#[source] cx_collab::EngineError),
    #[error("log stream error: {0}")]
    Stream(#[from] cx_collab::StreamError),
    #[error("log close error: {0}")]
    LogClose(#[source] std::io::Error),
    #[error("report error: {0}")]
    Report(#[from] cx_collab::ReportError),
    #[error("gate acquire error: {0}")]
    Gate(#[from] StepError),
}

/// Accumulated errors from a single `Executor::exec` call (§7: "every path
/// appends rather than replaces"). Empty means the run completed cleanly
/// even if individual steps failed — step outcomes live in `RunState`.
#[derive(Debug, Default)]
pub struct RunError(Vec<RunErrorEntry>);

impl RunError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<RunErrorEntry>) {
        self.0.push(entry.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[RunErrorEntry] {
        &self.0
    }

    /// Take the accumulated entries, leaving an empty `RunError` behind.
    /// Used by `Executor::exec` to pull the final result out of a
    /// `Mutex<RunError>` shared with spawned vertex tasks, without needing
    /// unique ownership of the surrounding `Arc`.
    pub(crate) fn take(&mut self) -> RunError {
        RunError(std::mem::take(&mut self.0))
    }

    /// Collapse to `Ok(())` when nothing was accumulated, matching the
    /// contract's "on clean success returns no error" rule.
    pub fn into_result(self) -> Result<(), RunError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

impl std::error::Error for RunError {}
