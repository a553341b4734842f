// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress reporting: idempotent snapshots of `RunState` at call time.

use async_trait::async_trait;
use cx_core::RunState;
use thiserror::Error;

/// Errors from a `Reporter`. Non-fatal per §7 — the executor logs at `warn`
/// and accumulates rather than aborting the run.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report failed: {0}")]
    Failed(String),
}

/// Reports a snapshot of `RunState` somewhere (UI, control plane, log line).
#[async_trait]
pub trait Reporter: Send + Sync + 'static {
    /// Report the whole stage (called at run start and run end).
    async fn report_stage(&self, state: &RunState) -> Result<(), ReportError>;

    /// Report a single step's current record.
    async fn report_step(&self, state: &RunState, step_name: &str) -> Result<(), ReportError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeReporter, ReportCall};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    pub enum ReportCall {
        Stage,
        Step(String),
    }

    #[derive(Default)]
    struct FakeState {
        calls: Vec<ReportCall>,
        step_error: Option<String>,
    }

    /// Records every report call for assertions; optionally fails `report_step`
    /// once to exercise the warn-only error path.
    #[derive(Clone, Default)]
    pub struct FakeReporter {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next_step_report(&self, message: impl Into<String>) {
            self.inner.lock().step_error = Some(message.into());
        }

        pub fn calls(&self) -> Vec<ReportCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl Reporter for FakeReporter {
        async fn report_stage(&self, _state: &RunState) -> Result<(), ReportError> {
            self.inner.lock().calls.push(ReportCall::Stage);
            Ok(())
        }

        async fn report_step(&self, _state: &RunState, step_name: &str) -> Result<(), ReportError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ReportCall::Step(step_name.to_string()));
            if let Some(message) = inner.step_error.take() {
                return Err(ReportError::Failed(message));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
