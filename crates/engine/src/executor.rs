// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Executor`: orchestrates a whole pipeline run (§4.1).

use crate::error::RunErrorEntry;
use crate::gate::ConcurrencyGate;
use crate::scheduler::DagScheduler;
use crate::step_runner::StepRunner;
use crate::{ExecutorConfig, RunError};
use cx_collab::{Engine, Reporter, Streamer, Uploader};
use cx_core::{ErrPolicy, RunState, Spec};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Owns the five collaborators for the lifetime of a single `exec` call.
/// Cheaply `Clone` (every field is an `Arc`).
#[derive(Clone)]
pub struct Executor {
    engine: Arc<dyn Engine>,
    reporter: Arc<dyn Reporter>,
    streamer: Arc<dyn Streamer>,
    uploader: Arc<dyn Uploader>,
    gate: Arc<ConcurrencyGate>,
}

impl Executor {
    pub fn new(
        engine: Arc<dyn Engine>,
        reporter: Arc<dyn Reporter>,
        streamer: Arc<dyn Streamer>,
        uploader: Arc<dyn Uploader>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            engine,
            reporter,
            streamer,
            uploader,
            gate: Arc::new(ConcurrencyGate::new(config.threads)),
        }
    }

    /// Drive `spec` to completion against `state`. Returns an aggregated
    /// error if the scheduler, a log close, or a terminal stage report
    /// failed — individual step failures never appear here, only in `state`.
    pub async fn exec(&self, cancel: &CancellationToken, spec: &Spec, state: &RunState) -> Result<(), RunError> {
        // 2. Setup.
        if let Err(e) = self.engine.setup(spec).await {
            tracing::error!(error = %e, "setup failed");
            state.fail_all(&e);
            let mut errors = RunError::new();
            errors.push(RunErrorEntry::Setup(e));
            if let Err(report_err) = self.reporter.report_stage(state).await {
                errors.push(RunErrorEntry::from(report_err));
            }
            self.destroy(spec).await;
            return errors.into_result();
        }

        let result = self.run_steps(cancel, spec, state).await;

        // 1. Destroy runs on a detached, non-cancellable context regardless
        // of the caller's own cancellation or the outcome above.
        self.destroy(spec).await;

        result
    }

    async fn run_steps(&self, cancel: &CancellationToken, spec: &Spec, state: &RunState) -> Result<(), RunError> {
        let errors = Arc::new(Mutex::new(RunError::new()));
        // 3. Cancellable child context: a FailFast step can cancel its
        // siblings without touching the caller's own cancellation.
        let child_cancel = cancel.child_token();
        let runner = StepRunner::new(
            self.engine.clone(),
            self.reporter.clone(),
            self.streamer.clone(),
            self.uploader.clone(),
            self.gate.clone(),
        );

        // 4/5. One vertex per step, one edge per dependency.
        let mut scheduler = DagScheduler::new();
        for step in spec.steps() {
            let runner = runner.clone();
            let vertex_cancel = child_cancel.clone();
            let state = state.clone();
            let spec = spec.clone();
            let step = step.clone();
            let errors = errors.clone();
            let dependencies: Vec<String> = step.dependencies.iter().cloned().collect();
            scheduler.add_vertex(step.name.clone(), dependencies, async move {
                runner.exec(&vertex_cancel, &state, &spec, &step, &errors).await;
                let failed_fast = step.err_policy == ErrPolicy::FailFast
                    && state.find(&step.name).and_then(|s| s.exit_code).unwrap_or(0) > 0;
                if failed_fast {
                    vertex_cancel.cancel();
                }
            });
        }

        // 6. Run the scheduler, collecting its error.
        if let Err(e) = scheduler.run().await {
            tracing::error!(error = %e, "scheduler failed");
            // 7. A scheduler error (missing vertex, cycle) fails every step
            // that isn't already in a terminal state of its own.
            if !state.failed() {
                state.fail_all(&e);
            }
            errors.lock().push(RunErrorEntry::from(e));
        }

        // 8. Terminal sweep.
        state.finish_all();

        // 9. Final stage report.
        if let Err(e) = self.reporter.report_stage(state).await {
            tracing::warn!(error = %e, "final stage report failed");
            errors.lock().push(RunErrorEntry::from(e));
        }

        // 10. Return the accumulated result.
        let taken = errors.lock().take();
        taken.into_result()
    }

    async fn destroy(&self, spec: &Spec) {
        if let Err(e) = self.engine.destroy(spec).await {
            tracing::error!(error = %e, "destroy failed");
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
