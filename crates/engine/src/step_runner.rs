// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `StepRunner`: drives a single step through admission, policy evaluation,
//! environment composition, the log pipeline, and the engine call (§4.2).

use crate::card::CardExtractor;
use crate::error::RunErrorEntry;
use crate::gate::ConcurrencyGate;
use crate::redact::SecretRedactor;
use crate::vars::compose_environment;
use crate::RunError;
use cx_collab::{Engine, Reporter, Streamer, Uploader};
use cx_core::{RunPolicy, RunState, Spec, Step, StepStatus, EARLY_EXIT_CODE, OOM_EXIT_CODE};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// What the policy gate (§4.2 step 3) decided to do with a step, independent
/// of any I/O — kept as a pure function so the truth table is unit-testable
/// without a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PolicyDecision {
    Run,
    Skip,
    NoOp,
}

pub(crate) fn evaluate_policy(
    run_policy: RunPolicy,
    run_failed: bool,
    run_cancelled: bool,
    already_terminal: bool,
) -> PolicyDecision {
    if run_cancelled {
        return PolicyDecision::NoOp;
    }
    match run_policy {
        RunPolicy::Never => PolicyDecision::NoOp,
        RunPolicy::Always => {
            if already_terminal {
                PolicyDecision::NoOp
            } else {
                PolicyDecision::Run
            }
        }
        RunPolicy::OnFailure => {
            if !run_failed {
                PolicyDecision::Skip
            } else if already_terminal {
                PolicyDecision::NoOp
            } else {
                PolicyDecision::Run
            }
        }
        RunPolicy::OnSuccess => {
            if run_failed {
                PolicyDecision::Skip
            } else if already_terminal {
                PolicyDecision::NoOp
            } else {
                PolicyDecision::Run
            }
        }
    }
}

/// Bundles the collaborators and gate a step needs to run. Cheaply `Clone`
/// (every field is an `Arc`), so the executor can hand one to every DAG
/// vertex closure.
#[derive(Clone)]
pub struct StepRunner {
    engine: Arc<dyn Engine>,
    reporter: Arc<dyn Reporter>,
    streamer: Arc<dyn Streamer>,
    uploader: Arc<dyn Uploader>,
    gate: Arc<ConcurrencyGate>,
}

impl StepRunner {
    pub fn new(
        engine: Arc<dyn Engine>,
        reporter: Arc<dyn Reporter>,
        streamer: Arc<dyn Streamer>,
        uploader: Arc<dyn Uploader>,
        gate: Arc<ConcurrencyGate>,
    ) -> Self {
        Self {
            engine,
            reporter,
            streamer,
            uploader,
            gate,
        }
    }

    /// Drive `step` through the full algorithm. Contributions to the
    /// executor's aggregated result (log-close and reporter errors) are
    /// pushed into `errors` directly; `StepRunner` never returns them.
    pub async fn exec(
        &self,
        cancel: &CancellationToken,
        state: &RunState,
        spec: &Spec,
        step: &Step,
        errors: &Mutex<RunError>,
    ) {
        let name = step.name.clone();
        let span = tracing::info_span!("step", step = %name);
        let _guard = span.enter();
        let start = std::time::Instant::now();

        self.exec_inner(cancel, state, spec, step, errors).await;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            status = %state.find(&name).map(|s| s.status).unwrap_or(StepStatus::Pending),
            "step finished"
        );
    }

    async fn exec_inner(
        &self,
        cancel: &CancellationToken,
        state: &RunState,
        spec: &Spec,
        step: &Step,
        errors: &Mutex<RunError>,
    ) {
        let name = step.name.as_str();

        // 1. Early cancel check.
        if cancel.is_cancelled() {
            state.cancel_step(name);
            return;
        }

        // 2. Admission.
        let _ticket = match self.gate.acquire(cancel).await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                state.cancel_step(name);
                return;
            }
            Err(e) => {
                tracing::error!(step = name, error = %e, "gate acquire failed");
                errors.lock().push(RunErrorEntry::from(e));
                return;
            }
        };

        // 3. Policy gate.
        let already_terminal = state.finished(name);
        let decision = evaluate_policy(step.run_policy, state.failed(), state.cancelled(), already_terminal);
        match decision {
            PolicyDecision::NoOp => return,
            PolicyDecision::Skip => {
                state.skip(name);
                if let Err(e) = self.reporter.report_step(state, name).await {
                    tracing::warn!(step = name, error = %e, "skip report failed");
                    errors.lock().push(RunErrorEntry::from(e));
                }
                return;
            }
            PolicyDecision::Run => {}
        }

        // 4. Start.
        state.start(name);
        if let Err(e) = self.reporter.report_step(state, name).await {
            tracing::warn!(step = name, error = %e, "start report failed");
            errors.lock().push(RunErrorEntry::from(e));
            return;
        }

        // 5. Environment composition.
        let mut clone = step.clone_for_run();
        let build = state.build();
        let stage = state.stage();
        clone.environ = compose_environment(&clone, &build, &stage);

        // 6. Log pipeline.
        let writer = match self.streamer.stream(state, name).await {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(step = name, error = %e, "log stream open failed");
                state.fail(name, &e);
                errors.lock().push(RunErrorEntry::from(e));
                if let Err(report_err) = self.reporter.report_step(state, name).await {
                    tracing::warn!(step = name, error = %report_err, "fail report failed");
                    errors.lock().push(RunErrorEntry::from(report_err));
                }
                return;
            }
        };
        let mut log = CardExtractor::new(SecretRedactor::new(writer, &clone.secrets));

        // 7. Detached step.
        if clone.detached {
            let engine = self.engine.clone();
            let cancel = cancel.clone();
            let spec = spec.clone();
            tokio::spawn(async move {
                let _ = engine.run(&cancel, &spec, &clone, &mut log).await;
                let _ = log.shutdown().await;
            });
            return;
        }

        // 8. Synchronous run.
        let run_result = self.engine.run(cancel, spec, &clone, &mut log).await;

        // 9. Always close.
        if let Err(e) = log.shutdown().await {
            errors.lock().push(RunErrorEntry::LogClose(e));
        }

        // 10. Card upload.
        if let Some(card) = log.take_card() {
            if let Err(e) = self.uploader.upload_card(card, state, name).await {
                tracing::warn!(step = name, error = %e, "card upload failed");
            }
        }

        // 11. Cancellation check.
        if cancel.is_cancelled() {
            state.cancel_step(name);
            return;
        }

        match run_result {
            // 12. Exited path.
            Ok(Some(exited)) => {
                let exit_code = if exited.oom_killed { OOM_EXIT_CODE } else { exited.exit_code };
                state.finish(name, exit_code);
                if let Err(e) = self.reporter.report_step(state, name).await {
                    tracing::warn!(step = name, error = %e, "finish report failed");
                    errors.lock().push(RunErrorEntry::from(e));
                }
                if exit_code == EARLY_EXIT_CODE {
                    state.skip_all();
                }
            }
            // 13. Engine signalled preemption without an exit code.
            Ok(None) => {
                state.cancel_step(name);
            }
            // 14. Internal engine error.
            Err(e) => {
                tracing::error!(step = name, error = %e, "engine run failed");
                state.fail(name, &e);
                if let Err(report_err) = self.reporter.report_step(state, name).await {
                    tracing::warn!(step = name, error = %report_err, "fail report failed");
                    errors.lock().push(RunErrorEntry::from(report_err));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "step_runner_tests.rs"]
mod tests;
