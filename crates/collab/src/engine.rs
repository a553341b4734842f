// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The execution backend contract: `Engine`.
//!
//! `Engine` is the one collaborator whose concrete implementations (container,
//! VM, SSH) are out of scope for this crate — only the trait and an
//! in-process `FakeEngine` for tests live here.

use async_trait::async_trait;
use cx_core::{Spec, Step};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

/// Errors raised by an `Engine` implementation.
///
/// A non-cancel error here fails only the owning step (§7); cancellation is
/// signalled through the `CancellationToken`, not through this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("setup failed: {0}")]
    Setup(String),
    #[error("destroy failed: {0}")]
    Destroy(String),
    #[error("run failed: {0}")]
    Run(String),
}

/// The terminal record of a step that actually exited (as opposed to one
/// that was cancelled or errored before exiting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exited {
    pub exit_code: i32,
    pub oom_killed: bool,
}

/// The execution backend contract.
///
/// `run` is handed a log sink to write the step's output to; it does not own
/// or close that sink — `StepRunner` does, once `run` returns (§4.2 step 9).
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Prepare the environment for the whole run. Called exactly once, before
    /// any step's `run`.
    async fn setup(&self, spec: &Spec) -> Result<(), EngineError>;

    /// Tear down the environment. Called exactly once per `Executor::exec`,
    /// even on panic/cancel, via a context independent of the caller's.
    async fn destroy(&self, spec: &Spec) -> Result<(), EngineError>;

    /// Run one step to completion (or until `cancel` fires).
    ///
    /// Returns `Ok(Some(Exited))` if the step's process actually exited,
    /// `Ok(None)` if it was preempted in a way that doesn't carry an exit
    /// code (callers should then consult `cancel.is_cancelled()`), or
    /// `Err` for an internal engine failure unrelated to cancellation.
    async fn run(
        &self,
        cancel: &CancellationToken,
        spec: &Spec,
        step: &Step,
        log: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<Option<Exited>, EngineError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{EngineCall, FakeEngine};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    /// One recorded invocation of a `FakeEngine` method.
    #[derive(Debug, Clone)]
    pub enum EngineCall {
        Setup,
        Destroy,
        Run { step: String },
    }

    /// Scripted response for a single step's `run` call.
    #[derive(Debug, Clone)]
    enum StepScript {
        Exit(Exited),
        /// Sleep until either the duration elapses or `cancel` fires, then
        /// return `Ok(None)` — used to exercise fail-fast cancellation (§8
        /// scenario 2: "B's engine call sleeps then observes ctx cancel").
        SleepThenCancel(Duration),
        Error(String),
    }

    struct FakeState {
        calls: Vec<EngineCall>,
        scripts: HashMap<String, StepScript>,
        setup_error: Option<String>,
    }

    /// In-process `Engine` for tests: each step's outcome is scripted ahead
    /// of time, and every call is recorded for assertions, mirroring
    /// `FakeAgentAdapter`'s call log in the adapters this crate family ships.
    #[derive(Clone)]
    pub struct FakeEngine {
        inner: Arc<Mutex<FakeState>>,
    }

    impl Default for FakeEngine {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FakeEngine {
        pub fn new() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    calls: Vec::new(),
                    scripts: HashMap::new(),
                    setup_error: None,
                })),
            }
        }

        pub fn script_exit(&self, step: impl Into<String>, exit_code: i32) {
            self.inner.lock().scripts.insert(
                step.into(),
                StepScript::Exit(Exited {
                    exit_code,
                    oom_killed: false,
                }),
            );
        }

        pub fn script_oom(&self, step: impl Into<String>) {
            self.inner.lock().scripts.insert(
                step.into(),
                StepScript::Exit(Exited {
                    exit_code: 137,
                    oom_killed: true,
                }),
            );
        }

        pub fn script_sleep_then_cancel(&self, step: impl Into<String>, sleep: Duration) {
            self.inner
                .lock()
                .scripts
                .insert(step.into(), StepScript::SleepThenCancel(sleep));
        }

        pub fn script_error(&self, step: impl Into<String>, message: impl Into<String>) {
            self.inner
                .lock()
                .scripts
                .insert(step.into(), StepScript::Error(message.into()));
        }

        pub fn set_setup_error(&self, message: impl Into<String>) {
            self.inner.lock().setup_error = Some(message.into());
        }

        pub fn calls(&self) -> Vec<EngineCall> {
            self.inner.lock().calls.clone()
        }

        pub fn destroy_count(&self) -> usize {
            self.inner
                .lock()
                .calls
                .iter()
                .filter(|c| matches!(c, EngineCall::Destroy))
                .count()
        }
    }

    #[async_trait]
    impl Engine for FakeEngine {
        async fn setup(&self, _spec: &Spec) -> Result<(), EngineError> {
            let mut inner = self.inner.lock();
            inner.calls.push(EngineCall::Setup);
            if let Some(message) = inner.setup_error.clone() {
                return Err(EngineError::Setup(message));
            }
            Ok(())
        }

        async fn destroy(&self, _spec: &Spec) -> Result<(), EngineError> {
            self.inner.lock().calls.push(EngineCall::Destroy);
            Ok(())
        }

        async fn run(
            &self,
            cancel: &CancellationToken,
            _spec: &Spec,
            step: &Step,
            log: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<Option<Exited>, EngineError> {
            use tokio::io::AsyncWriteExt;

            let script = {
                let mut inner = self.inner.lock();
                inner.calls.push(EngineCall::Run {
                    step: step.name.clone(),
                });
                inner.scripts.get(&step.name).cloned()
            };

            let _ = log.write_all(format!("running {}\n", step.name).as_bytes()).await;

            match script {
                Some(StepScript::Exit(exited)) => Ok(Some(exited)),
                Some(StepScript::SleepThenCancel(sleep)) => {
                    tokio::select! {
                        _ = tokio::time::sleep(sleep) => Ok(Some(Exited { exit_code: 0, oom_killed: false })),
                        _ = cancel.cancelled() => Ok(None),
                    }
                }
                Some(StepScript::Error(message)) => Err(EngineError::Run(message)),
                None => Ok(Some(Exited {
                    exit_code: 0,
                    oom_killed: false,
                })),
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
