// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RunState`: the single mutex-protected record of a pipeline run.

use crate::status::StepStatus;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque, read-only metadata about the build that owns this run.
///
/// `vars` feeds the build tier of the environment-composition merge order
/// (step ◁ build ◁ stage ◁ step-derived).
#[derive(Debug, Clone, Default)]
pub struct BuildMeta {
    pub vars: HashMap<String, String>,
}

/// Opaque, read-only metadata about the stage being reported atomically.
#[derive(Debug, Clone, Default)]
pub struct StageMeta {
    pub name: String,
    pub vars: HashMap<String, String>,
}

/// Per-step record tracked by `RunState`.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl StepRecord {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            exit_code: None,
            error: None,
        }
    }
}

/// An owned, lock-free snapshot of a step's record, for `Reporter` implementations.
#[derive(Debug, Clone)]
pub struct StepSnapshot {
    pub name: String,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

/// An owned, lock-free snapshot of the whole run, for `Reporter::report_stage`.
#[derive(Debug, Clone)]
pub struct StageSnapshot {
    pub stage: String,
    pub steps: Vec<StepSnapshot>,
    pub failed: bool,
    pub cancelled: bool,
}

struct StateInner {
    build: BuildMeta,
    stage: StageMeta,
    steps: Vec<StepRecord>,
    cancelled: bool,
}

impl StateInner {
    fn find_mut(&mut self, name: &str) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|s| s.name == name)
    }

    fn transition(&mut self, name: &str, next: StepStatus) {
        if let Some(record) = self.find_mut(name) {
            // Silently ignore attempts to move a terminal step; invariant 1
            // guarantees callers only ever try this on a stale task retry,
            // which should be a no-op rather than a panic.
            if record.status.can_transition_to(next) {
                record.status = next;
            }
        }
    }
}

/// The shared, mutation-protected record of build/stage/step status.
///
/// Cloning a `RunState` clones the handle (cheap `Arc` bump), not the data —
/// every clone observes the same underlying run, matching invariant 5 (a
/// single mutex serializes all mutation and compound reads).
#[derive(Clone)]
pub struct RunState {
    inner: Arc<Mutex<StateInner>>,
}

impl RunState {
    /// Create a fresh `RunState` with every step in `step_names` `Pending`.
    pub fn new<I, S>(build: BuildMeta, stage: StageMeta, step_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let steps = step_names.into_iter().map(|s| StepRecord::new(s.into())).collect();
        Self {
            inner: Arc::new(Mutex::new(StateInner {
                build,
                stage,
                steps,
                cancelled: false,
            })),
        }
    }

    /// Explicit lock surface for compound read-modify-write sequences, e.g.
    /// reading `exit_code` immediately after `finish` without re-entering the
    /// public API and risking an interleaved mutation.
    pub fn lock(&self) -> StateInnerView<'_> {
        StateInnerView {
            guard: self.inner.lock(),
        }
    }

    pub fn build(&self) -> BuildMeta {
        self.inner.lock().build.clone()
    }

    pub fn stage(&self) -> StageMeta {
        self.inner.lock().stage.clone()
    }

    pub fn failed(&self) -> bool {
        self.inner
            .lock()
            .steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed | StepStatus::Killed))
    }

    pub fn cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    pub fn finished(&self, name: &str) -> bool {
        self.inner
            .lock()
            .steps
            .iter()
            .find(|s| s.name == name)
            .is_some_and(|s| s.status.is_terminal())
    }

    pub fn find(&self, name: &str) -> Option<StepSnapshot> {
        self.inner.lock().steps.iter().find(|s| s.name == name).map(|s| StepSnapshot {
            name: s.name.clone(),
            status: s.status,
            exit_code: s.exit_code,
            error: s.error.clone(),
        })
    }

    pub fn start(&self, name: &str) {
        self.inner.lock().transition(name, StepStatus::Running);
    }

    pub fn finish(&self, name: &str, exit_code: i32) {
        let mut inner = self.inner.lock();
        let status = if exit_code == 0 || exit_code == crate::EARLY_EXIT_CODE {
            StepStatus::Passed
        } else {
            StepStatus::Failed
        };
        if let Some(record) = inner.find_mut(name) {
            record.exit_code = Some(exit_code);
        }
        inner.transition(name, status);
    }

    pub fn skip(&self, name: &str) {
        self.inner.lock().transition(name, StepStatus::Skipped);
    }

    /// Mark every step that has not yet started as `Skipped` (early-exit 78
    /// sentinel, or setup-wide skip). Steps already running or terminal are
    /// left untouched.
    pub fn skip_all(&self) {
        let mut inner = self.inner.lock();
        for record in inner.steps.iter_mut() {
            if record.status == StepStatus::Pending {
                record.status = StepStatus::Skipped;
            }
        }
    }

    pub fn fail(&self, name: &str, error: impl std::fmt::Display) {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.find_mut(name) {
            record.error = Some(error.to_string());
        }
        inner.transition(name, StepStatus::Failed);
    }

    /// Fail every step that is not already terminal, recording the same
    /// error on each (scheduler errors and setup errors fail the whole run).
    pub fn fail_all(&self, error: impl std::fmt::Display) {
        let message = error.to_string();
        let mut inner = self.inner.lock();
        for record in inner.steps.iter_mut() {
            if !record.status.is_terminal() {
                record.error = Some(message.clone());
                record.status = StepStatus::Failed;
            }
        }
    }

    /// Terminal sweep: every still-`Running` or still-`Pending` step becomes
    /// `Passed` (no error recorded) or `Failed` (error recorded).
    pub fn finish_all(&self) {
        let mut inner = self.inner.lock();
        for record in inner.steps.iter_mut() {
            if matches!(record.status, StepStatus::Running | StepStatus::Pending) {
                record.status = if record.error.is_some() {
                    StepStatus::Failed
                } else {
                    StepStatus::Passed
                };
            }
        }
    }

    /// Flag the whole run as cancelling. Distinct from a step's own
    /// `Cancelled` status: this is the run-wide signal the policy gate
    /// consults (§4.2 step 3); individual steps transition themselves once
    /// their task observes the cancelled context (see `cancel_step`).
    pub fn cancel(&self) {
        self.inner.lock().cancelled = true;
    }

    /// Transition a single step to `Cancelled` because its task observed a
    /// cancelled context (§4.2 steps 1, 2, 11, 13).
    pub fn cancel_step(&self, name: &str) {
        self.inner.lock().transition(name, StepStatus::Cancelled);
    }

    /// An owned, lock-free snapshot for `Reporter` implementations — taken
    /// under the lock but not held across any caller I/O.
    pub fn snapshot(&self) -> StageSnapshot {
        let inner = self.inner.lock();
        StageSnapshot {
            stage: inner.stage.name.clone(),
            steps: inner
                .steps
                .iter()
                .map(|s| StepSnapshot {
                    name: s.name.clone(),
                    status: s.status,
                    exit_code: s.exit_code,
                    error: s.error.clone(),
                })
                .collect(),
            failed: inner
                .steps
                .iter()
                .any(|s| matches!(s.status, StepStatus::Failed | StepStatus::Killed)),
            cancelled: inner.cancelled,
        }
    }
}

/// A view into the locked `StateInner`, exposed through `RunState::lock` so
/// callers doing compound read-modify-write hold one guard across several
/// reads/writes instead of re-entering the public API and risking an
/// interleaved mutation from another task.
pub struct StateInnerView<'a> {
    guard: MutexGuard<'a, StateInner>,
}

impl<'a> StateInnerView<'a> {
    pub fn find(&self, name: &str) -> Option<&StepRecord> {
        self.guard.steps.iter().find(|s| s.name == name)
    }

    pub fn finish(&mut self, name: &str, exit_code: i32) {
        let status = if exit_code == 0 || exit_code == crate::EARLY_EXIT_CODE {
            StepStatus::Passed
        } else {
            StepStatus::Failed
        };
        if let Some(record) = self.guard.find_mut(name) {
            record.exit_code = Some(exit_code);
        }
        self.guard.transition(name, status);
    }

    pub fn cancelled(&self) -> bool {
        self.guard.cancelled
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
