// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step descriptors: the unit of work the executor schedules.

use std::collections::BTreeSet;
use std::collections::HashMap;

/// Gate predicate evaluated at dispatch time, before a step is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPolicy {
    /// Run regardless of prior failures.
    Always,
    /// Never run (step exists in the graph but is inert this run).
    Never,
    /// Run only if nothing has failed yet.
    OnSuccess,
    /// Run only once something has already failed.
    OnFailure,
}

impl Default for RunPolicy {
    fn default() -> Self {
        RunPolicy::OnSuccess
    }
}

/// Whether a nonzero exit from this step cancels the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrPolicy {
    /// A failure here fails only this step; siblings and dependents proceed
    /// per their own policies.
    #[default]
    Fail,
    /// A failure here cancels every other in-flight and queued step.
    FailFast,
}

/// A secret the log pipeline must redact wherever it appears in step output.
#[derive(Debug, Clone)]
pub struct Secret {
    pub name: String,
    pub value: String,
}

/// One vertex in the pipeline DAG.
///
/// `Step` is the mutable-per-run descriptor the executor reads; `clone_for_run`
/// produces the copy that `StepRunner` mutates (environment composition) while
/// preserving the identity (`name`) used to key this run's `RunState`.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub dependencies: BTreeSet<String>,
    pub run_policy: RunPolicy,
    pub err_policy: ErrPolicy,
    pub detached: bool,
    pub secrets: Vec<Secret>,
    pub environ: HashMap<String, String>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: BTreeSet::new(),
            run_policy: RunPolicy::default(),
            err_policy: ErrPolicy::default(),
            detached: false,
            secrets: Vec::new(),
            environ: HashMap::new(),
        }
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.insert(name.into());
        self
    }

    pub fn run_policy(mut self, policy: RunPolicy) -> Self {
        self.run_policy = policy;
        self
    }

    pub fn err_policy(mut self, policy: ErrPolicy) -> Self {
        self.err_policy = policy;
        self
    }

    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environ.insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.push(Secret {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Produce the mutable copy `StepRunner` carries through a single run.
    ///
    /// Distinct from `Clone::clone` (also used by plain collection plumbing)
    /// to make explicit that this copy keeps this step's identity for the
    /// current run rather than being an arbitrary duplicate.
    pub fn clone_for_run(&self) -> Step {
        self.clone()
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
