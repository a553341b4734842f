// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cx-core: the data model for the pipeline execution core.
//!
//! Exposes the opaque `Spec`/`Step` description handed in by a caller and the
//! mutex-protected `RunState` the executor and its collaborators mutate while
//! driving a run to completion. Contains no scheduling, concurrency, or I/O —
//! see `cx-engine` for that.

mod spec;
mod state;
mod status;
mod step;

/// Sentinel step exit code requesting early-exit: remaining pending steps are
/// marked Skipped, and the step itself still counts as Passed.
pub const EARLY_EXIT_CODE: i32 = 78;

/// Conventional OOM-kill exit code, used when `Exited::oom_killed` is true.
pub const OOM_EXIT_CODE: i32 = 137;

pub use spec::Spec;
pub use state::{
    BuildMeta, RunState, StageMeta, StageSnapshot, StateInnerView, StepRecord, StepSnapshot,
};
pub use status::StepStatus;
pub use step::{ErrPolicy, RunPolicy, Secret, Step};
