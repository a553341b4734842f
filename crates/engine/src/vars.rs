// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment composition (§4.2 step 5): the ordered tier merge a step's
//! clone carries into `Engine::run`.

use cx_core::{BuildMeta, StageMeta, Step};
use std::collections::HashMap;

/// Merge a step's environment tiers in override order: the step's own
/// `environ`, then build-derived vars, then stage-derived vars, then
/// step-derived vars — later tiers win on key collision.
pub fn compose_environment(step: &Step, build: &BuildMeta, stage: &StageMeta) -> HashMap<String, String> {
    let mut merged = step.environ.clone();
    merge(&mut merged, &build.vars);
    merge(&mut merged, &stage.vars);
    merge(&mut merged, &step_derived_vars(step));
    merged
}

fn merge(into: &mut HashMap<String, String>, tier: &HashMap<String, String>) {
    for (key, value) in tier {
        into.insert(key.clone(), value.clone());
    }
}

/// Vars computed from the step itself rather than supplied by a caller —
/// the last, highest-priority tier.
fn step_derived_vars(step: &Step) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("CX_STEP_NAME".to_string(), step.name.clone());
    vars
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
