// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn fresh(names: &[&str]) -> RunState {
    RunState::new(
        BuildMeta::default(),
        StageMeta {
            name: "ci".to_string(),
            vars: HashMap::new(),
        },
        names.iter().map(|n| n.to_string()),
    )
}

#[test]
fn new_steps_start_pending() {
    let state = fresh(&["a", "b"]);
    assert_eq!(state.find("a").unwrap().status, StepStatus::Pending);
    assert!(!state.failed());
    assert!(!state.cancelled());
}

#[test]
fn finish_zero_is_passed_nonzero_is_failed() {
    let state = fresh(&["a", "b"]);
    state.start("a");
    state.finish("a", 0);
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);

    state.start("b");
    state.finish("b", 1);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Failed);
    assert_eq!(state.find("b").unwrap().exit_code, Some(1));
    assert!(state.failed());
}

#[test]
fn finish_early_exit_code_is_passed_not_failed() {
    let state = fresh(&["a"]);
    state.start("a");
    state.finish("a", crate::EARLY_EXIT_CODE);
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("a").unwrap().exit_code, Some(crate::EARLY_EXIT_CODE));
    assert!(!state.failed());
}

#[test]
fn skip_all_only_touches_pending_steps() {
    let state = fresh(&["a", "b", "c"]);
    state.start("a");
    state.finish("a", 0);
    state.skip_all();
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Skipped);
    assert_eq!(state.find("c").unwrap().status, StepStatus::Skipped);
}

#[test]
fn fail_all_skips_terminal_steps() {
    let state = fresh(&["a", "b"]);
    state.start("a");
    state.finish("a", 0);
    state.fail_all("scheduler error");
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Failed);
    assert_eq!(state.find("b").unwrap().error.as_deref(), Some("scheduler error"));
}

#[test]
fn finish_all_sweeps_running_and_pending_to_passed() {
    let state = fresh(&["a", "b"]);
    state.start("a");
    state.finish_all();
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Passed);
}

#[test]
fn transitions_never_move_backwards() {
    let state = fresh(&["a"]);
    state.start("a");
    state.finish("a", 0);
    // Attempting to re-start a terminal step is a no-op, not a panic or regression.
    state.start("a");
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
}

#[test]
fn cancel_sets_flag_independent_of_steps() {
    let state = fresh(&["a"]);
    assert!(!state.cancelled());
    state.cancel();
    assert!(state.cancelled());
    // The run-wide flag does not itself move any step's status.
    assert_eq!(state.find("a").unwrap().status, StepStatus::Pending);
}

#[test]
fn cancel_step_transitions_only_that_step() {
    let state = fresh(&["a", "b"]);
    state.start("a");
    state.cancel_step("a");
    assert_eq!(state.find("a").unwrap().status, StepStatus::Cancelled);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Pending);
}

#[test]
fn clone_shares_the_same_underlying_state() {
    let state = fresh(&["a"]);
    let handle = state.clone();
    handle.start("a");
    assert_eq!(state.find("a").unwrap().status, StepStatus::Running);
}

#[test]
fn snapshot_is_owned_and_reflects_current_state() {
    let state = fresh(&["a", "b"]);
    state.start("a");
    state.finish("a", 0);
    let snap = state.snapshot();
    assert_eq!(snap.stage, "ci");
    assert!(!snap.failed);
    assert_eq!(snap.steps.len(), 2);
}

#[test]
fn lock_surface_allows_compound_read_after_finish() {
    let state = fresh(&["a"]);
    let mut guard = state.lock();
    guard.finish("a", 137);
    assert_eq!(guard.find("a").unwrap().exit_code, Some(137));
}
