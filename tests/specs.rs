// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Black-box scenarios against `Executor::exec`, one per §8 case, run
//! in-process against the fake collaborators rather than a real backend.

use cx_collab::{FakeEngine, FakeReporter, FakeStreamer, FakeUploader};
use cx_core::{BuildMeta, ErrPolicy, RunPolicy, RunState, Spec, StageMeta, Step, StepStatus};
use cx_engine::{Executor, ExecutorConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn executor(engine: FakeEngine, reporter: FakeReporter) -> Executor {
    Executor::new(
        Arc::new(engine),
        Arc::new(reporter),
        Arc::new(FakeStreamer::new()),
        Arc::new(FakeUploader::new()),
        ExecutorConfig::unbounded(),
    )
}

fn state(names: &[&str]) -> RunState {
    RunState::new(
        BuildMeta::default(),
        StageMeta {
            name: "ci".to_string(),
            vars: Default::default(),
        },
        names.iter().map(|n| n.to_string()),
    )
}

#[tokio::test]
async fn linear_chain_all_pass() {
    let engine = FakeEngine::new();
    engine.script_exit("a", 0);
    engine.script_exit("b", 0);
    engine.script_exit("c", 0);
    let exec = executor(engine, FakeReporter::new());

    let state = state(&["a", "b", "c"]);
    let spec = Spec::new(
        "p",
        vec![
            Step::new("a").run_policy(RunPolicy::OnSuccess),
            Step::new("b").run_policy(RunPolicy::OnSuccess).depends_on("a"),
            Step::new("c").run_policy(RunPolicy::OnSuccess).depends_on("b"),
        ],
    );
    let cancel = CancellationToken::new();

    let result = exec.exec(&cancel, &spec, &state).await;

    assert!(result.is_ok());
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("c").unwrap().status, StepStatus::Passed);
    assert!(!state.failed());
}

#[tokio::test]
async fn fail_fast_cancels_siblings() {
    let engine = FakeEngine::new();
    engine.script_exit("a", 1);
    engine.script_sleep_then_cancel("b", Duration::from_secs(30));
    let exec = executor(engine, FakeReporter::new());

    let state = state(&["a", "b"]);
    let spec = Spec::new(
        "p",
        vec![
            Step::new("a").err_policy(ErrPolicy::FailFast),
            Step::new("b").run_policy(RunPolicy::Always),
        ],
    );
    let cancel = CancellationToken::new();

    let result = exec.exec(&cancel, &spec, &state).await;

    assert!(result.is_ok(), "fail-fast does not itself produce a scheduler error");
    assert_eq!(state.find("a").unwrap().status, StepStatus::Failed);
    assert_eq!(state.find("a").unwrap().exit_code, Some(1));
    assert_eq!(state.find("b").unwrap().status, StepStatus::Cancelled);
}

#[tokio::test]
async fn on_failure_skip() {
    let engine = FakeEngine::new();
    engine.script_exit("a", 0);
    let reporter = FakeReporter::new();
    let exec = executor(engine, reporter.clone());

    let state = state(&["a", "b"]);
    let spec = Spec::new(
        "p",
        vec![
            Step::new("a"),
            Step::new("b").run_policy(RunPolicy::OnFailure).depends_on("a"),
        ],
    );
    let cancel = CancellationToken::new();

    let result = exec.exec(&cancel, &spec, &state).await;

    assert!(result.is_ok());
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Skipped);
    assert!(reporter
        .calls()
        .iter()
        .any(|c| matches!(c, cx_collab::ReportCall::Step(name) if name == "b")));
}

#[tokio::test]
async fn early_exit_78_skips_remaining_pending_steps() {
    let engine = FakeEngine::new();
    engine.script_exit("a", 78);
    let exec = executor(engine, FakeReporter::new());

    let state = state(&["a", "b", "c"]);
    let spec = Spec::new(
        "p",
        vec![
            Step::new("a"),
            Step::new("b").run_policy(RunPolicy::Always),
            Step::new("c").run_policy(RunPolicy::Always),
        ],
    );
    let cancel = CancellationToken::new();

    let result = exec.exec(&cancel, &spec, &state).await;

    assert!(result.is_ok());
    assert_eq!(state.find("a").unwrap().status, StepStatus::Passed);
    assert_eq!(state.find("a").unwrap().exit_code, Some(78));
    assert_eq!(state.find("b").unwrap().status, StepStatus::Skipped);
    assert_eq!(state.find("c").unwrap().status, StepStatus::Skipped);
}

#[tokio::test]
async fn oom_kill_maps_to_exit_code_137() {
    let engine = FakeEngine::new();
    engine.script_oom("a");
    let exec = executor(engine, FakeReporter::new());

    let state = state(&["a"]);
    let spec = Spec::new("p", vec![Step::new("a")]);
    let cancel = CancellationToken::new();

    let result = exec.exec(&cancel, &spec, &state).await;

    assert!(result.is_ok());
    assert_eq!(state.find("a").unwrap().exit_code, Some(137));
}

#[tokio::test]
async fn dependency_cycle_fails_every_step_and_still_destroys() {
    let engine = FakeEngine::new();
    let exec = executor(engine.clone(), FakeReporter::new());

    let state = state(&["a", "b"]);
    let spec = Spec::new(
        "p",
        vec![Step::new("a").depends_on("b"), Step::new("b").depends_on("a")],
    );
    let cancel = CancellationToken::new();

    let result = exec.exec(&cancel, &spec, &state).await;

    let err = result.expect_err("a dependency cycle must surface as an error");
    assert!(err.to_string().contains("dependency cycle detected"));
    assert_eq!(state.find("a").unwrap().status, StepStatus::Failed);
    assert_eq!(state.find("b").unwrap().status, StepStatus::Failed);
    assert_eq!(engine.destroy_count(), 1);
}
