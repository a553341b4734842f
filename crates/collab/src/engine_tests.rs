// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cx_core::Step;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn spec() -> Spec {
    Spec::new("ci", vec![Step::new("a")])
}

#[tokio::test]
async fn scripted_exit_is_returned() {
    let engine = FakeEngine::new();
    engine.script_exit("a", 1);
    let cancel = CancellationToken::new();
    let mut sink = Vec::new();
    let exited = engine
        .run(&cancel, &spec(), &Step::new("a"), &mut sink)
        .await
        .unwrap();
    assert_eq!(exited, Some(Exited { exit_code: 1, oom_killed: false }));
}

#[tokio::test]
async fn unscripted_step_defaults_to_success() {
    let engine = FakeEngine::new();
    let cancel = CancellationToken::new();
    let mut sink = Vec::new();
    let exited = engine
        .run(&cancel, &spec(), &Step::new("a"), &mut sink)
        .await
        .unwrap();
    assert_eq!(exited.unwrap().exit_code, 0);
}

#[tokio::test]
async fn setup_error_is_surfaced() {
    let engine = FakeEngine::new();
    engine.set_setup_error("no capacity");
    let err = engine.setup(&spec()).await.unwrap_err();
    assert!(matches!(err, EngineError::Setup(_)));
}

#[tokio::test]
async fn sleep_then_cancel_observes_token() {
    let engine = FakeEngine::new();
    engine.script_sleep_then_cancel("a", Duration::from_secs(5));
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel_clone.cancel();
    });
    let mut sink = Vec::new();
    let exited = engine
        .run(&cancel, &spec(), &Step::new("a"), &mut sink)
        .await
        .unwrap();
    assert_eq!(exited, None);
}

#[tokio::test]
async fn calls_are_recorded_in_order() {
    let engine = FakeEngine::new();
    engine.setup(&spec()).await.unwrap();
    let cancel = CancellationToken::new();
    let mut sink = Vec::new();
    engine.run(&cancel, &spec(), &Step::new("a"), &mut sink).await.unwrap();
    engine.destroy(&spec()).await.unwrap();
    assert_eq!(engine.destroy_count(), 1);
    assert_eq!(engine.calls().len(), 3);
}
