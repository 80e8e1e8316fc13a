//! Trigger behavior across handler shapes.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;
use tokio::sync::oneshot;

use hookwire_core::error::{AppError, ErrorKind};
use hookwire_hooks::prelude::*;

use helpers::{Decision, Shape, TestEngine, order_payload, push, tagging};

#[tokio::test]
async fn test_handler_receives_payload() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "onSend",
            Handler::sync(|p: &mut HookPayload| {
                p.set("seen", json!(p.get_i64("a")));
                Ok(HookAction::Continue)
            }),
        )
        .expect("add");

    let payload = PayloadHandle::new(HookPayload::new().with_data("a", json!(1)));
    let outcome = engine.dispatcher.trigger("onSend", &payload).await.expect("trigger");

    assert_eq!(outcome, TriggerOutcome::Completed);
    assert_eq!(payload.lock().await.get_i64("seen"), Some(1));
}

#[tokio::test]
async fn test_runs_in_registration_order() {
    let engine = TestEngine::new();
    engine.registry.add("onSend", push("A")).expect("add");
    engine.registry.add("onSend", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert_eq!(result.expect("trigger"), TriggerOutcome::Completed);
    assert_eq!(order, vec!["A", "B"]);
}

#[tokio::test]
async fn test_later_handlers_see_earlier_edits() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "preRoute",
            Handler::sync(|p: &mut HookPayload| {
                p.set("route", json!("n2"));
                Ok(HookAction::Continue)
            }),
        )
        .expect("add");
    engine
        .registry
        .add(
            "preRoute",
            Handler::future(|payload: PayloadHandle| async move {
                let mut p = payload.lock().await;
                let route = p.get_string("route").unwrap_or("none").to_string();
                p.append("order", json!(route));
                Ok(HookAction::Continue)
            }),
        )
        .expect("add");

    let (_, order) = engine.run("preRoute").await;
    assert_eq!(order, vec!["n2"]);
}

#[tokio::test]
async fn test_halt_stops_remaining_handlers() {
    let engine = TestEngine::new();
    engine
        .registry
        .add("onSend.A", tagging(Shape::Sync, "A", Decision::Halt))
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert_eq!(result.expect("halt is not an error"), TriggerOutcome::Halted);
    assert_eq!(order, vec!["A"]);
}

#[tokio::test]
async fn test_returned_error_stops_remaining_handlers() {
    let engine = TestEngine::new();
    engine
        .registry
        .add("onSend.A", tagging(Shape::Sync, "A", Decision::Fail))
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    let err = result.unwrap_err();
    assert_eq!(order, vec!["A"]);
    match err {
        HookError::HandlerFailed {
            hook,
            label,
            source,
        } => {
            assert_eq!(hook, "onSend");
            assert_eq!(label.as_deref(), Some("A"));
            assert_eq!(source.kind, ErrorKind::Hook);
            assert_eq!(source.message, "test error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_sync_panic_becomes_failure() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "onSend.A",
            Handler::sync(|p: &mut HookPayload| {
                p.append("order", json!("A"));
                panic!("boom");
            }),
        )
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert_eq!(order, vec!["A"]);
    match result.unwrap_err() {
        HookError::HandlerPanicked { hook, message, .. } => {
            assert_eq!(hook, "onSend");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_async_panic_becomes_failure() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "onSend",
            Handler::future(|_payload: PayloadHandle| async move {
                if true {
                    panic!("async boom {}", 7);
                }
                Ok(HookAction::Continue)
            }),
        )
        .expect("add");
    engine.registry.add("onSend", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert!(order.is_empty());
    assert!(matches!(
        result,
        Err(HookError::HandlerPanicked { ref message, .. }) if message == "async boom 7"
    ));
}

#[tokio::test]
async fn test_callback_panic_becomes_failure() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "onSend",
            Handler::callback(|_payload: PayloadHandle, _done: Done| panic!("callback boom")),
        )
        .expect("add");

    let (result, _) = engine.run("onSend").await;
    assert!(matches!(result, Err(HookError::HandlerPanicked { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_shapes_are_equivalent() {
    for decision in [Decision::Continue, Decision::Halt, Decision::Fail] {
        let mut observed = Vec::new();

        for shape in Shape::ALL {
            let engine = TestEngine::new();
            engine.registry.add("onSend", push("before")).expect("add");
            engine
                .registry
                .add("onSend", tagging(shape, "middle", decision))
                .expect("add");
            engine.registry.add("onSend", push("after")).expect("add");

            let (result, order) = engine.run("onSend").await;
            let outcome = match result {
                Ok(outcome) => format!("{outcome:?}"),
                Err(HookError::HandlerFailed { source, .. }) => format!("failed: {}", source.message),
                Err(other) => panic!("unexpected error: {other:?}"),
            };
            observed.push((shape, outcome, order));
        }

        let (_, first_outcome, first_order) = &observed[0];
        for (shape, outcome, order) in &observed[1..] {
            assert_eq!(outcome, first_outcome, "{shape:?} outcome for {decision:?}");
            assert_eq!(order, first_order, "{shape:?} order for {decision:?}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_callback_handler_suspends_walk() {
    let engine = TestEngine::new();
    engine
        .registry
        .add("onSend.A", tagging(Shape::Callback, "A", Decision::Continue))
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert_eq!(result.expect("trigger"), TriggerOutcome::Completed);
    assert_eq!(order, vec!["A", "B"]);
}

#[tokio::test]
async fn test_callback_edits_payload_inline() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "onSend.inline",
            Handler::callback(|payload: PayloadHandle, done: Done| {
                match payload.try_lock() {
                    Ok(mut p) => {
                        p.append("order", json!("A"));
                        drop(p);
                        done.proceed();
                    }
                    Err(e) => done.fail(AppError::hook(e.to_string())),
                }
            }),
        )
        .expect("add");
    engine.registry.add("onSend", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;
    assert_eq!(result.expect("trigger"), TriggerOutcome::Completed);
    assert_eq!(order, vec!["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn test_callback_failure_skips_rest() {
    let engine = TestEngine::new();
    engine
        .registry
        .add(
            "onSend.A",
            Handler::callback(|_payload: PayloadHandle, done: Done| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    done.fail(AppError::hook("test error"));
                });
            }),
        )
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert!(order.is_empty());
    assert!(matches!(result, Err(HookError::HandlerFailed { .. })));
}

#[tokio::test]
async fn test_dropped_done_fails_trigger() {
    let engine = TestEngine::new();
    engine
        .registry
        .add("onSend.A", Handler::callback(|_payload: PayloadHandle, done: Done| drop(done)))
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let (result, order) = engine.run("onSend").await;

    assert!(order.is_empty());
    match result.unwrap_err() {
        HookError::CallbackDropped { hook, label } => {
            assert_eq!(hook, "onSend");
            assert_eq!(label.as_deref(), Some("A"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_point_completes() {
    let engine = TestEngine::new();
    let (result, order) = engine.run("never-registered").await;
    assert_eq!(result.expect("trigger"), TriggerOutcome::Completed);
    assert!(order.is_empty());
}

#[tokio::test]
async fn test_trigger_with_runs_inline_for_empty_point() {
    let engine = TestEngine::new();
    let (tx, mut rx) = oneshot::channel();

    let handle = engine
        .dispatcher
        .trigger_with("never-registered", order_payload(), move |completion| {
            let _ = tx.send(completion);
        });

    assert!(handle.is_none());
    let completion = rx.try_recv().expect("callback already ran");
    assert!(matches!(completion, Completion::Completed));
}

#[test]
fn test_trigger_with_outside_runtime_reports_failure() {
    let engine = TestEngine::new();
    engine.registry.add("onSend", push("A")).expect("add");
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = oneshot::channel();

    let seen = calls.clone();
    let handle = engine
        .dispatcher
        .trigger_with("onSend", order_payload(), move |completion| {
            seen.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(completion);
        });

    assert!(handle.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    match rx.try_recv().expect("callback already ran") {
        Completion::Failed(HookError::NoRuntime { hook }) => assert_eq!(hook, "onSend"),
        other => panic!("expected NoRuntime, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_trigger_with_reports_each_outcome_once() {
    for (decision, expected) in [
        (Decision::Continue, "completed"),
        (Decision::Halt, "halted"),
        (Decision::Fail, "failed"),
    ] {
        let engine = TestEngine::new();
        engine
            .registry
            .add("onSend", tagging(Shape::Async, "A", decision))
            .expect("add");

        let (tx, rx) = oneshot::channel();
        let handle = engine
            .dispatcher
            .trigger_with("onSend", order_payload(), move |completion| {
                // FnOnce plus a oneshot sender: a second call could not compile.
                let _ = tx.send(completion);
            })
            .expect("spawned");

        handle.await.expect("task");
        let completion = rx.await.expect("callback ran");
        let label = match completion {
            Completion::Completed => "completed",
            Completion::Halted => "halted",
            Completion::Failed(_) => "failed",
        };
        assert_eq!(label, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fails_stalled_callback() {
    let engine = TestEngine::new();
    let dispatcher = engine
        .dispatcher
        .clone()
        .with_handler_timeout(Duration::from_millis(100));
    engine
        .registry
        .add(
            "onSend.stuck",
            Handler::callback(|_payload: PayloadHandle, done: Done| {
                tokio::spawn(async move {
                    let _held = done;
                    std::future::pending::<()>().await;
                });
            }),
        )
        .expect("add");
    engine.registry.add("onSend.B", push("B")).expect("add");

    let payload = order_payload();
    let result = dispatcher.trigger("onSend", &payload).await;

    assert!(payload.lock().await.strings("order").is_empty());
    match result.unwrap_err() {
        HookError::TimedOut {
            label, timeout_ms, ..
        } => {
            assert_eq!(label.as_deref(), Some("stuck"));
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_from_config_applies_to_async_handlers() {
    let registry = Arc::new(HookRegistry::new());
    let config = hookwire_core::config::hooks::HooksConfig {
        restrict_to_known_points: false,
        handler_timeout_ms: Some(1_000),
    };
    let dispatcher = HookDispatcher::from_config(registry.clone(), &config);

    registry
        .add(
            "onSend",
            Handler::future(|_payload: PayloadHandle| async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(HookAction::Continue)
            }),
        )
        .expect("add");

    let result = dispatcher.trigger("onSend", &order_payload()).await;
    assert!(matches!(result, Err(HookError::TimedOut { timeout_ms: 1_000, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_does_not_affect_fast_handlers() {
    let engine = TestEngine::new();
    let dispatcher = engine
        .dispatcher
        .clone()
        .with_handler_timeout(Duration::from_secs(1));
    engine
        .registry
        .add("onSend", tagging(Shape::Callback, "A", Decision::Continue))
        .expect("add");

    let payload = order_payload();
    let outcome = dispatcher.trigger("onSend", &payload).await.expect("trigger");
    assert_eq!(outcome, TriggerOutcome::Completed);
    assert_eq!(payload.lock().await.strings("order"), vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_triggers_keep_their_own_order() {
    let engine = TestEngine::new();
    engine
        .registry
        .add("onSend", tagging(Shape::Async, "A", Decision::Continue))
        .expect("add");
    engine
        .registry
        .add("onSend", tagging(Shape::Callback, "B", Decision::Continue))
        .expect("add");
    engine.registry.add("onSend", push("C")).expect("add");

    let first = order_payload();
    let second = order_payload();
    let (r1, r2) = tokio::join!(
        engine.dispatcher.trigger("onSend", &first),
        engine.dispatcher.trigger("onSend", &second),
    );

    assert_eq!(r1.expect("first"), TriggerOutcome::Completed);
    assert_eq!(r2.expect("second"), TriggerOutcome::Completed);
    assert_eq!(first.lock().await.strings("order"), vec!["A", "B", "C"]);
    assert_eq!(second.lock().await.strings("order"), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_failure_converts_to_app_error() {
    let engine = TestEngine::new();
    engine
        .registry
        .add("preInstall", tagging(Shape::Sync, "A", Decision::Fail))
        .expect("add");

    let (result, _) = engine.run("preInstall").await;
    let app: AppError = result.unwrap_err().into();
    assert_eq!(app.kind, ErrorKind::Hook);
    assert!(app.message.contains("preInstall"));
}
