//! Shared test helpers for hook engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use hookwire_core::error::AppError;
use hookwire_hooks::prelude::*;

/// Delay used by handlers that complete later.
pub const DELAY: Duration = Duration::from_millis(30);

/// Logical decision a test handler makes after recording its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Halt,
    Fail,
}

/// Calling convention a test handler is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Sync,
    Callback,
    Async,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Sync, Shape::Callback, Shape::Async];
}

/// Fresh registry plus a dispatcher over it.
pub struct TestEngine {
    pub registry: Arc<HookRegistry>,
    pub dispatcher: HookDispatcher,
}

impl TestEngine {
    pub fn new() -> Self {
        let registry = Arc::new(HookRegistry::new());
        let dispatcher = HookDispatcher::new(registry.clone());
        Self {
            registry,
            dispatcher,
        }
    }

    /// Triggers `point` with a fresh payload holding an empty `order` trace.
    pub async fn run(&self, point: &str) -> (Result<TriggerOutcome, HookError>, Vec<String>) {
        let payload = order_payload();
        let result = self.dispatcher.trigger(point, &payload).await;
        let order = payload.lock().await.strings("order");
        (result, order)
    }
}

/// Payload with an empty `order` array.
pub fn order_payload() -> PayloadHandle {
    PayloadHandle::new(hook_payload!({ "order" => json!([]) }))
}

fn decide(decision: Decision) -> HandlerResult {
    match decision {
        Decision::Continue => Ok(HookAction::Continue),
        Decision::Halt => Ok(HookAction::Halt),
        Decision::Fail => Err(AppError::hook("test error")),
    }
}

/// Handler that pushes `tag` onto `order`, then makes `decision`.
///
/// Callback and async shapes complete after [`DELAY`].
pub fn tagging(shape: Shape, tag: &'static str, decision: Decision) -> Handler {
    match shape {
        Shape::Sync => Handler::sync(move |p: &mut HookPayload| {
            p.append("order", json!(tag));
            decide(decision)
        }),
        Shape::Callback => Handler::callback(move |payload: PayloadHandle, done: Done| {
            tokio::spawn(async move {
                tokio::time::sleep(DELAY).await;
                payload.lock().await.append("order", json!(tag));
                done.resolve(decide(decision));
            });
        }),
        Shape::Async => Handler::future(move |payload: PayloadHandle| async move {
            tokio::time::sleep(DELAY).await;
            payload.lock().await.append("order", json!(tag));
            decide(decision)
        }),
    }
}

/// Synchronous handler that pushes `tag` and continues.
pub fn push(tag: &'static str) -> Handler {
    tagging(Shape::Sync, tag, Decision::Continue)
}
