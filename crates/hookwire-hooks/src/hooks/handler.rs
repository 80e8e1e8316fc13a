//! Handler shapes.
//!
//! A handler is registered as exactly one of three calling conventions. The
//! shape is fixed when the [`Handler`] value is built; the dispatcher never
//! inspects return values to guess it.
//!
//! | Shape | Signature | Result delivered by |
//! |-------|-----------|---------------------|
//! | [`Handler::Sync`] | `Fn(&mut HookPayload) -> HandlerResult` | return value |
//! | [`Handler::Callback`] | `Fn(PayloadHandle, Done)` | `done.resolve(..)` |
//! | [`Handler::Async`] | `Fn(PayloadHandle) -> impl Future<Output = HandlerResult>` | future output |
//!
//! All three produce the same outcomes: `Ok(Continue)`, `Ok(Halt)`, or `Err`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use hookwire_core::error::AppError;
use hookwire_core::result::AppResult;

use super::definitions::{HookAction, HookPayload, PayloadHandle};

/// Value every handler eventually yields.
pub type HandlerResult = AppResult<HookAction>;

/// Handler that completes before returning.
pub trait SyncHook: Send + Sync {
    /// Runs the handler against the locked payload.
    fn call(&self, payload: &mut HookPayload) -> HandlerResult;
}

impl<F> SyncHook for F
where
    F: Fn(&mut HookPayload) -> HandlerResult + Send + Sync,
{
    fn call(&self, payload: &mut HookPayload) -> HandlerResult {
        (self)(payload)
    }
}

/// Handler that reports completion through a [`Done`] token.
///
/// The token may be moved into a spawned task and resolved later.
pub trait CallbackHook: Send + Sync {
    /// Starts the handler.
    fn call(&self, payload: PayloadHandle, done: Done);
}

impl<F> CallbackHook for F
where
    F: Fn(PayloadHandle, Done) + Send + Sync,
{
    fn call(&self, payload: PayloadHandle, done: Done) {
        (self)(payload, done)
    }
}

/// Handler whose completion is the output of a future.
#[async_trait]
pub trait AsyncHook: Send + Sync {
    /// Runs the handler to completion.
    async fn call(&self, payload: PayloadHandle) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> AsyncHook for F
where
    F: Fn(PayloadHandle) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, payload: PayloadHandle) -> HandlerResult {
        (self)(payload).await
    }
}

/// A registered handler, tagged with its calling convention.
#[derive(Clone)]
pub enum Handler {
    /// Returns its result directly.
    Sync(Arc<dyn SyncHook>),
    /// Resolves a [`Done`] token, possibly after returning.
    Callback(Arc<dyn CallbackHook>),
    /// Returns a future yielding its result.
    Async(Arc<dyn AsyncHook>),
}

impl Handler {
    /// Builds a synchronous handler from a closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut HookPayload) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Builds a callback-style handler from a closure.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(PayloadHandle, Done) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Builds an async handler from a closure returning a future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(PayloadHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Async(Arc::new(f))
    }

    /// Short name of the calling convention, for logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Callback(_) => "callback",
            Self::Async(_) => "async",
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.shape()).finish()
    }
}

/// One-shot completion token handed to callback-style handlers.
///
/// Resolving consumes the token, so a handler can complete at most once.
/// Dropping it unresolved fails the trigger.
#[derive(Debug)]
pub struct Done {
    tx: oneshot::Sender<HandlerResult>,
}

impl Done {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<HandlerResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Completes the handler with an explicit result.
    pub fn resolve(self, result: HandlerResult) {
        // The receiver is gone only if the trigger itself was dropped.
        let _ = self.tx.send(result);
    }

    /// Continues to the next handler.
    pub fn proceed(self) {
        self.resolve(Ok(HookAction::Continue));
    }

    /// Halts the pipeline.
    pub fn halt(self) {
        self.resolve(Ok(HookAction::Halt));
    }

    /// Fails the trigger with `err`.
    pub fn fail(self, err: AppError) {
        self.resolve(Err(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_names() {
        let sync = Handler::sync(|_p: &mut HookPayload| Ok(HookAction::Continue));
        let callback = Handler::callback(|_p, done: Done| done.proceed());
        let future = Handler::future(|_p| async { Ok(HookAction::Halt) });

        assert_eq!(sync.shape(), "sync");
        assert_eq!(callback.shape(), "callback");
        assert_eq!(future.shape(), "async");
        assert_eq!(format!("{future:?}"), "Handler(\"async\")");
    }

    #[tokio::test]
    async fn test_done_delivers_once() {
        let (done, rx) = Done::channel();
        done.halt();
        assert_eq!(rx.await.expect("resolved").expect("ok"), HookAction::Halt);
    }

    #[tokio::test]
    async fn test_dropped_done_closes_channel() {
        let (done, rx) = Done::channel();
        drop(done);
        assert!(rx.await.is_err());
    }

    struct Counter;

    impl SyncHook for Counter {
        fn call(&self, payload: &mut HookPayload) -> HandlerResult {
            let n = payload.get_i64("n").unwrap_or(0);
            payload.set("n", serde_json::json!(n + 1));
            Ok(HookAction::Continue)
        }
    }

    #[test]
    fn test_trait_impl_as_handler() {
        let handler = Handler::Sync(Arc::new(Counter));
        let mut payload = HookPayload::new();
        if let Handler::Sync(hook) = &handler {
            hook.call(&mut payload).expect("ok");
            hook.call(&mut payload).expect("ok");
        }
        assert_eq!(payload.get_i64("n"), Some(2));
    }
}
