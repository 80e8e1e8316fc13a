//! Hook dispatcher — runs the handlers of one hook point in order.
//!
//! Each trigger:
//! - Takes a snapshot of the point's handlers when it starts.
//! - Runs them one at a time; handler *i+1* starts only after handler *i*
//!   completed through its own calling convention.
//! - Stops at the first `Halt` (reported as [`TriggerOutcome::Halted`]) or
//!   the first failure (returned as a [`HookError`]).
//!
//! Handler panics and dropped completion tokens are turned into failures;
//! nothing a handler does escapes the trigger.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use hookwire_core::config::hooks::HooksConfig;

use super::definitions::{Completion, HookAction, PayloadHandle, TriggerOutcome};
use super::handler::{AsyncHook, CallbackHook, Done, Handler, HandlerResult, SyncHook};
use super::registry::{HookRegistry, Registration};
use crate::error::HookError;

/// Dispatches triggers to registered handlers.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    /// Hook registry.
    registry: Arc<HookRegistry>,
    /// Deadline for each callback or async handler.
    handler_timeout: Option<Duration>,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher with no handler deadline.
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self {
            registry,
            handler_timeout: None,
        }
    }

    /// Creates a dispatcher using the configured handler deadline.
    pub fn from_config(registry: Arc<HookRegistry>, config: &HooksConfig) -> Self {
        Self {
            registry,
            handler_timeout: config.handler_timeout(),
        }
    }

    /// Fails any callback or async handler that runs longer than `timeout`.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Runs every handler registered on `point` against `payload`.
    ///
    /// Returns [`TriggerOutcome::Completed`] immediately when nothing is
    /// registered.
    pub async fn trigger(
        &self,
        point: &str,
        payload: &PayloadHandle,
    ) -> Result<TriggerOutcome, HookError> {
        let handlers = self.registry.get_handlers(point);
        if handlers.is_empty() {
            return Ok(TriggerOutcome::Completed);
        }

        debug!(
            hook = %point,
            handler_count = handlers.len(),
            "Triggering hook"
        );

        for registration in &handlers {
            match self.invoke(registration, payload).await {
                Ok(HookAction::Continue) => {}
                Ok(HookAction::Halt) => {
                    debug!(
                        hook = %point,
                        label = registration.label().unwrap_or_default(),
                        "Handler halted execution"
                    );
                    return Ok(TriggerOutcome::Halted);
                }
                Err(e) => {
                    warn!(
                        hook = %point,
                        label = registration.label().unwrap_or_default(),
                        error = %e,
                        "Hook handler failed"
                    );
                    return Err(e);
                }
            }
        }

        Ok(TriggerOutcome::Completed)
    }

    /// Triggers `point` and reports the outcome to `callback` exactly once.
    ///
    /// With nothing registered, `callback` runs before this returns and no
    /// task is spawned. Otherwise the walk runs on a task spawned onto the
    /// current tokio runtime, whose handle is returned. Called outside a
    /// runtime, `callback` receives [`HookError::NoRuntime`] before this
    /// returns and no handler runs.
    pub fn trigger_with<F>(
        &self,
        point: &str,
        payload: PayloadHandle,
        callback: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        if !self.registry.is_active(point) {
            callback(Completion::Completed);
            return None;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(hook = %point, error = %e, "No runtime to trigger hook on");
                callback(Completion::Failed(HookError::NoRuntime {
                    hook: point.to_string(),
                }));
                return None;
            }
        };

        let dispatcher = self.clone();
        let point = point.to_string();
        Some(runtime.spawn(async move {
            let result = dispatcher.trigger(&point, &payload).await;
            callback(Completion::from(result));
        }))
    }

    /// Returns a reference to the hook registry.
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    async fn invoke(
        &self,
        registration: &Registration,
        payload: &PayloadHandle,
    ) -> Result<HookAction, HookError> {
        match registration.handler() {
            Handler::Sync(hook) => {
                let mut guard = payload.lock().await;
                let result = panic::catch_unwind(AssertUnwindSafe(|| hook.call(&mut guard)));
                drop(guard);
                match result {
                    Ok(result) => settle(registration, result),
                    Err(cause) => Err(panicked(registration, cause)),
                }
            }
            Handler::Callback(hook) => {
                let (done, rx) = Done::channel();
                let started =
                    panic::catch_unwind(AssertUnwindSafe(|| hook.call(payload.clone(), done)));
                if let Err(cause) = started {
                    return Err(panicked(registration, cause));
                }
                match self.bounded(registration, rx).await? {
                    Ok(result) => settle(registration, result),
                    Err(_) => Err(HookError::CallbackDropped {
                        hook: registration.point().to_string(),
                        label: registration.label().map(str::to_string),
                    }),
                }
            }
            Handler::Async(hook) => {
                let fut = AssertUnwindSafe(hook.call(payload.clone())).catch_unwind();
                match self.bounded(registration, fut).await? {
                    Ok(result) => settle(registration, result),
                    Err(cause) => Err(panicked(registration, cause)),
                }
            }
        }
    }

    /// Awaits `fut`, applying the handler deadline when one is configured.
    async fn bounded<F: Future>(
        &self,
        registration: &Registration,
        fut: F,
    ) -> Result<F::Output, HookError> {
        let Some(limit) = self.handler_timeout else {
            return Ok(fut.await);
        };
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| HookError::TimedOut {
                hook: registration.point().to_string(),
                label: registration.label().map(str::to_string),
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            })
    }
}

fn settle(registration: &Registration, result: HandlerResult) -> Result<HookAction, HookError> {
    result.map_err(|source| HookError::HandlerFailed {
        hook: registration.point().to_string(),
        label: registration.label().map(str::to_string),
        source,
    })
}

fn panicked(registration: &Registration, cause: Box<dyn Any + Send>) -> HookError {
    let message = if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    HookError::HandlerPanicked {
        hook: registration.point().to_string(),
        label: registration.label().map(str::to_string),
        message,
    }
}
