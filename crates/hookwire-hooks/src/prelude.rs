//! Prelude for convenient imports.

pub use async_trait::async_trait;

pub use hookwire_core::error::AppError;
pub use hookwire_core::result::AppResult;

pub use crate::error::HookError;
pub use crate::hooks::definitions::{
    Completion, HookAction, HookPayload, HookPoint, PayloadHandle, TriggerOutcome,
};
pub use crate::hooks::dispatcher::HookDispatcher;
pub use crate::hooks::handler::{AsyncHook, CallbackHook, Done, Handler, HandlerResult, SyncHook};
pub use crate::hooks::registry::HookRegistry;
pub use crate::scope::HookScope;

pub use crate::hook_payload;
