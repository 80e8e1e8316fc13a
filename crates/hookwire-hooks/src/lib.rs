//! # hookwire-hooks
//!
//! Hook pipeline engine. Provides:
//!
//! - A hook registry keyed by hook point, preserving registration order
//! - Labelled registrations removable one at a time or across all points
//! - A dispatcher running sync, callback-style and async handlers through one
//!   Continue/Halt/Error contract
//! - Label scopes for subsystem-lifetime cleanup

mod macros;

pub mod error;
pub mod hooks;
pub mod prelude;
pub mod scope;

pub use error::HookError;
pub use hooks::definitions::{
    Completion, HookAction, HookPayload, HookPoint, PayloadHandle, TriggerOutcome,
};
pub use hooks::dispatcher::HookDispatcher;
pub use hooks::handler::{Done, Handler, HandlerResult};
pub use hooks::registry::HookRegistry;
pub use scope::HookScope;
