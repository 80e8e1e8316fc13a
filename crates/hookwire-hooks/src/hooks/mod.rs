//! Hook system — id parsing, handler shapes, registry, and dispatcher.

pub mod definitions;
pub mod dispatcher;
pub mod handler;
pub mod id;
pub mod registry;

pub use definitions::{Completion, HookAction, HookPayload, HookPoint, PayloadHandle, TriggerOutcome};
pub use dispatcher::HookDispatcher;
pub use handler::{AsyncHook, CallbackHook, Done, Handler, HandlerResult, SyncHook};
pub use id::{HookId, RemovalTarget};
pub use registry::{HookRegistry, Registration};
