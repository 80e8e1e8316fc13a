//! Error types for the hook engine.

use hookwire_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Errors raised by registration calls and reported by failed triggers.
///
/// The first four variants are registration errors, returned directly from
/// `add`/`remove`. The rest only ever reach a caller through a trigger.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook id could not be parsed.
    #[error("Invalid hook id '{id}': {reason}")]
    InvalidHookId {
        /// The offending id.
        id: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The registry only accepts well-known hook points.
    #[error("Invalid hook '{point}'")]
    UnknownHookPoint {
        /// The rejected point name.
        point: String,
    },

    /// A registration with the same `point.label` already exists.
    #[error("Hook {id} already registered")]
    Duplicate {
        /// The duplicated id.
        id: String,
    },

    /// Anonymous hooks cannot be removed individually.
    #[error("Cannot remove hook without label: {id}")]
    UnlabelledRemoval {
        /// The id passed to `remove`.
        id: String,
    },

    /// A handler returned an error.
    #[error("Hook handler for '{hook}' failed: {source}")]
    HandlerFailed {
        /// Hook point being triggered.
        hook: String,
        /// Label of the failing registration, if any.
        label: Option<String>,
        /// Error returned by the handler.
        #[source]
        source: AppError,
    },

    /// A handler panicked.
    #[error("Hook handler for '{hook}' panicked: {message}")]
    HandlerPanicked {
        /// Hook point being triggered.
        hook: String,
        /// Label of the failing registration, if any.
        label: Option<String>,
        /// Panic message, when it was a string.
        message: String,
    },

    /// A callback-style handler dropped its completion token unresolved.
    #[error("Hook handler for '{hook}' dropped its completion callback")]
    CallbackDropped {
        /// Hook point being triggered.
        hook: String,
        /// Label of the failing registration, if any.
        label: Option<String>,
    },

    /// A handler did not complete within the configured deadline.
    #[error("Hook handler for '{hook}' timed out after {timeout_ms}ms")]
    TimedOut {
        /// Hook point being triggered.
        hook: String,
        /// Label of the failing registration, if any.
        label: Option<String>,
        /// The deadline that elapsed.
        timeout_ms: u64,
    },

    /// A callback-form trigger was started outside a tokio runtime.
    #[error("Cannot trigger '{hook}': no tokio runtime is running")]
    NoRuntime {
        /// Hook point that was not triggered.
        hook: String,
    },
}

impl HookError {
    /// Returns the hook point a trigger failure happened on.
    pub fn hook(&self) -> Option<&str> {
        match self {
            Self::HandlerFailed { hook, .. }
            | Self::HandlerPanicked { hook, .. }
            | Self::CallbackDropped { hook, .. }
            | Self::TimedOut { hook, .. }
            | Self::NoRuntime { hook } => Some(hook),
            _ => None,
        }
    }

    /// Returns whether this is a registration error rather than a trigger failure.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHookId { .. }
                | Self::UnknownHookPoint { .. }
                | Self::Duplicate { .. }
                | Self::UnlabelledRemoval { .. }
        )
    }
}

impl From<HookError> for AppError {
    fn from(err: HookError) -> Self {
        let kind = match &err {
            HookError::InvalidHookId { .. }
            | HookError::UnknownHookPoint { .. }
            | HookError::UnlabelledRemoval { .. } => ErrorKind::Validation,
            HookError::Duplicate { .. } => ErrorKind::Conflict,
            HookError::TimedOut { .. } => ErrorKind::Timeout,
            HookError::NoRuntime { .. } => ErrorKind::Internal,
            HookError::HandlerFailed { .. }
            | HookError::HandlerPanicked { .. }
            | HookError::CallbackDropped { .. } => ErrorKind::Hook,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
