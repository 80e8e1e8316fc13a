//! Convenience result type alias for hookwire.

use crate::error::AppError;

/// A specialized `Result` type for hookwire operations.
///
/// Hook handlers return `AppResult<HookAction>`.
pub type AppResult<T> = Result<T, AppError>;
