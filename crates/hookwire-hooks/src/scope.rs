//! Hook scopes — lifetime management for a subsystem's registrations.

use std::sync::Arc;

use tracing::info;

use crate::error::HookError;
use crate::hooks::handler::Handler;
use crate::hooks::registry::HookRegistry;

/// Registers hooks under one label so they can be removed together.
///
/// A flow, a debugger session, or an installed module typically owns one
/// scope: every hook it adds lands on `point.<label>`, and
/// [`close`](Self::close) removes them all with `*.<label>`.
#[derive(Debug, Clone)]
pub struct HookScope {
    /// Label shared by every registration in this scope.
    label: String,
    /// Hook registry.
    registry: Arc<HookRegistry>,
}

impl HookScope {
    /// Creates a scope for `label` on `registry`.
    pub fn new(registry: Arc<HookRegistry>, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            registry,
        }
    }

    /// Returns the scope label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Registers `handler` on `point` under this scope's label.
    #[track_caller]
    pub fn add(&self, point: impl AsRef<str>, handler: Handler) -> Result<(), HookError> {
        self.registry
            .add(&format!("{}.{}", point.as_ref(), self.label), handler)
    }

    /// Removes this scope's hook from one point.
    pub fn remove(&self, point: impl AsRef<str>) -> Result<(), HookError> {
        self.registry
            .remove(&format!("{}.{}", point.as_ref(), self.label))
    }

    /// Returns whether this scope has a hook on `point`.
    pub fn has(&self, point: impl AsRef<str>) -> bool {
        self.registry
            .has(&format!("{}.{}", point.as_ref(), self.label))
    }

    /// Removes every hook registered under this scope's label.
    pub fn close(&self) -> Result<(), HookError> {
        self.registry.remove(&format!("*.{}", self.label))?;
        info!(label = %self.label, "Hook scope closed");
        Ok(())
    }
}
