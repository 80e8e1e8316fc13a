//! Hook engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hook engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Reject registrations on points outside the well-known set.
    #[serde(default)]
    pub restrict_to_known_points: bool,
    /// Per-handler deadline in milliseconds for callback and async handlers.
    ///
    /// Unset means a handler may suspend a trigger indefinitely.
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
}

impl HooksConfig {
    /// Returns the handler timeout as a [`Duration`], if configured.
    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}
