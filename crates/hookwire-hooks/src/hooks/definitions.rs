//! Well-known hook points, the shared payload, and handler outcomes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, MutexGuard, TryLockError};
use uuid::Uuid;

use crate::error::HookError;

/// Hook points raised by the message-routing runtime and the module installer.
///
/// Registration is not limited to these names unless the registry was built
/// with [`HookRegistry::with_known_points`](crate::HookRegistry::with_known_points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPoint {
    // ── Message routing ──
    /// A node has called `send`; payload holds the outgoing send events.
    #[serde(rename = "onSend")]
    OnSend,
    /// A send event is about to be routed.
    #[serde(rename = "preRoute")]
    PreRoute,
    /// The router picked a destination; the message has been cloned if needed.
    #[serde(rename = "preDeliver")]
    PreDeliver,
    /// The message has been dispatched for delivery.
    #[serde(rename = "postDeliver")]
    PostDeliver,
    /// A node is about to receive a message.
    #[serde(rename = "onReceive")]
    OnReceive,
    /// The message has been handed to the node's input handler.
    #[serde(rename = "postReceive")]
    PostReceive,
    /// A node finished with a message or logged an error for it.
    #[serde(rename = "onComplete")]
    OnComplete,

    // ── Module installation ──
    /// Before a module is installed.
    #[serde(rename = "preInstall")]
    PreInstall,
    /// After a module is installed.
    #[serde(rename = "postInstall")]
    PostInstall,
    /// Before a module is removed.
    #[serde(rename = "preUninstall")]
    PreUninstall,
    /// After a module is removed.
    #[serde(rename = "postUninstall")]
    PostUninstall,
}

impl HookPoint {
    /// Every well-known hook point, in pipeline order.
    pub const ALL: [HookPoint; 11] = [
        Self::OnSend,
        Self::PreRoute,
        Self::PreDeliver,
        Self::PostDeliver,
        Self::OnReceive,
        Self::PostReceive,
        Self::OnComplete,
        Self::PreInstall,
        Self::PostInstall,
        Self::PreUninstall,
        Self::PostUninstall,
    ];

    /// Returns the string name of this hook point.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnSend => "onSend",
            Self::PreRoute => "preRoute",
            Self::PreDeliver => "preDeliver",
            Self::PostDeliver => "postDeliver",
            Self::OnReceive => "onReceive",
            Self::PostReceive => "postReceive",
            Self::OnComplete => "onComplete",
            Self::PreInstall => "preInstall",
            Self::PostInstall => "postInstall",
            Self::PreUninstall => "preUninstall",
            Self::PostUninstall => "postUninstall",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookPoint {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| HookError::UnknownHookPoint {
                point: s.to_string(),
            })
    }
}

impl AsRef<str> for HookPoint {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Mutable context passed by reference through every handler of a trigger.
///
/// Handlers see each other's edits in registration order; accumulating data
/// on the payload is the intended way state flows through a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookPayload {
    /// Identifier used to correlate log lines for this payload.
    pub id: Uuid,
    /// Arbitrary data keyed by string.
    pub data: Map<String, Value>,
    /// When the payload was built.
    pub created_at: DateTime<Utc>,
}

impl HookPayload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            data: Map::new(),
            created_at: Utc::now(),
        }
    }

    /// Inserts a value, builder style.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value, builder style.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, Value::String(value.to_string()))
    }

    /// Inserts or replaces a value.
    pub fn set(&mut self, key: &str, value: Value) -> Option<Value> {
        self.data.insert(key.to_string(), value)
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Appends to the array stored under `key`, creating it when absent.
    ///
    /// A non-array value under `key` is replaced by a one-element array.
    pub fn append(&mut self, key: &str, value: Value) {
        match self.data.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            _ => {
                self.data.insert(key.to_string(), Value::Array(vec![value]));
            }
        }
    }

    /// Gets a data value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Gets a string data value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Gets an i64 data value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool data value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }

    /// Returns the string entries of the array under `key`.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.data
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for HookPayload {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a payload, cloned into every handler of a trigger.
///
/// Callback-style and async handlers may hold the handle across suspension
/// points; the lock is only taken for the span of each access.
#[derive(Debug, Clone, Default)]
pub struct PayloadHandle(Arc<Mutex<HookPayload>>);

impl PayloadHandle {
    /// Wraps a payload for sharing across handlers.
    pub fn new(payload: HookPayload) -> Self {
        Self(Arc::new(Mutex::new(payload)))
    }

    /// Locks the payload for reading or mutation.
    pub async fn lock(&self) -> MutexGuard<'_, HookPayload> {
        self.0.lock().await
    }

    /// Locks the payload without waiting.
    ///
    /// Lets a callback-style handler edit the payload and resolve its token
    /// inline. Fails only while another handle holds the lock.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, HookPayload>, TryLockError> {
        self.0.try_lock()
    }

    /// Returns a copy of the current payload contents.
    pub async fn snapshot(&self) -> HookPayload {
        self.0.lock().await.clone()
    }
}

impl From<HookPayload> for PayloadHandle {
    fn from(payload: HookPayload) -> Self {
        Self::new(payload)
    }
}

/// What a handler wants the dispatcher to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HookAction {
    /// Run the next handler.
    #[default]
    Continue,
    /// Stop the pipeline here. Not an error.
    Halt,
}

/// Outcome of a trigger that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOutcome {
    /// Every handler ran and asked to continue.
    Completed,
    /// A handler halted the pipeline.
    Halted,
}

impl TriggerOutcome {
    /// Returns whether a handler halted the pipeline.
    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }
}

/// Value handed to a `trigger_with` completion callback, exactly once.
#[derive(Debug)]
pub enum Completion {
    /// Every handler ran and asked to continue.
    Completed,
    /// A handler halted the pipeline.
    Halted,
    /// A handler failed; remaining handlers were skipped.
    Failed(HookError),
}

impl Completion {
    /// Returns whether the trigger failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl From<Result<TriggerOutcome, HookError>> for Completion {
    fn from(result: Result<TriggerOutcome, HookError>) -> Self {
        match result {
            Ok(TriggerOutcome::Completed) => Self::Completed,
            Ok(TriggerOutcome::Halted) => Self::Halted,
            Err(e) => Self::Failed(e),
        }
    }
}
