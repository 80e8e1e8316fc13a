//! Hook registry — subsystems register handlers by hook point in arrival order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use hookwire_core::config::hooks::HooksConfig;

use super::definitions::HookPoint;
use super::handler::Handler;
use super::id::{HookId, RemovalTarget};
use crate::error::HookError;

/// One handler registered on one hook point.
#[derive(Debug)]
pub struct Registration {
    /// Registry-wide sequence number.
    seq: u64,
    /// Hook point the handler listens on.
    point: String,
    /// Optional label making the registration removable.
    label: Option<String>,
    /// The handler.
    handler: Handler,
    /// Call site of the `add` that created this registration.
    location: &'static Location<'static>,
}

impl Registration {
    /// Returns the hook point.
    pub fn point(&self) -> &str {
        &self.point
    }

    /// Returns the label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Returns where the registration was made.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Hook point → handlers in registration order. Never holds empty lists.
    points: HashMap<String, Vec<Arc<Registration>>>,
    /// Label → hook point → registration seq.
    labels: HashMap<String, HashMap<String, u64>>,
}

impl Inner {
    /// Detaches one registration, dropping the point once its list is empty.
    fn detach(&mut self, point: &str, seq: u64) {
        if let Some(entries) = self.points.get_mut(point) {
            entries.retain(|e| e.seq != seq);
            if entries.is_empty() {
                self.points.remove(point);
            }
        }
    }
}

/// Registry of hook handlers organized by hook point.
///
/// Build one per runtime and share it behind an `Arc`; there is no global
/// instance. Registration calls are synchronous and never wait on handlers,
/// so a handler may add or remove hooks on the registry that is running it.
#[derive(Debug, Default)]
pub struct HookRegistry {
    /// Registered handlers and the label index.
    inner: RwLock<Inner>,
    /// Points accepted by `add`; `None` accepts any name.
    allowed: Option<HashSet<String>>,
    /// Source of registration sequence numbers.
    next_seq: AtomicU64,
}

impl HookRegistry {
    /// Creates a new empty hook registry accepting any hook point.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that only accepts the well-known [`HookPoint`]s.
    pub fn with_known_points() -> Self {
        Self::with_allowed_points(HookPoint::ALL.iter().map(HookPoint::as_str))
    }

    /// Creates a registry that only accepts the given point names.
    pub fn with_allowed_points<I, S>(points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(points.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Creates a registry from configuration.
    pub fn from_config(config: &HooksConfig) -> Self {
        if config.restrict_to_known_points {
            Self::with_known_points()
        } else {
            Self::new()
        }
    }

    /// Registers a handler under `point` or `point.label`.
    ///
    /// The handler runs after every handler already registered on the point.
    /// A second registration of the same `point.label` is rejected and the
    /// first one is kept.
    #[track_caller]
    pub fn add(&self, hook_id: &str, handler: Handler) -> Result<(), HookError> {
        let location = Location::caller();
        let id = HookId::parse(hook_id)?;

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(&id.point) {
                return Err(HookError::UnknownHookPoint { point: id.point });
            }
        }

        let mut inner = self.write();
        if let Some(label) = &id.label {
            let taken = inner
                .labels
                .get(label)
                .is_some_and(|points| points.contains_key(&id.point));
            if taken {
                return Err(HookError::Duplicate {
                    id: hook_id.to_string(),
                });
            }
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        debug!(
            hook = %id,
            shape = handler.shape(),
            location = %location,
            "Adding hook"
        );

        if let Some(label) = &id.label {
            inner
                .labels
                .entry(label.clone())
                .or_default()
                .insert(id.point.clone(), seq);
        }
        inner
            .points
            .entry(id.point.clone())
            .or_default()
            .push(Arc::new(Registration {
                seq,
                point: id.point,
                label: id.label,
                handler,
                location,
            }));

        Ok(())
    }

    /// Removes `point.label`, or `*.label` from every point.
    ///
    /// Ids without a label are rejected: anonymous hooks can only be dropped
    /// by [`clear`](Self::clear). Removing something that is not registered
    /// is a no-op.
    pub fn remove(&self, hook_id: &str) -> Result<(), HookError> {
        let target = RemovalTarget::parse(hook_id)?;
        debug!(hook = %hook_id, "Removing hook");

        let mut inner = self.write();
        match target {
            RemovalTarget::Single { point, label } => {
                let Some(points) = inner.labels.get_mut(&label) else {
                    return Ok(());
                };
                let Some(seq) = points.remove(&point) else {
                    return Ok(());
                };
                if points.is_empty() {
                    inner.labels.remove(&label);
                }
                inner.detach(&point, seq);
            }
            RemovalTarget::AllPoints { label } => {
                if let Some(points) = inner.labels.remove(&label) {
                    for (point, seq) in points {
                        inner.detach(&point, seq);
                    }
                }
            }
        }

        Ok(())
    }

    /// Drops every registration.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.points.clear();
        inner.labels.clear();
        debug!("Cleared all hooks");
    }

    /// Returns the handlers for `point` in registration order.
    ///
    /// The returned list is a snapshot: later `add`/`remove` calls do not
    /// affect it.
    pub fn get_handlers(&self, point: &str) -> Vec<Arc<Registration>> {
        self.read().points.get(point).cloned().unwrap_or_default()
    }

    /// Returns whether any handler is registered on `point`.
    ///
    /// Cheap enough to call before building a payload, to skip triggers
    /// nobody listens to.
    pub fn is_active(&self, point: &str) -> bool {
        self.read().points.contains_key(point)
    }

    /// For `point.label`, whether that registration exists; for `point`,
    /// whether the point has any handler.
    pub fn has(&self, hook_id: &str) -> bool {
        let Ok(id) = HookId::parse(hook_id) else {
            return false;
        };
        let inner = self.read();
        match &id.label {
            Some(label) => inner
                .labels
                .get(label)
                .is_some_and(|points| points.contains_key(&id.point)),
            None => inner.points.contains_key(&id.point),
        }
    }

    /// Returns the set of points with at least one handler.
    ///
    /// A point leaves the set as soon as its last handler is removed.
    pub fn states(&self) -> BTreeSet<String> {
        self.read().points.keys().cloned().collect()
    }

    /// Returns the number of handlers registered for a hook point.
    pub fn handler_count(&self, point: &str) -> usize {
        self.read().points.get(point).map(Vec::len).unwrap_or(0)
    }

    /// Returns the labels registered on `point`, in registration order.
    pub fn labels(&self, point: &str) -> Vec<Option<String>> {
        self.read()
            .points
            .get(point)
            .map(|entries| entries.iter().map(|e| e.label.clone()).collect())
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        // Handlers never run under this lock, so a poisoned lock still holds
        // consistent data.
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
