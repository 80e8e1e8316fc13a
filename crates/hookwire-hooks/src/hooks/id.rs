//! Hook id parsing.
//!
//! Ids are parsed once at the API boundary; the registry and dispatcher only
//! ever work with the structured forms below.

use std::fmt;

use crate::error::HookError;

/// Point name reserved for removing a label from every point.
pub const WILDCARD: &str = "*";

const SEPARATOR: char = '.';

/// A parsed `point` or `point.label` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookId {
    /// The hook point.
    pub point: String,
    /// Optional label making the registration removable.
    pub label: Option<String>,
}

impl HookId {
    /// Parses an id used for registration. The wildcard point is rejected.
    pub fn parse(raw: &str) -> Result<Self, HookError> {
        let (point, label) = split(raw)?;
        if point == WILDCARD {
            return Err(invalid(raw, "wildcard is only valid for removal"));
        }
        Ok(Self {
            point: point.to_string(),
            label: label.map(str::to_string),
        })
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}{SEPARATOR}{label}", self.point),
            None => write!(f, "{}", self.point),
        }
    }
}

/// What a `remove` call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalTarget {
    /// One labelled registration on one point.
    Single {
        /// The hook point.
        point: String,
        /// The registration label.
        label: String,
    },
    /// The label on every point it is registered on.
    AllPoints {
        /// The registration label.
        label: String,
    },
}

impl RemovalTarget {
    /// Parses an id passed to `remove`. Unlabelled ids are rejected.
    pub fn parse(raw: &str) -> Result<Self, HookError> {
        let (point, label) = split(raw)?;
        let Some(label) = label else {
            return Err(HookError::UnlabelledRemoval { id: raw.to_string() });
        };
        if point == WILDCARD {
            Ok(Self::AllPoints {
                label: label.to_string(),
            })
        } else {
            Ok(Self::Single {
                point: point.to_string(),
                label: label.to_string(),
            })
        }
    }
}

fn split(raw: &str) -> Result<(&str, Option<&str>), HookError> {
    let (point, label) = match raw.split_once(SEPARATOR) {
        Some((point, label)) => (point, Some(label)),
        None => (raw, None),
    };
    if point.is_empty() {
        return Err(invalid(raw, "hook point must not be empty"));
    }
    if label.is_some_and(str::is_empty) {
        return Err(invalid(raw, "label must not be empty"));
    }
    Ok((point, label))
}

fn invalid(raw: &str, reason: &'static str) -> HookError {
    HookError::InvalidHookId {
        id: raw.to_string(),
        reason,
    }
}
