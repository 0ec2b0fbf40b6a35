//! Workflow states.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a state, unique within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named stage a tracked entity may occupy.
///
/// Display metadata (label, color, icon) is optional; the label falls back to
/// a humanized form of the id. `attrs` carries free-form per-state data that
/// the engine never interprets, e.g. a concrete workflow's progress number.
#[derive(Debug, Clone)]
pub struct StateDef {
    id: StateId,
    label: Option<String>,
    description: Option<String>,
    color: Option<String>,
    icon: Option<String>,
    phase: Option<String>,
    attrs: BTreeMap<String, Value>,
}

impl StateDef {
    pub fn new(id: impl Into<StateId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            description: None,
            color: None,
            icon: None,
            phase: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &StateId {
        &self.id
    }

    /// Display label, falling back to the humanized id.
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| humanize(self.id.as_str()))
    }

    /// Raw label metadata, without the humanized fallback.
    pub fn raw_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }
}

/// Turns `request_received` into `Request Received`.
pub fn humanize(id: &str) -> String {
    id.split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
