//! Caller-supplied context carried into guards, callbacks, and listeners.

use serde_json::Value;
use std::collections::BTreeSet;

/// Data accompanying a transition attempt.
///
/// `acting_roles` is `None` when the caller supplies no role information at
/// all, e.g. read-only introspection without an authenticated caller. Role
/// gates are then skipped entirely (permissive-by-default); an empty role set
/// is different and fails any non-wildcard role gate.
#[derive(Debug, Clone, Default)]
pub struct Context {
    acting_roles: Option<BTreeSet<String>>,
    data: Value,
}

impl Context {
    /// A context with no role information and no domain data.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context acting under the given roles.
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            acting_roles: Some(roles.into_iter().map(Into::into).collect()),
            data: Value::Null,
        }
    }

    /// Replaces the domain data bag.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Inserts a single field into the data bag, promoting it to an object
    /// if it was not one.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if !self.data.is_object() {
            self.data = Value::Object(Default::default());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.into(), value);
        }
    }

    pub fn acting_roles(&self) -> Option<&BTreeSet<String>> {
        self.acting_roles.as_ref()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.acting_roles
            .as_ref()
            .is_some_and(|roles| roles.contains(role))
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}
