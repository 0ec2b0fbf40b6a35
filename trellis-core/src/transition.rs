//! Workflow transitions: named, guarded, role-gated directed edges.

use crate::guard::{GuardExpr, GuardSpec};
use crate::hooks::{Guard, Hook};
use crate::state::{humanize, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Which states a transition may fire from.
///
/// `Any` is the wildcard used for cross-cutting actions such as cancellation:
/// it matches every non-final state without enumerating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Any,
    From(Vec<StateId>),
}

impl SourceSpec {
    pub fn states<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StateId>,
    {
        Self::From(states.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, state: &StateId, state_is_final: bool) -> bool {
        match self {
            SourceSpec::Any => !state_is_final,
            SourceSpec::From(sources) => sources.contains(state),
        }
    }
}

impl From<&str> for SourceSpec {
    fn from(state: &str) -> Self {
        Self::From(vec![StateId::from(state)])
    }
}

impl<const N: usize> From<[&str; N]> for SourceSpec {
    fn from(states: [&str; N]) -> Self {
        Self::states(states)
    }
}

/// Which roles a transition is gated on.
///
/// The gate passes when the caller holds at least one of the required roles.
/// A caller with no role information at all (as opposed to an empty role set)
/// skips the gate entirely; see [`crate::context::Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleSpec {
    Any,
    AnyOf(Vec<String>),
}

impl RoleSpec {
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(roles.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, acting: Option<&BTreeSet<String>>) -> bool {
        match self {
            RoleSpec::Any => true,
            RoleSpec::AnyOf(required) if required.is_empty() => true,
            RoleSpec::AnyOf(required) => match acting {
                // No role information supplied: permissive by default.
                None => true,
                Some(held) => required.iter().any(|role| held.contains(role)),
            },
        }
    }
}

/// A confirmation prompt the UI must show before firing the transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
}

/// A directed edge of the workflow graph.
pub struct TransitionDef {
    name: String,
    source: SourceSpec,
    target: StateId,
    roles: RoleSpec,
    label: Option<String>,
    color: Option<String>,
    icon: Option<String>,
    confirmation: Option<Confirmation>,
    guard: Option<GuardSpec>,
    callback: Option<Arc<dyn Hook>>,
}

impl TransitionDef {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<SourceSpec>,
        target: impl Into<StateId>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            roles: RoleSpec::Any,
            label: None,
            color: None,
            icon: None,
            confirmation: None,
            guard: None,
            callback: None,
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = RoleSpec::roles(roles);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
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

    pub fn confirm(mut self, message: impl Into<String>) -> Self {
        self.confirmation = Some(Confirmation {
            message: message.into(),
        });
        self
    }

    /// Attaches a declarative guard expression, compiled immediately.
    pub fn with_guard_expr(mut self, expr: &str) -> Result<Self, crate::error::WorkflowError> {
        self.guard = Some(GuardSpec::Expr(GuardExpr::parse(expr)?));
        Ok(self)
    }

    /// Attaches an opaque guard. Such guards are stripped by schema export.
    pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.guard = Some(GuardSpec::Custom(guard));
        self
    }

    /// Attaches a domain callback run during `apply`.
    pub fn with_callback(mut self, callback: Arc<dyn Hook>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &SourceSpec {
        &self.source
    }

    pub fn target(&self) -> &StateId {
        &self.target
    }

    pub fn roles(&self) -> &RoleSpec {
        &self.roles
    }

    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| humanize(&self.name))
    }

    pub fn raw_label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn guard(&self) -> Option<&GuardSpec> {
        self.guard.as_ref()
    }

    pub fn callback(&self) -> Option<&Arc<dyn Hook>> {
        self.callback.as_ref()
    }
}

impl fmt::Debug for TransitionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDef")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("roles", &self.roles)
            .field("confirmation", &self.confirmation)
            .field("guard", &self.guard)
            .field("callback", &self.callback.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_matching() {
        let exact = SourceSpec::from(["under_review", "request_received"]);
        assert!(exact.matches(&StateId::from("under_review"), false));
        assert!(!exact.matches(&StateId::from("approved"), false));
        // Exact sources ignore finality.
        assert!(exact.matches(&StateId::from("under_review"), true));

        let any = SourceSpec::Any;
        assert!(any.matches(&StateId::from("anything"), false));
        assert!(!any.matches(&StateId::from("closed"), true));
    }

    #[test]
    fn test_role_gate() {
        let gate = RoleSpec::roles(["curator", "administrator"]);

        let held: BTreeSet<String> = ["curator".to_string()].into_iter().collect();
        assert!(gate.allows(Some(&held)));

        let held: BTreeSet<String> = ["guest".to_string()].into_iter().collect();
        assert!(!gate.allows(Some(&held)));

        // Absent role information skips the gate; an empty set does not.
        assert!(gate.allows(None));
        let empty = BTreeSet::new();
        assert!(!gate.allows(Some(&empty)));

        assert!(RoleSpec::Any.allows(Some(&empty)));
        assert!(RoleSpec::AnyOf(vec![]).allows(Some(&empty)));
    }

    #[test]
    fn test_builder() {
        let t = TransitionDef::new("approve", "under_review", "approved")
            .with_roles(["curator"])
            .with_label("Approve Request")
            .confirm("Approve this loan request?");

        assert_eq!(t.name(), "approve");
        assert_eq!(t.label(), "Approve Request");
        assert_eq!(t.target(), &StateId::from("approved"));
        assert_eq!(
            t.confirmation().map(|c| c.message.as_str()),
            Some("Approve this loan request?")
        );
    }

    #[test]
    fn test_label_fallback() {
        let t = TransitionDef::new("start_condition_check", "a", "b");
        assert_eq!(t.label(), "Start Condition Check");
    }
}
