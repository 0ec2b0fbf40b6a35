//! # trellis-workflows
//!
//! Built-in workflow catalogues for museum collections procedures, supplied
//! to the engine as data. Currently the two Spectrum 5.0 loan procedures:
//! loans out (lending an object) and loans in (borrowing one).
//!
//! Progress and phase grouping are catalogue conventions, not engine
//! features: each state carries a `progress` attribute (0-100) and a phase,
//! and the helpers here read them back.

pub mod loan_in;
pub mod loan_out;

use serde_json::Value;
use trellis_core::{Registry, Schema, StateDef, StateId, Workflow};

/// Registry pre-populated with every built-in workflow.
pub fn registry() -> Registry {
    let registry = Registry::new();
    registry.register(Workflow::new(loan_out::schema()));
    registry.register(Workflow::new(loan_in::schema()));
    registry
}

/// How far through the procedure a state is, 0-100, read from the state's
/// `progress` attribute. Unknown states report 0.
pub fn progress(schema: &Schema, state: &StateId) -> u8 {
    schema
        .state(state)
        .and_then(|s| s.attr("progress"))
        .and_then(Value::as_u64)
        .map(|p| p.min(100) as u8)
        .unwrap_or(0)
}

/// States grouped by phase, in first-declared order of both phases and
/// states. States without a phase group under `"other"`.
pub fn states_by_phase(schema: &Schema) -> Vec<(String, Vec<&StateDef>)> {
    let mut groups: Vec<(String, Vec<&StateDef>)> = Vec::new();
    for state in schema.states() {
        let phase = state.phase().unwrap_or("other");
        match groups.iter_mut().find(|(name, _)| name == phase) {
            Some((_, members)) => members.push(state),
            None => groups.push((phase.to_string(), vec![state])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_builtins() {
        let registry = registry();
        assert_eq!(registry.identifiers(), vec!["loan_in", "loan_out"]);
    }

    #[test]
    fn test_progress_unknown_state_is_zero() {
        let schema = loan_out::schema();
        assert_eq!(progress(&schema, &StateId::from("no_such_state")), 0);
    }

    #[test]
    fn test_states_by_phase_ordering() {
        let schema = loan_out::schema();
        let groups = states_by_phase(&schema);
        let phases: Vec<&str> = groups.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            phases,
            vec![
                "request",
                "preparation",
                "closed",
                "dispatch",
                "transit",
                "on_loan",
                "return"
            ]
        );
    }
}
