//! Structural validation of schemas.

use crate::schema::Schema;
use crate::transition::SourceSpec;

/// Checks every structural invariant and collects every violation, so a
/// configuration author gets the complete report in one pass. Intended for
/// tests and startup, not the runtime hot path. Never fails.
pub fn validate(schema: &Schema) -> Vec<String> {
    let mut report = Vec::new();

    if !schema.has_state(schema.initial()) {
        report.push(format!(
            "initial state '{}' is not declared",
            schema.initial()
        ));
    }

    for id in schema.finals() {
        if !schema.has_state(id) {
            report.push(format!("final state '{}' is not declared", id));
        }
    }

    for transition in schema.transitions() {
        if !schema.has_state(transition.target()) {
            report.push(format!(
                "transition '{}' targets undeclared state '{}'",
                transition.name(),
                transition.target()
            ));
        }

        if let SourceSpec::From(sources) = transition.source() {
            for source in sources {
                if !schema.has_state(source) {
                    report.push(format!(
                        "transition '{}' has undeclared source state '{}'",
                        transition.name(),
                        source
                    ));
                }
            }
        }
    }

    // Every non-final state must offer a way out.
    for state in schema.states() {
        if schema.is_final(state.id()) {
            continue;
        }
        let has_exit = schema
            .transitions()
            .iter()
            .any(|t| t.source().matches(state.id(), false));
        if !has_exit {
            report.push(format!(
                "non-final state '{}' has no outgoing transition",
                state.id()
            ));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateDef;
    use crate::transition::{SourceSpec, TransitionDef};

    fn valid_schema() -> Schema {
        Schema::builder("shipping", "Shipping")
            .state(StateDef::new("created"))
            .state(StateDef::new("packed"))
            .state(StateDef::new("shipped"))
            .state(StateDef::new("cancelled"))
            .initial("created")
            .final_states(["shipped", "cancelled"])
            .transition(TransitionDef::new("pack", "created", "packed"))
            .transition(TransitionDef::new("ship", "packed", "shipped"))
            .transition(TransitionDef::new("cancel", SourceSpec::Any, "cancelled"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_schema_is_clean() {
        assert!(validate(&valid_schema()).is_empty());
    }

    #[test]
    fn test_undeclared_initial() {
        let schema = Schema::builder("w", "W")
            .state(StateDef::new("a"))
            .initial("missing")
            .final_state("a")
            .build()
            .unwrap();
        let report = validate(&schema);
        assert!(report.iter().any(|m| m.contains("missing")));
    }

    #[test]
    fn test_undeclared_final() {
        let schema = Schema::builder("w", "W")
            .state(StateDef::new("a"))
            .state(StateDef::new("b"))
            .initial("a")
            .final_states(["b", "ghost"])
            .transition(TransitionDef::new("go", "a", "b"))
            .build()
            .unwrap();
        let report = validate(&schema);
        assert_eq!(report.len(), 1);
        assert!(report[0].contains("ghost"));
    }

    #[test]
    fn test_undeclared_target_names_both_sides() {
        let schema = Schema::builder("freight", "Freight")
            .state(StateDef::new("packed"))
            .initial("packed")
            .transition(TransitionDef::new("ship", "packed", "in_orbit"))
            .build()
            .unwrap();
        let report = validate(&schema);
        assert!(report
            .iter()
            .any(|m| m.contains("ship") && m.contains("in_orbit")));
    }

    #[test]
    fn test_undeclared_source() {
        let schema = Schema::builder("w", "W")
            .state(StateDef::new("a"))
            .state(StateDef::new("b"))
            .initial("a")
            .final_state("b")
            .transition(TransitionDef::new("go", ["a", "phantom"], "b"))
            .build()
            .unwrap();
        let report = validate(&schema);
        assert!(report
            .iter()
            .any(|m| m.contains("go") && m.contains("phantom")));
    }

    #[test]
    fn test_dead_end_state() {
        let schema = Schema::builder("w", "W")
            .state(StateDef::new("a"))
            .state(StateDef::new("stuck"))
            .state(StateDef::new("done"))
            .initial("a")
            .final_state("done")
            .transition(TransitionDef::new("finish", "a", "done"))
            .build()
            .unwrap();
        let report = validate(&schema);
        assert_eq!(report.len(), 1);
        assert!(report[0].contains("stuck"));
    }

    #[test]
    fn test_wildcard_satisfies_exit_requirement() {
        // Only the wildcard cancel leads out of "limbo"; that is enough.
        let schema = Schema::builder("w", "W")
            .state(StateDef::new("a"))
            .state(StateDef::new("limbo"))
            .state(StateDef::new("cancelled"))
            .initial("a")
            .final_state("cancelled")
            .transition(TransitionDef::new("hold", "a", "limbo"))
            .transition(TransitionDef::new("cancel", SourceSpec::Any, "cancelled"))
            .build()
            .unwrap();
        assert!(validate(&schema).is_empty());
    }

    #[test]
    fn test_all_violations_collected() {
        let schema = Schema::builder("w", "W")
            .state(StateDef::new("a"))
            .state(StateDef::new("stuck"))
            .initial("nowhere")
            .final_state("ghost")
            .transition(TransitionDef::new("go", "a", "void"))
            .build()
            .unwrap();
        let report = validate(&schema);
        // initial, final, target, plus dead-ends for both declared states.
        assert!(report.len() >= 4);
    }
}
