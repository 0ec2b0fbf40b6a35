//! Named workflow lookup.
//!
//! An explicit registry injected at the call site. The engine holds no
//! global state; applications create one registry, register their workflows
//! during startup, and share it.

use crate::engine::Workflow;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Registry {
    workflows: DashMap<String, Arc<Workflow>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers under the schema's identifier, replacing any previous
    /// registration with the same identifier.
    pub fn register(&self, workflow: Workflow) -> Arc<Workflow> {
        let identifier = workflow.schema().identifier().to_string();
        let workflow = Arc::new(workflow);
        tracing::debug!(workflow = %identifier, "workflow registered");
        self.workflows.insert(identifier, workflow.clone());
        workflow
    }

    pub fn get(&self, identifier: &str) -> Option<Arc<Workflow>> {
        self.workflows.get(identifier).map(|w| w.clone())
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.iter().map(|w| w.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::state::StateDef;
    use crate::transition::TransitionDef;

    fn tiny(identifier: &str) -> Workflow {
        Workflow::new(
            Schema::builder(identifier, identifier)
                .state(StateDef::new("a"))
                .state(StateDef::new("b"))
                .initial("a")
                .final_state("b")
                .transition(TransitionDef::new("go", "a", "b"))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_register_and_get() {
        let registry = Registry::new();
        assert!(registry.is_empty());

        registry.register(tiny("loan_out"));
        registry.register(tiny("loan_in"));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("loan_out").is_some());
        assert!(registry.get("acquisition").is_none());
        assert_eq!(registry.identifiers(), vec!["loan_in", "loan_out"]);
    }
}
