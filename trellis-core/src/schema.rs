//! Immutable workflow schemas.
//!
//! A schema is built once via [`SchemaBuilder`], then shared read-only by any
//! number of callers. Declaration order of states and transitions is
//! preserved: it drives the ordering of available-transition lists and of the
//! exported map.

use crate::error::WorkflowError;
use crate::state::{humanize, StateDef, StateId};
use crate::transition::TransitionDef;
use std::collections::{BTreeSet, HashMap};

/// Color reported for states that carry no display metadata.
const DEFAULT_COLOR: &str = "secondary";

/// A complete workflow definition: states, transitions, entry point, and
/// terminal states.
#[derive(Debug)]
pub struct Schema {
    identifier: String,
    name: String,
    states: Vec<StateDef>,
    state_index: HashMap<StateId, usize>,
    transitions: Vec<TransitionDef>,
    transition_index: HashMap<String, usize>,
    initial: StateId,
    finals: BTreeSet<StateId>,
    checksum: String,
}

impl Schema {
    pub fn builder(identifier: impl Into<String>, name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(identifier, name)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// States in declaration order.
    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    /// Transitions in declaration order.
    pub fn transitions(&self) -> &[TransitionDef] {
        &self.transitions
    }

    pub fn initial(&self) -> &StateId {
        &self.initial
    }

    pub fn finals(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    pub fn state(&self, id: &StateId) -> Option<&StateDef> {
        self.state_index.get(id).map(|&i| &self.states[i])
    }

    pub fn has_state(&self, id: &StateId) -> bool {
        self.state_index.contains_key(id)
    }

    pub fn transition(&self, name: &str) -> Option<&TransitionDef> {
        self.transition_index.get(name).map(|&i| &self.transitions[i])
    }

    pub fn is_final(&self, id: &StateId) -> bool {
        self.finals.contains(id)
    }

    /// Display label for a state; humanizes the id when metadata is absent
    /// or the state is not declared.
    pub fn label(&self, id: &StateId) -> String {
        match self.state(id) {
            Some(state) => state.label(),
            None => humanize(id.as_str()),
        }
    }

    /// Display color for a state, with a neutral default.
    pub fn color(&self, id: &StateId) -> String {
        self.state(id)
            .and_then(|state| state.color())
            .unwrap_or(DEFAULT_COLOR)
            .to_string()
    }

    /// crc32c over the canonical serialized map; identifies a definition
    /// across export/import round-trips.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// One-shot builder for [`Schema`].
///
/// `build` rejects only construction-level problems (duplicate ids, duplicate
/// transition names, missing initial declaration). Structural invariants such
/// as dangling targets are reported by [`crate::validator::validate`] so that
/// a schema under authoring can still be constructed and inspected.
pub struct SchemaBuilder {
    identifier: String,
    name: String,
    states: Vec<StateDef>,
    transitions: Vec<TransitionDef>,
    initial: Option<StateId>,
    finals: BTreeSet<StateId>,
}

impl SchemaBuilder {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            states: Vec::new(),
            transitions: Vec::new(),
            initial: None,
            finals: BTreeSet::new(),
        }
    }

    pub fn state(mut self, state: StateDef) -> Self {
        self.states.push(state);
        self
    }

    pub fn transition(mut self, transition: TransitionDef) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn initial(mut self, id: impl Into<StateId>) -> Self {
        self.initial = Some(id.into());
        self
    }

    pub fn final_state(mut self, id: impl Into<StateId>) -> Self {
        self.finals.insert(id.into());
        self
    }

    pub fn final_states<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StateId>,
    {
        self.finals.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Schema, WorkflowError> {
        let initial = self.initial.ok_or_else(|| WorkflowError::InvalidDefinition {
            reason: format!("workflow '{}' declares no initial state", self.identifier),
        })?;

        let mut state_index = HashMap::with_capacity(self.states.len());
        for (i, state) in self.states.iter().enumerate() {
            if state_index.insert(state.id().clone(), i).is_some() {
                return Err(WorkflowError::InvalidDefinition {
                    reason: format!("duplicate state id '{}'", state.id()),
                });
            }
        }

        let mut transition_index = HashMap::with_capacity(self.transitions.len());
        for (i, transition) in self.transitions.iter().enumerate() {
            if transition_index
                .insert(transition.name().to_string(), i)
                .is_some()
            {
                return Err(WorkflowError::InvalidDefinition {
                    reason: format!("duplicate transition name '{}'", transition.name()),
                });
            }
        }

        let mut schema = Schema {
            identifier: self.identifier,
            name: self.name,
            states: self.states,
            state_index,
            transitions: self.transitions,
            transition_index,
            initial,
            finals: self.finals,
            checksum: String::new(),
        };

        let canonical = serde_json::to_vec(&schema.to_map())?;
        schema.checksum = format!("{:08x}", crc32c::crc32c(&canonical));

        Ok(schema)
    }
}
