//! Read-only views for UI and tooling.
//!
//! [`SchemaMap`] is the serializable form of a schema: everything structural
//! survives, opaque code does not. Guards written as expressions are exported
//! as their source text and recompiled on import; guards and callbacks
//! supplied as closures are stripped. The same representation doubles as the
//! on-disk definition DSL:
//!
//! ```yaml
//! identifier: loan_out
//! name: Loan Out
//! initial: request_received
//! finals: [closed, cancelled]
//! states:
//!   - id: request_received
//!     label: Request Received
//! transitions:
//!   - name: approve
//!     from: [under_review]
//!     to: approved
//!     roles: [curator]
//!   - name: cancel
//!     from: "*"
//!     to: cancelled
//! ```

use crate::error::WorkflowError;
use crate::schema::{Schema, SchemaBuilder};
use crate::state::StateDef;
use crate::transition::{RoleSpec, SourceSpec, TransitionDef};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Serializable form of a whole schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaMap {
    pub identifier: String,
    pub name: String,
    pub initial: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub finals: Vec<String>,
    pub states: Vec<StateMap>,
    pub transitions: Vec<TransitionMap>,
}

/// Serializable form of a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMap {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, Value>,
}

/// Serializable form of a transition. `from` accepts a single state, a list
/// of states, or the wildcard `"*"`; an empty `roles` list means unrestricted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMap {
    pub name: String,
    pub from: SourceMap,
    pub to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
}

/// Serializable source specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMap {
    Any,
    States(Vec<String>),
}

impl Serialize for SourceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SourceMap::Any => serializer.serialize_str("*"),
            SourceMap::States(states) => states.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SourceMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SourceMapVisitor;

        impl<'de> Visitor<'de> for SourceMapVisitor {
            type Value = SourceMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("\"*\", a state id, or a list of state ids")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == "*" {
                    Ok(SourceMap::Any)
                } else {
                    Ok(SourceMap::States(vec![v.to_string()]))
                }
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut states = Vec::new();
                while let Some(state) = seq.next_element::<String>()? {
                    states.push(state);
                }
                Ok(SourceMap::States(states))
            }
        }

        deserializer.deserialize_any(SourceMapVisitor)
    }
}

impl SchemaMap {
    pub fn from_schema(schema: &Schema) -> Self {
        let states = schema
            .states()
            .iter()
            .map(|state| StateMap {
                id: state.id().as_str().to_string(),
                label: state.raw_label().map(str::to_string),
                description: state.description().map(str::to_string),
                color: state.color().map(str::to_string),
                icon: state.icon().map(str::to_string),
                phase: state.phase().map(str::to_string),
                attrs: state.attrs().clone(),
            })
            .collect();

        let transitions = schema
            .transitions()
            .iter()
            .map(|t| TransitionMap {
                name: t.name().to_string(),
                from: match t.source() {
                    SourceSpec::Any => SourceMap::Any,
                    SourceSpec::From(states) => SourceMap::States(
                        states.iter().map(|s| s.as_str().to_string()).collect(),
                    ),
                },
                to: t.target().as_str().to_string(),
                roles: match t.roles() {
                    RoleSpec::Any => Vec::new(),
                    RoleSpec::AnyOf(roles) => roles.clone(),
                },
                label: t.raw_label().map(str::to_string),
                color: t.color().map(str::to_string),
                icon: t.icon().map(str::to_string),
                confirm_message: t.confirmation().map(|c| c.message.clone()),
                guard: t.guard().and_then(|g| g.expr_text()).map(str::to_string),
            })
            .collect();

        Self {
            identifier: schema.identifier().to_string(),
            name: schema.name().to_string(),
            initial: schema.initial().as_str().to_string(),
            finals: schema.finals().iter().map(|s| s.as_str().to_string()).collect(),
            states,
            transitions,
        }
    }

    /// Rebuilds a schema. Guard expressions are recompiled; parse failures
    /// surface as `InvalidGuard`.
    pub fn into_schema(self) -> Result<Schema, WorkflowError> {
        let mut builder = SchemaBuilder::new(self.identifier, self.name)
            .initial(self.initial)
            .final_states(self.finals);

        for state in self.states {
            let mut def = StateDef::new(state.id);
            if let Some(label) = state.label {
                def = def.with_label(label);
            }
            if let Some(description) = state.description {
                def = def.with_description(description);
            }
            if let Some(color) = state.color {
                def = def.with_color(color);
            }
            if let Some(icon) = state.icon {
                def = def.with_icon(icon);
            }
            if let Some(phase) = state.phase {
                def = def.with_phase(phase);
            }
            for (key, value) in state.attrs {
                def = def.with_attr(key, value);
            }
            builder = builder.state(def);
        }

        for t in self.transitions {
            let source = match t.from {
                SourceMap::Any => SourceSpec::Any,
                SourceMap::States(states) => SourceSpec::states(states),
            };
            let mut def = TransitionDef::new(t.name, source, t.to);
            if !t.roles.is_empty() {
                def = def.with_roles(t.roles);
            }
            if let Some(label) = t.label {
                def = def.with_label(label);
            }
            if let Some(color) = t.color {
                def = def.with_color(color);
            }
            if let Some(icon) = t.icon {
                def = def.with_icon(icon);
            }
            if let Some(message) = t.confirm_message {
                def = def.confirm(message);
            }
            if let Some(guard) = t.guard {
                def = def.with_guard_expr(&guard)?;
            }
            builder = builder.transition(def);
        }

        builder.build()
    }
}

impl Schema {
    /// Serializable structure for transport to UI/admin tooling or storage.
    pub fn to_map(&self) -> SchemaMap {
        SchemaMap::from_schema(self)
    }

    /// Rebuilds a schema from its serializable form.
    pub fn from_map(map: SchemaMap) -> Result<Schema, WorkflowError> {
        map.into_schema()
    }

    /// Mermaid state diagram: initial-state marker, one edge per concrete
    /// (non-wildcard) transition, final-state markers.
    pub fn to_diagram(&self) -> String {
        let mut out = String::from("stateDiagram-v2\n");
        out.push_str(&format!("    [*] --> {}\n", self.initial()));

        for transition in self.transitions() {
            if let SourceSpec::From(sources) = transition.source() {
                for source in sources {
                    out.push_str(&format!(
                        "    {} --> {} : {}\n",
                        source,
                        transition.target(),
                        transition.name()
                    ));
                }
            }
        }

        for state in self.finals() {
            out.push_str(&format!("    {} --> [*]\n", state));
        }

        out
    }
}
