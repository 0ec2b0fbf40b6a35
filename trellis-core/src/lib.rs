//! # trellis-core
//!
//! A declarative workflow engine for multi-step operational procedures.
//!
//! This crate provides:
//! - Immutable workflow schemas: states, guarded role-gated transitions,
//!   an initial state, and a set of final states
//! - Structural validation producing a complete defect report
//! - Transition evaluation (`can_transition`, `available_transitions`) and
//!   execution (`apply`) with lifecycle events
//! - A declarative guard expression language for file-defined workflows
//! - Introspection: serializable schema maps and Mermaid diagrams
//!
//! The engine never stores a tracked entity's current state: `apply` takes
//! the current state as input and returns the new state; persisting it is
//! the caller's job, as is serializing concurrent transitions per entity.

pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod guard;
pub mod hooks;
pub mod introspect;
pub mod registry;
pub mod schema;
pub mod state;
pub mod transition;
pub mod validator;

pub use context::Context;
pub use engine::{ApplyResult, AvailableTransition, Workflow};
pub use error::{DomainError, WorkflowError};
pub use events::{enter_event, leave_event, Event, EventBus, AFTER_TRANSITION, BEFORE_TRANSITION};
pub use guard::{GuardExpr, GuardSpec};
pub use hooks::{guard_fn, hook_fn, try_guard_fn, Guard, Hook, Listener};
pub use introspect::{SchemaMap, SourceMap, StateMap, TransitionMap};
pub use registry::Registry;
pub use schema::{Schema, SchemaBuilder};
pub use state::{humanize, StateDef, StateId};
pub use transition::{Confirmation, RoleSpec, SourceSpec, TransitionDef};
pub use validator::validate;
