//! Transition evaluation and execution.

use crate::context::Context;
use crate::error::WorkflowError;
use crate::events::{enter_event, leave_event, Event, EventBus, AFTER_TRANSITION, BEFORE_TRANSITION};
use crate::hooks::Listener;
use crate::schema::Schema;
use crate::state::StateId;
use crate::transition::Confirmation;
use serde::Serialize;
use std::sync::Arc;

/// A transition annotated with display metadata, for UI action-button
/// rendering without exposing schema internals.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableTransition {
    pub name: String,
    pub label: String,
    pub target: StateId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
}

/// Result of a successful `apply`. The caller is responsible for persisting
/// `to` as the entity's new current state; the engine stores nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub transition: String,
    pub from: StateId,
    pub to: StateId,
}

/// A runnable workflow: an immutable schema plus this instance's listener
/// registry. Shareable via `Arc`; all methods take `&self`.
pub struct Workflow {
    schema: Arc<Schema>,
    events: EventBus,
}

impl Workflow {
    pub fn new(schema: Schema) -> Self {
        Self::from_schema(Arc::new(schema))
    }

    pub fn from_schema(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            events: EventBus::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Registers a listener for `before_transition`, `after_transition`,
    /// `leave_<state>`, or `enter_<state>`. Intended for the configuration
    /// phase, before concurrent use begins.
    pub fn on(&self, event: impl Into<String>, listener: impl Listener + 'static) {
        self.events.on(event, Arc::new(listener));
    }

    /// Decides whether `transition` may fire from `state`, without side
    /// effects. Ordered short-circuiting gates: the transition must exist,
    /// the state must be declared and satisfy the transition's source, the
    /// role gate must pass, and the guard (if any) must return true.
    ///
    /// A guard failure (`Err`) propagates; a guard returning `false` yields
    /// `Ok(false)`.
    pub fn can_transition(
        &self,
        state: &StateId,
        transition: &str,
        ctx: &Context,
    ) -> Result<bool, WorkflowError> {
        let Some(def) = self.schema.transition(transition) else {
            return Ok(false);
        };

        if !self.schema.has_state(state) {
            return Ok(false);
        }

        if !def.source().matches(state, self.schema.is_final(state)) {
            return Ok(false);
        }

        if !def.roles().allows(ctx.acting_roles()) {
            return Ok(false);
        }

        match def.guard() {
            Some(guard) => guard.check(state, ctx).map_err(WorkflowError::Guard),
            None => Ok(true),
        }
    }

    /// Every transition that may fire from `state`, in declaration order,
    /// annotated for display.
    pub fn available_transitions(
        &self,
        state: &StateId,
        ctx: &Context,
    ) -> Result<Vec<AvailableTransition>, WorkflowError> {
        let mut available = Vec::new();
        for def in self.schema.transitions() {
            if self.can_transition(state, def.name(), ctx)? {
                available.push(AvailableTransition {
                    name: def.name().to_string(),
                    label: def.label(),
                    target: def.target().clone(),
                    color: def.color().map(str::to_string),
                    icon: def.icon().map(str::to_string),
                    confirmation: def.confirmation().cloned(),
                });
            }
        }
        Ok(available)
    }

    /// Performs the transition and returns the new state.
    ///
    /// When the transition may not fire, fails with `InvalidTransition`
    /// before any callback or event. Otherwise dispatches, in order:
    /// `before_transition`, the domain callback, `after_transition`,
    /// `leave_<from>`, `enter_<target>`. Domain failures from the callback or
    /// a listener propagate unchanged and abort the remaining steps.
    pub fn apply(
        &self,
        state: &StateId,
        transition: &str,
        ctx: &Context,
    ) -> Result<ApplyResult, WorkflowError> {
        let invalid = || WorkflowError::InvalidTransition {
            transition: transition.to_string(),
            state: state.clone(),
        };

        let def = self.schema.transition(transition).ok_or_else(invalid)?;
        if !self.can_transition(state, transition, ctx)? {
            return Err(invalid());
        }

        let target = def.target();
        let template = Event {
            name: BEFORE_TRANSITION,
            workflow: self.schema.identifier(),
            transition,
            from: state,
            to: target,
            context: ctx,
        };

        self.events.dispatch(&template)?;

        if let Some(callback) = def.callback() {
            callback
                .run(state, target, ctx)
                .map_err(WorkflowError::Callback)?;
        }

        self.events.dispatch(&Event {
            name: AFTER_TRANSITION,
            ..template
        })?;

        let leave = leave_event(state.as_str());
        self.events.dispatch(&Event {
            name: &leave,
            ..template
        })?;

        let enter = enter_event(target.as_str());
        self.events.dispatch(&Event {
            name: &enter,
            ..template
        })?;

        tracing::debug!(
            workflow = self.schema.identifier(),
            transition,
            from = %state,
            to = %target,
            "transition applied"
        );

        Ok(ApplyResult {
            transition: transition.to_string(),
            from: state.clone(),
            to: target.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::hooks::{guard_fn, hook_fn, try_guard_fn};
    use crate::state::StateDef;
    use crate::transition::{SourceSpec, TransitionDef};
    use parking_lot::Mutex;

    struct Spy {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Listener for Spy {
        fn on_event(&self, event: &Event<'_>) -> Result<(), DomainError> {
            self.log.lock().push(event.name.to_string());
            Ok(())
        }
    }

    fn review_schema() -> Schema {
        Schema::builder("loan_review", "Loan Review")
            .state(StateDef::new("request_received"))
            .state(StateDef::new("under_review"))
            .state(StateDef::new("approved"))
            .state(StateDef::new("cancelled"))
            .initial("request_received")
            .final_states(["approved", "cancelled"])
            .transition(
                TransitionDef::new("start_review", "request_received", "under_review")
                    .with_roles(["curator", "registrar"]),
            )
            .transition(
                TransitionDef::new("approve", "under_review", "approved")
                    .with_roles(["curator"])
                    .confirm("Approve this loan request?"),
            )
            .transition(
                TransitionDef::new("cancel", SourceSpec::Any, "cancelled")
                    .with_roles(["administrator"]),
            )
            .build()
            .unwrap()
    }

    fn spy_on_all(workflow: &Workflow, log: &Arc<Mutex<Vec<String>>>) {
        for event in [
            BEFORE_TRANSITION.to_string(),
            AFTER_TRANSITION.to_string(),
            leave_event("under_review"),
            enter_event("approved"),
        ] {
            workflow.on(event, Spy { log: log.clone() });
        }
    }

    #[test]
    fn test_role_gated_transition() {
        // Scenario A: "approve" requires "curator" and source "under_review".
        let workflow = Workflow::new(review_schema());
        let curator = Context::with_roles(["curator"]);

        assert!(workflow
            .can_transition(&StateId::from("under_review"), "approve", &curator)
            .unwrap());
        assert!(!workflow
            .can_transition(&StateId::from("request_received"), "approve", &curator)
            .unwrap());
    }

    #[test]
    fn test_wildcard_cancel_from_any_non_final_state() {
        // Scenario B.
        let workflow = Workflow::new(review_schema());
        let admin = Context::with_roles(["administrator"]);

        for state in ["request_received", "under_review"] {
            assert!(
                workflow
                    .can_transition(&StateId::from(state), "cancel", &admin)
                    .unwrap(),
                "cancel should fire from {state}"
            );
        }
        // Final states are excluded from the wildcard.
        assert!(!workflow
            .can_transition(&StateId::from("approved"), "cancel", &admin)
            .unwrap());
    }

    #[test]
    fn test_unknown_transition_and_state() {
        let workflow = Workflow::new(review_schema());
        let ctx = Context::new();
        assert!(!workflow
            .can_transition(&StateId::from("under_review"), "teleport", &ctx)
            .unwrap());
        assert!(!workflow
            .can_transition(&StateId::from("not_a_state"), "approve", &ctx)
            .unwrap());
    }

    #[test]
    fn test_missing_role_set_is_permissive() {
        let workflow = Workflow::new(review_schema());
        // No role information at all: the role gate is skipped.
        assert!(workflow
            .can_transition(&StateId::from("under_review"), "approve", &Context::new())
            .unwrap());
        // An empty role set is not the same thing.
        let no_roles: [&str; 0] = [];
        assert!(!workflow
            .can_transition(
                &StateId::from("under_review"),
                "approve",
                &Context::with_roles(no_roles)
            )
            .unwrap());
    }

    #[test]
    fn test_guard_gates_transition() {
        let schema = Schema::builder("guarded", "Guarded")
            .state(StateDef::new("packed"))
            .state(StateDef::new("dispatched"))
            .initial("packed")
            .final_state("dispatched")
            .transition(
                TransitionDef::new("dispatch", "packed", "dispatched")
                    .with_guard(guard_fn(|_, ctx| ctx.data()["courier_booked"] == true)),
            )
            .build()
            .unwrap();
        let workflow = Workflow::new(schema);
        let state = StateId::from("packed");

        let ready = Context::new().with_data(serde_json::json!({"courier_booked": true}));
        assert!(workflow.can_transition(&state, "dispatch", &ready).unwrap());

        let not_ready = Context::new().with_data(serde_json::json!({"courier_booked": false}));
        assert!(!workflow
            .can_transition(&state, "dispatch", &not_ready)
            .unwrap());
    }

    #[test]
    fn test_guard_error_propagates() {
        let schema = Schema::builder("guarded", "Guarded")
            .state(StateDef::new("a"))
            .state(StateDef::new("b"))
            .initial("a")
            .final_state("b")
            .transition(
                TransitionDef::new("go", "a", "b")
                    .with_guard(try_guard_fn(|_, _| Err("valuation service down".into()))),
            )
            .build()
            .unwrap();
        let workflow = Workflow::new(schema);

        let result = workflow.can_transition(&StateId::from("a"), "go", &Context::new());
        match result {
            Err(WorkflowError::Guard(e)) => {
                assert_eq!(e.to_string(), "valuation service down");
            }
            other => panic!("expected guard error, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_returns_target_and_dispatches_in_order() {
        let workflow = Workflow::new(review_schema());
        let log = Arc::new(Mutex::new(Vec::new()));
        spy_on_all(&workflow, &log);

        let result = workflow
            .apply(
                &StateId::from("under_review"),
                "approve",
                &Context::with_roles(["curator"]),
            )
            .unwrap();

        assert_eq!(result.to, StateId::from("approved"));
        assert_eq!(result.from, StateId::from("under_review"));
        assert_eq!(
            *log.lock(),
            vec![
                "before_transition".to_string(),
                "after_transition".to_string(),
                "leave_under_review".to_string(),
                "enter_approved".to_string(),
            ]
        );
    }

    #[test]
    fn test_callback_runs_between_before_and_after() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let callback_log = log.clone();
        let schema = Schema::builder("cb", "Callback")
            .state(StateDef::new("a"))
            .state(StateDef::new("b"))
            .initial("a")
            .final_state("b")
            .transition(TransitionDef::new("go", "a", "b").with_callback(hook_fn(
                move |from, to, _| {
                    callback_log.lock().push(format!("callback:{from}->{to}"));
                    Ok(())
                },
            )))
            .build()
            .unwrap();
        let workflow = Workflow::new(schema);
        workflow.on(BEFORE_TRANSITION, Spy { log: log.clone() });
        workflow.on(AFTER_TRANSITION, Spy { log: log.clone() });

        workflow
            .apply(&StateId::from("a"), "go", &Context::new())
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "before_transition".to_string(),
                "callback:a->b".to_string(),
                "after_transition".to_string(),
            ]
        );
    }

    #[test]
    fn test_rejected_apply_is_silent() {
        // Scenario C: missing role; no callback, no events.
        let workflow = Workflow::new(review_schema());
        let log = Arc::new(Mutex::new(Vec::new()));
        spy_on_all(&workflow, &log);

        let result = workflow.apply(
            &StateId::from("under_review"),
            "approve",
            &Context::with_roles(["guest"]),
        );

        match result {
            Err(WorkflowError::InvalidTransition { transition, state }) => {
                assert_eq!(transition, "approve");
                assert_eq!(state, StateId::from("under_review"));
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_callback_error_propagates_and_skips_remaining_events() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let schema = Schema::builder("cb", "Callback")
            .state(StateDef::new("a"))
            .state(StateDef::new("b"))
            .initial("a")
            .final_state("b")
            .transition(
                TransitionDef::new("go", "a", "b")
                    .with_callback(hook_fn(|_, _, _| Err("ledger write failed".into()))),
            )
            .build()
            .unwrap();
        let workflow = Workflow::new(schema);
        workflow.on(BEFORE_TRANSITION, Spy { log: log.clone() });
        workflow.on(AFTER_TRANSITION, Spy { log: log.clone() });

        let result = workflow.apply(&StateId::from("a"), "go", &Context::new());

        match result {
            Err(WorkflowError::Callback(e)) => {
                assert_eq!(e.to_string(), "ledger write failed");
            }
            other => panic!("expected callback error, got {other:?}"),
        }
        assert_eq!(*log.lock(), vec!["before_transition".to_string()]);
    }

    #[test]
    fn test_available_transitions_in_declaration_order() {
        let workflow = Workflow::new(review_schema());
        let ctx = Context::with_roles(["curator", "administrator"]);

        let available = workflow
            .available_transitions(&StateId::from("under_review"), &ctx)
            .unwrap();
        let names: Vec<&str> = available.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["approve", "cancel"]);

        let approve = &available[0];
        assert_eq!(approve.label, "Approve");
        assert_eq!(approve.target, StateId::from("approved"));
        assert_eq!(
            approve.confirmation.as_ref().map(|c| c.message.as_str()),
            Some("Approve this loan request?")
        );
    }

    #[test]
    fn test_available_transitions_empty_for_final_state() {
        let workflow = Workflow::new(review_schema());
        let ctx = Context::with_roles(["curator", "administrator"]);
        let available = workflow
            .available_transitions(&StateId::from("cancelled"), &ctx)
            .unwrap();
        assert!(available.is_empty());
    }
}
