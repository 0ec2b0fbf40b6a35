//! Per-workflow event dispatch.
//!
//! Each workflow instance owns one registry of named events to ordered
//! listener lists. The registry is append-only and is expected to be
//! populated during a configuration phase, before concurrent use begins.
//! Dispatch is synchronous and in registration order; a failing listener
//! aborts the remaining listeners of that invocation and the error
//! propagates to the caller.

use crate::context::Context;
use crate::error::WorkflowError;
use crate::hooks::Listener;
use crate::state::StateId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatched before the transition callback runs.
pub const BEFORE_TRANSITION: &str = "before_transition";
/// Dispatched after the transition callback completed.
pub const AFTER_TRANSITION: &str = "after_transition";

/// Name of the event dispatched when leaving a state.
pub fn leave_event(state: &str) -> String {
    format!("leave_{state}")
}

/// Name of the event dispatched when entering a state.
pub fn enter_event(state: &str) -> String {
    format!("enter_{state}")
}

/// Payload handed to listeners. Borrowed from the in-flight `apply` call.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub name: &'a str,
    pub workflow: &'a str,
    pub transition: &'a str,
    pub from: &'a StateId,
    pub to: &'a StateId,
    pub context: &'a Context,
}

/// Registry of named-event listener lists.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Arc<dyn Listener>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener for the named event.
    pub fn on(&self, event: impl Into<String>, listener: Arc<dyn Listener>) {
        self.listeners
            .write()
            .entry(event.into())
            .or_default()
            .push(listener);
    }

    /// Invokes listeners for `event.name` in registration order.
    pub fn dispatch(&self, event: &Event<'_>) -> Result<(), WorkflowError> {
        let registered = {
            let listeners = self.listeners.read();
            match listeners.get(event.name) {
                Some(list) => list.clone(),
                None => return Ok(()),
            }
        };

        for listener in registered {
            listener.on_event(event).map_err(WorkflowError::Listener)?;
        }

        Ok(())
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use parking_lot::Mutex;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Listener for Recorder {
        fn on_event(&self, event: &Event<'_>) -> Result<(), DomainError> {
            self.log.lock().push(format!("{}:{}", self.tag, event.name));
            Ok(())
        }
    }

    struct Failing;

    impl Listener for Failing {
        fn on_event(&self, _event: &Event<'_>) -> Result<(), DomainError> {
            Err("listener broke".into())
        }
    }

    fn sample_event<'a>(
        name: &'a str,
        from: &'a StateId,
        to: &'a StateId,
        ctx: &'a Context,
    ) -> Event<'a> {
        Event {
            name,
            workflow: "loan_out",
            transition: "approve",
            from,
            to,
            context: ctx,
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = EventBus::new();
        bus.on(
            BEFORE_TRANSITION,
            Arc::new(Recorder {
                tag: "first",
                log: log.clone(),
            }),
        );
        bus.on(
            BEFORE_TRANSITION,
            Arc::new(Recorder {
                tag: "second",
                log: log.clone(),
            }),
        );

        assert_eq!(bus.listener_count(BEFORE_TRANSITION), 2);
        assert_eq!(bus.listener_count(AFTER_TRANSITION), 0);

        let from = StateId::from("under_review");
        let to = StateId::from("approved");
        let ctx = Context::new();
        bus.dispatch(&sample_event(BEFORE_TRANSITION, &from, &to, &ctx))
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec![
                "first:before_transition".to_string(),
                "second:before_transition".to_string()
            ]
        );
    }

    #[test]
    fn test_unknown_event_is_noop() {
        let bus = EventBus::new();
        let from = StateId::from("a");
        let to = StateId::from("b");
        let ctx = Context::new();
        bus.dispatch(&sample_event("enter_b", &from, &to, &ctx))
            .unwrap();
    }

    #[test]
    fn test_failing_listener_aborts_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = EventBus::new();
        bus.on(AFTER_TRANSITION, Arc::new(Failing));
        bus.on(
            AFTER_TRANSITION,
            Arc::new(Recorder {
                tag: "late",
                log: log.clone(),
            }),
        );

        let from = StateId::from("a");
        let to = StateId::from("b");
        let ctx = Context::new();
        let result = bus.dispatch(&sample_event(AFTER_TRANSITION, &from, &to, &ctx));

        assert!(matches!(result, Err(WorkflowError::Listener(_))));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_event_names() {
        assert_eq!(leave_event("on_display"), "leave_on_display");
        assert_eq!(enter_event("returned"), "enter_returned");
    }
}
