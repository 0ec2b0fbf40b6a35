//! Seams for user-supplied code: guards, transition callbacks, listeners.
//!
//! All three are opaque to the engine. Their latency and failures propagate
//! unchanged; the engine performs no retries and no isolation between them.

use crate::context::Context;
use crate::error::DomainError;
use crate::events::Event;
use crate::state::StateId;
use std::sync::Arc;

/// A predicate gating whether a transition may fire.
pub trait Guard: Send + Sync {
    fn check(&self, state: &StateId, ctx: &Context) -> Result<bool, DomainError>;
}

/// A side-effecting callback invoked while a transition is applied, between
/// the `before_transition` and `after_transition` events.
pub trait Hook: Send + Sync {
    fn run(&self, from: &StateId, to: &StateId, ctx: &Context) -> Result<(), DomainError>;
}

/// A subscriber to dispatched lifecycle events.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event<'_>) -> Result<(), DomainError>;
}

impl<F> Listener for F
where
    F: Fn(&Event<'_>) -> Result<(), DomainError> + Send + Sync,
{
    fn on_event(&self, event: &Event<'_>) -> Result<(), DomainError> {
        self(event)
    }
}

struct FnGuard<F>(F);

impl<F> Guard for FnGuard<F>
where
    F: Fn(&StateId, &Context) -> bool + Send + Sync,
{
    fn check(&self, state: &StateId, ctx: &Context) -> Result<bool, DomainError> {
        Ok((self.0)(state, ctx))
    }
}

struct TryFnGuard<F>(F);

impl<F> Guard for TryFnGuard<F>
where
    F: Fn(&StateId, &Context) -> Result<bool, DomainError> + Send + Sync,
{
    fn check(&self, state: &StateId, ctx: &Context) -> Result<bool, DomainError> {
        (self.0)(state, ctx)
    }
}

struct FnHook<F>(F);

impl<F> Hook for FnHook<F>
where
    F: Fn(&StateId, &StateId, &Context) -> Result<(), DomainError> + Send + Sync,
{
    fn run(&self, from: &StateId, to: &StateId, ctx: &Context) -> Result<(), DomainError> {
        (self.0)(from, to, ctx)
    }
}

/// Wraps an infallible predicate closure as a [`Guard`].
pub fn guard_fn<F>(f: F) -> Arc<dyn Guard>
where
    F: Fn(&StateId, &Context) -> bool + Send + Sync + 'static,
{
    Arc::new(FnGuard(f))
}

/// Wraps a fallible predicate closure as a [`Guard`].
pub fn try_guard_fn<F>(f: F) -> Arc<dyn Guard>
where
    F: Fn(&StateId, &Context) -> Result<bool, DomainError> + Send + Sync + 'static,
{
    Arc::new(TryFnGuard(f))
}

/// Wraps a closure as a transition [`Hook`].
pub fn hook_fn<F>(f: F) -> Arc<dyn Hook>
where
    F: Fn(&StateId, &StateId, &Context) -> Result<(), DomainError> + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}
