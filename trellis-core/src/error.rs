//! Engine error types.

use crate::state::StateId;
use thiserror::Error;

/// Opaque error raised by user-supplied guards, callbacks, or listeners.
pub type DomainError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from the workflow engine.
///
/// Structural invariant violations are deliberately absent here: they are
/// surfaced as a report by [`crate::validator::validate`], never raised at
/// runtime. Domain errors (`Guard`, `Callback`, `Listener`) are transparent
/// wrappers so the original failure reaches the caller untouched.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The schema could not be constructed (duplicate ids, missing initial).
    #[error("invalid workflow definition: {reason}")]
    InvalidDefinition { reason: String },

    /// A guard expression failed to parse.
    #[error("invalid guard expression: {reason}")]
    InvalidGuard { reason: String },

    /// `apply` was invoked for a transition that may not fire.
    #[error("invalid transition: cannot apply '{transition}' in state '{state}'")]
    InvalidTransition { transition: String, state: StateId },

    /// A user-supplied guard raised.
    #[error(transparent)]
    Guard(DomainError),

    /// A user-supplied transition callback raised.
    #[error(transparent)]
    Callback(DomainError),

    /// A registered event listener raised.
    #[error(transparent)]
    Listener(DomainError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
