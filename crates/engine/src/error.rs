use adflow_billing::BillingError;
use adflow_storage::StorageError;
use thiserror::Error;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Engine-level errors surfaced to the caller of a transition.
///
/// Per-action failures in isolate mode never appear here; they are
/// logged and reported through the evaluation report only.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("billing error: {0}")]
    Billing(#[from] BillingError),

    /// The actor's role is not allowed to drive this transition.
    #[error("transition denied: {0}")]
    TransitionDenied(String),

    /// An entity precondition blocks the transition; nothing was
    /// committed.
    #[error("precondition violation: {0}")]
    PreconditionViolation(String),

    /// A fatal-mode action failed, failing the whole transition.
    #[error("fatal action {action} failed: {reason}")]
    FatalAction { action: &'static str, reason: String },

    #[error("invalid context: {0}")]
    InvalidContext(String),
}
