//! The adflow workflow engine.
//!
//! A probability-milestone state machine drives campaigns through their
//! sales lifecycle. When a probability update crosses configured
//! thresholds, a declarative rule set fires and its actions create the
//! dependent business records: reservations, approval requests, orders,
//! contracts, invoices, notifications, tasks.
//!
//! Entry point is [`WorkflowEvaluator`], constructed with a storage
//! backend, a [`ConfigRegistry`](adflow_config::ConfigRegistry), and a
//! [`RuleSet`]. Evaluations are serialized per entity id; see
//! `evaluator` for why.

#![deny(unsafe_code)]

mod error;
mod evaluator;
mod executor;
mod matcher;
mod state_machine;
mod telemetry;

pub use error::{WorkflowError, WorkflowResult};
pub use evaluator::{EvaluationReport, RejectionReport, WorkflowEvaluator};
pub use executor::{ActionExecutors, ActionOutcome};
pub use matcher::RuleSet;
pub use state_machine::{
    check_booking_gate, check_rejection_gate, check_role_gate, check_talent_preconditions,
    compute_crossings,
};
pub use telemetry::{ActiveWorkflow, WorkflowMetrics, WorkflowTelemetry};
