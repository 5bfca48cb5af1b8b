//! Storage contracts for the adflow workflow engine.
//!
//! This crate defines the persistence surface the engine runs against:
//! - campaigns and their scheduled spots
//! - reservations, talent approvals, campaign approvals
//! - orders, contracts, invoices, recurring schedules
//! - the tenant user directory and tasks
//! - the fire-and-forget notification sink
//!
//! Design stance:
//! - Every operation is tenant-scoped; derived records are always
//!   attributable to the tenant that triggered them.
//! - A transactional backend is the source of truth in production; the
//!   in-memory adapter here is the deterministic reference used by the
//!   engine's tests.

#![deny(unsafe_code)]

mod error;
pub mod memory;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryWorkflowStore;
pub use traits::{
    ApprovalStore, CampaignStore, ContractStore, DirectoryStore, InvoiceStore, NotificationSink,
    OrderStore, ReservationStore, WorkflowStorage,
};
