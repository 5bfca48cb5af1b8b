//! Domain types for the adflow campaign workflow engine
//!
//! Everything here is data: campaigns and their scheduled spots, the
//! ephemeral [`WorkflowContext`] that rides through a single transition,
//! declarative [`AutomationRule`]s with their closed [`WorkflowAction`]
//! set, and the derived business records the engine creates at milestones
//! (reservations, approvals, contracts, orders, invoices).
//!
//! The engine itself lives in `adflow-engine`; storage contracts in
//! `adflow-storage`. This crate has no behavior beyond constructors,
//! projections, and condition evaluation.

#![deny(unsafe_code)]

pub mod approval;
pub mod campaign;
pub mod context;
pub mod ids;
pub mod invoice;
pub mod notify;
pub mod reservation;
pub mod rule;
pub mod sales;

pub use approval::{
    ApprovalStatus, CampaignApproval, TalentApprovalRequest, TalentApprovalSummary,
    TALENT_APPROVAL_WINDOW_DAYS,
};
pub use campaign::{Campaign, Cents, Placement, ScheduledSpot, SpotType};
pub use context::{EntityType, Role, User, WorkflowContext};
pub use ids::*;
pub use invoice::{
    billing_period_of, BillingPeriod, Invoice, InvoiceItem, InvoiceStatus,
    RecurringInvoiceSchedule,
};
pub use notify::{Notification, NotificationKind, Task};
pub use reservation::{Reservation, ReservationItem, ReservationStatus, RESERVATION_HOLD_DAYS};
pub use rule::{
    AutomationRule, ConditionOp, FailureMode, InvoiceSource, NotificationAudience, RuleCondition,
    RuleTrigger, WorkflowAction,
};
pub use sales::{Contract, ContractLineItem, ContractStatus, Order, OrderItem, OrderStatus};
