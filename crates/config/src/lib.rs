//! Milestone thresholds and per-tenant configuration
//!
//! The [`MilestoneSchedule`] is the Threshold Registry: a validated
//! mapping from named milestones to probability values, constructed
//! once from tenant configuration and reused. Validation happens at
//! load time — a non-monotonic schedule is a configuration error, never
//! something discovered mid-transition.
//!
//! The [`ConfigRegistry`] holds compiled-in defaults plus per-tenant
//! overrides. Callers read it at the start of each evaluation rather
//! than caching, since a tenant may change configuration between
//! campaigns.

#![deny(unsafe_code)]

pub mod milestone;
pub mod tenant;

pub use milestone::{ConfigError, Milestone, MilestoneSchedule, RawSchedule};
pub use tenant::{ConfigRegistry, TenantConfig};
