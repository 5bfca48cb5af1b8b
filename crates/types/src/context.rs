//! Workflow context: the ephemeral state of one transition
//!
//! A [`WorkflowContext`] is created once per transition and passed by
//! reference through the rule matcher and action executors. It is never
//! persisted.

use crate::ids::{EntityId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of entity a transition is about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Campaign,
    Order,
    Contract,
    Approval,
    Episode,
}

/// Actor roles, from most to least privileged
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Master,
    Admin,
    Sales,
    Talent,
    Member,
}

impl Role {
    /// Whether this role may override approval gates (proceed past
    /// pending talent approvals, approve/reject campaigns)
    pub fn can_override_approvals(&self) -> bool {
        matches!(self, Role::Master | Role::Admin)
    }
}

/// A user in the tenant's directory
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub name: String,
    pub role: Role,
}

/// Ephemeral context for a single workflow transition.
///
/// `previous_state` / `new_state` are status labels; campaign
/// transitions additionally carry the old and new probability, which is
/// what crossing detection runs on. `metadata` is a free-form bag rule
/// conditions evaluate against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub previous_state: String,
    pub new_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_probability: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_probability: Option<u8>,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub tenant_id: TenantId,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkflowContext {
    pub fn new(
        entity_id: EntityId,
        entity_type: EntityType,
        tenant_id: TenantId,
        actor_id: UserId,
        actor_role: Role,
    ) -> Self {
        Self {
            entity_id,
            entity_type,
            previous_state: String::new(),
            new_state: String::new(),
            previous_probability: None,
            new_probability: None,
            actor_id,
            actor_role,
            tenant_id,
            metadata: HashMap::new(),
        }
    }

    pub fn with_states(mut self, previous: impl Into<String>, new: impl Into<String>) -> Self {
        self.previous_state = previous.into();
        self.new_state = new.into();
        self
    }

    pub fn with_probabilities(mut self, previous: u8, new: u8) -> Self {
        self.previous_probability = Some(previous);
        self.new_probability = Some(new);
        self
    }

    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// A copy of this context re-targeted at a different state pair,
    /// used when one probability update fans out into several
    /// per-milestone rule lookups
    pub fn for_states(&self, previous: impl Into<String>, new: impl Into<String>) -> Self {
        let mut ctx = self.clone();
        ctx.previous_state = previous.into();
        ctx.new_state = new.into();
        ctx
    }
}
