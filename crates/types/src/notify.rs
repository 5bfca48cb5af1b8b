//! Notifications and tasks
//!
//! Notifications are written to a fire-and-forget sink; delivery is
//! someone else's problem and delivery failures never fail a workflow.

use crate::ids::{EntityId, NotificationId, TaskId, TenantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    #[default]
    Workflow,
    Approval,
    Reservation,
    Billing,
    TaskAssigned,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    /// The entity this notification is about, used when rejection
    /// clears pending approval notifications for a campaign
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        tenant_id: TenantId,
        user_id: UserId,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            tenant_id,
            user_id,
            title: title.into(),
            message: message.into(),
            kind,
            entity_id: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn about(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
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
}

/// A task assigned to a user by the assign-task executor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub tenant_id: TenantId,
    pub assignee_id: UserId,
    pub title: String,
    pub description: String,
    pub due_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        tenant_id: TenantId,
        assignee_id: UserId,
        title: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::generate(),
            tenant_id,
            assignee_id,
            title: title.into(),
            description: String::new(),
            due_at,
            entity_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn about(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }
}
