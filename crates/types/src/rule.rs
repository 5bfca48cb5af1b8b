//! Automation rules: configuration, not code
//!
//! A rule binds a transition trigger (entity type, optional from-state,
//! required to-state, conditions over context metadata) to an ordered
//! list of actions. The action set is a closed enum so dispatch is
//! exhaustively checked at compile time — there is no string-keyed
//! action registry to fall out of sync.

use crate::context::{Role, WorkflowContext};
use crate::ids::{RuleId, TalentId, UserId};
use crate::notify::NotificationKind;
use crate::EntityType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ── Conditions ───────────────────────────────────────────────────────

/// Predicate operators for rule conditions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
}

/// A simple predicate over the context metadata bag
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: String,
    pub op: ConditionOp,
    pub value: Value,
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, op: ConditionOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluate against a metadata bag. A missing field never matches.
    pub fn evaluate(&self, metadata: &HashMap<String, Value>) -> bool {
        let Some(actual) = metadata.get(&self.field) else {
            return false;
        };
        match self.op {
            ConditionOp::Equals => actual == &self.value,
            ConditionOp::GreaterThan => match (actual.as_f64(), self.value.as_f64()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            ConditionOp::LessThan => match (actual.as_f64(), self.value.as_f64()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            ConditionOp::Contains => match (actual, &self.value) {
                (Value::String(haystack), Value::String(needle)) => haystack.contains(needle),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            },
        }
    }
}

// ── Trigger ──────────────────────────────────────────────────────────

/// When a rule fires
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleTrigger {
    pub entity_type: EntityType,
    /// When set, the transition must come *from* this state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_state: Option<String>,
    /// The transition must land in this state
    pub to_state: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<RuleCondition>,
}

impl RuleTrigger {
    pub fn new(entity_type: EntityType, to_state: impl Into<String>) -> Self {
        Self {
            entity_type,
            from_state: None,
            to_state: to_state.into(),
            conditions: Vec::new(),
        }
    }

    pub fn from_state(mut self, state: impl Into<String>) -> Self {
        self.from_state = Some(state.into());
        self
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches(&self, ctx: &WorkflowContext) -> bool {
        if self.entity_type != ctx.entity_type {
            return false;
        }
        if let Some(from) = &self.from_state {
            if from != &ctx.previous_state {
                return false;
            }
        }
        if self.to_state != ctx.new_state {
            return false;
        }
        self.conditions.iter().all(|c| c.evaluate(&ctx.metadata))
    }
}

// ── Actions ──────────────────────────────────────────────────────────

/// What to do when an action executor fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Log and continue with the remaining actions (the default)
    #[default]
    Isolate,
    /// Propagate and fail the whole transition. Used for reservation
    /// creation at the approval milestone: the campaign must not end up
    /// approved but unreserved.
    Fatal,
}

/// Which source records an invoice is derived from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceSource {
    #[default]
    Order,
    EpisodeDelivery,
}

/// Symbolic recipient lists, resolved to concrete users at execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAudience {
    /// The creator of the entity the transition is about
    EntityOwner,
    /// All users with the admin (or master) role
    Admins,
    /// All users with the sales role
    SalesTeam,
    /// A specific talent
    Talent { talent_id: TalentId },
    /// A specific user
    User { user_id: UserId },
}

/// The closed set of workflow action kinds.
///
/// Each variant carries its own config; the executor matches
/// exhaustively, so adding a kind is a compile error until every arm
/// handles it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum WorkflowAction {
    CreateReservation {
        #[serde(default)]
        on_failure: FailureMode,
    },
    CreateTalentApproval,
    CreateAdminApproval,
    CreateContract,
    CreateOrder,
    CreateInvoice {
        #[serde(default)]
        source: InvoiceSource,
    },
    SendNotification {
        audience: NotificationAudience,
        title: String,
        message: String,
        #[serde(default)]
        kind: NotificationKind,
    },
    AssignTask {
        role: Role,
        title: String,
        due_in_days: i64,
    },
    UpdateStatus {
        status: String,
    },
}

impl WorkflowAction {
    /// Stable name for logging and metrics
    pub fn kind_name(&self) -> &'static str {
        match self {
            WorkflowAction::CreateReservation { .. } => "create_reservation",
            WorkflowAction::CreateTalentApproval => "create_talent_approval",
            WorkflowAction::CreateAdminApproval => "create_admin_approval",
            WorkflowAction::CreateContract => "create_contract",
            WorkflowAction::CreateOrder => "create_order",
            WorkflowAction::CreateInvoice { .. } => "create_invoice",
            WorkflowAction::SendNotification { .. } => "send_notification",
            WorkflowAction::AssignTask { .. } => "assign_task",
            WorkflowAction::UpdateStatus { .. } => "update_status",
        }
    }

    /// Whether a failure of this action fails the whole transition
    pub fn failure_mode(&self) -> FailureMode {
        match self {
            WorkflowAction::CreateReservation { on_failure } => *on_failure,
            _ => FailureMode::Isolate,
        }
    }
}

// ── Rule ─────────────────────────────────────────────────────────────

/// A declarative automation rule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub name: String,
    pub trigger: RuleTrigger,
    /// Executed in order, each fully before the next rule begins
    pub actions: Vec<WorkflowAction>,
    pub is_active: bool,
}

impl AutomationRule {
    pub fn new(name: impl Into<String>, trigger: RuleTrigger) -> Self {
        Self {
            id: RuleId::generate(),
            name: name.into(),
            trigger,
            actions: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_action(mut self, action: WorkflowAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn matches(&self, ctx: &WorkflowContext) -> bool {
        self.is_active && self.trigger.matches(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EntityId, TenantId};
    use serde_json::json;

    fn order_ctx(from: &str, to: &str) -> WorkflowContext {
        WorkflowContext::new(
            EntityId::new("o1"),
            EntityType::Order,
            TenantId::new("acme"),
            UserId::new("u1"),
            Role::Sales,
        )
        .with_states(from, to)
    }

    #[test]
    fn test_condition_equals() {
        let mut meta = HashMap::new();
        meta.insert("region".to_string(), json!("emea"));
        let c = RuleCondition::new("region", ConditionOp::Equals, "emea");
        assert!(c.evaluate(&meta));
        let c = RuleCondition::new("region", ConditionOp::Equals, "apac");
        assert!(!c.evaluate(&meta));
    }

    #[test]
    fn test_condition_numeric() {
        let mut meta = HashMap::new();
        meta.insert("budget".to_string(), json!(50_000));
        assert!(RuleCondition::new("budget", ConditionOp::GreaterThan, 10_000).evaluate(&meta));
        assert!(RuleCondition::new("budget", ConditionOp::LessThan, 100_000).evaluate(&meta));
        assert!(!RuleCondition::new("budget", ConditionOp::GreaterThan, 50_000).evaluate(&meta));
    }

    #[test]
    fn test_condition_contains() {
        let mut meta = HashMap::new();
        meta.insert("tags".to_string(), json!(["priority", "q3"]));
        meta.insert("notes".to_string(), json!("rush order"));
        assert!(RuleCondition::new("tags", ConditionOp::Contains, "q3").evaluate(&meta));
        assert!(RuleCondition::new("notes", ConditionOp::Contains, "rush").evaluate(&meta));
        assert!(!RuleCondition::new("tags", ConditionOp::Contains, "q4").evaluate(&meta));
    }

    #[test]
    fn test_condition_missing_field_never_matches() {
        let meta = HashMap::new();
        assert!(!RuleCondition::new("anything", ConditionOp::Equals, "x").evaluate(&meta));
    }

    #[test]
    fn test_trigger_from_state_selectivity() {
        // A rule for pending_approval -> approved must not match
        // pending_approval -> booked.
        let trigger = RuleTrigger::new(EntityType::Order, "approved").from_state("pending_approval");
        assert!(trigger.matches(&order_ctx("pending_approval", "approved")));
        assert!(!trigger.matches(&order_ctx("pending_approval", "booked")));
        assert!(!trigger.matches(&order_ctx("draft", "approved")));
    }

    #[test]
    fn test_trigger_without_from_state() {
        let trigger = RuleTrigger::new(EntityType::Order, "approved");
        assert!(trigger.matches(&order_ctx("pending_approval", "approved")));
        assert!(trigger.matches(&order_ctx("draft", "approved")));
    }

    #[test]
    fn test_inactive_rule_never_matches() {
        let rule = AutomationRule::new(
            "on approval",
            RuleTrigger::new(EntityType::Order, "approved"),
        )
        .disabled();
        assert!(!rule.matches(&order_ctx("pending_approval", "approved")));
    }

    #[test]
    fn test_action_serde_tagged() {
        let action = WorkflowAction::SendNotification {
            audience: NotificationAudience::Admins,
            title: "Approval needed".into(),
            message: "Campaign pending".into(),
            kind: NotificationKind::Approval,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "send_notification");
        assert_eq!(json["config"]["audience"], "admins");

        let back: WorkflowAction = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind_name(), "send_notification");
    }

    #[test]
    fn test_failure_mode_defaults() {
        let action = WorkflowAction::CreateReservation {
            on_failure: FailureMode::Fatal,
        };
        assert_eq!(action.failure_mode(), FailureMode::Fatal);
        assert_eq!(
            WorkflowAction::CreateTalentApproval.failure_mode(),
            FailureMode::Isolate
        );
    }
}
