//! Rule matcher.
//!
//! A [`RuleSet`] is explicitly constructed and handed to the evaluator;
//! there is no process-wide rule registry. Matching preserves
//! registration order, and the evaluator runs each matched rule's
//! actions to completion before the next rule begins.

use adflow_types::{
    AutomationRule, EntityType, FailureMode, NotificationAudience, NotificationKind, RuleTrigger,
    WorkflowAction, WorkflowContext,
};

#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    rules: Vec<AutomationRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: AutomationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn add(&mut self, rule: AutomationRule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All active rules matching the transition, in registration order.
    pub fn matching(&self, ctx: &WorkflowContext) -> Vec<&AutomationRule> {
        self.rules.iter().filter(|r| r.matches(ctx)).collect()
    }

    /// The compiled-in campaign milestone rules. Tenants may extend or
    /// replace this set; the milestone semantics themselves live here
    /// as configuration, not in engine code.
    pub fn campaign_defaults() -> Self {
        Self::new()
            .with_rule(
                AutomationRule::new(
                    "pre-sale activation",
                    RuleTrigger::new(EntityType::Campaign, "pre_sale_active"),
                )
                .with_action(WorkflowAction::SendNotification {
                    audience: NotificationAudience::EntityOwner,
                    title: "Schedule builder unlocked".to_string(),
                    message: "The campaign is pre-sale active; spots can now be scheduled."
                        .to_string(),
                    kind: NotificationKind::Workflow,
                }),
            )
            .with_rule(
                AutomationRule::new(
                    "schedule validated",
                    RuleTrigger::new(EntityType::Campaign, "schedule_valid"),
                )
                .with_action(WorkflowAction::SendNotification {
                    audience: NotificationAudience::EntityOwner,
                    title: "Schedule validated".to_string(),
                    message: "The campaign schedule has passed validation.".to_string(),
                    kind: NotificationKind::Workflow,
                }),
            )
            .with_rule(
                AutomationRule::new(
                    "talent approval requests",
                    RuleTrigger::new(EntityType::Campaign, "talent_approval"),
                )
                .with_action(WorkflowAction::CreateTalentApproval),
            )
            .with_rule(
                AutomationRule::new(
                    "inventory auto-reserve",
                    RuleTrigger::new(EntityType::Campaign, "auto_reserve"),
                )
                // The campaign must not end up approved but unreserved,
                // so reservation failure fails the milestone.
                .with_action(WorkflowAction::CreateReservation {
                    on_failure: FailureMode::Fatal,
                }),
            )
            .with_rule(
                AutomationRule::new(
                    "admin approval request",
                    RuleTrigger::new(EntityType::Campaign, "admin_approval"),
                )
                .with_action(WorkflowAction::CreateAdminApproval),
            )
            .with_rule(
                AutomationRule::new(
                    "campaign booked",
                    RuleTrigger::new(EntityType::Campaign, "booked"),
                )
                .with_action(WorkflowAction::CreateOrder)
                .with_action(WorkflowAction::CreateContract)
                .with_action(WorkflowAction::CreateInvoice {
                    source: Default::default(),
                })
                .with_action(WorkflowAction::SendNotification {
                    audience: NotificationAudience::EntityOwner,
                    title: "Campaign booked".to_string(),
                    message: "Order, contract, and invoice have been generated.".to_string(),
                    kind: NotificationKind::Workflow,
                }),
            )
    }
}
