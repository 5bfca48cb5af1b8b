//! The workflow evaluator: the engine's inbound interface.
//!
//! Entity-mutation handlers call [`WorkflowEvaluator::evaluate_transition`]
//! with a context describing the change. Evaluations for the same entity
//! id are serialized through a keyed async mutex before crossings are
//! computed; without it two concurrent probability updates can both
//! observe "not yet crossed" and double-fire a milestone's actions.

use crate::executor::{ActionExecutors, ActionOutcome};
use crate::matcher::RuleSet;
use crate::state_machine::{
    check_booking_gate, check_rejection_gate, check_role_gate, check_talent_preconditions,
    compute_crossings,
};
use crate::telemetry::WorkflowTelemetry;
use crate::{WorkflowError, WorkflowResult};
use adflow_config::{ConfigRegistry, Milestone, TenantConfig};
use adflow_storage::WorkflowStorage;
use adflow_types::{
    AutomationRule, CampaignId, EntityId, EntityType, FailureMode, Notification, NotificationKind,
    ReservationStatus, WorkflowContext, WorkflowId,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// What one evaluation did, for callers, logs, and tests. Partial
/// action failures appear here and in logs only; they are never
/// surfaced to the end user.
#[derive(Clone, Debug, Default)]
pub struct EvaluationReport {
    pub crossed: Vec<Milestone>,
    pub rules_matched: usize,
    /// Action kind names, in execution order
    pub executed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// What an explicit rejection rolled back.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectionReport {
    pub reservations_released: usize,
    pub approvals_denied: usize,
    pub notifications_cleared: u64,
    pub fallback_probability: u8,
}

/// Per-entity serialization primitive. Guards are handed out per
/// entity id; holding one blocks every other evaluation for that id.
#[derive(Default)]
struct EntityLocks {
    inner: Mutex<HashMap<EntityId, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    async fn acquire(&self, id: &EntityId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            // An entry whose only owner is the map has no holder and no
            // waiter; drop it so the map does not grow with every
            // entity id ever evaluated.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct WorkflowEvaluator<S> {
    store: Arc<S>,
    configs: ConfigRegistry,
    rules: RuleSet,
    executors: ActionExecutors<S>,
    telemetry: Arc<WorkflowTelemetry>,
    locks: EntityLocks,
}

impl<S: WorkflowStorage> WorkflowEvaluator<S> {
    pub fn new(store: Arc<S>, configs: ConfigRegistry, rules: RuleSet) -> Self {
        Self {
            executors: ActionExecutors::new(store.clone()),
            store,
            configs,
            rules,
            telemetry: Arc::new(WorkflowTelemetry::new()),
            locks: EntityLocks::default(),
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<WorkflowTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn telemetry(&self) -> &Arc<WorkflowTelemetry> {
        &self.telemetry
    }

    /// Evaluate one transition. Gate and precondition failures return
    /// an error with nothing committed; isolated action failures are
    /// reported in the returned report only.
    pub async fn evaluate_transition(
        &self,
        ctx: WorkflowContext,
    ) -> WorkflowResult<EvaluationReport> {
        let _guard = self.locks.acquire(&ctx.entity_id).await;

        let workflow_id = WorkflowId::generate();
        let workflow_type = workflow_type_of(ctx.entity_type);
        let start = self.telemetry.start_workflow(&workflow_id, workflow_type);

        let result = self.run_transition(&ctx).await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    entity_id = %ctx.entity_id,
                    crossed = report.crossed.len(),
                    executed = report.executed.len(),
                    skipped = report.skipped.len(),
                    failed = report.failed.len(),
                    "transition evaluated"
                );
                self.telemetry
                    .end_workflow(&workflow_id, workflow_type, start, true);
            }
            Err(err) => {
                self.telemetry.error(&workflow_id, workflow_type, err, &ctx);
                self.telemetry
                    .end_workflow(&workflow_id, workflow_type, start, false);
            }
        }
        result
    }

    async fn run_transition(&self, ctx: &WorkflowContext) -> WorkflowResult<EvaluationReport> {
        // Configuration is read fresh per evaluation; a tenant may
        // change thresholds between campaigns.
        let config = self.configs.get(&ctx.tenant_id);

        match (ctx.entity_type, ctx.previous_probability, ctx.new_probability) {
            (EntityType::Campaign, Some(old), Some(new)) => {
                self.run_campaign_transition(ctx, &config, old, new).await
            }
            (EntityType::Campaign, _, _) => Err(WorkflowError::InvalidContext(
                "campaign transition without old/new probability".to_string(),
            )),
            _ => {
                // Non-campaign entities match rules on the state pair
                // directly; there is no crossing computation.
                let mut report = EvaluationReport::default();
                let matched = self.rules.matching(ctx);
                report.rules_matched = matched.len();
                for rule in matched {
                    self.run_rule_actions(rule, ctx, &config, &mut report)
                        .await?;
                }
                Ok(report)
            }
        }
    }

    async fn run_campaign_transition(
        &self,
        ctx: &WorkflowContext,
        config: &TenantConfig,
        old: u8,
        new: u8,
    ) -> WorkflowResult<EvaluationReport> {
        let campaign_id = CampaignId::new(ctx.entity_id.as_str());
        let crossings = compute_crossings(&config.schedule, ctx)?;
        check_role_gate(config, ctx, &crossings)?;

        if crossings.contains(&Milestone::AdminApproval) {
            let requests = self
                .store
                .talent_approvals_for_campaign(&ctx.tenant_id, &campaign_id)
                .await?;
            check_talent_preconditions(ctx, &crossings, &requests, Utc::now())?;
        }

        if crossings.contains(&Milestone::OrderCreation) {
            let approval = self
                .store
                .latest_campaign_approval(&ctx.tenant_id, &campaign_id)
                .await?;
            check_booking_gate(ctx, &crossings, approval.as_ref())?;
        }

        let mut report = EvaluationReport {
            crossed: crossings.clone(),
            ..Default::default()
        };

        let previous_label = config.schedule.status_label(old);
        for milestone in &crossings {
            let step_ctx = ctx.for_states(previous_label, milestone.status_label());
            let matched = self.rules.matching(&step_ctx);
            report.rules_matched += matched.len();
            for rule in matched {
                self.run_rule_actions(rule, &step_ctx, config, &mut report)
                    .await?;
            }
        }

        // Commit the probability and its status projection together,
        // after all gates and fatal actions have passed.
        self.store
            .set_campaign_state(
                &ctx.tenant_id,
                &campaign_id,
                new,
                config.schedule.status_label(new),
            )
            .await?;
        Ok(report)
    }

    async fn run_rule_actions(
        &self,
        rule: &AutomationRule,
        ctx: &WorkflowContext,
        config: &TenantConfig,
        report: &mut EvaluationReport,
    ) -> WorkflowResult<()> {
        for action in &rule.actions {
            let kind = action.kind_name();
            match self.executors.execute(action, ctx, config).await {
                Ok(ActionOutcome::Executed) => report.executed.push(kind),
                Ok(ActionOutcome::Skipped) => report.skipped.push(kind),
                Err(err) => {
                    if action.failure_mode() == FailureMode::Fatal {
                        return Err(WorkflowError::FatalAction {
                            action: kind,
                            reason: err.to_string(),
                        });
                    }
                    tracing::warn!(
                        rule = %rule.name,
                        action = kind,
                        entity_id = %ctx.entity_id,
                        error = %err,
                        "action failed, continuing with remaining actions"
                    );
                    report.failed.push(kind);
                }
            }
        }
        Ok(())
    }

    /// Explicit rejection from the admin-approval state back to the
    /// rejection-fallback state. Bypasses crossing detection and runs
    /// its own rollback set: release every held reservation, deny
    /// pending campaign approvals, clear pending approval
    /// notifications, then commit the fallback state.
    pub async fn reject_campaign(&self, ctx: WorkflowContext) -> WorkflowResult<RejectionReport> {
        let _guard = self.locks.acquire(&ctx.entity_id).await;

        let workflow_id = WorkflowId::generate();
        let start = self
            .telemetry
            .start_workflow(&workflow_id, "campaign_rejection");

        let result = self.run_rejection(&ctx).await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    entity_id = %ctx.entity_id,
                    reservations_released = report.reservations_released,
                    approvals_denied = report.approvals_denied,
                    notifications_cleared = report.notifications_cleared,
                    "campaign rejected"
                );
                self.telemetry
                    .end_workflow(&workflow_id, "campaign_rejection", start, true);
            }
            Err(err) => {
                self.telemetry
                    .error(&workflow_id, "campaign_rejection", err, &ctx);
                self.telemetry
                    .end_workflow(&workflow_id, "campaign_rejection", start, false);
            }
        }
        result
    }

    async fn run_rejection(&self, ctx: &WorkflowContext) -> WorkflowResult<RejectionReport> {
        let config = self.configs.get(&ctx.tenant_id);
        check_rejection_gate(&config, ctx)?;

        let campaign_id = CampaignId::new(ctx.entity_id.as_str());
        let campaign = self.store.get_campaign(&ctx.tenant_id, &campaign_id).await?;

        let mut report = RejectionReport::default();

        // Full release of every held reservation. Partial re-negotiation
        // is a product question; full release is the safe default.
        for reservation in self
            .store
            .reservations_for_campaign(&ctx.tenant_id, &campaign_id)
            .await?
        {
            if reservation.status == ReservationStatus::Held {
                self.store
                    .set_reservation_status(
                        &ctx.tenant_id,
                        &reservation.id,
                        ReservationStatus::Released,
                    )
                    .await?;
                report.reservations_released += 1;
            }
        }

        while let Some(approval) = self
            .store
            .pending_campaign_approval(&ctx.tenant_id, &campaign_id)
            .await?
        {
            self.store
                .set_campaign_approval_status(
                    &ctx.tenant_id,
                    &approval.id,
                    adflow_types::ApprovalStatus::Denied,
                    &ctx.actor_id,
                )
                .await?;
            report.approvals_denied += 1;
        }

        report.notifications_cleared = self
            .store
            .clear_entity_notifications(&ctx.tenant_id, &ctx.entity_id, NotificationKind::Approval)
            .await?;

        let fallback = config.schedule.threshold(Milestone::RejectionFallback);
        self.store
            .set_campaign_state(
                &ctx.tenant_id,
                &campaign_id,
                fallback,
                Milestone::RejectionFallback.status_label(),
            )
            .await?;
        report.fallback_probability = fallback;

        if config.notifications_enabled {
            let notification = Notification::new(
                ctx.tenant_id.clone(),
                campaign.owner_id.clone(),
                "Campaign rejected",
                format!(
                    "Campaign {} was rejected and fell back to {}% probability.",
                    campaign.name, fallback
                ),
                NotificationKind::Workflow,
            )
            .about(ctx.entity_id.clone());
            if let Err(err) = self.store.create_notification(notification).await {
                tracing::warn!(
                    entity_id = %ctx.entity_id,
                    error = %err,
                    "rejection notification write failed"
                );
            }
        }

        Ok(report)
    }
}

fn workflow_type_of(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Campaign => "campaign_transition",
        EntityType::Order => "order_transition",
        EntityType::Contract => "contract_transition",
        EntityType::Approval => "approval_transition",
        EntityType::Episode => "episode_transition",
    }
}
