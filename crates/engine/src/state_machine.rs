//! Milestone state machine: crossing computation and transition gates.
//!
//! All functions here are pure over their inputs; the evaluator loads
//! whatever records the checks need and passes them in.

use crate::{WorkflowError, WorkflowResult};
use adflow_config::{Milestone, MilestoneSchedule, TenantConfig};
use adflow_types::{ApprovalStatus, CampaignApproval, TalentApprovalRequest, WorkflowContext};
use chrono::{DateTime, Utc};

/// The milestones a campaign transition crosses, in firing order.
/// Requires both probabilities on the context.
pub fn compute_crossings(
    schedule: &MilestoneSchedule,
    ctx: &WorkflowContext,
) -> WorkflowResult<Vec<Milestone>> {
    let (Some(old), Some(new)) = (ctx.previous_probability, ctx.new_probability) else {
        return Err(WorkflowError::InvalidContext(
            "campaign transition without old/new probability".to_string(),
        ));
    };
    Ok(schedule.crossings(old, new))
}

/// Role gate: crossing the admin-approval milestone requires an actor
/// role in the tenant's approval-role set.
pub fn check_role_gate(
    config: &TenantConfig,
    ctx: &WorkflowContext,
    crossings: &[Milestone],
) -> WorkflowResult<()> {
    if crossings.contains(&Milestone::AdminApproval) && !config.role_may_approve(ctx.actor_role) {
        return Err(WorkflowError::TransitionDenied(format!(
            "role {:?} may not drive the admin-approval transition",
            ctx.actor_role
        )));
    }
    Ok(())
}

/// Talent-approval preconditions for crossing the admin-approval
/// milestone. Denied requests block the transition outright; open
/// pending requests log a warning. Actors with override privilege
/// (admin, master) proceed in both cases, with the override logged.
pub fn check_talent_preconditions(
    ctx: &WorkflowContext,
    crossings: &[Milestone],
    requests: &[TalentApprovalRequest],
    now: DateTime<Utc>,
) -> WorkflowResult<()> {
    if !crossings.contains(&Milestone::AdminApproval) {
        return Ok(());
    }

    let denied = requests
        .iter()
        .filter(|r| r.status == ApprovalStatus::Denied)
        .count();
    if denied > 0 {
        if !ctx.actor_role.can_override_approvals() {
            return Err(WorkflowError::PreconditionViolation(format!(
                "{denied} talent approval(s) denied for campaign {}",
                ctx.entity_id
            )));
        }
        tracing::warn!(
            entity_id = %ctx.entity_id,
            actor_id = %ctx.actor_id,
            denied,
            "overriding denied talent approvals"
        );
    }

    let pending = requests
        .iter()
        .filter(|r| r.status == ApprovalStatus::Pending && r.is_open(now))
        .count();
    if pending > 0 {
        if !ctx.actor_role.can_override_approvals() {
            return Err(WorkflowError::PreconditionViolation(format!(
                "{pending} talent approval(s) still pending for campaign {}",
                ctx.entity_id
            )));
        }
        tracing::warn!(
            entity_id = %ctx.entity_id,
            actor_id = %ctx.actor_id,
            pending,
            "proceeding past pending talent approvals with override privilege"
        );
    }
    Ok(())
}

/// Booking gate for crossing the order-creation milestone: the
/// campaign's most recent approval record must be granted. Pending,
/// denied, and missing records all block. Actors with override
/// privilege proceed, with the override logged.
pub fn check_booking_gate(
    ctx: &WorkflowContext,
    crossings: &[Milestone],
    approval: Option<&CampaignApproval>,
) -> WorkflowResult<()> {
    if !crossings.contains(&Milestone::OrderCreation) {
        return Ok(());
    }
    let status = approval.map(|a| a.status);
    if status == Some(ApprovalStatus::Approved) {
        return Ok(());
    }
    if ctx.actor_role.can_override_approvals() {
        tracing::warn!(
            entity_id = %ctx.entity_id,
            actor_id = %ctx.actor_id,
            ?status,
            "booking without granted campaign approval under override privilege"
        );
        return Ok(());
    }
    let detail = match status {
        Some(ApprovalStatus::Pending) => "is still pending",
        Some(ApprovalStatus::Denied) => "was denied",
        _ => "does not exist",
    };
    Err(WorkflowError::PreconditionViolation(format!(
        "campaign {} approval {detail}, booking blocked",
        ctx.entity_id
    )))
}

/// Role gate for the explicit rejection event.
pub fn check_rejection_gate(config: &TenantConfig, ctx: &WorkflowContext) -> WorkflowResult<()> {
    if !config.role_may_approve(ctx.actor_role) {
        return Err(WorkflowError::TransitionDenied(format!(
            "role {:?} may not reject campaigns",
            ctx.actor_role
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use adflow_types::{
        CampaignId, EntityId, EntityType, Role, ShowId, SpotType, TalentApprovalSummary, TalentId,
        TenantId, UserId,
    };

    fn ctx(role: Role, old: u8, new: u8) -> WorkflowContext {
        WorkflowContext::new(
            EntityId::new("c1"),
            EntityType::Campaign,
            TenantId::new("acme"),
            UserId::new("u1"),
            role,
        )
        .with_probabilities(old, new)
    }

    fn request(status: ApprovalStatus) -> TalentApprovalRequest {
        let mut r = TalentApprovalRequest::new(
            TenantId::new("acme"),
            CampaignId::new("c1"),
            ShowId::new("show-a"),
            TalentId::new("t1"),
            SpotType::HostRead,
            TalentApprovalSummary::default(),
        );
        r.status = status;
        r
    }

    fn approval(status: ApprovalStatus) -> CampaignApproval {
        let mut a = CampaignApproval::new(
            TenantId::new("acme"),
            CampaignId::new("c1"),
            vec![Role::Admin],
            UserId::new("u1"),
            0.0,
        );
        a.status = status;
        a
    }

    #[test]
    fn test_crossings_require_probabilities() {
        let schedule = MilestoneSchedule::default();
        let mut c = ctx(Role::Sales, 0, 50);
        c.previous_probability = None;
        assert!(matches!(
            compute_crossings(&schedule, &c),
            Err(WorkflowError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_role_gate_blocks_sales_at_admin_approval() {
        let config = TenantConfig::default();
        let crossings = vec![Milestone::AdminApproval];
        assert!(matches!(
            check_role_gate(&config, &ctx(Role::Sales, 80, 92), &crossings),
            Err(WorkflowError::TransitionDenied(_))
        ));
        assert!(check_role_gate(&config, &ctx(Role::Admin, 80, 92), &crossings).is_ok());
    }

    #[test]
    fn test_role_gate_ignores_lower_milestones() {
        let config = TenantConfig::default();
        let crossings = vec![Milestone::PreSaleActive, Milestone::ScheduleValid];
        assert!(check_role_gate(&config, &ctx(Role::Sales, 0, 40), &crossings).is_ok());
    }

    #[test]
    fn test_denied_talent_approval_blocks_without_override() {
        let crossings = vec![Milestone::AdminApproval];
        let requests = vec![request(ApprovalStatus::Denied)];
        let now = Utc::now();
        assert!(matches!(
            check_talent_preconditions(&ctx(Role::Sales, 80, 92), &crossings, &requests, now),
            Err(WorkflowError::PreconditionViolation(_))
        ));
        for role in [Role::Admin, Role::Master] {
            assert!(
                check_talent_preconditions(&ctx(role, 80, 92), &crossings, &requests, now).is_ok()
            );
        }
    }

    #[test]
    fn test_pending_blocks_only_without_override() {
        let crossings = vec![Milestone::AdminApproval];
        let requests = vec![request(ApprovalStatus::Pending)];
        let now = Utc::now();
        assert!(matches!(
            check_talent_preconditions(&ctx(Role::Sales, 80, 92), &crossings, &requests, now),
            Err(WorkflowError::PreconditionViolation(_))
        ));
        assert!(
            check_talent_preconditions(&ctx(Role::Admin, 80, 92), &crossings, &requests, now)
                .is_ok()
        );
    }

    #[test]
    fn test_booking_gate_requires_granted_approval() {
        let crossings = vec![Milestone::OrderCreation];
        let sales = ctx(Role::Sales, 92, 100);
        assert!(
            check_booking_gate(&sales, &crossings, Some(&approval(ApprovalStatus::Approved)))
                .is_ok()
        );
        for status in [ApprovalStatus::Pending, ApprovalStatus::Denied] {
            assert!(matches!(
                check_booking_gate(&sales, &crossings, Some(&approval(status))),
                Err(WorkflowError::PreconditionViolation(_))
            ));
        }
        assert!(matches!(
            check_booking_gate(&sales, &crossings, None),
            Err(WorkflowError::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_booking_gate_override_and_lower_milestones() {
        let crossings = vec![Milestone::OrderCreation];
        for role in [Role::Admin, Role::Master] {
            assert!(check_booking_gate(
                &ctx(role, 92, 100),
                &crossings,
                Some(&approval(ApprovalStatus::Pending))
            )
            .is_ok());
        }
        let lower = vec![Milestone::AdminApproval];
        assert!(check_booking_gate(&ctx(Role::Sales, 80, 92), &lower, None).is_ok());
    }

    #[test]
    fn test_approved_requests_do_not_block() {
        let crossings = vec![Milestone::AdminApproval];
        let requests = vec![request(ApprovalStatus::Approved)];
        assert!(check_talent_preconditions(
            &ctx(Role::Sales, 80, 92),
            &crossings,
            &requests,
            Utc::now()
        )
        .is_ok());
    }
}
