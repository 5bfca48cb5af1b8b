//! Action executors: one arm per workflow action kind.
//!
//! Every creating executor probes for an existing non-terminal record
//! by its natural business key first and skips when found; idempotency
//! never relies on unique-constraint recovery. Failure isolation is the
//! evaluator's job — executors just return errors.

use crate::{WorkflowError, WorkflowResult};
use adflow_billing::InvoiceGenerator;
use adflow_config::{Milestone, TenantConfig};
use adflow_storage::WorkflowStorage;
use adflow_types::{
    Campaign, CampaignApproval, CampaignId, Cents, EntityType, EpisodeId, InvoiceSource,
    Notification, NotificationAudience, NotificationKind, Order, OrderId, OrderItem, OrderStatus,
    Reservation, ReservationItem, ReservationStatus, Role, ScheduledSpot, ShowId,
    TalentApprovalRequest, TalentApprovalSummary, TalentId, Task, UserId, WorkflowAction,
    WorkflowContext,
};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What one action execution did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    Executed,
    /// The derived record already existed (or there was nothing to do).
    Skipped,
}

pub struct ActionExecutors<S> {
    store: Arc<S>,
    invoices: InvoiceGenerator<S>,
}

impl<S: WorkflowStorage> ActionExecutors<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            invoices: InvoiceGenerator::new(store.clone()),
            store,
        }
    }

    /// Dispatch one action. The match is exhaustive over the closed
    /// action set, so a new action kind fails to compile until it has
    /// an arm here.
    pub async fn execute(
        &self,
        action: &WorkflowAction,
        ctx: &WorkflowContext,
        config: &TenantConfig,
    ) -> WorkflowResult<ActionOutcome> {
        match action {
            WorkflowAction::CreateReservation { .. } => self.create_reservation(ctx, config).await,
            WorkflowAction::CreateTalentApproval => self.create_talent_approval(ctx, config).await,
            WorkflowAction::CreateAdminApproval => self.create_admin_approval(ctx, config).await,
            WorkflowAction::CreateContract => self.create_contract(ctx).await,
            WorkflowAction::CreateOrder => self.create_order(ctx).await,
            WorkflowAction::CreateInvoice { source } => {
                self.create_invoice(ctx, config, *source).await
            }
            WorkflowAction::SendNotification {
                audience,
                title,
                message,
                kind,
            } => {
                self.send_notification(ctx, config, audience, title, message, *kind)
                    .await
            }
            WorkflowAction::AssignTask {
                role,
                title,
                due_in_days,
            } => self.assign_task(ctx, *role, title, *due_in_days).await,
            WorkflowAction::UpdateStatus { status } => self.update_status(ctx, status).await,
        }
    }

    fn campaign_id(ctx: &WorkflowContext) -> CampaignId {
        CampaignId::new(ctx.entity_id.as_str())
    }

    async fn load_campaign(&self, ctx: &WorkflowContext) -> WorkflowResult<Campaign> {
        Ok(self
            .store
            .get_campaign(&ctx.tenant_id, &Self::campaign_id(ctx))
            .await?)
    }

    // ── create-reservation ───────────────────────────────────────────

    async fn create_reservation(
        &self,
        ctx: &WorkflowContext,
        config: &TenantConfig,
    ) -> WorkflowResult<ActionOutcome> {
        let campaign_id = Self::campaign_id(ctx);
        let now = Utc::now();
        if let Some(existing) = self
            .store
            .active_reservation(&ctx.tenant_id, &campaign_id, now)
            .await?
        {
            tracing::debug!(
                campaign_id = %campaign_id,
                reservation_id = %existing.id,
                "active reservation already held, skipping"
            );
            return Ok(ActionOutcome::Skipped);
        }

        let campaign = self.load_campaign(ctx).await?;
        let spots = self
            .store
            .scheduled_spots(&ctx.tenant_id, &campaign_id)
            .await?;
        if spots.is_empty() {
            return Err(WorkflowError::InvalidContext(format!(
                "campaign {campaign_id} has no scheduled spots to reserve"
            )));
        }

        let total_amount: Cents = spots.iter().map(|s| s.negotiated_rate).sum();
        let reserve_fraction = config.schedule.threshold(Milestone::AutoReserve) as i64;
        let estimated_revenue = campaign.budget * reserve_fraction / 100;

        let reservation = Reservation::new(
            ctx.tenant_id.clone(),
            campaign_id.clone(),
            campaign.advertiser_id.clone(),
            campaign.agency_id.clone(),
            total_amount,
            estimated_revenue,
        );
        let items: Vec<ReservationItem> = spots
            .iter()
            .map(|spot| ReservationItem::from_spot(reservation.id.clone(), spot))
            .collect();
        let reservation_id = reservation.id.clone();
        self.store.create_reservation(reservation, items).await?;

        tracing::info!(
            campaign_id = %campaign_id,
            reservation_id = %reservation_id,
            spot_count = spots.len(),
            total_amount,
            estimated_revenue,
            "inventory reserved"
        );
        Ok(ActionOutcome::Executed)
    }

    // ── create-talent-approval ───────────────────────────────────────

    async fn create_talent_approval(
        &self,
        ctx: &WorkflowContext,
        config: &TenantConfig,
    ) -> WorkflowResult<ActionOutcome> {
        let campaign_id = Self::campaign_id(ctx);
        let spots = self
            .store
            .scheduled_spots(&ctx.tenant_id, &campaign_id)
            .await?;
        let now = Utc::now();

        // One group per (show, talent) among allow-listed spot types.
        let mut groups: BTreeMap<(ShowId, TalentId), Vec<&ScheduledSpot>> = BTreeMap::new();
        for spot in &spots {
            if !config.requires_talent_approval(spot.spot_type) {
                continue;
            }
            let Some(talent_id) = &spot.talent_id else {
                continue;
            };
            groups
                .entry((spot.show_id.clone(), talent_id.clone()))
                .or_default()
                .push(spot);
        }

        let mut created = 0usize;
        for ((show_id, talent_id), group) in groups {
            let open = self
                .store
                .find_open_talent_approval(&ctx.tenant_id, &campaign_id, &show_id, &talent_id, now)
                .await?;
            if let Some(existing) = open {
                tracing::debug!(
                    campaign_id = %campaign_id,
                    show_id = %show_id,
                    talent_id = %talent_id,
                    approval_id = %existing.id,
                    "open talent approval exists, skipping"
                );
                continue;
            }

            let summary = TalentApprovalSummary {
                spot_count: group.len(),
                total_value: group.iter().map(|s| s.negotiated_rate).sum(),
                first_air_date: group.iter().map(|s| s.air_date).min(),
                last_air_date: group.iter().map(|s| s.air_date).max(),
            };
            let request = TalentApprovalRequest::new(
                ctx.tenant_id.clone(),
                campaign_id.clone(),
                show_id.clone(),
                talent_id.clone(),
                group[0].spot_type,
                summary,
            );
            let approval_id = request.id.clone();
            self.store.create_talent_approval(request).await?;
            created += 1;

            // Talent sign in with their talent id as the user id.
            let notification = Notification::new(
                ctx.tenant_id.clone(),
                UserId::new(talent_id.as_str()),
                "Spot approval requested",
                format!(
                    "{} spot(s) on {} are awaiting your approval.",
                    group.len(),
                    show_id
                ),
                NotificationKind::Approval,
            )
            .about(ctx.entity_id.clone());
            self.deliver(ctx, config, notification).await;

            tracing::info!(
                campaign_id = %campaign_id,
                show_id = %show_id,
                talent_id = %talent_id,
                approval_id = %approval_id,
                "talent approval requested"
            );
        }

        Ok(if created > 0 {
            ActionOutcome::Executed
        } else {
            ActionOutcome::Skipped
        })
    }

    // ── create-admin-approval ────────────────────────────────────────

    async fn create_admin_approval(
        &self,
        ctx: &WorkflowContext,
        config: &TenantConfig,
    ) -> WorkflowResult<ActionOutcome> {
        let campaign_id = Self::campaign_id(ctx);
        if let Some(existing) = self
            .store
            .pending_campaign_approval(&ctx.tenant_id, &campaign_id)
            .await?
        {
            tracing::debug!(
                campaign_id = %campaign_id,
                approval_id = %existing.id,
                "pending campaign approval exists, skipping"
            );
            return Ok(ActionOutcome::Skipped);
        }

        let spots = self
            .store
            .scheduled_spots(&ctx.tenant_id, &campaign_id)
            .await?;
        let variances: Vec<f64> = spots.iter().filter_map(|s| s.rate_variance_pct()).collect();
        let variance_pct = if variances.is_empty() {
            0.0
        } else {
            variances.iter().sum::<f64>() / variances.len() as f64
        };

        let approval = CampaignApproval::new(
            ctx.tenant_id.clone(),
            campaign_id.clone(),
            config.approval_roles.clone(),
            ctx.actor_id.clone(),
            variance_pct,
        );
        let approval_id = approval.id.clone();
        self.store.create_campaign_approval(approval).await?;

        let over_threshold = variance_pct > config.rate_card_variance_threshold_pct;
        let title = if over_threshold {
            "Campaign approval needed (rate-card variance flagged)"
        } else {
            "Campaign approval needed"
        };
        for user in self.approval_audience(ctx).await? {
            let notification = Notification::new(
                ctx.tenant_id.clone(),
                user.id,
                title,
                format!(
                    "Campaign {} requests approval; rate-card variance {:.1}%.",
                    campaign_id, variance_pct
                ),
                NotificationKind::Approval,
            )
            .about(ctx.entity_id.clone())
            .with_metadata("rate_card_variance_pct", variance_pct);
            self.deliver(ctx, config, notification).await;
        }

        tracing::info!(
            campaign_id = %campaign_id,
            approval_id = %approval_id,
            variance_pct,
            over_threshold,
            "campaign approval requested"
        );
        Ok(ActionOutcome::Executed)
    }

    async fn approval_audience(&self, ctx: &WorkflowContext) -> WorkflowResult<Vec<adflow_types::User>> {
        let mut users = self
            .store
            .users_with_role(&ctx.tenant_id, Role::Admin)
            .await?;
        users.extend(
            self.store
                .users_with_role(&ctx.tenant_id, Role::Master)
                .await?,
        );
        Ok(users)
    }

    // ── create-order ─────────────────────────────────────────────────

    async fn create_order(&self, ctx: &WorkflowContext) -> WorkflowResult<ActionOutcome> {
        let campaign_id = Self::campaign_id(ctx);
        if let Some(existing) = self
            .store
            .order_for_campaign(&ctx.tenant_id, &campaign_id)
            .await?
        {
            tracing::debug!(
                campaign_id = %campaign_id,
                order_id = %existing.id,
                "order already exists for campaign, skipping"
            );
            return Ok(ActionOutcome::Skipped);
        }

        let campaign = self.load_campaign(ctx).await?;
        let spots = self
            .store
            .scheduled_spots(&ctx.tenant_id, &campaign_id)
            .await?;
        if spots.is_empty() {
            return Err(WorkflowError::InvalidContext(format!(
                "campaign {campaign_id} has no scheduled spots to order"
            )));
        }

        let mut order = Order::new(
            ctx.tenant_id.clone(),
            campaign_id.clone(),
            campaign.advertiser_id.clone(),
            campaign.agency_id.clone(),
            spots.iter().map(|s| s.negotiated_rate).sum(),
        );
        order.status = OrderStatus::Booked;
        let items: Vec<OrderItem> = spots
            .iter()
            .map(|spot| OrderItem::from_spot(order.id.clone(), spot))
            .collect();
        let order_id = order.id.clone();
        self.store.create_order(order, items).await?;

        // Booking confirms the inventory hold.
        let now = Utc::now();
        if let Some(reservation) = self
            .store
            .active_reservation(&ctx.tenant_id, &campaign_id, now)
            .await?
        {
            self.store
                .set_reservation_status(
                    &ctx.tenant_id,
                    &reservation.id,
                    ReservationStatus::Confirmed,
                )
                .await?;
            tracing::info!(
                campaign_id = %campaign_id,
                reservation_id = %reservation.id,
                "reservation confirmed at booking"
            );
        }

        tracing::info!(
            campaign_id = %campaign_id,
            order_id = %order_id,
            spot_count = spots.len(),
            "order created"
        );
        Ok(ActionOutcome::Executed)
    }

    // ── create-contract ──────────────────────────────────────────────

    async fn create_contract(&self, ctx: &WorkflowContext) -> WorkflowResult<ActionOutcome> {
        let campaign_id = Self::campaign_id(ctx);
        let Some(order) = self
            .store
            .order_for_campaign(&ctx.tenant_id, &campaign_id)
            .await?
        else {
            return Err(WorkflowError::InvalidContext(format!(
                "campaign {campaign_id} has no order to contract"
            )));
        };

        if let Some(existing) = self
            .store
            .contract_for_order(&ctx.tenant_id, &order.id)
            .await?
        {
            tracing::debug!(
                order_id = %order.id,
                contract_id = %existing.id,
                "contract already exists for order, skipping"
            );
            return Ok(ActionOutcome::Skipped);
        }

        let items = self.store.order_items(&ctx.tenant_id, &order.id).await?;
        let (contract, line_items) = adflow_types::Contract::from_order(&order, &items);
        let contract_id = contract.id.clone();
        self.store.create_contract(contract, line_items).await?;

        tracing::info!(
            order_id = %order.id,
            contract_id = %contract_id,
            "contract created"
        );
        Ok(ActionOutcome::Executed)
    }

    // ── create-invoice ───────────────────────────────────────────────

    async fn create_invoice(
        &self,
        ctx: &WorkflowContext,
        config: &TenantConfig,
        source: InvoiceSource,
    ) -> WorkflowResult<ActionOutcome> {
        let now = Utc::now();
        match source {
            InvoiceSource::Order => {
                let campaign_id = Self::campaign_id(ctx);
                let Some(order) = self
                    .store
                    .order_for_campaign(&ctx.tenant_id, &campaign_id)
                    .await?
                else {
                    return Err(WorkflowError::InvalidContext(format!(
                        "campaign {campaign_id} has no order to invoice"
                    )));
                };
                let existing = self
                    .store
                    .invoices_for_order(&ctx.tenant_id, &order.id)
                    .await?;
                if !existing.is_empty() {
                    tracing::debug!(
                        order_id = %order.id,
                        "order already invoiced, skipping"
                    );
                    return Ok(ActionOutcome::Skipped);
                }
                let invoice = self
                    .invoices
                    .invoice_from_order(config, &ctx.tenant_id, &order.id, false, now)
                    .await?;
                tracing::info!(order_id = %order.id, number = %invoice.number, "invoice created");
                Ok(ActionOutcome::Executed)
            }
            InvoiceSource::EpisodeDelivery => {
                let episode = EpisodeId::new(ctx.entity_id.as_str());
                let invoices = self
                    .invoices
                    .invoices_from_episode_delivery(config, &ctx.tenant_id, &episode, now)
                    .await?;
                Ok(if invoices.is_empty() {
                    ActionOutcome::Skipped
                } else {
                    ActionOutcome::Executed
                })
            }
        }
    }

    // ── send-notification ────────────────────────────────────────────

    async fn send_notification(
        &self,
        ctx: &WorkflowContext,
        config: &TenantConfig,
        audience: &NotificationAudience,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> WorkflowResult<ActionOutcome> {
        if !config.notifications_enabled {
            return Ok(ActionOutcome::Skipped);
        }

        let recipients: Vec<UserId> = match audience {
            NotificationAudience::EntityOwner => self.entity_owner(ctx).await?,
            NotificationAudience::Admins => self
                .approval_audience(ctx)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect(),
            NotificationAudience::SalesTeam => self
                .store
                .users_with_role(&ctx.tenant_id, Role::Sales)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect(),
            NotificationAudience::Talent { talent_id } => {
                vec![UserId::new(talent_id.as_str())]
            }
            NotificationAudience::User { user_id } => vec![user_id.clone()],
        };
        if recipients.is_empty() {
            tracing::warn!(entity_id = %ctx.entity_id, ?audience, "notification audience resolved to no users");
            return Ok(ActionOutcome::Skipped);
        }

        for user_id in recipients {
            let notification = Notification::new(
                ctx.tenant_id.clone(),
                user_id,
                title,
                message,
                kind,
            )
            .about(ctx.entity_id.clone());
            self.deliver(ctx, config, notification).await;
        }
        Ok(ActionOutcome::Executed)
    }

    /// The owner of the entity the transition is about. Orders resolve
    /// through their owning campaign; the remaining entity kinds carry
    /// no owner and resolve to nobody.
    async fn entity_owner(&self, ctx: &WorkflowContext) -> WorkflowResult<Vec<UserId>> {
        match ctx.entity_type {
            EntityType::Campaign => Ok(vec![self.load_campaign(ctx).await?.owner_id]),
            EntityType::Order => {
                let order = self
                    .store
                    .get_order(&ctx.tenant_id, &OrderId::new(ctx.entity_id.as_str()))
                    .await?;
                let campaign = self
                    .store
                    .get_campaign(&ctx.tenant_id, &order.campaign_id)
                    .await?;
                Ok(vec![campaign.owner_id])
            }
            EntityType::Contract | EntityType::Approval | EntityType::Episode => Ok(Vec::new()),
        }
    }

    /// Fire-and-forget write to the notification sink. Sink failures
    /// are logged and swallowed; they never fail a workflow.
    async fn deliver(&self, ctx: &WorkflowContext, config: &TenantConfig, n: Notification) {
        if !config.notifications_enabled {
            return;
        }
        if let Err(err) = self.store.create_notification(n).await {
            tracing::warn!(
                entity_id = %ctx.entity_id,
                error = %err,
                "notification sink write failed"
            );
        }
    }

    // ── assign-task ──────────────────────────────────────────────────

    async fn assign_task(
        &self,
        ctx: &WorkflowContext,
        role: Role,
        title: &str,
        due_in_days: i64,
    ) -> WorkflowResult<ActionOutcome> {
        let users = self.store.users_with_role(&ctx.tenant_id, role).await?;
        // No load balancing: first user with the role gets the task.
        let Some(assignee) = users.into_iter().next() else {
            tracing::warn!(
                entity_id = %ctx.entity_id,
                ?role,
                "no user with required role, task not assigned"
            );
            return Ok(ActionOutcome::Skipped);
        };

        let task = Task::new(
            ctx.tenant_id.clone(),
            assignee.id.clone(),
            title,
            Utc::now() + Duration::days(due_in_days),
        )
        .about(ctx.entity_id.clone());
        let task_id = task.id.clone();
        self.store.create_task(task).await?;

        tracing::info!(
            entity_id = %ctx.entity_id,
            assignee_id = %assignee.id,
            task_id = %task_id,
            "task assigned"
        );
        Ok(ActionOutcome::Executed)
    }

    // ── update-status ────────────────────────────────────────────────

    async fn update_status(
        &self,
        ctx: &WorkflowContext,
        status: &str,
    ) -> WorkflowResult<ActionOutcome> {
        let campaign = self.load_campaign(ctx).await?;
        let probability = ctx.new_probability.unwrap_or(campaign.probability);
        self.store
            .set_campaign_state(&ctx.tenant_id, &campaign.id, probability, status)
            .await?;
        tracing::info!(campaign_id = %campaign.id, status, "status updated");
        Ok(ActionOutcome::Executed)
    }
}
