//! In-memory reference implementation of the adflow storage traits.
//!
//! Deterministic and test-friendly. Production deployments should put
//! a transactional backend behind the same traits; derived-record
//! idempotency in the engine relies only on the probe methods, not on
//! unique-constraint recovery.

use crate::traits::{
    ApprovalStore, CampaignStore, ContractStore, DirectoryStore, InvoiceStore, NotificationSink,
    OrderStore, ReservationStore,
};
use crate::{StorageError, StorageResult};
use adflow_types::{
    ApprovalId, ApprovalStatus, Campaign, CampaignApproval, CampaignId, Contract, ContractId,
    ContractLineItem, EntityId, EpisodeId, Invoice, InvoiceId, InvoiceItem, Notification,
    NotificationKind, Order, OrderId, OrderItem, OrderStatus, RecurringInvoiceSchedule,
    Reservation, ReservationId, ReservationItem, ReservationStatus, Role, ScheduledSpot, ShowId,
    SpotId, TalentApprovalRequest, TalentId, Task, TenantId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct TenantShard {
    campaigns: HashMap<CampaignId, Campaign>,
    spots: Vec<ScheduledSpot>,
    reservations: Vec<Reservation>,
    reservation_items: Vec<ReservationItem>,
    talent_approvals: Vec<TalentApprovalRequest>,
    campaign_approvals: Vec<CampaignApproval>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    contracts: Vec<Contract>,
    contract_line_items: Vec<ContractLineItem>,
    invoices: Vec<Invoice>,
    invoice_items: Vec<InvoiceItem>,
    recurring: HashMap<OrderId, RecurringInvoiceSchedule>,
    users: Vec<User>,
    tasks: Vec<Task>,
    notifications: Vec<Notification>,
}

/// In-memory adflow storage adapter, sharded per tenant.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    shards: RwLock<HashMap<TenantId, TenantShard>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(
        &self,
        tenant: &TenantId,
        f: impl FnOnce(&TenantShard) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let guard = self
            .shards
            .read()
            .map_err(|_| StorageError::Backend("shard lock poisoned".to_string()))?;
        match guard.get(tenant) {
            Some(shard) => f(shard),
            None => f(&TenantShard::default()),
        }
    }

    fn write<T>(
        &self,
        tenant: &TenantId,
        f: impl FnOnce(&mut TenantShard) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self
            .shards
            .write()
            .map_err(|_| StorageError::Backend("shard lock poisoned".to_string()))?;
        f(guard.entry(tenant.clone()).or_default())
    }
}

#[async_trait]
impl CampaignStore for InMemoryWorkflowStore {
    async fn upsert_campaign(&self, campaign: Campaign) -> StorageResult<()> {
        self.write(&campaign.tenant_id.clone(), |shard| {
            shard.campaigns.insert(campaign.id.clone(), campaign);
            Ok(())
        })
    }

    async fn get_campaign(&self, tenant: &TenantId, id: &CampaignId) -> StorageResult<Campaign> {
        self.read(tenant, |shard| {
            shard
                .campaigns
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(format!("campaign {id}")))
        })
    }

    async fn set_campaign_state(
        &self,
        tenant: &TenantId,
        id: &CampaignId,
        probability: u8,
        status: &str,
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            let campaign = shard
                .campaigns
                .get_mut(id)
                .ok_or_else(|| StorageError::NotFound(format!("campaign {id}")))?;
            campaign.probability = probability;
            campaign.status = status.to_string();
            campaign.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn upsert_spot(&self, spot: ScheduledSpot) -> StorageResult<()> {
        let tenant = self.read_spot_tenant(&spot)?;
        self.write(&tenant, |shard| {
            shard.spots.retain(|s| s.id != spot.id);
            shard.spots.push(spot);
            Ok(())
        })
    }

    async fn scheduled_spots(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Vec<ScheduledSpot>> {
        self.read(tenant, |shard| {
            Ok(shard
                .spots
                .iter()
                .filter(|s| &s.campaign_id == campaign)
                .cloned()
                .collect())
        })
    }

    async fn uninvoiced_delivered_spots(
        &self,
        tenant: &TenantId,
        episode: &EpisodeId,
    ) -> StorageResult<Vec<ScheduledSpot>> {
        self.read(tenant, |shard| {
            Ok(shard
                .spots
                .iter()
                .filter(|s| s.episode_id.as_ref() == Some(episode) && s.delivered && !s.invoiced)
                .cloned()
                .collect())
        })
    }

    async fn mark_spots_invoiced(
        &self,
        tenant: &TenantId,
        spot_ids: &[SpotId],
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            for spot in shard.spots.iter_mut() {
                if spot_ids.contains(&spot.id) {
                    spot.invoiced = true;
                }
            }
            Ok(())
        })
    }
}

impl InMemoryWorkflowStore {
    /// Spots don't carry a tenant id; resolve it through the campaign.
    fn read_spot_tenant(&self, spot: &ScheduledSpot) -> StorageResult<TenantId> {
        let guard = self
            .shards
            .read()
            .map_err(|_| StorageError::Backend("shard lock poisoned".to_string()))?;
        for (tenant, shard) in guard.iter() {
            if shard.campaigns.contains_key(&spot.campaign_id) {
                return Ok(tenant.clone());
            }
        }
        Err(StorageError::NotFound(format!(
            "campaign {} for spot {}",
            spot.campaign_id, spot.id
        )))
    }
}

#[async_trait]
impl ReservationStore for InMemoryWorkflowStore {
    async fn create_reservation(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> StorageResult<()> {
        self.write(&reservation.tenant_id.clone(), |shard| {
            if shard.reservations.iter().any(|r| r.id == reservation.id) {
                return Err(StorageError::Conflict(format!(
                    "reservation {} already exists",
                    reservation.id
                )));
            }
            shard.reservations.push(reservation);
            shard.reservation_items.extend(items);
            Ok(())
        })
    }

    async fn active_reservation(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Reservation>> {
        self.read(tenant, |shard| {
            Ok(shard
                .reservations
                .iter()
                .find(|r| &r.campaign_id == campaign && r.is_active(now))
                .cloned())
        })
    }

    async fn reservations_for_campaign(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Vec<Reservation>> {
        self.read(tenant, |shard| {
            Ok(shard
                .reservations
                .iter()
                .filter(|r| &r.campaign_id == campaign)
                .cloned()
                .collect())
        })
    }

    async fn set_reservation_status(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
        status: ReservationStatus,
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            let reservation = shard
                .reservations
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| StorageError::NotFound(format!("reservation {id}")))?;
            reservation.status = status;
            Ok(())
        })
    }

    async fn reservation_items(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
    ) -> StorageResult<Vec<ReservationItem>> {
        self.read(tenant, |shard| {
            Ok(shard
                .reservation_items
                .iter()
                .filter(|item| &item.reservation_id == id)
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl ApprovalStore for InMemoryWorkflowStore {
    async fn create_talent_approval(&self, request: TalentApprovalRequest) -> StorageResult<()> {
        self.write(&request.tenant_id.clone(), |shard| {
            shard.talent_approvals.push(request);
            Ok(())
        })
    }

    async fn find_open_talent_approval(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
        show: &ShowId,
        talent: &TalentId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<TalentApprovalRequest>> {
        self.read(tenant, |shard| {
            Ok(shard
                .talent_approvals
                .iter()
                .find(|r| {
                    &r.campaign_id == campaign
                        && &r.show_id == show
                        && &r.talent_id == talent
                        && r.is_open(now)
                })
                .cloned())
        })
    }

    async fn talent_approvals_for_campaign(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Vec<TalentApprovalRequest>> {
        self.read(tenant, |shard| {
            Ok(shard
                .talent_approvals
                .iter()
                .filter(|r| &r.campaign_id == campaign)
                .cloned()
                .collect())
        })
    }

    async fn set_talent_approval_status(
        &self,
        tenant: &TenantId,
        id: &ApprovalId,
        status: ApprovalStatus,
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            let request = shard
                .talent_approvals
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| StorageError::NotFound(format!("talent approval {id}")))?;
            request.status = status;
            Ok(())
        })
    }

    async fn create_campaign_approval(&self, approval: CampaignApproval) -> StorageResult<()> {
        self.write(&approval.tenant_id.clone(), |shard| {
            shard.campaign_approvals.push(approval);
            Ok(())
        })
    }

    async fn pending_campaign_approval(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Option<CampaignApproval>> {
        self.read(tenant, |shard| {
            Ok(shard
                .campaign_approvals
                .iter()
                .find(|a| &a.campaign_id == campaign && a.status == ApprovalStatus::Pending)
                .cloned())
        })
    }

    async fn latest_campaign_approval(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Option<CampaignApproval>> {
        self.read(tenant, |shard| {
            Ok(shard
                .campaign_approvals
                .iter()
                .filter(|a| &a.campaign_id == campaign)
                .max_by_key(|a| a.requested_at)
                .cloned())
        })
    }

    async fn set_campaign_approval_status(
        &self,
        tenant: &TenantId,
        id: &ApprovalId,
        status: ApprovalStatus,
        resolved_by: &UserId,
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            let approval = shard
                .campaign_approvals
                .iter_mut()
                .find(|a| &a.id == id)
                .ok_or_else(|| StorageError::NotFound(format!("campaign approval {id}")))?;
            approval.status = status;
            approval.resolved_at = Some(Utc::now());
            approval.resolved_by = Some(resolved_by.clone());
            Ok(())
        })
    }
}

#[async_trait]
impl OrderStore for InMemoryWorkflowStore {
    async fn create_order(&self, order: Order, items: Vec<OrderItem>) -> StorageResult<()> {
        self.write(&order.tenant_id.clone(), |shard| {
            if shard.orders.iter().any(|o| o.id == order.id) {
                return Err(StorageError::Conflict(format!(
                    "order {} already exists",
                    order.id
                )));
            }
            shard.orders.push(order);
            shard.order_items.extend(items);
            Ok(())
        })
    }

    async fn get_order(&self, tenant: &TenantId, id: &OrderId) -> StorageResult<Order> {
        self.read(tenant, |shard| {
            shard
                .orders
                .iter()
                .find(|o| &o.id == id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(format!("order {id}")))
        })
    }

    async fn order_for_campaign(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Option<Order>> {
        self.read(tenant, |shard| {
            Ok(shard
                .orders
                .iter()
                .find(|o| &o.campaign_id == campaign && o.status != OrderStatus::Cancelled)
                .cloned())
        })
    }

    async fn set_order_status(
        &self,
        tenant: &TenantId,
        id: &OrderId,
        status: OrderStatus,
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            let order = shard
                .orders
                .iter_mut()
                .find(|o| &o.id == id)
                .ok_or_else(|| StorageError::NotFound(format!("order {id}")))?;
            order.status = status;
            order.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn order_items(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Vec<OrderItem>> {
        self.read(tenant, |shard| {
            Ok(shard
                .order_items
                .iter()
                .filter(|item| &item.order_id == order)
                .cloned()
                .collect())
        })
    }

    async fn mark_order_items_invoiced(
        &self,
        tenant: &TenantId,
        item_ids: &[String],
    ) -> StorageResult<()> {
        self.write(tenant, |shard| {
            for item in shard.order_items.iter_mut() {
                if item_ids.contains(&item.id) {
                    item.invoiced = true;
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl ContractStore for InMemoryWorkflowStore {
    async fn create_contract(
        &self,
        contract: Contract,
        line_items: Vec<ContractLineItem>,
    ) -> StorageResult<()> {
        let total: i64 = line_items.iter().map(|li| li.amount).sum();
        if total != contract.total_amount {
            return Err(StorageError::InvariantViolation(format!(
                "contract {} total {} != line item sum {}",
                contract.id, contract.total_amount, total
            )));
        }
        self.write(&contract.tenant_id.clone(), |shard| {
            shard.contracts.push(contract);
            shard.contract_line_items.extend(line_items);
            Ok(())
        })
    }

    async fn contract_for_order(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Option<Contract>> {
        self.read(tenant, |shard| {
            Ok(shard
                .contracts
                .iter()
                .find(|c| &c.order_id == order)
                .cloned())
        })
    }

    async fn contract_line_items(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
    ) -> StorageResult<Vec<ContractLineItem>> {
        self.read(tenant, |shard| {
            Ok(shard
                .contract_line_items
                .iter()
                .filter(|li| &li.contract_id == contract)
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl InvoiceStore for InMemoryWorkflowStore {
    async fn create_invoice(&self, invoice: Invoice, items: Vec<InvoiceItem>) -> StorageResult<()> {
        let total: i64 = items.iter().map(|i| i.amount).sum();
        if total != invoice.total_amount {
            return Err(StorageError::InvariantViolation(format!(
                "invoice {} total {} != item sum {}",
                invoice.number, invoice.total_amount, total
            )));
        }
        self.write(&invoice.tenant_id.clone(), |shard| {
            if shard.invoices.iter().any(|i| i.number == invoice.number) {
                return Err(StorageError::Conflict(format!(
                    "invoice number {} already issued",
                    invoice.number
                )));
            }
            shard.invoices.push(invoice);
            shard.invoice_items.extend(items);
            Ok(())
        })
    }

    async fn invoice_numbers(&self, tenant: &TenantId, prefix: &str) -> StorageResult<Vec<String>> {
        self.read(tenant, |shard| {
            Ok(shard
                .invoices
                .iter()
                .filter(|i| i.number.starts_with(prefix))
                .map(|i| i.number.clone())
                .collect())
        })
    }

    async fn invoices_for_order(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Vec<Invoice>> {
        self.read(tenant, |shard| {
            Ok(shard
                .invoices
                .iter()
                .filter(|i| i.order_id.as_ref() == Some(order))
                .cloned()
                .collect())
        })
    }

    async fn invoice_items(
        &self,
        tenant: &TenantId,
        invoice: &InvoiceId,
    ) -> StorageResult<Vec<InvoiceItem>> {
        self.read(tenant, |shard| {
            Ok(shard
                .invoice_items
                .iter()
                .filter(|item| &item.invoice_id == invoice)
                .cloned()
                .collect())
        })
    }

    async fn upsert_recurring_schedule(
        &self,
        schedule: RecurringInvoiceSchedule,
    ) -> StorageResult<()> {
        self.write(&schedule.tenant_id.clone(), |shard| {
            shard.recurring.insert(schedule.order_id.clone(), schedule);
            Ok(())
        })
    }

    async fn recurring_schedule_for_order(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Option<RecurringInvoiceSchedule>> {
        self.read(tenant, |shard| Ok(shard.recurring.get(order).cloned()))
    }

    async fn due_recurring_schedules(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<RecurringInvoiceSchedule>> {
        self.read(tenant, |shard| {
            Ok(shard
                .recurring
                .values()
                .filter(|s| s.is_due(now))
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl DirectoryStore for InMemoryWorkflowStore {
    async fn upsert_user(&self, user: User) -> StorageResult<()> {
        self.write(&user.tenant_id.clone(), |shard| {
            shard.users.retain(|u| u.id != user.id);
            shard.users.push(user);
            Ok(())
        })
    }

    async fn users_with_role(&self, tenant: &TenantId, role: Role) -> StorageResult<Vec<User>> {
        self.read(tenant, |shard| {
            Ok(shard
                .users
                .iter()
                .filter(|u| u.role == role)
                .cloned()
                .collect())
        })
    }

    async fn create_task(&self, task: Task) -> StorageResult<()> {
        self.write(&task.tenant_id.clone(), |shard| {
            shard.tasks.push(task);
            Ok(())
        })
    }

    async fn tasks_for_user(&self, tenant: &TenantId, user: &UserId) -> StorageResult<Vec<Task>> {
        self.read(tenant, |shard| {
            Ok(shard
                .tasks
                .iter()
                .filter(|t| &t.assignee_id == user)
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl NotificationSink for InMemoryWorkflowStore {
    async fn create_notification(&self, notification: Notification) -> StorageResult<()> {
        self.write(&notification.tenant_id.clone(), |shard| {
            shard.notifications.push(notification);
            Ok(())
        })
    }

    async fn clear_entity_notifications(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
        kind: NotificationKind,
    ) -> StorageResult<u64> {
        self.write(tenant, |shard| {
            let before = shard.notifications.len();
            shard
                .notifications
                .retain(|n| !(n.entity_id.as_ref() == Some(entity) && n.kind == kind));
            Ok((before - shard.notifications.len()) as u64)
        })
    }

    async fn notifications_for_user(
        &self,
        tenant: &TenantId,
        user: &UserId,
    ) -> StorageResult<Vec<Notification>> {
        self.read(tenant, |shard| {
            Ok(shard
                .notifications
                .iter()
                .filter(|n| &n.user_id == user)
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adflow_types::{AdvertiserId, Placement, SpotType};

    fn campaign(tenant: &str) -> Campaign {
        Campaign::new(
            TenantId::new(tenant),
            "Test Campaign",
            AdvertiserId::new("adv-1"),
            UserId::new("u1"),
            1_000_00,
        )
    }

    #[tokio::test]
    async fn test_campaign_round_trip() {
        let store = InMemoryWorkflowStore::new();
        let c = campaign("acme");
        let id = c.id.clone();
        store.upsert_campaign(c).await.unwrap();

        let fetched = store.get_campaign(&TenantId::new("acme"), &id).await.unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let store = InMemoryWorkflowStore::new();
        let c = campaign("acme");
        let id = c.id.clone();
        store.upsert_campaign(c).await.unwrap();

        let other = store.get_campaign(&TenantId::new("globex"), &id).await;
        assert!(matches!(other, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_campaign_state() {
        let store = InMemoryWorkflowStore::new();
        let c = campaign("acme");
        let id = c.id.clone();
        store.upsert_campaign(c).await.unwrap();

        store
            .set_campaign_state(&TenantId::new("acme"), &id, 35, "schedule_valid")
            .await
            .unwrap();
        let fetched = store.get_campaign(&TenantId::new("acme"), &id).await.unwrap();
        assert_eq!(fetched.probability, 35);
        assert_eq!(fetched.status, "schedule_valid");
    }

    #[tokio::test]
    async fn test_invoice_conservation_enforced() {
        let store = InMemoryWorkflowStore::new();
        let invoice = Invoice {
            id: InvoiceId::generate(),
            tenant_id: TenantId::new("acme"),
            number: "INV-202608-0001".to_string(),
            order_id: None,
            campaign_id: None,
            advertiser_id: AdvertiserId::new("adv-1"),
            status: adflow_types::InvoiceStatus::Draft,
            issue_date: Utc::now(),
            due_date: Utc::now(),
            total_amount: 100_00,
            pre_billed: false,
            created_at: Utc::now(),
        };
        let items = vec![InvoiceItem {
            id: "item-1".to_string(),
            invoice_id: invoice.id.clone(),
            order_item_id: None,
            spot_id: None,
            description: "spot".to_string(),
            amount: 90_00, // does not sum to the total
        }];
        let result = store.create_invoice(invoice, items).await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_conflicts() {
        let store = InMemoryWorkflowStore::new();
        let make = |number: &str| Invoice {
            id: InvoiceId::generate(),
            tenant_id: TenantId::new("acme"),
            number: number.to_string(),
            order_id: None,
            campaign_id: None,
            advertiser_id: AdvertiserId::new("adv-1"),
            status: adflow_types::InvoiceStatus::Draft,
            issue_date: Utc::now(),
            due_date: Utc::now(),
            total_amount: 0,
            pre_billed: false,
            created_at: Utc::now(),
        };
        store.create_invoice(make("INV-202608-0001"), vec![]).await.unwrap();
        let dup = store.create_invoice(make("INV-202608-0001"), vec![]).await;
        assert!(matches!(dup, Err(StorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_clear_entity_notifications() {
        let store = InMemoryWorkflowStore::new();
        let tenant = TenantId::new("acme");
        let entity = EntityId::new("c1");
        let n = Notification::new(
            tenant.clone(),
            UserId::new("admin-1"),
            "Approval needed",
            "",
            NotificationKind::Approval,
        )
        .about(entity.clone());
        store.create_notification(n).await.unwrap();

        let cleared = store
            .clear_entity_notifications(&tenant, &entity, NotificationKind::Approval)
            .await
            .unwrap();
        assert_eq!(cleared, 1);
        let remaining = store
            .notifications_for_user(&tenant, &UserId::new("admin-1"))
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_latest_campaign_approval_sees_resolved_records() {
        let store = InMemoryWorkflowStore::new();
        let tenant = TenantId::new("acme");
        let c = campaign("acme");
        let campaign_id = c.id.clone();
        store.upsert_campaign(c).await.unwrap();

        let mut earlier = CampaignApproval::new(
            tenant.clone(),
            campaign_id.clone(),
            vec![Role::Admin],
            UserId::new("u1"),
            0.0,
        );
        earlier.requested_at = Utc::now() - chrono::Duration::days(2);
        earlier.status = ApprovalStatus::Denied;
        store.create_campaign_approval(earlier).await.unwrap();

        let recent = CampaignApproval::new(
            tenant.clone(),
            campaign_id.clone(),
            vec![Role::Admin],
            UserId::new("u1"),
            0.0,
        );
        let recent_id = recent.id.clone();
        store.create_campaign_approval(recent).await.unwrap();
        store
            .set_campaign_approval_status(
                &tenant,
                &recent_id,
                ApprovalStatus::Approved,
                &UserId::new("admin-1"),
            )
            .await
            .unwrap();

        // Resolved approvals stay visible here even though the pending
        // probe no longer returns them.
        assert!(store
            .pending_campaign_approval(&tenant, &campaign_id)
            .await
            .unwrap()
            .is_none());
        let latest = store
            .latest_campaign_approval(&tenant, &campaign_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, recent_id);
        assert_eq!(latest.status, ApprovalStatus::Approved);
    }

    #[tokio::test]
    async fn test_spot_requires_known_campaign() {
        let store = InMemoryWorkflowStore::new();
        let spot = ScheduledSpot::new(
            CampaignId::new("ghost"),
            ShowId::new("show-a"),
            Utc::now(),
            Placement::MidRoll,
            SpotType::Produced,
            100_00,
            100_00,
        );
        assert!(matches!(
            store.upsert_spot(spot).await,
            Err(StorageError::NotFound(_))
        ));
    }
}
