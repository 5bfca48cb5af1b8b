use crate::StorageResult;
use adflow_types::{
    ApprovalId, ApprovalStatus, Campaign, CampaignApproval, CampaignId, Contract, ContractId,
    ContractLineItem, EntityId, EpisodeId, Invoice, InvoiceId, InvoiceItem, Notification,
    NotificationKind, Order, OrderId, OrderItem, OrderStatus, RecurringInvoiceSchedule,
    Reservation, ReservationId, ReservationItem, ReservationStatus, Role, ScheduledSpot, ShowId,
    SpotId, TalentApprovalRequest, TalentId, Task, TenantId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage interface for campaigns and their scheduled spots.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn upsert_campaign(&self, campaign: Campaign) -> StorageResult<()>;

    async fn get_campaign(&self, tenant: &TenantId, id: &CampaignId) -> StorageResult<Campaign>;

    /// Persist probability and its status projection together — the
    /// status label is never mutated independently of probability.
    async fn set_campaign_state(
        &self,
        tenant: &TenantId,
        id: &CampaignId,
        probability: u8,
        status: &str,
    ) -> StorageResult<()>;

    async fn upsert_spot(&self, spot: ScheduledSpot) -> StorageResult<()>;

    async fn scheduled_spots(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Vec<ScheduledSpot>>;

    /// Delivered spots on an episode that have not yet been invoiced.
    async fn uninvoiced_delivered_spots(
        &self,
        tenant: &TenantId,
        episode: &EpisodeId,
    ) -> StorageResult<Vec<ScheduledSpot>>;

    /// Mark spots as invoiced so they never appear on another invoice.
    async fn mark_spots_invoiced(
        &self,
        tenant: &TenantId,
        spot_ids: &[SpotId],
    ) -> StorageResult<()>;
}

/// Storage interface for inventory reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn create_reservation(
        &self,
        reservation: Reservation,
        items: Vec<ReservationItem>,
    ) -> StorageResult<()>;

    /// The campaign's held, unexpired reservation — the idempotency
    /// probe for the create-reservation executor.
    async fn active_reservation(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Reservation>>;

    async fn reservations_for_campaign(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Vec<Reservation>>;

    async fn set_reservation_status(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
        status: ReservationStatus,
    ) -> StorageResult<()>;

    async fn reservation_items(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
    ) -> StorageResult<Vec<ReservationItem>>;
}

/// Storage interface for talent and campaign approvals.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn create_talent_approval(&self, request: TalentApprovalRequest) -> StorageResult<()>;

    /// An unexpired pending/approved request for the natural key
    /// (campaign, show, talent) — the idempotency probe for the
    /// create-talent-approval executor.
    async fn find_open_talent_approval(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
        show: &ShowId,
        talent: &TalentId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<TalentApprovalRequest>>;

    async fn talent_approvals_for_campaign(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Vec<TalentApprovalRequest>>;

    async fn set_talent_approval_status(
        &self,
        tenant: &TenantId,
        id: &ApprovalId,
        status: ApprovalStatus,
    ) -> StorageResult<()>;

    async fn create_campaign_approval(&self, approval: CampaignApproval) -> StorageResult<()>;

    async fn pending_campaign_approval(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Option<CampaignApproval>>;

    /// The campaign's most recent approval record regardless of status,
    /// consulted by the booking gate.
    async fn latest_campaign_approval(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Option<CampaignApproval>>;

    async fn set_campaign_approval_status(
        &self,
        tenant: &TenantId,
        id: &ApprovalId,
        status: ApprovalStatus,
        resolved_by: &UserId,
    ) -> StorageResult<()>;
}

/// Storage interface for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: Order, items: Vec<OrderItem>) -> StorageResult<()>;

    async fn get_order(&self, tenant: &TenantId, id: &OrderId) -> StorageResult<Order>;

    /// The campaign's existing order — the idempotency probe for the
    /// create-order executor.
    async fn order_for_campaign(
        &self,
        tenant: &TenantId,
        campaign: &CampaignId,
    ) -> StorageResult<Option<Order>>;

    async fn set_order_status(
        &self,
        tenant: &TenantId,
        id: &OrderId,
        status: OrderStatus,
    ) -> StorageResult<()>;

    async fn order_items(&self, tenant: &TenantId, order: &OrderId)
        -> StorageResult<Vec<OrderItem>>;

    async fn mark_order_items_invoiced(
        &self,
        tenant: &TenantId,
        item_ids: &[String],
    ) -> StorageResult<()>;
}

/// Storage interface for contracts.
#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn create_contract(
        &self,
        contract: Contract,
        line_items: Vec<ContractLineItem>,
    ) -> StorageResult<()>;

    /// The order's existing contract — the idempotency probe for the
    /// create-contract executor.
    async fn contract_for_order(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Option<Contract>>;

    async fn contract_line_items(
        &self,
        tenant: &TenantId,
        contract: &ContractId,
    ) -> StorageResult<Vec<ContractLineItem>>;
}

/// Storage interface for invoices and recurring schedules.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn create_invoice(&self, invoice: Invoice, items: Vec<InvoiceItem>) -> StorageResult<()>;

    /// All invoice numbers issued under a prefix, for sequence scans.
    async fn invoice_numbers(&self, tenant: &TenantId, prefix: &str) -> StorageResult<Vec<String>>;

    async fn invoices_for_order(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Vec<Invoice>>;

    async fn invoice_items(
        &self,
        tenant: &TenantId,
        invoice: &InvoiceId,
    ) -> StorageResult<Vec<InvoiceItem>>;

    async fn upsert_recurring_schedule(
        &self,
        schedule: RecurringInvoiceSchedule,
    ) -> StorageResult<()>;

    async fn recurring_schedule_for_order(
        &self,
        tenant: &TenantId,
        order: &OrderId,
    ) -> StorageResult<Option<RecurringInvoiceSchedule>>;

    async fn due_recurring_schedules(
        &self,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<RecurringInvoiceSchedule>>;
}

/// Storage interface for the tenant user directory and tasks.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn upsert_user(&self, user: User) -> StorageResult<()>;

    async fn users_with_role(&self, tenant: &TenantId, role: Role) -> StorageResult<Vec<User>>;

    async fn create_task(&self, task: Task) -> StorageResult<()>;

    async fn tasks_for_user(&self, tenant: &TenantId, user: &UserId) -> StorageResult<Vec<Task>>;
}

/// Fire-and-forget notification sink.
///
/// Callers never fail a workflow on sink errors; the engine logs and
/// moves on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create_notification(&self, notification: Notification) -> StorageResult<()>;

    /// Remove pending notifications of a kind about an entity, used
    /// when rejection clears outstanding approval notifications.
    /// Returns how many were cleared.
    async fn clear_entity_notifications(
        &self,
        tenant: &TenantId,
        entity: &EntityId,
        kind: NotificationKind,
    ) -> StorageResult<u64>;

    async fn notifications_for_user(
        &self,
        tenant: &TenantId,
        user: &UserId,
    ) -> StorageResult<Vec<Notification>>;
}

/// Unified storage bundle the workflow evaluator runs against.
pub trait WorkflowStorage:
    CampaignStore
    + ReservationStore
    + ApprovalStore
    + OrderStore
    + ContractStore
    + InvoiceStore
    + DirectoryStore
    + NotificationSink
    + Send
    + Sync
{
}

impl<T> WorkflowStorage for T where
    T: CampaignStore
        + ReservationStore
        + ApprovalStore
        + OrderStore
        + ContractStore
        + InvoiceStore
        + DirectoryStore
        + NotificationSink
        + Send
        + Sync
{
}
