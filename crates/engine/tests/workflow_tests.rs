//! End-to-end workflow engine tests against the in-memory store.

use adflow_config::{ConfigRegistry, Milestone, TenantConfig};
use adflow_engine::{RuleSet, WorkflowError, WorkflowEvaluator};
use adflow_storage::{
    ApprovalStore, CampaignStore, ContractStore, DirectoryStore, InMemoryWorkflowStore,
    InvoiceStore, NotificationSink, OrderStore, ReservationStore,
};
use adflow_types::{
    AdvertiserId, ApprovalStatus, AutomationRule, Campaign, EntityId, EntityType,
    NotificationAudience, NotificationKind, Order, Placement, ReservationStatus, Role, RuleTrigger,
    ScheduledSpot, ShowId, SpotType, TalentApprovalRequest, TalentApprovalSummary, TalentId,
    TenantId, User, UserId, WorkflowAction, WorkflowContext,
};
use chrono::Utc;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn tenant() -> TenantId {
    TenantId::new("acme")
}

fn evaluator(
    store: Arc<InMemoryWorkflowStore>,
    configs: ConfigRegistry,
) -> WorkflowEvaluator<InMemoryWorkflowStore> {
    WorkflowEvaluator::new(store, configs, RuleSet::campaign_defaults())
}

async fn seed_campaign(store: &InMemoryWorkflowStore, probability: u8) -> Campaign {
    let campaign = Campaign::new(
        tenant(),
        "Q3 Push",
        AdvertiserId::new("adv-1"),
        UserId::new("owner-1"),
        1_000_000,
    )
    .with_probability(probability);
    store.upsert_campaign(campaign.clone()).await.unwrap();
    campaign
}

async fn seed_admin(store: &InMemoryWorkflowStore) -> User {
    let admin = User {
        id: UserId::new("admin-1"),
        tenant_id: tenant(),
        name: "Ada Admin".to_string(),
        role: Role::Admin,
    };
    store.upsert_user(admin.clone()).await.unwrap();
    admin
}

async fn seed_host_read_spot(
    store: &InMemoryWorkflowStore,
    campaign: &Campaign,
    show: &str,
    talent: &str,
    negotiated: i64,
    rate_card: i64,
) -> ScheduledSpot {
    let spot = ScheduledSpot::new(
        campaign.id.clone(),
        ShowId::new(show),
        Utc::now() + chrono::Duration::days(30),
        Placement::MidRoll,
        SpotType::HostRead,
        negotiated,
        rate_card,
    )
    .with_talent(TalentId::new(talent));
    store.upsert_spot(spot.clone()).await.unwrap();
    spot
}

fn transition(campaign: &Campaign, actor: &str, role: Role, old: u8, new: u8) -> WorkflowContext {
    WorkflowContext::new(
        EntityId::new(campaign.id.as_str()),
        EntityType::Campaign,
        tenant(),
        UserId::new(actor),
        role,
    )
    .with_probabilities(old, new)
}

#[tokio::test]
async fn test_end_to_end_0_to_92() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;
    let admin = seed_admin(&store).await;
    // Two host-read spots for the same talent on different shows, each
    // 10% under rate card.
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 90_00, 100_00).await;
    seed_host_read_spot(&store, &campaign, "show-b", "talent-1", 90_00, 100_00).await;

    let engine = evaluator(store.clone(), ConfigRegistry::new());
    let report = engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 0, 92))
        .await
        .unwrap();

    // Milestones in numeric order, reservation before admin approval.
    assert_eq!(
        report.crossed,
        vec![
            Milestone::PreSaleActive,
            Milestone::ScheduleValid,
            Milestone::TalentApproval,
            Milestone::AutoReserve,
            Milestone::AdminApproval,
        ]
    );
    assert!(report.failed.is_empty());

    // One talent approval per (show, talent) pair.
    let approvals = store
        .talent_approvals_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 2);
    let shows: Vec<&str> = approvals.iter().map(|a| a.show_id.as_str()).collect();
    assert!(shows.contains(&"show-a") && shows.contains(&"show-b"));

    // One held reservation with one item per spot.
    let reservation = store
        .active_reservation(&tenant(), &campaign.id, Utc::now())
        .await
        .unwrap()
        .expect("reservation should be held");
    assert_eq!(reservation.total_amount, 180_00);
    // budget 1_000_000 at the 90% auto-reserve threshold
    assert_eq!(reservation.estimated_revenue, 900_000);
    let items = store
        .reservation_items(&tenant(), &reservation.id)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);

    // One pending campaign approval carrying the rate-card variance.
    let approval = store
        .pending_campaign_approval(&tenant(), &campaign.id)
        .await
        .unwrap()
        .expect("campaign approval should be pending");
    assert!((approval.rate_card_variance_pct - 10.0).abs() < 1e-9);

    // The admin notification carries the variance too.
    let admin_notifications = store
        .notifications_for_user(&tenant(), &admin.id)
        .await
        .unwrap();
    let approval_note = admin_notifications
        .iter()
        .find(|n| n.title.contains("approval"))
        .expect("admin should be notified");
    assert_eq!(
        approval_note.metadata.get("rate_card_variance_pct").unwrap(),
        10.0
    );

    // Committed state: probability and its projection together.
    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.probability, 92);
    assert_eq!(stored.status, "admin_approval");
}

#[tokio::test]
async fn test_edge_triggering_fires_nothing_twice() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    let first = engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 0, 15))
        .await
        .unwrap();
    assert_eq!(first.crossed, vec![Milestone::PreSaleActive]);

    // Same bracket, already past 10: nothing re-fires.
    let second = engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 15, 18))
        .await
        .unwrap();
    assert!(second.crossed.is_empty());
    assert!(second.executed.is_empty());

    // No change at all.
    let third = engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 18, 18))
        .await
        .unwrap();
    assert!(third.crossed.is_empty());

    // The owner was notified exactly once.
    let notes = store
        .notifications_for_user(&tenant(), &UserId::new("owner-1"))
        .await
        .unwrap();
    assert_eq!(
        notes
            .iter()
            .filter(|n| n.title == "Schedule builder unlocked")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_talent_approval_idempotent_across_refires() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 60).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 100_00, 100_00).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 60, 70))
        .await
        .unwrap();
    // A stale caller re-reports the same crossing.
    let second = engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 60, 70))
        .await
        .unwrap();

    let approvals = store
        .talent_approvals_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert!(second.skipped.contains(&"create_talent_approval"));
}

#[tokio::test]
async fn test_concurrent_updates_create_one_request_set() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 60).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 100_00, 100_00).await;
    let engine = Arc::new(evaluator(store.clone(), ConfigRegistry::new()));

    // Both updates observe the same stale "not yet crossed" state; the
    // per-entity lock serializes them and the existence probe makes the
    // second a no-op.
    let (a, b) = tokio::join!(
        engine.evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 60, 70)),
        engine.evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 60, 70)),
    );
    a.unwrap();
    b.unwrap();

    let approvals = store
        .talent_approvals_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
}

#[tokio::test]
async fn test_admin_approval_role_gate() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 80).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 100_00, 100_00).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    let denied = engine
        .evaluate_transition(transition(&campaign, "sales-1", Role::Sales, 80, 92))
        .await;
    assert!(matches!(denied, Err(WorkflowError::TransitionDenied(_))));

    // Nothing was committed.
    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.probability, 80);

    engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 80, 92))
        .await
        .unwrap();
    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.probability, 92);
}

#[tokio::test]
async fn test_denied_talent_approval_gate_and_override() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 80).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 100_00, 100_00).await;

    let mut denied = TalentApprovalRequest::new(
        tenant(),
        campaign.id.clone(),
        ShowId::new("show-a"),
        TalentId::new("talent-1"),
        SpotType::HostRead,
        TalentApprovalSummary::default(),
    );
    denied.status = ApprovalStatus::Denied;
    store.create_talent_approval(denied).await.unwrap();

    // Let sales through the role gate so the precondition itself is
    // what blocks.
    let mut registry = ConfigRegistry::new();
    let mut config = TenantConfig::default();
    config.approval_roles = vec![Role::Admin, Role::Master, Role::Sales];
    registry.set_override(tenant(), config).unwrap();
    let engine = evaluator(store.clone(), registry);

    let blocked = engine
        .evaluate_transition(transition(&campaign, "sales-1", Role::Sales, 80, 92))
        .await;
    assert!(matches!(
        blocked,
        Err(WorkflowError::PreconditionViolation(_))
    ));

    // Admin overrides the denial and still gets a reservation plus an
    // admin approval.
    engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 80, 92))
        .await
        .unwrap();
    assert!(store
        .active_reservation(&tenant(), &campaign.id, Utc::now())
        .await
        .unwrap()
        .is_some());
    assert!(store
        .pending_campaign_approval(&tenant(), &campaign.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_fatal_reservation_failure_fails_transition() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    // No scheduled spots: reservation creation has nothing to hold.
    let campaign = seed_campaign(&store, 80).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    let result = engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 80, 92))
        .await;
    assert!(matches!(
        result,
        Err(WorkflowError::FatalAction {
            action: "create_reservation",
            ..
        })
    ));

    // The campaign is not left approved-but-unreserved.
    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.probability, 80);
}

#[tokio::test]
async fn test_booking_at_100_conserves_totals_and_confirms_reservation() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;
    seed_admin(&store).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 90_00, 100_00).await;
    seed_host_read_spot(&store, &campaign, "show-b", "talent-1", 110_00, 100_00).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 0, 92))
        .await
        .unwrap();
    let report = engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 92, 100))
        .await
        .unwrap();
    assert_eq!(report.crossed, vec![Milestone::OrderCreation]);
    assert!(report.failed.is_empty());

    let order = store
        .order_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap()
        .expect("order should exist");
    assert_eq!(order.total_amount, 200_00);

    // Contract line items sum exactly to the order total.
    let contract = store
        .contract_for_order(&tenant(), &order.id)
        .await
        .unwrap()
        .expect("contract should exist");
    let line_items = store
        .contract_line_items(&tenant(), &contract.id)
        .await
        .unwrap();
    let line_sum: i64 = line_items.iter().map(|li| li.amount).sum();
    assert_eq!(contract.total_amount, line_sum);
    assert_eq!(contract.total_amount, order.total_amount);

    // One invoice whose items sum to its total.
    let invoices = store.invoices_for_order(&tenant(), &order.id).await.unwrap();
    assert_eq!(invoices.len(), 1);
    let invoice_items = store
        .invoice_items(&tenant(), &invoices[0].id)
        .await
        .unwrap();
    let item_sum: i64 = invoice_items.iter().map(|i| i.amount).sum();
    assert_eq!(invoices[0].total_amount, item_sum);
    assert_eq!(invoices[0].total_amount, order.total_amount);

    // The hold became a confirmed reservation.
    let reservations = store
        .reservations_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].status, ReservationStatus::Confirmed);

    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.status, "booked");
}

#[tokio::test]
async fn test_booking_blocked_until_campaign_approval_granted() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;
    seed_admin(&store).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 100_00, 100_00).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    // The 0 -> 92 run leaves a pending campaign approval behind.
    engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 0, 92))
        .await
        .unwrap();
    let approval = store
        .pending_campaign_approval(&tenant(), &campaign.id)
        .await
        .unwrap()
        .expect("campaign approval should be pending");

    // Sales cannot book past the unresolved approval.
    let blocked = engine
        .evaluate_transition(transition(&campaign, "sales-1", Role::Sales, 92, 100))
        .await;
    assert!(matches!(
        blocked,
        Err(WorkflowError::PreconditionViolation(_))
    ));
    assert!(store
        .order_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap()
        .is_none());
    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.probability, 92);

    // Once granted, the same actor books normally.
    store
        .set_campaign_approval_status(
            &tenant(),
            &approval.id,
            ApprovalStatus::Approved,
            &UserId::new("admin-1"),
        )
        .await
        .unwrap();
    engine
        .evaluate_transition(transition(&campaign, "sales-1", Role::Sales, 92, 100))
        .await
        .unwrap();
    assert!(store
        .order_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap()
        .is_some());
    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.status, "booked");
}

#[tokio::test]
async fn test_order_owner_notification_resolves_through_campaign() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 100).await;
    let order = Order::new(
        tenant(),
        campaign.id.clone(),
        campaign.advertiser_id.clone(),
        None,
        100_00,
    );
    store.create_order(order.clone(), Vec::new()).await.unwrap();

    let rules = RuleSet::new().with_rule(
        AutomationRule::new(
            "order confirmed notice",
            RuleTrigger::new(EntityType::Order, "confirmed"),
        )
        .with_action(WorkflowAction::SendNotification {
            audience: NotificationAudience::EntityOwner,
            title: "Order confirmed".into(),
            message: "The order was confirmed by the network.".into(),
            kind: NotificationKind::Workflow,
        }),
    );
    let engine = WorkflowEvaluator::new(store.clone(), ConfigRegistry::new(), rules);

    let ctx = WorkflowContext::new(
        EntityId::new(order.id.as_str()),
        EntityType::Order,
        tenant(),
        UserId::new("admin-1"),
        Role::Admin,
    )
    .with_states("booked", "confirmed");
    let report = engine.evaluate_transition(ctx).await.unwrap();
    assert_eq!(report.executed, vec!["send_notification"]);

    // The recipient is the owning campaign's owner, not a campaign
    // record looked up under the order id.
    let owner_notes = store
        .notifications_for_user(&tenant(), &UserId::new("owner-1"))
        .await
        .unwrap();
    assert!(owner_notes.iter().any(|n| n.title == "Order confirmed"));
}

#[tokio::test]
async fn test_rejection_rollback() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;
    let admin = seed_admin(&store).await;
    seed_host_read_spot(&store, &campaign, "show-a", "talent-1", 90_00, 100_00).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    engine
        .evaluate_transition(transition(&campaign, "admin-1", Role::Admin, 0, 92))
        .await
        .unwrap();

    // Rejection is role-gated too.
    let denied = engine
        .reject_campaign(transition(&campaign, "sales-1", Role::Sales, 92, 92))
        .await;
    assert!(matches!(denied, Err(WorkflowError::TransitionDenied(_))));

    let report = engine
        .reject_campaign(transition(&campaign, "admin-1", Role::Admin, 92, 92))
        .await
        .unwrap();
    assert_eq!(report.reservations_released, 1);
    assert_eq!(report.approvals_denied, 1);
    assert!(report.notifications_cleared >= 1);
    assert_eq!(report.fallback_probability, 65);

    // No reservation is active any more.
    assert!(store
        .active_reservation(&tenant(), &campaign.id, Utc::now())
        .await
        .unwrap()
        .is_none());
    let reservations = store
        .reservations_for_campaign(&tenant(), &campaign.id)
        .await
        .unwrap();
    assert!(reservations
        .iter()
        .all(|r| r.status == ReservationStatus::Released));

    // Pending approval notifications for the campaign are gone.
    let admin_notes = store
        .notifications_for_user(&tenant(), &admin.id)
        .await
        .unwrap();
    let campaign_entity = EntityId::new(campaign.id.as_str());
    assert!(admin_notes
        .iter()
        .all(|n| n.entity_id.as_ref() != Some(&campaign_entity)
            || n.kind != adflow_types::NotificationKind::Approval));

    let stored = store.get_campaign(&tenant(), &campaign.id).await.unwrap();
    assert_eq!(stored.probability, 65);
    assert_eq!(stored.status, "rejected");
}

#[tokio::test]
async fn test_tenant_threshold_override_changes_crossings() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;

    let mut registry = ConfigRegistry::new();
    let mut config = TenantConfig::default();
    config.schedule = adflow_config::MilestoneSchedule::from_raw(adflow_config::RawSchedule {
        pre_sale_active: 20,
        schedule_valid: 40,
        talent_approval: 60,
        admin_approval: 85,
        auto_reserve: 85,
        order_creation: 100,
        rejection_fallback: 60,
    })
    .unwrap();
    registry.set_override(tenant(), config).unwrap();
    let engine = evaluator(store.clone(), registry);

    // 0 -> 15 crosses nothing under the raised pre-sale threshold.
    let report = engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 0, 15))
        .await
        .unwrap();
    assert!(report.crossed.is_empty());

    let report = engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 15, 20))
        .await
        .unwrap();
    assert_eq!(report.crossed, vec![Milestone::PreSaleActive]);
}

#[tokio::test]
async fn test_telemetry_tracks_transitions() {
    init_tracing();
    let store = Arc::new(InMemoryWorkflowStore::new());
    let campaign = seed_campaign(&store, 0).await;
    let engine = evaluator(store.clone(), ConfigRegistry::new());

    engine
        .evaluate_transition(transition(&campaign, "owner-1", Role::Sales, 0, 15))
        .await
        .unwrap();
    // A sales actor bouncing off the admin gate is a failed workflow.
    let _ = engine
        .evaluate_transition(transition(&campaign, "sales-1", Role::Sales, 15, 92))
        .await;

    let metrics = engine
        .telemetry()
        .metrics_for("campaign_transition")
        .unwrap();
    assert_eq!(metrics.total_executions, 2);
    assert_eq!(metrics.successful_executions, 1);
    assert_eq!(metrics.failed_executions, 1);
    assert_eq!(metrics.error_rate(), 0.5);
    assert!(engine.telemetry().active_workflows().is_empty());
}
