//! Recurring billing driver.

use crate::{BillingResult, InvoiceGenerator};
use adflow_config::TenantConfig;
use adflow_storage::{CampaignStore, InvoiceStore, OrderStore};
use adflow_types::TenantId;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of one `run_due` sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecurringRunReport {
    pub generated: u32,
    pub failed: u32,
}

/// Drives due recurring schedules through the invoice generator.
///
/// Each due schedule produces one pre-billed invoice for its order and
/// then advances one period; a failed generation is logged and the
/// schedule is left untouched so the next sweep retries it.
pub struct RecurringBillingRunner<S> {
    store: Arc<S>,
    generator: InvoiceGenerator<S>,
}

impl<S: CampaignStore + OrderStore + InvoiceStore> RecurringBillingRunner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            generator: InvoiceGenerator::new(store.clone()),
            store,
        }
    }

    pub async fn run_due(
        &self,
        config: &TenantConfig,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> BillingResult<RecurringRunReport> {
        let due = self.store.due_recurring_schedules(tenant, now).await?;
        let mut report = RecurringRunReport::default();

        for mut schedule in due {
            match self
                .generator
                .invoice_from_order(config, tenant, &schedule.order_id, true, now)
                .await
            {
                Ok(invoice) => {
                    schedule.advance();
                    self.store.upsert_recurring_schedule(schedule).await?;
                    report.generated += 1;
                    tracing::info!(
                        tenant_id = %tenant,
                        number = %invoice.number,
                        "recurring invoice generated"
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        tenant_id = %tenant,
                        order_id = %schedule.order_id,
                        error = %err,
                        "recurring invoice generation failed, will retry next sweep"
                    );
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adflow_storage::{CampaignStore, InMemoryWorkflowStore, InvoiceStore, OrderStore};
    use adflow_types::{
        AdvertiserId, BillingPeriod, Campaign, Order, OrderId, OrderItem, Placement,
        RecurringInvoiceSchedule, ScheduledSpot, ShowId, SpotType, UserId,
    };

    fn tenant() -> TenantId {
        TenantId::new("acme")
    }

    async fn seed_order(store: &InMemoryWorkflowStore) -> Order {
        let campaign = Campaign::new(
            tenant(),
            "Always On",
            AdvertiserId::new("adv-1"),
            UserId::new("u1"),
            1_200_000,
        );
        store.upsert_campaign(campaign.clone()).await.unwrap();
        let order = Order::new(
            tenant(),
            campaign.id.clone(),
            campaign.advertiser_id.clone(),
            None,
            100_000,
        );
        let spot = ScheduledSpot::new(
            campaign.id,
            ShowId::new("show-a"),
            Utc::now(),
            Placement::MidRoll,
            SpotType::Produced,
            100_000,
            100_000,
        );
        let items = vec![OrderItem::from_spot(order.id.clone(), &spot)];
        store.create_order(order.clone(), items).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_due_schedule_generates_and_advances() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let order = seed_order(&store).await;
        let now = Utc::now();
        let schedule = RecurringInvoiceSchedule::new(
            tenant(),
            order.id.clone(),
            BillingPeriod::Monthly,
            now - chrono::Duration::days(1),
        );
        store.upsert_recurring_schedule(schedule).await.unwrap();

        let runner = RecurringBillingRunner::new(store.clone());
        let report = runner
            .run_due(&TenantConfig::default(), &tenant(), now)
            .await
            .unwrap();

        assert_eq!(report, RecurringRunReport { generated: 1, failed: 0 });
        let advanced = store
            .recurring_schedule_for_order(&tenant(), &order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(advanced.invoices_generated, 1);
        assert!(advanced.next_invoice_date > now);

        let invoices = store.invoices_for_order(&tenant(), &order.id).await.unwrap();
        assert_eq!(invoices.len(), 1);
        assert!(invoices[0].pre_billed);
    }

    #[tokio::test]
    async fn test_not_due_schedule_is_left_alone() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let order = seed_order(&store).await;
        let now = Utc::now();
        let schedule = RecurringInvoiceSchedule::new(
            tenant(),
            order.id.clone(),
            BillingPeriod::Monthly,
            now + chrono::Duration::days(10),
        );
        store.upsert_recurring_schedule(schedule).await.unwrap();

        let runner = RecurringBillingRunner::new(store.clone());
        let report = runner
            .run_due(&TenantConfig::default(), &tenant(), now)
            .await
            .unwrap();
        assert_eq!(report.generated, 0);
    }

    #[tokio::test]
    async fn test_failed_generation_does_not_advance() {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let now = Utc::now();
        // Schedule for an order that does not exist.
        let schedule = RecurringInvoiceSchedule::new(
            tenant(),
            OrderId::new("ghost"),
            BillingPeriod::Monthly,
            now - chrono::Duration::days(1),
        );
        store.upsert_recurring_schedule(schedule).await.unwrap();

        let runner = RecurringBillingRunner::new(store.clone());
        let report = runner
            .run_due(&TenantConfig::default(), &tenant(), now)
            .await
            .unwrap();
        assert_eq!(report, RecurringRunReport { generated: 0, failed: 1 });

        let untouched = store
            .recurring_schedule_for_order(&tenant(), &OrderId::new("ghost"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.invoices_generated, 0);
    }
}
