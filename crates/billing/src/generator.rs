//! Invoice generation from orders and episode delivery.

use crate::{BillingError, BillingResult, InvoiceNumber};
use adflow_config::TenantConfig;
use adflow_storage::{CampaignStore, InvoiceStore, OrderStore, StorageError};
use adflow_types::{
    billing_period_of, AdvertiserId, CampaignId, Cents, EpisodeId, Invoice, InvoiceId, InvoiceItem,
    InvoiceStatus, OrderId, ScheduledSpot, SpotId, TenantId,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Days until a generated invoice falls due.
pub const NET_TERMS_DAYS: i64 = 30;

/// How many times a number-allocation conflict is retried before the
/// error propagates.
const NUMBER_ALLOC_RETRIES: usize = 3;

/// Builds invoices against the storage layer. Numbering is allocated
/// per (prefix, year, month) bucket at generation time.
pub struct InvoiceGenerator<S> {
    store: Arc<S>,
}

impl<S: CampaignStore + OrderStore + InvoiceStore> InvoiceGenerator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn allocate_number(
        &self,
        config: &TenantConfig,
        tenant: &TenantId,
        now: DateTime<Utc>,
    ) -> BillingResult<InvoiceNumber> {
        let existing = self
            .store
            .invoice_numbers(tenant, &config.invoice_prefix)
            .await?;
        let (year, month) = billing_period_of(now);
        Ok(InvoiceNumber::next_in_sequence(
            &existing,
            &config.invoice_prefix,
            year,
            month,
        ))
    }

    /// Writes the invoice under a freshly allocated number. A concurrent
    /// writer can take the number between the sequence scan and the
    /// insert; the resulting conflict is retried with a rescan instead
    /// of dropping the invoice.
    async fn create_numbered(
        &self,
        config: &TenantConfig,
        tenant: &TenantId,
        mut invoice: Invoice,
        items: Vec<InvoiceItem>,
        now: DateTime<Utc>,
    ) -> BillingResult<Invoice> {
        let mut attempts = 0;
        loop {
            let number = self.allocate_number(config, tenant, now).await?;
            invoice.number = number.to_string();
            match self
                .store
                .create_invoice(invoice.clone(), items.clone())
                .await
            {
                Ok(()) => return Ok(invoice),
                Err(StorageError::Conflict(_)) if attempts < NUMBER_ALLOC_RETRIES => {
                    attempts += 1;
                    tracing::debug!(
                        tenant_id = %tenant,
                        number = %invoice.number,
                        attempts,
                        "invoice number taken by a concurrent writer, reallocating"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// One invoice covering the whole order, line items 1:1 from order
    /// items. When `pre_billed` is false the order items are marked
    /// invoiced; pre-billed (recurring) invoices bill the order each
    /// period and leave the items open for delivery reconciliation.
    pub async fn invoice_from_order(
        &self,
        config: &TenantConfig,
        tenant: &TenantId,
        order_id: &OrderId,
        pre_billed: bool,
        now: DateTime<Utc>,
    ) -> BillingResult<Invoice> {
        let order = self.store.get_order(tenant, order_id).await?;
        let items = self.store.order_items(tenant, order_id).await?;
        if items.is_empty() {
            return Err(BillingError::NothingToInvoice(format!(
                "order {order_id} has no items"
            )));
        }

        let invoice_id = InvoiceId::generate();
        let invoice_items: Vec<InvoiceItem> = items
            .iter()
            .map(|item| InvoiceItem {
                id: uuid::Uuid::new_v4().to_string(),
                invoice_id: invoice_id.clone(),
                order_item_id: Some(item.id.clone()),
                spot_id: Some(item.spot_id.clone()),
                description: item.description.clone(),
                amount: item.amount,
            })
            .collect();
        let total_amount: Cents = invoice_items.iter().map(|i| i.amount).sum();

        let invoice = Invoice {
            id: invoice_id,
            tenant_id: tenant.clone(),
            number: String::new(),
            order_id: Some(order.id.clone()),
            campaign_id: Some(order.campaign_id.clone()),
            advertiser_id: order.advertiser_id.clone(),
            status: InvoiceStatus::Issued,
            issue_date: now,
            due_date: now + Duration::days(NET_TERMS_DAYS),
            total_amount,
            pre_billed,
            created_at: now,
        };
        let invoice = self
            .create_numbered(config, tenant, invoice, invoice_items, now)
            .await?;

        if !pre_billed {
            let item_ids: Vec<String> = items.iter().map(|i| i.id.clone()).collect();
            self.store.mark_order_items_invoiced(tenant, &item_ids).await?;
        }

        tracing::info!(
            tenant_id = %tenant,
            order_id = %order_id,
            number = %invoice.number,
            total_amount = invoice.total_amount,
            pre_billed,
            "generated order invoice"
        );
        Ok(invoice)
    }

    /// Invoices the episode's delivered-but-uninvoiced spots, one
    /// invoice per advertiser when the tenant groups by advertiser,
    /// otherwise one per campaign. Billed spots are marked invoiced so
    /// they never appear on a second invoice.
    pub async fn invoices_from_episode_delivery(
        &self,
        config: &TenantConfig,
        tenant: &TenantId,
        episode: &EpisodeId,
        now: DateTime<Utc>,
    ) -> BillingResult<Vec<Invoice>> {
        let spots = self
            .store
            .uninvoiced_delivered_spots(tenant, episode)
            .await?;
        if spots.is_empty() {
            return Ok(Vec::new());
        }

        let mut groups: Vec<(AdvertiserId, Option<CampaignId>, Vec<ScheduledSpot>)> = Vec::new();
        for spot in spots {
            let campaign = self.store.get_campaign(tenant, &spot.campaign_id).await?;
            let key_campaign = if config.group_episode_invoices_by_advertiser {
                None
            } else {
                Some(campaign.id.clone())
            };
            match groups
                .iter_mut()
                .find(|(adv, c, _)| *adv == campaign.advertiser_id && *c == key_campaign)
            {
                Some((_, _, group)) => group.push(spot),
                None => groups.push((campaign.advertiser_id, key_campaign, vec![spot])),
            }
        }

        let mut invoices = Vec::with_capacity(groups.len());
        for (advertiser_id, campaign_id, group) in groups {
            let invoice_id = InvoiceId::generate();
            let items: Vec<InvoiceItem> = group
                .iter()
                .map(|spot| InvoiceItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    invoice_id: invoice_id.clone(),
                    order_item_id: None,
                    spot_id: Some(spot.id.clone()),
                    description: format!(
                        "Delivered {:?} spot on {} ({})",
                        spot.placement,
                        spot.show_id,
                        spot.air_date.format("%Y-%m-%d")
                    ),
                    amount: spot.negotiated_rate,
                })
                .collect();
            let total_amount: Cents = items.iter().map(|i| i.amount).sum();

            let invoice = Invoice {
                id: invoice_id,
                tenant_id: tenant.clone(),
                number: String::new(),
                order_id: None,
                campaign_id,
                advertiser_id: advertiser_id.clone(),
                status: InvoiceStatus::Issued,
                issue_date: now,
                due_date: now + Duration::days(NET_TERMS_DAYS),
                total_amount,
                pre_billed: false,
                created_at: now,
            };
            let invoice = self
                .create_numbered(config, tenant, invoice, items, now)
                .await?;

            let spot_ids: Vec<SpotId> = group.iter().map(|s| s.id.clone()).collect();
            self.store.mark_spots_invoiced(tenant, &spot_ids).await?;

            tracing::info!(
                tenant_id = %tenant,
                episode_id = %episode,
                advertiser_id = %advertiser_id,
                number = %invoice.number,
                spot_count = spot_ids.len(),
                total_amount = invoice.total_amount,
                "generated episode delivery invoice"
            );
            invoices.push(invoice);
        }
        Ok(invoices)
    }
}
