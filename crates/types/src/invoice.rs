//! Invoices and recurring schedules
//!
//! Invoice records only; numbering and generation logic live in
//! `adflow-billing`. The invoice total must equal the sum of its item
//! amounts, and the number is unique per (prefix, year, month).

use crate::campaign::Cents;
use crate::ids::{AdvertiserId, CampaignId, InvoiceId, OrderId, SpotId, TenantId};
use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Void,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub tenant_id: TenantId,
    /// `{prefix}-{yyyy}{mm}-{seq:04}`, assigned by the billing subsystem
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    pub advertiser_id: AdvertiserId,
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    /// Must equal the sum of item amounts
    pub total_amount: Cents,
    /// Generated ahead of delivery (pre-billed) rather than from
    /// delivered spots
    pub pre_billed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: InvoiceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_id: Option<SpotId>,
    pub description: String,
    pub amount: Cents,
}

/// How often a recurring schedule bills
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Monthly,
    Quarterly,
}

impl BillingPeriod {
    pub fn advance(&self, date: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            BillingPeriod::Monthly => 1,
            BillingPeriod::Quarterly => 3,
        };
        date.checked_add_months(Months::new(months))
            .unwrap_or(date)
    }
}

/// A per-order recurring billing schedule.
///
/// After each successful generation the schedule advances by one
/// period; once no further generation is due (past `end_date`) it
/// disables itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecurringInvoiceSchedule {
    pub id: String,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub period: BillingPeriod,
    pub next_invoice_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub invoices_generated: u32,
}

impl RecurringInvoiceSchedule {
    pub fn new(
        tenant_id: TenantId,
        order_id: OrderId,
        period: BillingPeriod,
        first_invoice_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id,
            order_id,
            period,
            next_invoice_date: first_invoice_date,
            end_date: None,
            enabled: true,
            invoices_generated: 0,
        }
    }

    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_invoice_date <= now
    }

    /// Advance one period after a successful generation, disabling the
    /// schedule when the next date would fall past `end_date`
    pub fn advance(&mut self) {
        self.invoices_generated += 1;
        self.next_invoice_date = self.period.advance(self.next_invoice_date);
        if let Some(end) = self.end_date {
            if self.next_invoice_date > end {
                self.enabled = false;
            }
        }
    }
}

/// The (year, month) bucket an invoice number sequences within
pub fn billing_period_of(date: DateTime<Utc>) -> (i32, u32) {
    (date.year(), date.month())
}
