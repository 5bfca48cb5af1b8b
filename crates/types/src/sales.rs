//! Orders and contracts
//!
//! An order is generated from a campaign at the order-creation
//! milestone; a contract is generated from an approved order with line
//! items derived 1:1 from order items. Both carry the conservation
//! invariant: the record total equals the sum of its items.

use crate::campaign::{Cents, ScheduledSpot};
use crate::ids::{
    AdvertiserId, AgencyId, CampaignId, ContractId, OrderId, ShowId, SpotId, TenantId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    PendingApproval,
    Approved,
    Booked,
    Confirmed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub tenant_id: TenantId,
    pub campaign_id: CampaignId,
    pub advertiser_id: AdvertiserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    pub status: OrderStatus,
    pub total_amount: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        tenant_id: TenantId,
        campaign_id: CampaignId,
        advertiser_id: AdvertiserId,
        agency_id: Option<AgencyId>,
        total_amount: Cents,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::generate(),
            tenant_id,
            campaign_id,
            advertiser_id,
            agency_id,
            status: OrderStatus::Draft,
            total_amount,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One billable line on an order, derived from a scheduled spot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: OrderId,
    pub spot_id: SpotId,
    pub show_id: ShowId,
    pub air_date: DateTime<Utc>,
    pub description: String,
    pub quantity: u32,
    pub unit_rate: Cents,
    pub amount: Cents,
    /// Set once billed; an invoiced item never appears on another invoice
    pub invoiced: bool,
    pub delivered: bool,
}

impl OrderItem {
    pub fn from_spot(order_id: OrderId, spot: &ScheduledSpot) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            order_id,
            spot_id: spot.id.clone(),
            show_id: spot.show_id.clone(),
            air_date: spot.air_date,
            description: format!("{:?} spot on {}", spot.placement, spot.show_id),
            quantity: 1,
            unit_rate: spot.negotiated_rate,
            amount: spot.negotiated_rate,
            invoiced: false,
            delivered: spot.delivered,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Issued,
    Signed,
    Void,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub campaign_id: CampaignId,
    pub advertiser_id: AdvertiserId,
    pub status: ContractStatus,
    /// Must equal the sum of line item amounts
    pub total_amount: Cents,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Derive a contract from an order, line items 1:1 from order items.
    /// The contract total is recomputed from the items rather than
    /// copied, so the conservation invariant holds by construction.
    pub fn from_order(order: &Order, items: &[OrderItem]) -> (Self, Vec<ContractLineItem>) {
        let id = ContractId::generate();
        let line_items: Vec<ContractLineItem> = items
            .iter()
            .map(|item| ContractLineItem {
                id: uuid::Uuid::new_v4().to_string(),
                contract_id: id.clone(),
                order_item_id: item.id.clone(),
                description: item.description.clone(),
                amount: item.amount,
            })
            .collect();
        let total_amount = line_items.iter().map(|li| li.amount).sum();
        let contract = Self {
            id,
            tenant_id: order.tenant_id.clone(),
            order_id: order.id.clone(),
            campaign_id: order.campaign_id.clone(),
            advertiser_id: order.advertiser_id.clone(),
            status: ContractStatus::Draft,
            total_amount,
            created_at: Utc::now(),
        };
        (contract, line_items)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractLineItem {
    pub id: String,
    pub contract_id: ContractId,
    pub order_item_id: String,
    pub description: String,
    pub amount: Cents,
}
