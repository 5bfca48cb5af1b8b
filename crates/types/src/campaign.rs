//! Campaigns and scheduled spots
//!
//! A campaign's `probability` (0–100) is the sole driver of milestone
//! transitions; the `status` label is a display projection of probability
//! and is only mutated by the workflow engine. Scheduled spots are the
//! schedulable unit everything else derives from: reservation items,
//! talent-approval grouping, order items, and delivery invoicing.

use crate::ids::{
    AdvertiserId, AgencyId, CampaignId, EpisodeId, ShowId, SpotId, TalentId, TenantId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monetary amounts in minor units (cents). Integer so that
/// conservation invariants (contract total == sum of line items) hold
/// exactly.
pub type Cents = i64;

/// A sales campaign moving through the probability lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub tenant_id: TenantId,
    pub name: String,
    /// Sales probability, 0–100. Drives all milestone transitions.
    pub probability: u8,
    /// Display projection of probability via the milestone schedule.
    pub status: String,
    pub advertiser_id: AdvertiserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    /// The user who created the campaign (the "entity owner" audience)
    pub owner_id: UserId,
    pub budget: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(
        tenant_id: TenantId,
        name: impl Into<String>,
        advertiser_id: AdvertiserId,
        owner_id: UserId,
        budget: Cents,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: CampaignId::generate(),
            tenant_id,
            name: name.into(),
            probability: 0,
            status: "prospect".to_string(),
            advertiser_id,
            agency_id: None,
            owner_id,
            budget,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_agency(mut self, agency_id: AgencyId) -> Self {
        self.agency_id = Some(agency_id);
        self
    }

    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = probability;
        self
    }
}

/// Where a spot runs inside an episode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    PreRoll,
    MidRoll,
    PostRoll,
}

/// The kind of ad read a spot is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotType {
    /// Read live by the show's host — requires talent approval
    HostRead,
    /// Talent endorsement — requires talent approval
    Endorsement,
    /// Pre-produced creative
    Produced,
    /// Programmatically inserted
    Programmatic,
}

/// A scheduled ad spot on a show/episode
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledSpot {
    pub id: SpotId,
    pub campaign_id: CampaignId,
    pub show_id: ShowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
    /// The talent who reads the spot, when the spot type needs one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talent_id: Option<TalentId>,
    pub air_date: DateTime<Utc>,
    pub placement: Placement,
    pub spot_type: SpotType,
    /// Negotiated rate for this spot
    pub negotiated_rate: Cents,
    /// The show's default (rate-card) rate for this placement
    pub rate_card_rate: Cents,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    /// Set once the spot has appeared on an invoice; invoiced spots are
    /// never billed a second time
    pub invoiced: bool,
}

impl ScheduledSpot {
    pub fn new(
        campaign_id: CampaignId,
        show_id: ShowId,
        air_date: DateTime<Utc>,
        placement: Placement,
        spot_type: SpotType,
        negotiated_rate: Cents,
        rate_card_rate: Cents,
    ) -> Self {
        Self {
            id: SpotId::generate(),
            campaign_id,
            show_id,
            episode_id: None,
            talent_id: None,
            air_date,
            placement,
            spot_type,
            negotiated_rate,
            rate_card_rate,
            delivered: false,
            delivered_at: None,
            invoiced: false,
        }
    }

    pub fn with_talent(mut self, talent_id: TalentId) -> Self {
        self.talent_id = Some(talent_id);
        self
    }

    pub fn with_episode(mut self, episode_id: EpisodeId) -> Self {
        self.episode_id = Some(episode_id);
        self
    }

    /// Percentage delta between the negotiated rate and the rate card,
    /// or `None` when the rate card is zero (nothing to compare against)
    pub fn rate_variance_pct(&self) -> Option<f64> {
        if self.rate_card_rate == 0 {
            return None;
        }
        let delta = (self.negotiated_rate - self.rate_card_rate).abs() as f64;
        Some(delta / self.rate_card_rate as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(negotiated: Cents, rate_card: Cents) -> ScheduledSpot {
        ScheduledSpot::new(
            CampaignId::new("c1"),
            ShowId::new("show-a"),
            Utc::now(),
            Placement::MidRoll,
            SpotType::HostRead,
            negotiated,
            rate_card,
        )
    }

    #[test]
    fn test_rate_variance() {
        // 90_00 negotiated vs 100_00 rate card: 10% under
        let s = spot(90_00, 100_00);
        assert_eq!(s.rate_variance_pct(), Some(10.0));
    }

    #[test]
    fn test_rate_variance_zero_rate_card() {
        assert_eq!(spot(90_00, 0).rate_variance_pct(), None);
    }

    #[test]
    fn test_campaign_builder() {
        let c = Campaign::new(
            TenantId::new("acme"),
            "Q3 Push",
            AdvertiserId::new("adv-1"),
            UserId::new("u1"),
            1_000_000,
        )
        .with_agency(AgencyId::new("ag-1"))
        .with_probability(35);

        assert_eq!(c.probability, 35);
        assert_eq!(c.agency_id, Some(AgencyId::new("ag-1")));
        assert_eq!(c.status, "prospect");
    }

    #[test]
    fn test_spot_type_serde() {
        assert_eq!(
            serde_json::to_string(&SpotType::HostRead).unwrap(),
            "\"host_read\""
        );
    }
}
