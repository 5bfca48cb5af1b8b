//! Inventory reservations
//!
//! A reservation is the hold placed on a campaign's scheduled inventory
//! at the auto-reserve milestone. It stays `held` until the campaign
//! books (confirmed) or is rejected (released). Expiry is a wall-clock
//! deadline checked lazily at read time — there is no timer sweeping
//! reservations.

use crate::campaign::{Cents, Placement, ScheduledSpot};
use crate::ids::{
    AdvertiserId, AgencyId, CampaignId, EpisodeId, ReservationId, ShowId, SpotId, TenantId,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days a reservation holds inventory before lapsing
pub const RESERVATION_HOLD_DAYS: i64 = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Held,
    Released,
    Confirmed,
}

/// An inventory hold for a campaign
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub tenant_id: TenantId,
    pub campaign_id: CampaignId,
    pub advertiser_id: AdvertiserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<AgencyId>,
    /// Sum of the held spots' negotiated rates
    pub total_amount: Cents,
    /// Budget weighted by the auto-reserve probability fraction
    pub estimated_revenue: Cents,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        tenant_id: TenantId,
        campaign_id: CampaignId,
        advertiser_id: AdvertiserId,
        agency_id: Option<AgencyId>,
        total_amount: Cents,
        estimated_revenue: Cents,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ReservationId::generate(),
            tenant_id,
            campaign_id,
            advertiser_id,
            agency_id,
            total_amount,
            estimated_revenue,
            status: ReservationStatus::Held,
            expires_at: now + Duration::days(RESERVATION_HOLD_DAYS),
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Held and not yet lapsed
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Held && !self.is_expired(now)
    }
}

/// One held spot within a reservation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReservationItem {
    pub id: String,
    pub reservation_id: ReservationId,
    pub spot_id: SpotId,
    pub show_id: ShowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
    pub air_date: DateTime<Utc>,
    pub placement: Placement,
    pub rate: Cents,
}

impl ReservationItem {
    pub fn from_spot(reservation_id: ReservationId, spot: &ScheduledSpot) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            reservation_id,
            spot_id: spot.id.clone(),
            show_id: spot.show_id.clone(),
            episode_id: spot.episode_id.clone(),
            air_date: spot.air_date,
            placement: spot.placement,
            rate: spot.negotiated_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation() -> Reservation {
        Reservation::new(
            TenantId::new("acme"),
            CampaignId::new("c1"),
            AdvertiserId::new("adv-1"),
            None,
            100_000,
            90_000,
        )
    }

    #[test]
    fn test_new_reservation_is_held_for_14_days() {
        let r = reservation();
        assert_eq!(r.status, ReservationStatus::Held);
        let held_for = r.expires_at - r.created_at;
        assert_eq!(held_for.num_days(), RESERVATION_HOLD_DAYS);
    }

    #[test]
    fn test_active_window() {
        let r = reservation();
        assert!(r.is_active(Utc::now()));
        assert!(!r.is_active(Utc::now() + Duration::days(15)));
    }

    #[test]
    fn test_released_is_not_active() {
        let mut r = reservation();
        r.status = ReservationStatus::Released;
        assert!(!r.is_active(Utc::now()));
    }
}
