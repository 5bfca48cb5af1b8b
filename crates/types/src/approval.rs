//! Approval records
//!
//! Two kinds: talent approvals (one per unique campaign/show/talent
//! combination, created at the talent-approval milestone) and campaign
//! approvals (created at the admin-approval milestone, gating the 100%
//! transition for non-privileged actors).

use crate::campaign::{Cents, SpotType};
use crate::context::Role;
use crate::ids::{ApprovalId, CampaignId, ShowId, TalentId, TenantId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Days a talent approval request stays open before lapsing
pub const TALENT_APPROVAL_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
}

/// Snapshot of what the talent is being asked to approve
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TalentApprovalSummary {
    pub spot_count: usize,
    pub total_value: Cents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_air_date: Option<DateTime<Utc>>,
}

/// A request for a talent to approve reading spots for a campaign
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TalentApprovalRequest {
    pub id: ApprovalId,
    pub tenant_id: TenantId,
    pub campaign_id: CampaignId,
    pub show_id: ShowId,
    pub talent_id: TalentId,
    pub spot_type: SpotType,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
    pub summary: TalentApprovalSummary,
    pub created_at: DateTime<Utc>,
}

impl TalentApprovalRequest {
    pub fn new(
        tenant_id: TenantId,
        campaign_id: CampaignId,
        show_id: ShowId,
        talent_id: TalentId,
        spot_type: SpotType,
        summary: TalentApprovalSummary,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApprovalId::generate(),
            tenant_id,
            campaign_id,
            show_id,
            talent_id,
            spot_type,
            status: ApprovalStatus::Pending,
            expires_at: now + Duration::days(TALENT_APPROVAL_WINDOW_DAYS),
            summary,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Pending or approved and not yet lapsed — the existence of such a
    /// request is what makes repeated milestone firing idempotent
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status,
            ApprovalStatus::Pending | ApprovalStatus::Approved
        ) && !self.is_expired(now)
    }
}

/// An admin approval gating a campaign's move to 100%
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignApproval {
    pub id: ApprovalId,
    pub tenant_id: TenantId,
    pub campaign_id: CampaignId,
    pub status: ApprovalStatus,
    pub required_roles: Vec<Role>,
    pub requested_by: UserId,
    pub requested_at: DateTime<Utc>,
    /// Rate-card variance at request time, carried on the approval and
    /// its notification so the approver sees how far off rate card the
    /// deal is
    pub rate_card_variance_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<UserId>,
}

impl CampaignApproval {
    pub fn new(
        tenant_id: TenantId,
        campaign_id: CampaignId,
        required_roles: Vec<Role>,
        requested_by: UserId,
        rate_card_variance_pct: f64,
    ) -> Self {
        Self {
            id: ApprovalId::generate(),
            tenant_id,
            campaign_id,
            status: ApprovalStatus::Pending,
            required_roles,
            requested_by,
            requested_at: Utc::now(),
            rate_card_variance_pct,
            resolved_at: None,
            resolved_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: ApprovalStatus) -> TalentApprovalRequest {
        let mut r = TalentApprovalRequest::new(
            TenantId::new("acme"),
            CampaignId::new("c1"),
            ShowId::new("show-a"),
            TalentId::new("t1"),
            SpotType::HostRead,
            TalentApprovalSummary::default(),
        );
        r.status = status;
        r
    }

    #[test]
    fn test_open_states() {
        let now = Utc::now();
        assert!(request(ApprovalStatus::Pending).is_open(now));
        assert!(request(ApprovalStatus::Approved).is_open(now));
        assert!(!request(ApprovalStatus::Denied).is_open(now));
    }

    #[test]
    fn test_expired_request_is_not_open() {
        let r = request(ApprovalStatus::Pending);
        assert!(!r.is_open(Utc::now() + Duration::days(8)));
    }

    #[test]
    fn test_window_is_seven_days() {
        let r = request(ApprovalStatus::Pending);
        assert_eq!(
            (r.expires_at - r.created_at).num_days(),
            TALENT_APPROVAL_WINDOW_DAYS
        );
    }
}
