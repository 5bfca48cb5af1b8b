//! Identifier newtypes
//!
//! Every record is addressed by a string id (UUID v4 when generated).
//! Newtypes keep tenant ids from being passed where a campaign id is
//! expected, which matters in a multi-tenant engine.

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Tenant (organization) identifier — scopes every stored record
    TenantId
);
string_id!(
    /// Campaign identifier
    CampaignId
);
string_id!(
    /// User identifier
    UserId
);
string_id!(
    /// Show identifier
    ShowId
);
string_id!(
    /// Episode identifier
    EpisodeId
);
string_id!(
    /// Talent identifier
    TalentId
);
string_id!(
    /// Advertiser identifier
    AdvertiserId
);
string_id!(
    /// Agency identifier
    AgencyId
);
string_id!(
    /// Scheduled spot identifier
    SpotId
);
string_id!(
    /// Reservation identifier
    ReservationId
);
string_id!(
    /// Approval record identifier (talent or campaign approvals)
    ApprovalId
);
string_id!(
    /// Order identifier
    OrderId
);
string_id!(
    /// Contract identifier
    ContractId
);
string_id!(
    /// Invoice identifier
    InvoiceId
);
string_id!(
    /// Notification identifier
    NotificationId
);
string_id!(
    /// Task identifier
    TaskId
);
string_id!(
    /// Automation rule identifier
    RuleId
);
string_id!(
    /// The entity a workflow transition is about (campaign, order, ...)
    EntityId
);
string_id!(
    /// A single workflow evaluation, for telemetry correlation
    WorkflowId
);
