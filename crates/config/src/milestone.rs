//! Milestones and the threshold schedule
//!
//! A milestone is a named probability threshold gating a set of
//! automated actions. Crossing is edge-triggered: a milestone fires iff
//! `old < threshold <= new`. Re-saving a campaign at the same (or a
//! still-higher-but-already-past) probability fires nothing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors, fatal at load time
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("threshold for {milestone} is {value}, outside 0..=100")]
    OutOfRange { milestone: Milestone, value: u16 },

    #[error("non-monotonic thresholds: {earlier} ({earlier_value}) must be below {later} ({later_value})")]
    NonMonotonic {
        earlier: Milestone,
        earlier_value: u8,
        later: Milestone,
        later_value: u8,
    },

    #[error("auto_reserve ({auto_reserve}) must lie within [admin_approval ({admin_approval}), order_creation ({order_creation})]")]
    AutoReserveOutOfBand {
        auto_reserve: u8,
        admin_approval: u8,
        order_creation: u8,
    },

    #[error("rejection_fallback ({fallback}) must be positive and below admin_approval ({admin_approval})")]
    FallbackOutOfBand { fallback: u8, admin_approval: u8 },
}

/// The named probability milestones of the campaign lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    /// Campaign is live enough to open the schedule builder
    PreSaleActive,
    /// Schedule has been validated
    ScheduleValid,
    /// Talent approval requests go out
    TalentApproval,
    /// Admin approval is requested
    AdminApproval,
    /// Inventory is reserved
    AutoReserve,
    /// The order (and downstream contract/invoice) is created
    OrderCreation,
    /// Where a rejected campaign falls back to
    RejectionFallback,
}

impl Milestone {
    /// The status label a campaign displays at this milestone
    pub fn status_label(&self) -> &'static str {
        match self {
            Milestone::PreSaleActive => "pre_sale_active",
            Milestone::ScheduleValid => "schedule_valid",
            Milestone::TalentApproval => "talent_approval",
            Milestone::AdminApproval => "admin_approval",
            Milestone::AutoReserve => "auto_reserve",
            Milestone::OrderCreation => "booked",
            Milestone::RejectionFallback => "rejected",
        }
    }

    /// Tie-break index for milestones sharing a threshold value.
    /// AutoReserve sorts before AdminApproval so the reservation exists
    /// before the admin approval notification that references it.
    fn rank(&self) -> u8 {
        match self {
            Milestone::PreSaleActive => 0,
            Milestone::ScheduleValid => 1,
            Milestone::TalentApproval => 2,
            Milestone::AutoReserve => 3,
            Milestone::AdminApproval => 4,
            Milestone::OrderCreation => 5,
            Milestone::RejectionFallback => 6,
        }
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.status_label())
    }
}

/// A validated mapping from milestones to probability thresholds.
///
/// Construction enforces, at load time:
/// - every value in 0..=100
/// - the forward chain pre-sale < schedule-valid < talent-approval <
///   admin-approval < order-creation strictly increasing
/// - auto-reserve within [admin-approval, order-creation]
/// - rejection-fallback positive and below admin-approval
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule", into = "RawSchedule")]
pub struct MilestoneSchedule {
    pre_sale_active: u8,
    schedule_valid: u8,
    talent_approval: u8,
    admin_approval: u8,
    auto_reserve: u8,
    order_creation: u8,
    rejection_fallback: u8,
}

/// Unvalidated threshold values as they come out of tenant config
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawSchedule {
    pub pre_sale_active: u16,
    pub schedule_valid: u16,
    pub talent_approval: u16,
    pub admin_approval: u16,
    pub auto_reserve: u16,
    pub order_creation: u16,
    pub rejection_fallback: u16,
}

impl Default for MilestoneSchedule {
    fn default() -> Self {
        // Compiled-in defaults; validated by construction in tests.
        Self {
            pre_sale_active: 10,
            schedule_valid: 35,
            talent_approval: 65,
            admin_approval: 90,
            auto_reserve: 90,
            order_creation: 100,
            rejection_fallback: 65,
        }
    }
}

impl TryFrom<RawSchedule> for MilestoneSchedule {
    type Error = ConfigError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        MilestoneSchedule::from_raw(raw)
    }
}

impl From<MilestoneSchedule> for RawSchedule {
    fn from(s: MilestoneSchedule) -> Self {
        Self {
            pre_sale_active: s.pre_sale_active as u16,
            schedule_valid: s.schedule_valid as u16,
            talent_approval: s.talent_approval as u16,
            admin_approval: s.admin_approval as u16,
            auto_reserve: s.auto_reserve as u16,
            order_creation: s.order_creation as u16,
            rejection_fallback: s.rejection_fallback as u16,
        }
    }
}

impl MilestoneSchedule {
    /// Validate raw tenant configuration into a usable schedule
    pub fn from_raw(raw: RawSchedule) -> Result<Self, ConfigError> {
        let in_range = |milestone: Milestone, value: u16| -> Result<u8, ConfigError> {
            if value > 100 {
                Err(ConfigError::OutOfRange { milestone, value })
            } else {
                Ok(value as u8)
            }
        };

        let schedule = Self {
            pre_sale_active: in_range(Milestone::PreSaleActive, raw.pre_sale_active)?,
            schedule_valid: in_range(Milestone::ScheduleValid, raw.schedule_valid)?,
            talent_approval: in_range(Milestone::TalentApproval, raw.talent_approval)?,
            admin_approval: in_range(Milestone::AdminApproval, raw.admin_approval)?,
            auto_reserve: in_range(Milestone::AutoReserve, raw.auto_reserve)?,
            order_creation: in_range(Milestone::OrderCreation, raw.order_creation)?,
            rejection_fallback: in_range(Milestone::RejectionFallback, raw.rejection_fallback)?,
        };

        let chain = [
            (Milestone::PreSaleActive, schedule.pre_sale_active),
            (Milestone::ScheduleValid, schedule.schedule_valid),
            (Milestone::TalentApproval, schedule.talent_approval),
            (Milestone::AdminApproval, schedule.admin_approval),
            (Milestone::OrderCreation, schedule.order_creation),
        ];
        for window in chain.windows(2) {
            let (earlier, earlier_value) = window[0];
            let (later, later_value) = window[1];
            if earlier_value >= later_value {
                return Err(ConfigError::NonMonotonic {
                    earlier,
                    earlier_value,
                    later,
                    later_value,
                });
            }
        }

        if schedule.auto_reserve < schedule.admin_approval
            || schedule.auto_reserve > schedule.order_creation
        {
            return Err(ConfigError::AutoReserveOutOfBand {
                auto_reserve: schedule.auto_reserve,
                admin_approval: schedule.admin_approval,
                order_creation: schedule.order_creation,
            });
        }

        if schedule.rejection_fallback == 0
            || schedule.rejection_fallback >= schedule.admin_approval
        {
            return Err(ConfigError::FallbackOutOfBand {
                fallback: schedule.rejection_fallback,
                admin_approval: schedule.admin_approval,
            });
        }

        Ok(schedule)
    }

    pub fn threshold(&self, milestone: Milestone) -> u8 {
        match milestone {
            Milestone::PreSaleActive => self.pre_sale_active,
            Milestone::ScheduleValid => self.schedule_valid,
            Milestone::TalentApproval => self.talent_approval,
            Milestone::AdminApproval => self.admin_approval,
            Milestone::AutoReserve => self.auto_reserve,
            Milestone::OrderCreation => self.order_creation,
            Milestone::RejectionFallback => self.rejection_fallback,
        }
    }

    /// The milestones crossed by a probability change, in firing order.
    ///
    /// Edge-triggered: a milestone is crossed iff
    /// `old < threshold <= new`. Ordered ascending by threshold, with
    /// [`Milestone::rank`] breaking ties. `RejectionFallback` never
    /// appears — rejection is an explicit event, not a crossing.
    pub fn crossings(&self, old: u8, new: u8) -> Vec<Milestone> {
        if new <= old {
            return Vec::new();
        }
        let mut crossed: Vec<Milestone> = [
            Milestone::PreSaleActive,
            Milestone::ScheduleValid,
            Milestone::TalentApproval,
            Milestone::AdminApproval,
            Milestone::AutoReserve,
            Milestone::OrderCreation,
        ]
        .into_iter()
        .filter(|m| {
            let t = self.threshold(*m);
            old < t && t <= new
        })
        .collect();
        crossed.sort_by_key(|m| (self.threshold(*m), m.rank()));
        crossed
    }

    /// Display projection: the status label of the highest milestone at
    /// or below the probability
    pub fn status_label(&self, probability: u8) -> &'static str {
        let mut label = "prospect";
        for milestone in [
            Milestone::PreSaleActive,
            Milestone::ScheduleValid,
            Milestone::TalentApproval,
            Milestone::AdminApproval,
            Milestone::OrderCreation,
        ] {
            if probability >= self.threshold(milestone) {
                label = milestone.status_label();
            }
        }
        label
    }
}
