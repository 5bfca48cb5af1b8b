//! Per-tenant configuration
//!
//! Overrides are validated when set, so a bad threshold schedule is an
//! operator-visible load error rather than a transition-time surprise.

use crate::milestone::{ConfigError, MilestoneSchedule};
use adflow_types::{Role, SpotType, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything tenant-configurable about the workflow engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantConfig {
    pub schedule: MilestoneSchedule,
    /// Roles allowed to drive admin-approval and rejection transitions
    pub approval_roles: Vec<Role>,
    /// Rate-card variance (percent) above which the admin approval
    /// notification is flagged
    pub rate_card_variance_threshold_pct: f64,
    /// Spot types that require talent approval
    pub talent_approval_spot_types: Vec<SpotType>,
    /// Master toggle for workflow notifications
    pub notifications_enabled: bool,
    /// Prefix for generated invoice numbers
    pub invoice_prefix: String,
    /// Group episode-delivery invoices by advertiser (one invoice per
    /// advertiser) instead of one invoice for the whole delivery batch
    pub group_episode_invoices_by_advertiser: bool,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            schedule: MilestoneSchedule::default(),
            approval_roles: vec![Role::Admin, Role::Master],
            rate_card_variance_threshold_pct: 10.0,
            talent_approval_spot_types: vec![SpotType::HostRead, SpotType::Endorsement],
            notifications_enabled: true,
            invoice_prefix: "INV".to_string(),
            group_episode_invoices_by_advertiser: true,
        }
    }
}

impl TenantConfig {
    pub fn requires_talent_approval(&self, spot_type: SpotType) -> bool {
        self.talent_approval_spot_types.contains(&spot_type)
    }

    pub fn role_may_approve(&self, role: Role) -> bool {
        self.approval_roles.contains(&role)
    }
}

/// Per-tenant configuration with compiled-in defaults.
///
/// Explicitly constructed and passed into the evaluator — there is no
/// process-wide registry. Reads are cheap clones; the evaluator reads
/// at the start of every evaluation rather than caching.
#[derive(Clone, Debug, Default)]
pub struct ConfigRegistry {
    defaults: TenantConfig,
    overrides: HashMap<TenantId, TenantConfig>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: TenantConfig) -> Self {
        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    /// Install a tenant override. The schedule is already validated by
    /// its own constructor; this re-checks so hand-built configs cannot
    /// sneak past.
    pub fn set_override(
        &mut self,
        tenant_id: TenantId,
        config: TenantConfig,
    ) -> Result<(), ConfigError> {
        MilestoneSchedule::from_raw(config.schedule.clone().into())?;
        self.overrides.insert(tenant_id, config);
        Ok(())
    }

    /// The effective configuration for a tenant
    pub fn get(&self, tenant_id: &TenantId) -> TenantConfig {
        self.overrides
            .get(tenant_id)
            .unwrap_or(&self.defaults)
            .clone()
    }

    /// The effective milestone thresholds for a tenant
    pub fn thresholds(&self, tenant_id: &TenantId) -> MilestoneSchedule {
        self.get(tenant_id).schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestone::RawSchedule;

    #[test]
    fn test_defaults_used_without_override() {
        let registry = ConfigRegistry::new();
        let cfg = registry.get(&TenantId::new("acme"));
        assert_eq!(cfg.invoice_prefix, "INV");
        assert!(cfg.role_may_approve(Role::Admin));
        assert!(!cfg.role_may_approve(Role::Sales));
    }

    #[test]
    fn test_override_takes_effect() {
        let mut registry = ConfigRegistry::new();
        let mut cfg = TenantConfig::default();
        cfg.invoice_prefix = "ACME".to_string();
        registry
            .set_override(TenantId::new("acme"), cfg)
            .unwrap();

        assert_eq!(registry.get(&TenantId::new("acme")).invoice_prefix, "ACME");
        assert_eq!(registry.get(&TenantId::new("other")).invoice_prefix, "INV");
    }

    #[test]
    fn test_custom_schedule_override() {
        let mut registry = ConfigRegistry::new();
        let mut cfg = TenantConfig::default();
        cfg.schedule = MilestoneSchedule::from_raw(RawSchedule {
            pre_sale_active: 5,
            schedule_valid: 25,
            talent_approval: 50,
            admin_approval: 80,
            auto_reserve: 85,
            order_creation: 100,
            rejection_fallback: 50,
        })
        .unwrap();
        registry.set_override(TenantId::new("acme"), cfg).unwrap();

        let schedule = registry.thresholds(&TenantId::new("acme"));
        assert_eq!(
            schedule.threshold(crate::milestone::Milestone::AdminApproval),
            80
        );
    }

    #[test]
    fn test_talent_approval_allow_list() {
        let cfg = TenantConfig::default();
        assert!(cfg.requires_talent_approval(SpotType::HostRead));
        assert!(cfg.requires_talent_approval(SpotType::Endorsement));
        assert!(!cfg.requires_talent_approval(SpotType::Produced));
    }
}
