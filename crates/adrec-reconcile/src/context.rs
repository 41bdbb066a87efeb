//! Run-scoped safety state — derived once from config + mode, read-only after.
//!
//! Replaces the usual pile of process-global run flags: every reconciler and
//! the executor receive the same [`RunContext`] value, so there is no hidden
//! cross-call state and no way for a mid-run flag flip to leak mutations.

use std::collections::{BTreeMap, BTreeSet};

use adrec_config::{ConfigSnapshot, RunMode};

use crate::{LiveCampaign, MutationKind};

/// Error raised when safety state cannot be derived. Reported as
/// GATE_BLOCKED, distinct from a missing/disabled config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateError {
    /// Tenant is configured off; the caller must not have reached derivation.
    TenantDisabled,
    /// Label marker collides with the canary filter; scoping would be
    /// ambiguous (every touched entity would instantly enter the canary).
    MarkerCanaryCollision { marker: String },
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::TenantDisabled => write!(f, "gate derivation on a disabled tenant"),
            GateError::MarkerCanaryCollision { marker } => write!(
                f,
                "labelMarker '{marker}' equals canaryLabelFilter; scoping is ambiguous"
            ),
        }
    }
}

impl std::error::Error for GateError {}

/// Immutable per-run safety state consulted by every reconciler and by the
/// mutation executor.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub tenant_id: String,
    pub mode: RunMode,
    pub label_marker: String,
    pub canary_label_filter: Option<String>,
    /// True only when `config.promote` AND production mode. The sole switch
    /// that lets the executor touch the platform.
    pub promote_active: bool,
    /// Mirrors `promote_active` for report visibility. The reserved-keyword
    /// guard itself is unconditional: a reserved term never becomes an intent
    /// in any mode.
    pub neg_guard_active: bool,
    reserved: BTreeSet<String>,
    exclusions: BTreeMap<String, Option<BTreeSet<String>>>,
}

impl RunContext {
    /// Derive safety state for one run. Called exactly once, between config
    /// load and the first live-state read.
    pub fn derive(cfg: &ConfigSnapshot, mode: RunMode) -> Result<Self, GateError> {
        if !cfg.enabled {
            return Err(GateError::TenantDisabled);
        }
        if let Some(canary) = &cfg.canary_label_filter {
            if *canary == cfg.label_marker {
                return Err(GateError::MarkerCanaryCollision {
                    marker: cfg.label_marker.clone(),
                });
            }
        }

        let promote_active = cfg.promote && mode == RunMode::Production;

        Ok(Self {
            tenant_id: cfg.tenant_id.clone(),
            mode,
            label_marker: cfg.label_marker.clone(),
            canary_label_filter: cfg.canary_label_filter.clone(),
            promote_active,
            neg_guard_active: promote_active,
            reserved: cfg.reserved_keywords_effective(),
            exclusions: cfg.exclusions.clone(),
        })
    }

    /// Promote gate: may this class of mutation be *applied*?
    /// Intents are always computed and logged regardless.
    pub fn allow(&self, _kind: MutationKind) -> bool {
        self.promote_active
    }

    /// Case-insensitive substring match against the reserved list.
    /// Deliberately broad: "mybrand shoes" is caught by reserved term "brand".
    pub fn is_reserved(&self, term: &str) -> bool {
        let t = term.to_lowercase();
        self.reserved.iter().any(|r| t.contains(r.as_str()))
    }

    /// Whole campaign excluded (listed with no ad-group keys).
    pub fn campaign_excluded(&self, campaign_name: &str) -> bool {
        matches!(self.exclusions.get(campaign_name), Some(None))
    }

    /// Ad group excluded: either its campaign is fully excluded or it is
    /// listed under the campaign's exclusion entry.
    pub fn ad_group_excluded(&self, campaign_name: &str, ad_group_name: &str) -> bool {
        match self.exclusions.get(campaign_name) {
            Some(None) => true,
            Some(Some(groups)) => groups.contains(ad_group_name),
            None => false,
        }
    }

    /// A campaign is in scope when it still exists on the platform, is not
    /// excluded, and passes the canary filter (when one is set).
    pub fn campaign_in_scope(&self, campaign: &LiveCampaign) -> bool {
        if campaign.status == crate::EntityStatus::Removed {
            return false;
        }
        if self.campaign_excluded(&campaign.name) {
            return false;
        }
        if let Some(canary) = &self.canary_label_filter {
            if !campaign.labels.contains(canary) {
                return false;
            }
        }
        true
    }

    /// Whether a label set carries our marker ("managed by us").
    pub fn is_managed(&self, labels: &BTreeSet<String>) -> bool {
        labels.contains(&self.label_marker)
    }
}

/// Ad groups labeled by this run, threaded forward through the orchestrator
/// so later reconcilers never re-query labels from an eventually-consistent
/// platform read.
#[derive(Clone, Debug, Default)]
pub struct LabelSet {
    labeled_ad_groups: BTreeSet<String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, ad_group_id: impl Into<String>) {
        self.labeled_ad_groups.insert(ad_group_id.into());
    }

    pub fn contains(&self, ad_group_id: &str) -> bool {
        self.labeled_ad_groups.contains(ad_group_id)
    }

    pub fn len(&self) -> usize {
        self.labeled_ad_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labeled_ad_groups.is_empty()
    }
}
