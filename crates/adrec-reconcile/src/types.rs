use std::collections::{BTreeMap, BTreeSet};

use adrec_config::AudienceMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entity status as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Enabled,
    Paused,
    Removed,
}

/// Campaign bidding strategy. Only `TargetSpend` is ever desired; everything
/// else round-trips as its raw platform string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BiddingStrategy {
    TargetSpend,
    Other(String),
}

impl From<String> for BiddingStrategy {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("TARGET_SPEND") {
            BiddingStrategy::TargetSpend
        } else {
            BiddingStrategy::Other(s)
        }
    }
}

impl From<BiddingStrategy> for String {
    fn from(b: BiddingStrategy) -> String {
        match b {
            BiddingStrategy::TargetSpend => "TARGET_SPEND".to_string(),
            BiddingStrategy::Other(s) => s,
        }
    }
}

/// Read-only projection of a live campaign. Never cached across runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveCampaign {
    pub id: String,
    pub name: String,
    pub status: EntityStatus,
    pub budget_micros: i64,
    pub bidding_strategy: BiddingStrategy,
    pub cpc_ceiling_micros: i64,
    #[serde(default)]
    pub has_schedule: bool,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAdGroup {
    pub id: String,
    pub name: String,
    pub campaign_id: String,
    pub status: EntityStatus,
    #[serde(default)]
    pub bid_modifier: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAd {
    pub id: String,
    pub ad_group_id: String,
    #[serde(default)]
    pub headlines: Vec<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
    #[serde(default)]
    pub final_url: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub is_dynamic_search_ad: bool,
}

/// The tenant-wide shared negative keyword list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegativeList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub terms: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAudienceAttachment {
    pub list_id: i64,
    pub campaign_id: String,
    pub mode: AudienceMode,
    #[serde(default)]
    pub bid_modifier: Option<f64>,
}

/// Current truth of the external advertising account for one tenant, as far
/// as this engine reads it. Assembled fresh at run start.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveState {
    /// campaign id -> campaign
    pub campaigns: BTreeMap<String, LiveCampaign>,
    /// ad group id -> ad group
    pub ad_groups: BTreeMap<String, LiveAdGroup>,
    /// ad id -> ad
    pub ads: BTreeMap<String, LiveAd>,
    pub shared_negative_list: Option<NegativeList>,
    /// campaign ids the shared list is attached to
    pub negative_list_attached: BTreeSet<String>,
    /// ad group id -> ad-group-level negative terms
    pub adgroup_negatives: BTreeMap<String, BTreeSet<String>>,
    pub audience_attachments: Vec<LiveAudienceAttachment>,
    /// audience list id -> member count, where the platform reports one
    pub audience_list_sizes: BTreeMap<i64, i64>,
}

impl LiveState {
    pub fn campaign_by_name(&self, name: &str) -> Option<&LiveCampaign> {
        self.campaigns.values().find(|c| c.name == name)
    }

    pub fn ad_groups_of<'a>(
        &'a self,
        campaign_id: &'a str,
    ) -> impl Iterator<Item = &'a LiveAdGroup> {
        self.ad_groups
            .values()
            .filter(move |g| g.campaign_id == campaign_id)
    }

    pub fn ads_of<'a>(&'a self, ad_group_id: &'a str) -> impl Iterator<Item = &'a LiveAd> {
        self.ads
            .values()
            .filter(move |a| a.ad_group_id == ad_group_id)
    }

    pub fn attachments_for<'a>(
        &'a self,
        campaign_id: &'a str,
    ) -> impl Iterator<Item = &'a LiveAudienceAttachment> {
        self.audience_attachments
            .iter()
            .filter(move |a| a.campaign_id == campaign_id)
    }
}

/// Class of mutation an intent describes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    BudgetChange,
    BiddingStrategyChange,
    AdScheduleAdd,
    MasterNegativeAdd,
    NegativeListAttach,
    AdgroupNegativeAdd,
    RsaCreate,
    AudienceAttach,
    AudienceDetach,
    AdgroupPause,
    CampaignBudgetChange,
    BidModifierChange,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::BudgetChange => "BUDGET_CHANGE",
            MutationKind::BiddingStrategyChange => "BIDDING_STRATEGY_CHANGE",
            MutationKind::AdScheduleAdd => "AD_SCHEDULE_ADD",
            MutationKind::MasterNegativeAdd => "MASTER_NEGATIVE_ADD",
            MutationKind::NegativeListAttach => "NEGATIVE_LIST_ATTACH",
            MutationKind::AdgroupNegativeAdd => "ADGROUP_NEGATIVE_ADD",
            MutationKind::RsaCreate => "RSA_CREATE",
            MutationKind::AudienceAttach => "AUDIENCE_ATTACH",
            MutationKind::AudienceDetach => "AUDIENCE_DETACH",
            MutationKind::AdgroupPause => "ADGROUP_PAUSE",
            MutationKind::CampaignBudgetChange => "CAMPAIGN_BUDGET_CHANGE",
            MutationKind::BidModifierChange => "BID_MODIFIER_CHANGE",
        }
    }
}

/// What a mutation points at. `entity_id` carries kind-specific targets
/// (shared list id, audience list id, ad id).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub ad_group_id: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
}

impl TargetRef {
    pub fn campaign(id: impl Into<String>) -> Self {
        Self {
            campaign_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn ad_group(campaign_id: impl Into<String>, ad_group_id: impl Into<String>) -> Self {
        Self {
            campaign_id: Some(campaign_id.into()),
            ad_group_id: Some(ad_group_id.into()),
            ..Self::default()
        }
    }

    pub fn entity(id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Compact human-readable form for logs.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(c) = &self.campaign_id {
            parts.push(format!("campaign={c}"));
        }
        if let Some(g) = &self.ad_group_id {
            parts.push(format!("adGroup={g}"));
        }
        if let Some(e) = &self.entity_id {
            parts.push(format!("entity={e}"));
        }
        parts.join(" ")
    }
}

/// One proposed mutation. Created by a reconciler, consumed exactly once by
/// the executor, never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationIntent {
    pub kind: MutationKind,
    pub target: TargetRef,
    pub before: Value,
    pub after: Value,
    pub reason: String,
}

impl MutationIntent {
    pub fn new(
        kind: MutationKind,
        target: TargetRef,
        before: Value,
        after: Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            before,
            after,
            reason: reason.into(),
        }
    }
}
