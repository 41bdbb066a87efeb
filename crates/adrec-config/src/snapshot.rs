//! ConfigSnapshot — deserialize the config service's wire JSON and validate it
//! into the typed desired-state record used by every reconciler.
//!
//! # Design constraints
//! - Pure, deterministic conversion. No IO.
//! - All shape problems are decided here, once. Either the snapshot loads and
//!   every nested map is well-formed, or loading fails with a CONFIG_* error.
//! - Soft problems (an unknown audience mode) degrade with a recorded warning
//!   instead of failing the run.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{canonical_json, sha256_hex, units_to_micros};

/// Conservative fallback applied when a tenant ships an empty reserved list.
/// The reserved-keyword guard must never be fully open.
pub const DEFAULT_RESERVED_TERMS: &[&str] = &["brand", "official"];

/// Default minimum audience list size before a bid modifier may be proposed.
const DEFAULT_AUDIENCE_MIN_SIZE: i64 = 1000;

const KNOWN_DAYS: &[&str] = &[
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

/// How an audience list is attached to a campaign.
///
/// Unknown wire values degrade to `Observe` (never fail the run); the
/// degradation is recorded in [`ConfigSnapshot::validation_warnings`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudienceMode {
    Observe,
    Target,
    Exclude,
}

impl AudienceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudienceMode::Observe => "OBSERVE",
            AudienceMode::Target => "TARGET",
            AudienceMode::Exclude => "EXCLUDE",
        }
    }
}

/// One configured audience attachment for a (campaign, ad group) pair.
#[derive(Clone, Debug, PartialEq)]
pub struct AudienceSpec {
    pub list_id: i64,
    pub mode: AudienceMode,
    pub bid_modifier: Option<f64>,
}

/// Default ad schedule: days plus "HH:MM" start/end.
///
/// The strings are kept raw here; the schedule reconciler parses them and
/// falls back to business hours on malformed input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub days: Vec<String>,
    pub start: String,
    pub end: String,
}

impl ScheduleSpec {
    pub fn business_hours() -> Self {
        Self {
            days: KNOWN_DAYS[..5].iter().map(|d| d.to_string()).collect(),
            start: "09:00".to_string(),
            end: "18:00".to_string(),
        }
    }
}

/// RSA headline/description overrides for one ad group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RsaContent {
    pub headlines: Vec<String>,
    pub descriptions: Vec<String>,
}

/// Immutable, validated desired-state record for one tenant.
///
/// Campaigns and ad groups are referenced by *name* throughout (the config is
/// human-written; platform ids are only known live-side).
#[derive(Clone, Debug)]
pub struct ConfigSnapshot {
    pub tenant_id: String,
    pub enabled: bool,
    /// Global live-mutation gate. Applying anything requires this AND
    /// production mode.
    pub promote: bool,
    /// Tag applied to every entity this engine creates or touches.
    pub label_marker: String,
    /// When set, only campaigns carrying this label are in scope.
    pub canary_label_filter: Option<String>,

    pub daily_budget_cap_default_micros: i64,
    pub budget_cap_overrides_micros: BTreeMap<String, i64>,
    pub cpc_ceiling_default_micros: i64,
    pub cpc_ceiling_overrides_micros: BTreeMap<String, i64>,

    pub schedule_default: ScheduleSpec,
    pub add_business_hours_if_none: bool,

    pub master_negative_keywords: BTreeSet<String>,
    /// campaign -> ad group -> candidate negative terms.
    pub waste_negative_map: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    reserved_keywords: BTreeSet<String>,
    /// campaign -> None (whole campaign skipped) | Some(ad groups skipped).
    pub exclusions: BTreeMap<String, Option<BTreeSet<String>>>,

    pub rsa_overrides: BTreeMap<String, BTreeMap<String, RsaContent>>,
    pub default_final_url: String,
    pub default_headlines: Vec<String>,
    pub default_descriptions: Vec<String>,

    pub audience_map: BTreeMap<String, BTreeMap<String, AudienceSpec>>,
    pub audience_min_size: i64,

    pub mining_cost_threshold_micros: i64,
    pub mining_lookback_days: u32,

    /// Soft degradations recorded during validation (run-report visible).
    pub validation_warnings: Vec<String>,

    config_hash: String,
}

impl ConfigSnapshot {
    /// Validate the config service's wire JSON into a snapshot.
    ///
    /// Hard failures (CONFIG_*) are reserved for values the engine cannot run
    /// with; anything survivable degrades with a warning instead.
    pub fn from_json(raw: Value) -> Result<Self> {
        let config_hash = sha256_hex(canonical_json(&raw).as_bytes());
        let wire: WireConfig =
            serde_json::from_value(raw).context("CONFIG_PARSE: malformed config document")?;

        let mut warnings: Vec<String> = Vec::new();

        if wire.tenant_id.trim().is_empty() {
            bail!("CONFIG_INVALID: tenantId is empty");
        }
        if wire.label_marker.trim().is_empty() {
            bail!("CONFIG_INVALID: labelMarker is empty");
        }
        if wire.daily_budget_cap_default <= 0.0 {
            bail!(
                "CONFIG_INVALID: dailyBudgetCapDefault must be > 0, got {}",
                wire.daily_budget_cap_default
            );
        }
        if wire.cpc_ceiling_default <= 0.0 {
            bail!(
                "CONFIG_INVALID: cpcCeilingDefault must be > 0, got {}",
                wire.cpc_ceiling_default
            );
        }

        let budget_cap_overrides_micros =
            validate_money_map("budgetCapOverrides", &wire.budget_cap_overrides)?;
        let cpc_ceiling_overrides_micros =
            validate_money_map("cpcCeilingOverrides", &wire.cpc_ceiling_overrides)?;

        let schedule_default = match wire.schedule_default {
            Some(s) => {
                let days: Vec<String> = s
                    .days
                    .iter()
                    .map(|d| d.trim().to_ascii_uppercase())
                    .filter(|d| {
                        let known = KNOWN_DAYS.contains(&d.as_str());
                        if !known {
                            warnings.push(format!("scheduleDefault: unknown day '{d}' dropped"));
                        }
                        known
                    })
                    .collect();
                if days.is_empty() {
                    warnings.push("scheduleDefault: no valid days, using business hours".into());
                    ScheduleSpec::business_hours()
                } else {
                    ScheduleSpec {
                        days,
                        start: s.start,
                        end: s.end,
                    }
                }
            }
            None => ScheduleSpec::business_hours(),
        };

        let master_negative_keywords: BTreeSet<String> = wire
            .master_negative_keywords
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        let mut waste_negative_map: BTreeMap<String, BTreeMap<String, BTreeSet<String>>> =
            BTreeMap::new();
        for (campaign, groups) in &wire.waste_negative_map {
            if campaign.trim().is_empty() {
                bail!("CONFIG_INVALID: wasteNegativeMap has empty campaign key");
            }
            let mut by_group: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for (group, terms) in groups {
                if group.trim().is_empty() {
                    bail!(
                        "CONFIG_INVALID: wasteNegativeMap['{campaign}'] has empty ad group key"
                    );
                }
                let cleaned: BTreeSet<String> = terms
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                if !cleaned.is_empty() {
                    by_group.insert(group.clone(), cleaned);
                }
            }
            if !by_group.is_empty() {
                waste_negative_map.insert(campaign.clone(), by_group);
            }
        }

        let reserved_keywords: BTreeSet<String> = wire
            .reserved_keywords
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut exclusions: BTreeMap<String, Option<BTreeSet<String>>> = BTreeMap::new();
        for (campaign, groups) in &wire.exclusions {
            if campaign.trim().is_empty() {
                bail!("CONFIG_INVALID: exclusions has empty campaign key");
            }
            exclusions.insert(
                campaign.clone(),
                groups
                    .as_ref()
                    .map(|gs| gs.iter().map(|g| g.trim().to_string()).collect()),
            );
        }

        let mut rsa_overrides: BTreeMap<String, BTreeMap<String, RsaContent>> = BTreeMap::new();
        for (campaign, groups) in &wire.rsa_overrides {
            if campaign.trim().is_empty() {
                bail!("CONFIG_INVALID: rsaOverrides has empty campaign key");
            }
            let mut by_group = BTreeMap::new();
            for (group, content) in groups {
                if group.trim().is_empty() {
                    bail!("CONFIG_INVALID: rsaOverrides['{campaign}'] has empty ad group key");
                }
                by_group.insert(
                    group.clone(),
                    RsaContent {
                        headlines: content.headlines.clone(),
                        descriptions: content.descriptions.clone(),
                    },
                );
            }
            rsa_overrides.insert(campaign.clone(), by_group);
        }

        let mut audience_map: BTreeMap<String, BTreeMap<String, AudienceSpec>> = BTreeMap::new();
        for (campaign, groups) in &wire.audience_map {
            if campaign.trim().is_empty() {
                bail!("CONFIG_INVALID: audienceMap has empty campaign key");
            }
            let mut by_group = BTreeMap::new();
            for (group, spec) in groups {
                if spec.list_id <= 0 {
                    warnings.push(format!(
                        "audienceMap['{campaign}']['{group}']: listId {} invalid, entry dropped",
                        spec.list_id
                    ));
                    continue;
                }
                let mode = match spec.mode.trim().to_ascii_uppercase().as_str() {
                    "OBSERVE" | "" => AudienceMode::Observe,
                    "TARGET" => AudienceMode::Target,
                    "EXCLUDE" => AudienceMode::Exclude,
                    other => {
                        warnings.push(format!(
                            "audienceMap['{campaign}']['{group}']: unknown mode '{other}', \
                             degraded to OBSERVE"
                        ));
                        AudienceMode::Observe
                    }
                };
                by_group.insert(
                    group.clone(),
                    AudienceSpec {
                        list_id: spec.list_id,
                        mode,
                        bid_modifier: spec.bid_modifier,
                    },
                );
            }
            if !by_group.is_empty() {
                audience_map.insert(campaign.clone(), by_group);
            }
        }

        let audience_min_size = wire.audience_min_size.unwrap_or(DEFAULT_AUDIENCE_MIN_SIZE);
        if audience_min_size < 0 {
            bail!("CONFIG_INVALID: audienceMinSize must be >= 0");
        }

        Ok(Self {
            tenant_id: wire.tenant_id,
            enabled: wire.enabled,
            promote: wire.promote,
            label_marker: wire.label_marker,
            canary_label_filter: wire
                .canary_label_filter
                .filter(|s| !s.trim().is_empty()),
            daily_budget_cap_default_micros: units_to_micros(wire.daily_budget_cap_default),
            budget_cap_overrides_micros,
            cpc_ceiling_default_micros: units_to_micros(wire.cpc_ceiling_default),
            cpc_ceiling_overrides_micros,
            schedule_default,
            add_business_hours_if_none: wire.add_business_hours_if_none,
            master_negative_keywords,
            waste_negative_map,
            reserved_keywords,
            exclusions,
            rsa_overrides,
            default_final_url: wire.default_final_url,
            default_headlines: wire.default_headlines,
            default_descriptions: wire.default_descriptions,
            audience_map,
            audience_min_size,
            mining_cost_threshold_micros: units_to_micros(wire.mining_cost_threshold),
            mining_lookback_days: wire.mining_lookback_days,
            validation_warnings: warnings,
            config_hash,
        })
    }

    /// sha256 over the canonical (key-sorted, compact) wire JSON.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    /// Campaign-specific budget cap override, else the tenant default.
    pub fn effective_budget_cap_micros(&self, campaign: &str) -> i64 {
        *self
            .budget_cap_overrides_micros
            .get(campaign)
            .unwrap_or(&self.daily_budget_cap_default_micros)
    }

    /// Campaign-specific CPC ceiling override, else the tenant default.
    pub fn effective_cpc_ceiling_micros(&self, campaign: &str) -> i64 {
        *self
            .cpc_ceiling_overrides_micros
            .get(campaign)
            .unwrap_or(&self.cpc_ceiling_default_micros)
    }

    /// Configured reserved terms, lowercased; falls back to
    /// [`DEFAULT_RESERVED_TERMS`] when the tenant list is empty.
    pub fn reserved_keywords_effective(&self) -> BTreeSet<String> {
        if self.reserved_keywords.is_empty() {
            DEFAULT_RESERVED_TERMS.iter().map(|t| t.to_string()).collect()
        } else {
            self.reserved_keywords.clone()
        }
    }
}

fn validate_money_map(field: &str, map: &BTreeMap<String, f64>) -> Result<BTreeMap<String, i64>> {
    let mut out = BTreeMap::new();
    for (campaign, units) in map {
        if campaign.trim().is_empty() {
            bail!("CONFIG_INVALID: {field} has empty campaign key");
        }
        if *units <= 0.0 {
            bail!("CONFIG_INVALID: {field}['{campaign}'] must be > 0, got {units}");
        }
        out.insert(campaign.clone(), units_to_micros(*units));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Wire structs (config service camelCase schema)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConfig {
    tenant_id: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    promote: bool,
    label_marker: String,
    #[serde(default)]
    canary_label_filter: Option<String>,

    daily_budget_cap_default: f64,
    #[serde(default)]
    budget_cap_overrides: BTreeMap<String, f64>,
    cpc_ceiling_default: f64,
    #[serde(default)]
    cpc_ceiling_overrides: BTreeMap<String, f64>,

    #[serde(default)]
    schedule_default: Option<WireSchedule>,
    #[serde(default)]
    add_business_hours_if_none: bool,

    #[serde(default)]
    master_negative_keywords: Vec<String>,
    #[serde(default)]
    waste_negative_map: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    reserved_keywords: Vec<String>,
    #[serde(default)]
    exclusions: BTreeMap<String, Option<Vec<String>>>,

    #[serde(default)]
    rsa_overrides: BTreeMap<String, BTreeMap<String, WireRsaContent>>,
    #[serde(default)]
    default_final_url: String,
    #[serde(default)]
    default_headlines: Vec<String>,
    #[serde(default)]
    default_descriptions: Vec<String>,

    #[serde(default)]
    audience_map: BTreeMap<String, BTreeMap<String, WireAudienceSpec>>,
    #[serde(default)]
    audience_min_size: Option<i64>,

    #[serde(default = "default_mining_cost_threshold")]
    mining_cost_threshold: f64,
    #[serde(default = "default_mining_lookback_days")]
    mining_lookback_days: u32,
}

fn default_mining_cost_threshold() -> f64 {
    2.0
}

fn default_mining_lookback_days() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
struct WireSchedule {
    #[serde(default)]
    days: Vec<String>,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
}

#[derive(Debug, Deserialize)]
struct WireRsaContent {
    #[serde(default)]
    headlines: Vec<String>,
    #[serde(default)]
    descriptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAudienceSpec {
    #[serde(default)]
    list_id: i64,
    #[serde(default)]
    mode: String,
    #[serde(default)]
    bid_modifier: Option<f64>,
}
