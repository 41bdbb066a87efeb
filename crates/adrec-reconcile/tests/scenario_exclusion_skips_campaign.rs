//! Exclusion guard scenarios.
//!
//! GREEN when:
//! - A campaign listed with no ad-group keys is skipped by every family.
//! - A campaign listed with specific ad groups only skips those ad groups.
//! - A canary label filter restricts scope to labeled campaigns.

use std::collections::BTreeSet;

use adrec_config::{ConfigSnapshot, RunMode};
use adrec_reconcile::*;
use serde_json::json;

fn config() -> ConfigSnapshot {
    ConfigSnapshot::from_json(json!({
        "tenantId": "acme",
        "enabled": true,
        "promote": true,
        "labelMarker": "adrec-managed",
        "dailyBudgetCapDefault": 3.0,
        "cpcCeilingDefault": 0.40,
        "addBusinessHoursIfNone": true,
        "masterNegativeKeywords": ["junk traffic"],
        "wasteNegativeMap": {
            "Excluded": {"G": ["term a"]},
            "Partial": {"Blocked": ["term b"], "Open": ["term c"]}
        },
        "exclusions": {"Excluded": null, "Partial": ["Blocked"]},
    }))
    .unwrap()
}

fn campaign(id: &str, name: &str) -> LiveCampaign {
    LiveCampaign {
        id: id.to_string(),
        name: name.to_string(),
        status: EntityStatus::Enabled,
        budget_micros: 9_000_000, // above cap, would emit if in scope
        bidding_strategy: BiddingStrategy::Other("MANUAL_CPC".into()),
        cpc_ceiling_micros: 0,
        has_schedule: false,
        labels: Default::default(),
    }
}

fn ad_group(id: &str, name: &str, campaign_id: &str) -> LiveAdGroup {
    LiveAdGroup {
        id: id.to_string(),
        name: name.to_string(),
        campaign_id: campaign_id.to_string(),
        status: EntityStatus::Enabled,
        bid_modifier: None,
    }
}

fn live() -> LiveState {
    let mut live = LiveState::default();
    for c in [campaign("c1", "Excluded"), campaign("c2", "Partial")] {
        live.campaigns.insert(c.id.clone(), c);
    }
    for g in [
        ad_group("g1", "G", "c1"),
        ad_group("g2", "Blocked", "c2"),
        ad_group("g3", "Open", "c2"),
    ] {
        live.ad_groups.insert(g.id.clone(), g);
    }
    live
}

fn all_family_intents(cfg: &ConfigSnapshot, ctx: &RunContext, live: &LiveState) -> Vec<MutationIntent> {
    let mut labels = LabelSet::new();
    let mut all = Vec::new();
    all.extend(budget_intents(cfg, ctx, live));
    all.extend(bidding_intents(cfg, ctx, live));
    all.extend(schedule_intents(cfg, ctx, live));
    all.extend(master_negative_intents(cfg, ctx, live));
    all.extend(adgroup_negative_intents(
        ctx,
        live,
        &cfg.waste_negative_map,
        &BTreeSet::new(),
    ));
    all.extend(creative_intents(cfg, ctx, live, &mut labels));
    all.extend(audience_intents(cfg, ctx, live));
    all
}

#[test]
fn fully_excluded_campaign_gets_zero_intents() {
    let cfg = config();
    let ctx = RunContext::derive(&cfg, RunMode::Production).unwrap();
    let live = live();

    let all = all_family_intents(&cfg, &ctx, &live);
    for i in &all {
        assert_ne!(
            i.target.campaign_id.as_deref(),
            Some("c1"),
            "excluded campaign referenced by {:?}: {}",
            i.kind,
            i.reason
        );
    }
    // The non-excluded campaign still reconciles.
    assert!(all.iter().any(|i| i.target.campaign_id.as_deref() == Some("c2")));
}

#[test]
fn partial_exclusion_only_skips_listed_ad_groups() {
    let cfg = config();
    let ctx = RunContext::derive(&cfg, RunMode::Production).unwrap();
    let live = live();

    let negs = adgroup_negative_intents(&ctx, &live, &cfg.waste_negative_map, &BTreeSet::new());
    let groups: Vec<&str> = negs
        .iter()
        .map(|i| i.target.ad_group_id.as_deref().unwrap())
        .collect();
    assert_eq!(groups, vec!["g3"]); // "Blocked"/g2 skipped, "Open"/g3 kept
}

#[test]
fn canary_filter_restricts_scope() {
    let mut raw = json!({
        "tenantId": "acme",
        "enabled": true,
        "promote": true,
        "labelMarker": "adrec-managed",
        "canaryLabelFilter": "adrec-canary",
        "dailyBudgetCapDefault": 3.0,
        "cpcCeilingDefault": 0.40,
    });
    raw["addBusinessHoursIfNone"] = json!(false);
    let cfg = ConfigSnapshot::from_json(raw).unwrap();
    let ctx = RunContext::derive(&cfg, RunMode::Production).unwrap();

    let mut live = LiveState::default();
    let mut in_canary = campaign("c1", "A");
    in_canary.labels.insert("adrec-canary".into());
    let outside = campaign("c2", "B");
    live.campaigns.insert("c1".into(), in_canary);
    live.campaigns.insert("c2".into(), outside);

    let budgets = budget_intents(&cfg, &ctx, &live);
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].target.campaign_id.as_deref(), Some("c1"));
}
