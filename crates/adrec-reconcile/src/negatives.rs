//! Negative-keyword reconciler.
//!
//! Two sub-paths:
//! - master list: diff the configured master set against the shared list's
//!   current terms (case-insensitive), then attach the shared list to every
//!   in-scope campaign that lacks it.
//! - ad-group path: per (campaign, ad group) candidate terms from the waste
//!   map or search-term mining, deduplicated and diffed against live
//!   ad-group negatives.
//!
//! The reserved-keyword guard sits in front of both paths: a term containing
//! a reserved substring is dropped before it can become an intent.

use std::collections::{BTreeMap, BTreeSet};

use adrec_config::ConfigSnapshot;
use serde_json::{json, Value};

use crate::{LiveState, MutationIntent, MutationKind, RunContext, TargetRef};

/// campaign name -> ad group name -> candidate negative terms.
pub type WasteMap = BTreeMap<String, BTreeMap<String, BTreeSet<String>>>;

/// Master-list sub-path: MASTER_NEGATIVE_ADD per missing term, then
/// NEGATIVE_LIST_ATTACH per unattached in-scope campaign.
pub fn master_negative_intents(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    let list_target: TargetRef = match &live.shared_negative_list {
        Some(list) => TargetRef::entity(&list.id),
        // No shared list yet: the platform client creates it on first add.
        None => TargetRef::default(),
    };
    let existing_lower: BTreeSet<String> = live
        .shared_negative_list
        .as_ref()
        .map(|l| l.terms.iter().map(|t| t.to_lowercase()).collect())
        .unwrap_or_default();

    for term in &cfg.master_negative_keywords {
        if ctx.is_reserved(term) {
            continue;
        }
        if existing_lower.contains(&term.to_lowercase()) {
            continue;
        }
        intents.push(MutationIntent::new(
            MutationKind::MasterNegativeAdd,
            list_target.clone(),
            Value::Null,
            json!({ "term": term }),
            format!("master negative '{term}' missing from shared list"),
        ));
    }

    for campaign in live.campaigns.values() {
        if !ctx.campaign_in_scope(campaign) {
            continue;
        }
        if live.negative_list_attached.contains(&campaign.id) {
            continue;
        }
        intents.push(MutationIntent::new(
            MutationKind::NegativeListAttach,
            TargetRef::campaign(&campaign.id),
            Value::Null,
            json!({ "sharedList": true }),
            format!("shared negative list not attached to '{}'", campaign.name),
        ));
    }

    intents
}

/// Ad-group sub-path: one ADGROUP_NEGATIVE_ADD per unique candidate term not
/// already live on that ad group and not planned earlier in this run
/// (`already`: (ad group id, lowercased term) pairs).
pub fn adgroup_negative_intents(
    ctx: &RunContext,
    live: &LiveState,
    candidates: &WasteMap,
    already: &BTreeSet<(String, String)>,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    for (campaign_name, groups) in candidates {
        let campaign = match live.campaign_by_name(campaign_name) {
            Some(c) if ctx.campaign_in_scope(c) => c,
            _ => continue,
        };
        for (group_name, terms) in groups {
            if ctx.ad_group_excluded(campaign_name, group_name) {
                continue;
            }
            let group = match live
                .ad_groups_of(&campaign.id)
                .find(|g| &g.name == group_name)
            {
                Some(g) => g,
                None => continue,
            };
            let live_lower: BTreeSet<String> = live
                .adgroup_negatives
                .get(&group.id)
                .map(|ts| ts.iter().map(|t| t.to_lowercase()).collect())
                .unwrap_or_default();

            let mut seen_this_group: BTreeSet<String> = BTreeSet::new();
            for term in terms {
                let lower = term.to_lowercase();
                if !seen_this_group.insert(lower.clone()) {
                    continue;
                }
                if ctx.is_reserved(term) {
                    continue;
                }
                if live_lower.contains(&lower) {
                    continue;
                }
                if already.contains(&(group.id.clone(), lower)) {
                    continue;
                }
                intents.push(MutationIntent::new(
                    MutationKind::AdgroupNegativeAdd,
                    TargetRef::ad_group(&campaign.id, &group.id),
                    Value::Null,
                    json!({ "term": term }),
                    format!("negative '{term}' for '{campaign_name}' / '{group_name}'"),
                ));
            }
        }
    }

    intents
}
