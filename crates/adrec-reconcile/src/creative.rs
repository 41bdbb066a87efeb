//! Creative reconciler: generate one responsive search ad per in-scope ad
//! group that has neither a managed ad nor a dynamic-search-ad sibling.
//!
//! The label marker makes generation idempotent: a created ad carries the
//! marker, so the next run (live labels) and the same run (forward
//! [`LabelSet`]) both skip the ad group.

use adrec_config::ConfigSnapshot;
use serde_json::{json, Value};

use crate::{
    EntityStatus, LabelSet, LiveState, MutationIntent, MutationKind, RunContext, TargetRef,
};

pub const MAX_HEADLINE_LEN: usize = 30;
pub const MAX_DESCRIPTION_LEN: usize = 90;
pub const MAX_HEADLINES: usize = 15;
pub const MAX_DESCRIPTIONS: usize = 4;
/// Entries shorter than this after normalization are dropped.
pub const MIN_ITEM_LEN: usize = 3;

/// Platform minimums for a valid RSA.
const MIN_RSA_HEADLINES: usize = 3;
const MIN_RSA_DESCRIPTIONS: usize = 2;

/// Normalize one line: trim, drop repeated words (whitespace-normalized,
/// case-insensitive, first occurrence wins), truncate to `max_len` chars.
fn normalize_item(raw: &str, max_len: usize) -> String {
    let mut seen = std::collections::BTreeSet::new();
    let mut words: Vec<&str> = Vec::new();
    for w in raw.split_whitespace() {
        if seen.insert(w.to_lowercase()) {
            words.push(w);
        }
    }
    let joined = words.join(" ");
    let truncated: String = joined.chars().take(max_len).collect();
    truncated.trim_end().to_string()
}

/// Content lint: normalize each item, drop too-short entries, deduplicate
/// across the list case-insensitively, cap the item count.
pub fn lint_lines(items: &[String], max_len: usize, max_items: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for raw in items {
        let item = normalize_item(raw, max_len);
        if item.chars().count() < MIN_ITEM_LEN {
            continue;
        }
        if !seen.insert(item.to_lowercase()) {
            continue;
        }
        out.push(item);
        if out.len() == max_items {
            break;
        }
    }
    out
}

/// Infer the landing URL for an ad group from its existing ads, falling back
/// to the configured default.
fn infer_final_url(live: &LiveState, ad_group_id: &str, default_url: &str) -> String {
    live.ads_of(ad_group_id)
        .map(|a| a.final_url.trim())
        .find(|u| !u.is_empty())
        .unwrap_or(default_url.trim())
        .to_string()
}

/// Emit one RSA_CREATE per eligible ad group; marks each in `labels`.
pub fn creative_intents(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
    labels: &mut LabelSet,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    for group in live.ad_groups.values() {
        if group.status != EntityStatus::Enabled {
            continue;
        }
        let campaign = match live.campaigns.get(&group.campaign_id) {
            Some(c) if ctx.campaign_in_scope(c) => c,
            _ => continue,
        };
        if ctx.ad_group_excluded(&campaign.name, &group.name) {
            continue;
        }
        if labels.contains(&group.id) {
            continue;
        }
        let mut has_managed_ad = false;
        let mut has_dsa = false;
        for ad in live.ads_of(&group.id) {
            if ctx.is_managed(&ad.labels) {
                has_managed_ad = true;
            }
            if ad.is_dynamic_search_ad {
                has_dsa = true;
            }
        }
        if has_managed_ad || has_dsa {
            continue;
        }

        let final_url = infer_final_url(live, &group.id, &cfg.default_final_url);
        if final_url.is_empty() {
            // No landing page anywhere: nothing safe to create.
            continue;
        }

        let content = cfg
            .rsa_overrides
            .get(&campaign.name)
            .and_then(|m| m.get(&group.name));
        let headlines = lint_lines(
            content.map(|c| c.headlines.as_slice()).unwrap_or(&cfg.default_headlines),
            MAX_HEADLINE_LEN,
            MAX_HEADLINES,
        );
        let descriptions = lint_lines(
            content
                .map(|c| c.descriptions.as_slice())
                .unwrap_or(&cfg.default_descriptions),
            MAX_DESCRIPTION_LEN,
            MAX_DESCRIPTIONS,
        );
        if headlines.len() < MIN_RSA_HEADLINES || descriptions.len() < MIN_RSA_DESCRIPTIONS {
            continue;
        }

        intents.push(MutationIntent::new(
            MutationKind::RsaCreate,
            TargetRef::ad_group(&campaign.id, &group.id),
            Value::Null,
            json!({
                "headlines": headlines,
                "descriptions": descriptions,
                "finalUrl": final_url,
                "labels": [ctx.label_marker.clone()],
            }),
            format!("no managed ad in '{}' / '{}'", campaign.name, group.name),
        ));
        labels.mark(&group.id);
    }

    intents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_truncates_and_dedupes() {
        let items = vec![
            "  Best Best Shoes  ".to_string(),
            "best shoes".to_string(),
            "ok".to_string(),
            "A very long headline that certainly exceeds thirty characters".to_string(),
        ];
        let out = lint_lines(&items, MAX_HEADLINE_LEN, MAX_HEADLINES);
        assert_eq!(out[0], "Best Shoes");
        // "best shoes" is a case-insensitive duplicate of the normalized first item.
        assert_eq!(out.len(), 2);
        assert!(out[1].chars().count() <= MAX_HEADLINE_LEN);
    }

    #[test]
    fn lint_caps_item_count() {
        let items: Vec<String> = (0..30).map(|i| format!("headline number {i}")).collect();
        assert_eq!(lint_lines(&items, MAX_HEADLINE_LEN, MAX_HEADLINES).len(), MAX_HEADLINES);
    }

    #[test]
    fn lint_drops_short_entries() {
        let items = vec!["ab".to_string(), "abc".to_string()];
        assert_eq!(lint_lines(&items, MAX_HEADLINE_LEN, MAX_HEADLINES), vec!["abc"]);
    }
}
