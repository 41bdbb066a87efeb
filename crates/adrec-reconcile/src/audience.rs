//! Audience reconciler: converge campaign-level audience attachments toward
//! the configured map.
//!
//! Bid modifiers are only proposed when the list size is known and at or
//! above the configured minimum. Unknown size means "unsafe to bid-adjust",
//! not "unsafe to attach": the attach intent is still emitted, with the
//! modifier omitted.

use adrec_config::ConfigSnapshot;
use serde_json::{json, Map, Value};

use crate::{LiveState, MutationIntent, MutationKind, RunContext, TargetRef};

pub fn audience_intents(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    for campaign in live.campaigns.values() {
        if !ctx.campaign_in_scope(campaign) {
            continue;
        }
        let configured = cfg.audience_map.get(&campaign.name);

        // Attach pass: configured pairs not yet present on the campaign.
        // The attachment itself is campaign-level, so a list configured by
        // several ad groups of one campaign yields a single intent.
        if let Some(groups) = configured {
            let mut proposed = std::collections::BTreeSet::new();
            for (group_name, spec) in groups {
                if ctx.ad_group_excluded(&campaign.name, group_name) {
                    continue;
                }
                let attached = live
                    .attachments_for(&campaign.id)
                    .any(|a| a.list_id == spec.list_id);
                if attached || !proposed.insert(spec.list_id) {
                    continue;
                }

                let known_size = live.audience_list_sizes.get(&spec.list_id).copied();
                let modifier = match (spec.bid_modifier, known_size) {
                    (Some(m), Some(size)) if size >= cfg.audience_min_size => Some(m),
                    _ => None,
                };

                let mut after = Map::new();
                after.insert("listId".into(), json!(spec.list_id));
                after.insert("mode".into(), json!(spec.mode.as_str()));
                if let Some(m) = modifier {
                    after.insert("bidModifier".into(), json!(m));
                }

                let size_note = match known_size {
                    Some(s) => format!("size {s}"),
                    None => "size unknown".to_string(),
                };
                intents.push(MutationIntent::new(
                    MutationKind::AudienceAttach,
                    TargetRef::campaign(&campaign.id),
                    Value::Null,
                    Value::Object(after),
                    format!(
                        "audience {} ({}) for '{}' / '{}', {size_note}",
                        spec.list_id,
                        spec.mode.as_str(),
                        campaign.name,
                        group_name
                    ),
                ));
            }
        }

        // Detach pass: live attachments whose list id no longer appears
        // anywhere in the campaign's configured map.
        for attachment in live.attachments_for(&campaign.id) {
            let still_wanted = configured
                .map(|groups| groups.values().any(|s| s.list_id == attachment.list_id))
                .unwrap_or(false);
            if still_wanted {
                continue;
            }
            intents.push(MutationIntent::new(
                MutationKind::AudienceDetach,
                TargetRef::campaign(&campaign.id),
                json!({
                    "listId": attachment.list_id,
                    "mode": attachment.mode.as_str(),
                }),
                Value::Null,
                format!(
                    "audience {} no longer configured for '{}'",
                    attachment.list_id, campaign.name
                ),
            ));
        }
    }

    intents
}
