//! Schedule reconciler: add a default ad schedule to campaigns that have none.
//!
//! Only runs when `addBusinessHoursIfNone` is configured. Malformed "HH:MM"
//! strings fall back to Mon-Fri 09:00-18:00 rather than failing the run.

use adrec_config::{ConfigSnapshot, ScheduleSpec};
use serde_json::{json, Value};

use crate::{LiveState, MutationIntent, MutationKind, RunContext, TargetRef};

/// Parse "HH:MM" into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

fn day_blocks(spec: &ScheduleSpec) -> Vec<Value> {
    let (start, end) = match (parse_hhmm(&spec.start), parse_hhmm(&spec.end)) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => {
            let fallback = ScheduleSpec::business_hours();
            // 09:00 / 18:00 always parse
            (
                parse_hhmm(&fallback.start).unwrap_or(540),
                parse_hhmm(&fallback.end).unwrap_or(1080),
            )
        }
    };

    let days = if spec.days.is_empty() {
        ScheduleSpec::business_hours().days
    } else {
        spec.days.clone()
    };

    days.iter()
        .map(|day| {
            json!({
                "day": day,
                "startMinute": start,
                "endMinute": end,
            })
        })
        .collect()
}

/// Emit one AD_SCHEDULE_ADD per in-scope campaign that currently has zero
/// schedule blocks.
pub fn schedule_intents(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
) -> Vec<MutationIntent> {
    if !cfg.add_business_hours_if_none {
        return Vec::new();
    }

    let mut intents = Vec::new();
    for campaign in live.campaigns.values() {
        if !ctx.campaign_in_scope(campaign) || campaign.has_schedule {
            continue;
        }
        intents.push(MutationIntent::new(
            MutationKind::AdScheduleAdd,
            TargetRef::campaign(&campaign.id),
            json!({ "blocks": [] }),
            json!({ "blocks": day_blocks(&cfg.schedule_default) }),
            format!("'{}' has no ad schedule", campaign.name),
        ));
    }
    intents
}
