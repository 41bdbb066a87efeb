//! Budget reconciler: cap daily budgets, never raise them.
//!
//! Raising a budget is exclusively the pacing path's job
//! (CAMPAIGN_BUDGET_CHANGE); this family only converges downward toward the
//! effective cap.

use adrec_config::ConfigSnapshot;
use serde_json::json;

use crate::{LiveState, MutationIntent, MutationKind, RunContext, TargetRef};

/// Emit one BUDGET_CHANGE per in-scope campaign whose live budget exceeds its
/// effective cap. `after` is always the cap, so `before > after` holds for
/// every emitted intent.
pub fn budget_intents(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    for campaign in live.campaigns.values() {
        if !ctx.campaign_in_scope(campaign) {
            continue;
        }
        let cap = cfg.effective_budget_cap_micros(&campaign.name);
        if campaign.budget_micros > cap {
            intents.push(MutationIntent::new(
                MutationKind::BudgetChange,
                TargetRef::campaign(&campaign.id),
                json!({ "budgetMicros": campaign.budget_micros }),
                json!({ "budgetMicros": cap }),
                format!(
                    "daily budget {} exceeds cap {} for '{}'",
                    campaign.budget_micros, cap, campaign.name
                ),
            ));
        }
    }

    intents
}
