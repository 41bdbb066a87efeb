//! Bidding reconciler: every managed campaign targets TARGET_SPEND with a
//! CPC ceiling.
//!
//! An intent is emitted only when the live strategy or ceiling actually
//! diverges. The platform treats re-applying an identical ceiling as a no-op,
//! but comparing first keeps the intent ledger itself idempotent: two
//! back-to-back runs over converged state log zero bidding intents.

use adrec_config::ConfigSnapshot;
use serde_json::json;

use crate::{BiddingStrategy, LiveState, MutationIntent, MutationKind, RunContext, TargetRef};

pub fn bidding_intents(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
) -> Vec<MutationIntent> {
    let mut intents = Vec::new();

    for campaign in live.campaigns.values() {
        if !ctx.campaign_in_scope(campaign) {
            continue;
        }
        let ceiling = cfg.effective_cpc_ceiling_micros(&campaign.name);
        let strategy_ok = campaign.bidding_strategy == BiddingStrategy::TargetSpend;
        let ceiling_ok = campaign.cpc_ceiling_micros == ceiling;
        if strategy_ok && ceiling_ok {
            continue;
        }

        let live_strategy: String = campaign.bidding_strategy.clone().into();
        intents.push(MutationIntent::new(
            MutationKind::BiddingStrategyChange,
            TargetRef::campaign(&campaign.id),
            json!({
                "strategy": live_strategy,
                "cpcCeilingMicros": campaign.cpc_ceiling_micros,
            }),
            json!({
                "strategy": "TARGET_SPEND",
                "cpcCeilingMicros": ceiling,
            }),
            format!(
                "'{}' bidding {} ceiling {} -> TARGET_SPEND ceiling {}",
                campaign.name, live_strategy, campaign.cpc_ceiling_micros, ceiling
            ),
        ));
    }

    intents
}
