//! MutationExecutor — gate check, dispatch, ledger append.

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, warn};

use adrec_audit::{Disposition, MutationLog};
use adrec_reconcile::{MutationIntent, MutationKind, RunContext};

use crate::PlatformClient;

/// Result of executing one intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutcome {
    pub applied: bool,
    pub error: Option<String>,
}

impl ExecOutcome {
    fn planned() -> Self {
        Self {
            applied: false,
            error: None,
        }
    }

    fn applied() -> Self {
        Self {
            applied: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            applied: false,
            error: Some(error),
        }
    }
}

/// Single apply path for all mutations in one run.
pub struct MutationExecutor<'a, C: PlatformClient> {
    ctx: &'a RunContext,
    client: &'a mut C,
    log: &'a mut MutationLog,
}

impl<'a, C: PlatformClient> MutationExecutor<'a, C> {
    pub fn new(ctx: &'a RunContext, client: &'a mut C, log: &'a mut MutationLog) -> Self {
        Self { ctx, client, log }
    }

    /// Execute one intent: gate, dispatch, append. Exactly one ledger entry
    /// results from this call no matter which path is taken.
    pub fn execute(&mut self, intent: &MutationIntent) -> ExecOutcome {
        if !self.ctx.allow(intent.kind) {
            self.append(intent, Disposition::Planned, None);
            return ExecOutcome::planned();
        }

        match dispatch(self.client, intent) {
            Ok(()) => {
                debug!(
                    kind = intent.kind.as_str(),
                    target = %intent.target.describe(),
                    "mutation applied"
                );
                self.append(intent, Disposition::Applied, None);
                ExecOutcome::applied()
            }
            Err(e) => {
                // Local failure boundary: record, keep going.
                warn!(
                    kind = intent.kind.as_str(),
                    target = %intent.target.describe(),
                    error = %e,
                    "mutation failed; run continues"
                );
                let msg = e.to_string();
                self.append(intent, Disposition::Failed, Some(msg.clone()));
                ExecOutcome::failed(msg)
            }
        }
    }

    /// Execute a batch in order. Returns (applied, failed) counts.
    pub fn execute_all(&mut self, intents: &[MutationIntent]) -> (u64, u64) {
        let mut applied = 0;
        let mut failed = 0;
        for intent in intents {
            let outcome = self.execute(intent);
            if outcome.applied {
                applied += 1;
            } else if outcome.error.is_some() {
                failed += 1;
            }
        }
        (applied, failed)
    }

    fn append(&mut self, intent: &MutationIntent, disposition: Disposition, err: Option<String>) {
        if let Err(e) = self.log.append(intent, disposition, err) {
            // Ledger serialization failing is a code bug, not a platform
            // condition; surface loudly but do not abort the run.
            error!(error = %e, "mutation ledger append failed");
        }
    }
}

fn require_str<'v>(opt: &'v Option<String>, what: &str) -> Result<&'v str> {
    opt.as_deref()
        .ok_or_else(|| anyhow!("intent missing {what} target"))
}

fn dispatch<C: PlatformClient>(client: &mut C, intent: &MutationIntent) -> Result<()> {
    match intent.kind {
        MutationKind::BudgetChange | MutationKind::CampaignBudgetChange => {
            let campaign = require_str(&intent.target.campaign_id, "campaign")?;
            let micros = intent.after["budgetMicros"]
                .as_i64()
                .context("after.budgetMicros missing")?;
            client.set_campaign_budget(campaign, micros)
        }
        MutationKind::BiddingStrategyChange => {
            let campaign = require_str(&intent.target.campaign_id, "campaign")?;
            let ceiling = intent.after["cpcCeilingMicros"]
                .as_i64()
                .context("after.cpcCeilingMicros missing")?;
            client.set_bidding_strategy(campaign, ceiling)
        }
        MutationKind::AdScheduleAdd => {
            let campaign = require_str(&intent.target.campaign_id, "campaign")?;
            client.add_ad_schedule(campaign, &intent.after["blocks"])
        }
        MutationKind::MasterNegativeAdd => {
            let term = intent.after["term"].as_str().context("after.term missing")?;
            client.add_master_negative(term)
        }
        MutationKind::NegativeListAttach => {
            let campaign = require_str(&intent.target.campaign_id, "campaign")?;
            client.attach_negative_list(campaign)
        }
        MutationKind::AdgroupNegativeAdd => {
            let group = require_str(&intent.target.ad_group_id, "ad group")?;
            let term = intent.after["term"].as_str().context("after.term missing")?;
            client.add_adgroup_negative(group, term)
        }
        MutationKind::RsaCreate => {
            let group = require_str(&intent.target.ad_group_id, "ad group")?;
            client.create_rsa(group, &intent.after)
        }
        MutationKind::AudienceAttach => {
            let campaign = require_str(&intent.target.campaign_id, "campaign")?;
            client.attach_audience(campaign, &intent.after)
        }
        MutationKind::AudienceDetach => {
            let campaign = require_str(&intent.target.campaign_id, "campaign")?;
            let list_id = intent.before["listId"]
                .as_i64()
                .context("before.listId missing")?;
            client.detach_audience(campaign, list_id)
        }
        MutationKind::AdgroupPause => {
            let group = require_str(&intent.target.ad_group_id, "ad group")?;
            client.pause_ad_group(group)
        }
        MutationKind::BidModifierChange => {
            let group = require_str(&intent.target.ad_group_id, "ad group")?;
            let modifier = intent.after["bidModifier"]
                .as_f64()
                .context("after.bidModifier missing")?;
            client.set_bid_modifier(group, modifier)
        }
    }
}
