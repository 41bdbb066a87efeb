//! The per-tenant run loop.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};
use uuid::Uuid;

use adrec_audit::{Disposition, MutationLog};
use adrec_config::{ConfigSnapshot, RunMode};
use adrec_executor::MutationExecutor;
use adrec_pacing::{pace_bid_modifier_intent, pace_budget_intent, pace_pause_intent, PaceSignal};
use adrec_reconcile::{
    adgroup_negative_intents, audience_intents, bidding_intents, budget_intents, creative_intents,
    master_negative_intents, schedule_intents, select_waste_terms, LabelSet, LiveState,
    MutationIntent, MutationKind, RunContext, SearchTermRow,
};

use crate::report::{cap_log_jsonl, report_chunks, RunReport, RunState};
use crate::sources::{ConfigSource, Platform, ReportSink, SignalSource};

/// Run one tenant front to back. Infallible by construction: every failure
/// mode collapses into a terminal state inside the returned report.
pub fn run_tenant<P: Platform>(
    tenant_id: &str,
    mode: RunMode,
    config_source: &dyn ConfigSource,
    signal_source: &dyn SignalSource,
    report_sink: &dyn ReportSink,
    platform: &mut P,
) -> RunReport {
    let run_id = Uuid::new_v4();
    info!(tenant = tenant_id, run = %run_id, mode = mode.as_str(), "run start");

    let report = drive(tenant_id, run_id, mode, config_source, signal_source, platform);

    upload_report(report_sink, &report);
    info!(
        tenant = tenant_id,
        run = %run_id,
        state = report.state.as_str(),
        "run finished"
    );
    report
}

fn drive<P: Platform>(
    tenant_id: &str,
    run_id: Uuid,
    mode: RunMode,
    config_source: &dyn ConfigSource,
    signal_source: &dyn SignalSource,
    platform: &mut P,
) -> RunReport {
    let mut warnings: Vec<String> = Vec::new();

    // LOADING_CONFIG
    let raw = match config_source.fetch_config(tenant_id) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!(tenant = tenant_id, "no config; tenant disabled");
            return RunReport::terminal(tenant_id, run_id, mode.as_str(), RunState::Disabled);
        }
        Err(e) => {
            warn!(tenant = tenant_id, error = %e, "config fetch failed");
            let mut r = RunReport::terminal(tenant_id, run_id, mode.as_str(), RunState::Disabled);
            r.warnings.push(format!("config fetch failed: {e}"));
            return r;
        }
    };
    let cfg = match ConfigSnapshot::from_json(raw) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(tenant = tenant_id, error = %e, "config rejected");
            let mut r = RunReport::terminal(tenant_id, run_id, mode.as_str(), RunState::Disabled);
            r.warnings.push(format!("config rejected: {e}"));
            return r;
        }
    };
    warnings.extend(cfg.validation_warnings.iter().cloned());

    // GATE_CHECK
    if !cfg.enabled {
        info!(tenant = tenant_id, "tenant disabled by config");
        let mut r = RunReport::terminal(tenant_id, run_id, mode.as_str(), RunState::Disabled);
        r.config_hash = Some(cfg.config_hash().to_string());
        r.warnings = warnings;
        return r;
    }

    // GUARDS_INIT
    let ctx = match RunContext::derive(&cfg, mode) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(tenant = tenant_id, error = %e, "gate blocked");
            let mut r = RunReport::terminal(tenant_id, run_id, mode.as_str(), RunState::GateBlocked);
            r.config_hash = Some(cfg.config_hash().to_string());
            warnings.push(format!("gate blocked: {e}"));
            r.warnings = warnings;
            return r;
        }
    };

    // RECONCILE
    let mut log = MutationLog::new(run_id);
    let mut report = RunReport::terminal(tenant_id, run_id, mode.as_str(), RunState::Complete);
    report.config_hash = Some(cfg.config_hash().to_string());

    match platform.read_live_state(tenant_id) {
        Ok(live) => {
            report.search_term_rows = reconcile(
                &cfg,
                &ctx,
                &live,
                platform,
                signal_source,
                &mut log,
                &mut warnings,
            );
        }
        Err(e) => {
            warn!(tenant = tenant_id, error = %e, "live state read failed; reconcile skipped");
            warnings.push(format!("live state read failed, reconcile skipped: {e}"));
        }
    }

    // REPORT
    match platform.campaign_metrics(tenant_id) {
        Ok(rows) => report.metrics_rows = rows,
        Err(e) => {
            warn!(tenant = tenant_id, error = %e, "metric harvest failed");
            warnings.push(format!("metric harvest failed: {e}"));
        }
    }

    report.planned = log.counts_by_kind(Disposition::Planned);
    report.applied = log.counts_by_kind(Disposition::Applied);
    report.failed = log.counts_by_kind(Disposition::Failed);
    match log.to_jsonl() {
        Ok(full) => {
            let (capped, truncated) = cap_log_jsonl(&full);
            report.log_jsonl = capped;
            report.log_truncated = truncated;
        }
        Err(e) => warnings.push(format!("ledger export failed: {e}")),
    }
    report.warnings = warnings;
    report
}

/// Fixed family order. Each family's intents are executed before the next
/// family runs, so pacing sees budgets the budget family already applied.
/// Returns the search-term rows read for mining; they double as the report
/// harvest.
#[allow(clippy::too_many_arguments)]
fn reconcile<P: Platform>(
    cfg: &ConfigSnapshot,
    ctx: &RunContext,
    live: &LiveState,
    platform: &mut P,
    signal_source: &dyn SignalSource,
    log: &mut MutationLog,
    warnings: &mut Vec<String>,
) -> Vec<SearchTermRow> {
    // Budgets applied this run, layered over the live snapshot.
    let mut current_budgets: BTreeMap<String, i64> = live
        .campaigns
        .values()
        .map(|c| (c.id.clone(), c.budget_micros))
        .collect();

    let budget = budget_intents(cfg, ctx, live);
    execute_tracking_budgets(ctx, platform, log, &budget, &mut current_budgets);

    let tenant = &ctx.tenant_id;
    let mut exec = MutationExecutor::new(ctx, platform, log);
    exec.execute_all(&bidding_intents(cfg, ctx, live));
    exec.execute_all(&schedule_intents(cfg, ctx, live));
    exec.execute_all(&master_negative_intents(cfg, ctx, live));

    // Configured waste terms first; mined terms must not duplicate them.
    let configured = adgroup_negative_intents(ctx, live, &cfg.waste_negative_map, &BTreeSet::new());
    let already: BTreeSet<(String, String)> = configured
        .iter()
        .filter_map(|i| {
            let group = i.target.ad_group_id.clone()?;
            let term = i.after["term"].as_str()?.to_lowercase();
            Some((group, term))
        })
        .collect();
    exec.execute_all(&configured);
    drop(exec);

    let mined_rows = match platform.search_terms(tenant, cfg.mining_lookback_days) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "search-term read failed; mining skipped");
            warnings.push(format!("search-term read failed, mining skipped: {e}"));
            Vec::new()
        }
    };
    let mined = select_waste_terms(&mined_rows, cfg.mining_cost_threshold_micros);
    let harvest = mined_rows;

    let mut exec = MutationExecutor::new(ctx, platform, log);
    exec.execute_all(&adgroup_negative_intents(ctx, live, &mined, &already));

    let mut labels = LabelSet::new();
    exec.execute_all(&creative_intents(cfg, ctx, live, &mut labels));
    exec.execute_all(&audience_intents(cfg, ctx, live));
    drop(exec);

    // Pacing last: operates on post-reconcile budgets.
    match signal_source.fetch_signals(tenant) {
        Ok(Some(signals)) => {
            pacing_pass(ctx, live, platform, log, &signals, &mut current_budgets);
        }
        Ok(None) => debug!("no pacing signals published"),
        Err(e) => {
            warn!(error = %e, "signal fetch failed; pacing skipped");
            warnings.push(format!("signal fetch failed, pacing skipped: {e}"));
        }
    }

    harvest
}

fn execute_tracking_budgets<P: Platform>(
    ctx: &RunContext,
    platform: &mut P,
    log: &mut MutationLog,
    intents: &[MutationIntent],
    current_budgets: &mut BTreeMap<String, i64>,
) {
    let mut exec = MutationExecutor::new(ctx, platform, log);
    for intent in intents {
        let outcome = exec.execute(intent);
        if !outcome.applied {
            continue;
        }
        if let (Some(campaign), Some(micros)) =
            (&intent.target.campaign_id, intent.after["budgetMicros"].as_i64())
        {
            current_budgets.insert(campaign.clone(), micros);
        }
    }
}

fn pacing_pass<P: Platform>(
    ctx: &RunContext,
    live: &LiveState,
    platform: &mut P,
    log: &mut MutationLog,
    signals: &[PaceSignal],
    current_budgets: &mut BTreeMap<String, i64>,
) {
    let mut exec = MutationExecutor::new(ctx, platform, log);
    for signal in signals {
        // Signals obey the same scope and exclusion guards as every other
        // family: an excluded campaign or ad group is never touched.
        let campaign = match live.campaigns.get(&signal.campaign_id) {
            Some(c) => c,
            None => {
                debug!(campaign = %signal.campaign_id, "pacing signal for unknown campaign");
                continue;
            }
        };
        if !ctx.campaign_in_scope(campaign) {
            debug!(campaign = %campaign.name, "pacing signal for out-of-scope campaign");
            continue;
        }
        let group = live.ad_groups.get(&signal.ad_group_id);
        if let Some(g) = group {
            if ctx.ad_group_excluded(&campaign.name, &g.name) {
                debug!(
                    campaign = %campaign.name,
                    ad_group = %g.name,
                    "pacing signal for excluded ad group"
                );
                continue;
            }
        }

        let current = current_budgets
            .get(&campaign.id)
            .copied()
            .unwrap_or(campaign.budget_micros);
        if let Some(intent) = pace_budget_intent(signal, current) {
            let outcome = exec.execute(&intent);
            if outcome.applied && intent.kind == MutationKind::CampaignBudgetChange {
                if let Some(micros) = intent.after["budgetMicros"].as_i64() {
                    current_budgets.insert(campaign.id.clone(), micros);
                }
            }
        }

        if let Some(g) = group {
            if let Some(intent) = pace_pause_intent(signal, g.status) {
                exec.execute(&intent);
            }
            if let Some(intent) = pace_bid_modifier_intent(signal, g.bid_modifier.unwrap_or(1.0)) {
                exec.execute(&intent);
            }
        }
    }
}

fn upload_report(sink: &dyn ReportSink, report: &RunReport) {
    let chunks = report_chunks(report);
    for chunk in &chunks {
        let idx = chunk["chunk"].as_u64().unwrap_or(0);
        if let Err(e) = sink.upload_chunk(&report.tenant_id, chunk) {
            warn!(
                tenant = %report.tenant_id,
                chunk = idx,
                error = %e,
                "report chunk upload failed; continuing"
            );
        }
    }
}
