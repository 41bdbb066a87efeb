//! Pacing signals through a full run.
//!
//! GREEN when:
//! - A REDUCE_BUDGET signal compounds on the budget the cap family already
//!   applied this run, not on the stale pre-run value.
//! - A PAUSE signal pauses the ad group, and a second run over the paused
//!   group applies nothing.
//! - Signals for excluded campaigns or ad groups are dropped whole.
//! - A thin margin pushes the ad-group bid modifier down.
//! - Sub-hysteresis signals change nothing.

use std::collections::BTreeSet;

use adrec_config::RunMode;
use adrec_pacing::{PaceAction, PaceSignal};
use adrec_reconcile::{
    BiddingStrategy, EntityStatus, LiveAdGroup, LiveCampaign, LiveState,
};
use adrec_runtime::{run_tenant, RunState};
use adrec_testkit::{CollectingReportSink, FakeConfigSource, FakePlatform, FakeSignalSource};
use serde_json::json;

fn config() -> serde_json::Value {
    json!({
        "tenantId": "acme",
        "enabled": true,
        "promote": true,
        "labelMarker": "adrec-managed",
        "dailyBudgetCapDefault": 3.0,
        "cpcCeilingDefault": 0.40,
    })
}

fn platform() -> FakePlatform {
    let mut live = LiveState::default();
    live.campaigns.insert(
        "c1".into(),
        LiveCampaign {
            id: "c1".into(),
            name: "General".into(),
            status: EntityStatus::Enabled,
            budget_micros: 5_000_000,
            bidding_strategy: BiddingStrategy::TargetSpend,
            cpc_ceiling_micros: 400_000,
            has_schedule: true,
            labels: BTreeSet::new(),
        },
    );
    live.ad_groups.insert(
        "g1".into(),
        LiveAdGroup {
            id: "g1".into(),
            name: "Core".into(),
            campaign_id: "c1".into(),
            status: EntityStatus::Enabled,
            bid_modifier: Some(1.0),
        },
    );
    FakePlatform::new(live)
}

fn signal(action: PaceAction, pace_signal: f64, margin: Option<f64>) -> PaceSignal {
    PaceSignal {
        campaign_id: "c1".into(),
        ad_group_id: "g1".into(),
        action,
        pace_signal,
        reason: "inventory low".into(),
        min_stock: None,
        margin,
    }
}

#[test]
fn reduce_signal_compounds_on_capped_budget() {
    let config = FakeConfigSource::with_config(config());
    let signals =
        FakeSignalSource::with_signals(vec![signal(PaceAction::ReduceBudget, 0.5, None)]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    let report = run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );

    assert_eq!(report.state, RunState::Complete);
    // Cap family first: 5.00 -> 3.00. Then the signal: 3.00 * 0.5 = 1.50.
    assert_eq!(platform.live.campaigns["c1"].budget_micros, 1_500_000);
}

#[test]
fn pause_signal_pauses_the_ad_group() {
    let config = FakeConfigSource::with_config(config());
    let signals = FakeSignalSource::with_signals(vec![signal(PaceAction::Pause, 0.0, None)]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );

    assert_eq!(platform.live.ad_groups["g1"].status, EntityStatus::Paused);
}

#[test]
fn repeated_pause_signal_converges_after_first_run() {
    let config = FakeConfigSource::with_config(config());
    let signals = FakeSignalSource::with_signals(vec![signal(PaceAction::Pause, 0.0, None)]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    let first = run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );
    assert_eq!(first.applied.get("ADGROUP_PAUSE"), Some(&1));

    let second = run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );
    assert!(
        second.applied.is_empty() && second.planned.is_empty(),
        "second run re-applied on converged state: {:?}",
        second.applied
    );
    assert!(second.failed.is_empty());
}

#[test]
fn excluded_campaign_drops_its_signals() {
    let mut raw = config();
    raw["exclusions"] = serde_json::json!({ "General": null });
    let config = FakeConfigSource::with_config(raw);
    let signals = FakeSignalSource::with_signals(vec![signal(PaceAction::Pause, 0.0, None)]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    let report = run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );

    assert_eq!(report.state, RunState::Complete);
    assert!(report.planned.is_empty() && report.applied.is_empty() && report.failed.is_empty());
    assert_eq!(platform.live.ad_groups["g1"].status, EntityStatus::Enabled);
    assert_eq!(platform.live.campaigns["c1"].budget_micros, 5_000_000);
}

#[test]
fn excluded_ad_group_drops_its_signals() {
    let mut raw = config();
    raw["exclusions"] = serde_json::json!({ "General": ["Core"] });
    let config = FakeConfigSource::with_config(raw);
    let signals = FakeSignalSource::with_signals(vec![
        signal(PaceAction::ReduceBudget, 0.5, None),
        signal(PaceAction::Pause, 0.0, None),
    ]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );

    // The campaign itself stays in scope: the cap family still lands 3.00,
    // but both signals referencing the excluded ad group are dropped.
    assert_eq!(platform.live.campaigns["c1"].budget_micros, 3_000_000);
    assert_eq!(platform.live.ad_groups["g1"].status, EntityStatus::Enabled);
}

#[test]
fn thin_margin_halves_the_bid_modifier() {
    let config = FakeConfigSource::with_config(config());
    let signals = FakeSignalSource::with_signals(vec![signal(
        PaceAction::MonitorMargin,
        1.0,
        Some(0.05),
    )]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );

    assert_eq!(platform.live.ad_groups["g1"].bid_modifier, Some(0.5));
}

#[test]
fn sub_hysteresis_signal_changes_nothing() {
    let config = FakeConfigSource::with_config(config());
    // 0.97 of the capped budget is inside the 5% dead band.
    let signals =
        FakeSignalSource::with_signals(vec![signal(PaceAction::ReduceBudget, 0.97, None)]);
    let sink = CollectingReportSink::new();
    let mut platform = platform();

    run_tenant(
        "acme",
        RunMode::Production,
        &config,
        &signals,
        &sink,
        &mut platform,
    );

    assert_eq!(platform.live.campaigns["c1"].budget_micros, 3_000_000);
    assert_eq!(platform.live.ad_groups["g1"].bid_modifier, Some(1.0));
}
