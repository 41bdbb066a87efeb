//! Promote gate scenarios through the executor.
//!
//! GREEN when:
//! - With promote off, every intent is logged PLANNED and the platform
//!   client receives zero calls.
//! - With promote on but PREVIEW mode, the gate stays closed.
//! - With promote on in PRODUCTION, intents are dispatched and logged APPLIED.

use adrec_audit::{Disposition, MutationLog};
use adrec_config::{ConfigSnapshot, RunMode};
use adrec_executor::{MutationExecutor, PlatformClient};
use adrec_reconcile::{MutationIntent, MutationKind, RunContext, TargetRef};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Default)]
struct RecordingClient {
    calls: Vec<String>,
}

impl PlatformClient for RecordingClient {
    fn set_campaign_budget(&mut self, campaign_id: &str, budget_micros: i64) -> anyhow::Result<()> {
        self.calls.push(format!("budget {campaign_id} {budget_micros}"));
        Ok(())
    }
    fn set_bidding_strategy(&mut self, campaign_id: &str, _cpc_ceiling_micros: i64) -> anyhow::Result<()> {
        self.calls.push(format!("bidding {campaign_id}"));
        Ok(())
    }
    fn add_ad_schedule(&mut self, campaign_id: &str, _blocks: &Value) -> anyhow::Result<()> {
        self.calls.push(format!("schedule {campaign_id}"));
        Ok(())
    }
    fn add_master_negative(&mut self, term: &str) -> anyhow::Result<()> {
        self.calls.push(format!("master-neg {term}"));
        Ok(())
    }
    fn attach_negative_list(&mut self, campaign_id: &str) -> anyhow::Result<()> {
        self.calls.push(format!("neg-attach {campaign_id}"));
        Ok(())
    }
    fn add_adgroup_negative(&mut self, ad_group_id: &str, term: &str) -> anyhow::Result<()> {
        self.calls.push(format!("ag-neg {ad_group_id} {term}"));
        Ok(())
    }
    fn create_rsa(&mut self, ad_group_id: &str, _spec: &Value) -> anyhow::Result<()> {
        self.calls.push(format!("rsa {ad_group_id}"));
        Ok(())
    }
    fn attach_audience(&mut self, campaign_id: &str, _spec: &Value) -> anyhow::Result<()> {
        self.calls.push(format!("aud-attach {campaign_id}"));
        Ok(())
    }
    fn detach_audience(&mut self, campaign_id: &str, list_id: i64) -> anyhow::Result<()> {
        self.calls.push(format!("aud-detach {campaign_id} {list_id}"));
        Ok(())
    }
    fn pause_ad_group(&mut self, ad_group_id: &str) -> anyhow::Result<()> {
        self.calls.push(format!("pause {ad_group_id}"));
        Ok(())
    }
    fn set_bid_modifier(&mut self, ad_group_id: &str, modifier: f64) -> anyhow::Result<()> {
        self.calls.push(format!("modifier {ad_group_id} {modifier}"));
        Ok(())
    }
}

fn ctx(promote: bool, mode: RunMode) -> RunContext {
    let cfg = ConfigSnapshot::from_json(json!({
        "tenantId": "acme",
        "enabled": true,
        "promote": promote,
        "labelMarker": "adrec-managed",
        "dailyBudgetCapDefault": 3.0,
        "cpcCeilingDefault": 0.40,
    }))
    .unwrap();
    RunContext::derive(&cfg, mode).unwrap()
}

fn sample_intents() -> Vec<MutationIntent> {
    vec![
        MutationIntent::new(
            MutationKind::BudgetChange,
            TargetRef::campaign("c1"),
            json!({"budgetMicros": 5_000_000}),
            json!({"budgetMicros": 3_000_000}),
            "daily cap",
        ),
        MutationIntent::new(
            MutationKind::MasterNegativeAdd,
            TargetRef::entity("shared-list"),
            Value::Null,
            json!({"term": "cheap"}),
            "master negative",
        ),
    ]
}

#[test]
fn promote_off_plans_everything_and_touches_nothing() {
    let ctx = ctx(false, RunMode::Production);
    let mut client = RecordingClient::default();
    let mut log = MutationLog::new(Uuid::new_v4());

    let intents = sample_intents();
    let (applied, failed) = {
        let mut exec = MutationExecutor::new(&ctx, &mut client, &mut log);
        exec.execute_all(&intents)
    };

    assert_eq!(applied, 0);
    assert_eq!(failed, 0);
    assert!(client.calls.is_empty());
    assert_eq!(log.len(), intents.len());
    assert!(log
        .entries()
        .iter()
        .all(|e| e.disposition == Disposition::Planned));
}

#[test]
fn preview_mode_closes_gate_even_with_promote_on() {
    let ctx = ctx(true, RunMode::Preview);
    let mut client = RecordingClient::default();
    let mut log = MutationLog::new(Uuid::new_v4());

    let intents = sample_intents();
    let mut exec = MutationExecutor::new(&ctx, &mut client, &mut log);
    let (applied, _) = exec.execute_all(&intents);

    assert_eq!(applied, 0);
    assert!(client.calls.is_empty());
}

#[test]
fn production_with_promote_applies_and_logs_applied() {
    let ctx = ctx(true, RunMode::Production);
    let mut client = RecordingClient::default();
    let mut log = MutationLog::new(Uuid::new_v4());

    let intents = sample_intents();
    let (applied, failed) = {
        let mut exec = MutationExecutor::new(&ctx, &mut client, &mut log);
        exec.execute_all(&intents)
    };

    assert_eq!(applied, 2);
    assert_eq!(failed, 0);
    assert_eq!(
        client.calls,
        vec!["budget c1 3000000".to_string(), "master-neg cheap".to_string()]
    );
    assert_eq!(log.count(Disposition::Applied), 2);
}

#[test]
fn every_intent_lands_in_ledger_exactly_once() {
    let ctx = ctx(true, RunMode::Production);
    let mut client = RecordingClient::default();
    let mut log = MutationLog::new(Uuid::new_v4());

    let intents = sample_intents();
    {
        let mut exec = MutationExecutor::new(&ctx, &mut client, &mut log);
        exec.execute_all(&intents);
    }

    assert_eq!(log.len(), intents.len());
    let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![0, 1]);
}
