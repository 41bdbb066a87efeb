//! Mutation ledger integrity scenarios.
//!
//! GREEN when:
//! - An untampered exported trail verifies end to end.
//! - Editing any entry's payload breaks verification at that line.
//! - Removing a line breaks the chain at the next line.
//! - Per-kind counts reflect dispositions exactly.

use adrec_audit::*;
use adrec_reconcile::{MutationIntent, MutationKind, TargetRef};
use serde_json::json;
use uuid::Uuid;

fn intent(kind: MutationKind, campaign: &str) -> MutationIntent {
    MutationIntent::new(
        kind,
        TargetRef::campaign(campaign),
        json!({ "budgetMicros": 5_000_000 }),
        json!({ "budgetMicros": 3_000_000 }),
        "test intent",
    )
}

fn sample_log() -> MutationLog {
    let mut log = MutationLog::new(Uuid::new_v4());
    log.append(&intent(MutationKind::BudgetChange, "c1"), Disposition::Applied, None)
        .unwrap();
    log.append(&intent(MutationKind::BudgetChange, "c2"), Disposition::Planned, None)
        .unwrap();
    log.append(
        &intent(MutationKind::RsaCreate, "c3"),
        Disposition::Failed,
        Some("platform rejected ad".into()),
    )
    .unwrap();
    log
}

#[test]
fn untampered_trail_verifies() {
    let log = sample_log();
    let jsonl = log.to_jsonl().unwrap();
    assert_eq!(verify_jsonl(&jsonl).unwrap(), VerifyResult::Valid { lines: 3 });
}

#[test]
fn payload_edit_detected() {
    let log = sample_log();
    let jsonl = log.to_jsonl().unwrap();
    let tampered = jsonl.replace("3000000", "9000000");
    assert_ne!(jsonl, tampered, "replacement must hit the payload");

    match verify_jsonl(&tampered).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 1);
            assert!(reason.contains("hash_self"));
        }
        other => panic!("tamper not detected: {other:?}"),
    }
}

#[test]
fn dropped_line_detected() {
    let log = sample_log();
    let jsonl = log.to_jsonl().unwrap();
    let without_second: String = jsonl
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, l)| format!("{l}\n"))
        .collect();

    match verify_jsonl(&without_second).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 2);
            assert!(reason.contains("hash_prev"));
        }
        other => panic!("dropped line not detected: {other:?}"),
    }
}

#[test]
fn counts_reflect_dispositions() {
    let log = sample_log();
    assert_eq!(log.count(Disposition::Applied), 1);
    assert_eq!(log.count(Disposition::Planned), 1);
    assert_eq!(log.count(Disposition::Failed), 1);

    let applied = log.counts_by_kind(Disposition::Applied);
    assert_eq!(applied.get("BUDGET_CHANGE"), Some(&1));
    assert_eq!(applied.get("RSA_CREATE"), None);
}

#[test]
fn seq_increments_per_append() {
    let log = sample_log();
    let seqs: Vec<u64> = log.entries().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
}
