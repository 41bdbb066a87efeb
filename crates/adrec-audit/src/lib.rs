//! adrec-audit
//!
//! Append-only per-run mutation ledger with an optional tamper-evident hash
//! chain. One entry per intent, planned or applied, exactly once.
//!
//! The ledger lives in memory for the duration of a run and is exported as
//! JSON Lines for the report upload; `verify_jsonl` re-checks an exported
//! trail end to end.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use adrec_reconcile::{MutationIntent, MutationKind, TargetRef};

/// Terminal fate of one intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// Computed and logged; the promote gate kept it off the platform.
    Planned,
    /// Applied to the platform successfully.
    Applied,
    /// Apply was attempted and the platform call failed.
    Failed,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Planned => "PLANNED",
            Disposition::Applied => "APPLIED",
            Disposition::Failed => "FAILED",
        }
    }
}

/// One ledger line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub run_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub kind: MutationKind,
    pub target: TargetRef,
    pub before: Value,
    pub after: Value,
    pub reason: String,
    pub disposition: Disposition,
    pub error: Option<String>,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Append-only in-memory mutation ledger for one run.
pub struct MutationLog {
    run_id: Uuid,
    entries: Vec<LogEntry>,
    last_hash: Option<String>,
}

impl MutationLog {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            entries: Vec::new(),
            last_hash: None,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append one intent with its disposition. Chain state advances on every
    /// append; entries are never mutated afterwards.
    pub fn append(
        &mut self,
        intent: &MutationIntent,
        disposition: Disposition,
        error: Option<String>,
    ) -> Result<LogEntry> {
        let mut entry = LogEntry {
            seq: self.entries.len() as u64,
            run_id: self.run_id,
            ts_utc: Utc::now(),
            kind: intent.kind,
            target: intent.target.clone(),
            before: intent.before.clone(),
            after: intent.after.clone(),
            reason: intent.reason.clone(),
            disposition,
            error,
            hash_prev: self.last_hash.clone(),
            hash_self: None,
        };

        let self_hash = compute_entry_hash(&entry)?;
        entry.hash_self = Some(self_hash.clone());
        self.last_hash = Some(self_hash);

        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries with the given disposition.
    pub fn count(&self, disposition: Disposition) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.disposition == disposition)
            .count() as u64
    }

    /// Per-kind counts for one disposition, for the run report.
    pub fn counts_by_kind(&self, disposition: Disposition) -> BTreeMap<String, u64> {
        let mut out = BTreeMap::new();
        for e in &self.entries {
            if e.disposition == disposition {
                *out.entry(e.kind.as_str().to_string()).or_insert(0) += 1;
            }
        }
        out
    }

    /// Export as JSON Lines (one entry per line, canonical key order).
    pub fn to_jsonl(&self) -> Result<String> {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&canonical_json_line(e)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize ledger entry failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Entry hash over canonical JSON WITHOUT hash_self (no self-reference).
pub fn compute_entry_hash(entry: &LogEntry) -> Result<String> {
    let mut clone = entry.clone();
    clone.hash_self = None;
    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Result of hash chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

/// Verify the hash chain of an exported JSONL mutation trail.
pub fn verify_jsonl(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let entry: LogEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("parse ledger entry at line {}", i + 1))?;
        line_count += 1;

        if entry.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, entry.hash_prev
                ),
            });
        }

        if let Some(ref claimed) = entry.hash_self {
            let recomputed = compute_entry_hash(&entry)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!("hash_self mismatch: claimed {claimed}, recomputed {recomputed}"),
                });
            }
        }

        prev_hash = entry.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}
