//! Run report assembly and chunking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use adrec_reconcile::SearchTermRow;

/// Rows per report chunk. Chunk 0 is the summary and carries no rows.
pub const REPORT_CHUNK_ROWS: usize = 500;

/// Upper bound on the inlined ledger export. Truncation happens on a line
/// boundary; the full ledger stays available locally.
pub const MAX_REPORT_LOG_BYTES: usize = 256 * 1024;

/// Terminal state of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Tenant has no config, invalid config, or `enabled=false`.
    Disabled,
    /// Safety-gate derivation refused to produce a RunContext.
    GateBlocked,
    /// The run walked every phase it could reach.
    Complete,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Disabled => "DISABLED",
            RunState::GateBlocked => "GATE_BLOCKED",
            RunState::Complete => "COMPLETE",
        }
    }
}

/// Everything one run produced. Always built, even for DISABLED and
/// GATE_BLOCKED terminals.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub tenant_id: String,
    pub mode: String,
    pub state: RunState,
    pub config_hash: Option<String>,
    /// kind -> count, per disposition.
    pub planned: BTreeMap<String, u64>,
    pub applied: BTreeMap<String, u64>,
    pub failed: BTreeMap<String, u64>,
    /// Ledger export, capped at [`MAX_REPORT_LOG_BYTES`].
    pub log_jsonl: String,
    pub log_truncated: bool,
    pub metrics_rows: Vec<Value>,
    pub search_term_rows: Vec<SearchTermRow>,
    pub warnings: Vec<String>,
}

impl RunReport {
    /// Skeleton report for a run that never reached the reconcile phase.
    pub fn terminal(tenant_id: &str, run_id: Uuid, mode: &str, state: RunState) -> Self {
        Self {
            run_id,
            tenant_id: tenant_id.to_string(),
            mode: mode.to_string(),
            state,
            config_hash: None,
            planned: BTreeMap::new(),
            applied: BTreeMap::new(),
            failed: BTreeMap::new(),
            log_jsonl: String::new(),
            log_truncated: false,
            metrics_rows: Vec::new(),
            search_term_rows: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Cap a JSONL export on a line boundary. Returns (capped, truncated).
pub(crate) fn cap_log_jsonl(full: &str) -> (String, bool) {
    if full.len() <= MAX_REPORT_LOG_BYTES {
        return (full.to_string(), false);
    }
    let cut = full[..MAX_REPORT_LOG_BYTES]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (full[..cut].to_string(), true)
}

/// Split a report into upload chunks. Chunk 0 carries the summary; rows (the
/// metric harvest plus search-term rows, tagged by type) follow in batches of
/// [`REPORT_CHUNK_ROWS`]. A row-free run still produces the summary chunk.
pub fn report_chunks(report: &RunReport) -> Vec<Value> {
    let mut rows: Vec<Value> = Vec::new();
    for m in &report.metrics_rows {
        rows.push(json!({ "rowType": "CAMPAIGN_METRIC", "row": m }));
    }
    for s in &report.search_term_rows {
        rows.push(json!({ "rowType": "SEARCH_TERM", "row": s }));
    }

    let row_chunks: Vec<&[Value]> = rows.chunks(REPORT_CHUNK_ROWS).collect();
    let total = 1 + row_chunks.len();

    let mut chunks = Vec::with_capacity(total);
    chunks.push(json!({
        "runId": report.run_id,
        "tenantId": report.tenant_id,
        "chunk": 0,
        "chunks": total,
        "summary": {
            "mode": report.mode,
            "state": report.state,
            "configHash": report.config_hash,
            "planned": report.planned,
            "applied": report.applied,
            "failed": report.failed,
            "warnings": report.warnings,
            "logTruncated": report.log_truncated,
            "logJsonl": report.log_jsonl,
        },
    }));
    for (i, chunk) in row_chunks.iter().enumerate() {
        chunks.push(json!({
            "runId": report.run_id,
            "tenantId": report.tenant_id,
            "chunk": i + 1,
            "chunks": total,
            "rows": chunk,
        }));
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with_rows(metrics: usize, terms: usize) -> RunReport {
        let mut r = RunReport::terminal("acme", Uuid::new_v4(), "PRODUCTION", RunState::Complete);
        r.metrics_rows = (0..metrics).map(|i| json!({ "i": i })).collect();
        r.search_term_rows = (0..terms)
            .map(|i| SearchTermRow {
                campaign_name: "General".into(),
                ad_group_name: "Core".into(),
                term: format!("term {i}"),
                cost_micros: 0,
                conversions: 0.0,
                clicks: 0,
                impressions: 0,
            })
            .collect();
        r
    }

    #[test]
    fn empty_report_is_one_summary_chunk() {
        let chunks = report_chunks(&report_with_rows(0, 0));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0]["chunk"], 0);
        assert_eq!(chunks[0]["chunks"], 1);
        assert!(chunks[0]["summary"].is_object());
    }

    #[test]
    fn rows_split_at_five_hundred() {
        // 600 metric rows + 450 search-term rows = 1050 rows = 3 row chunks.
        let chunks = report_chunks(&report_with_rows(600, 450));
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[1]["rows"].as_array().unwrap().len(), 500);
        assert_eq!(chunks[2]["rows"].as_array().unwrap().len(), 500);
        assert_eq!(chunks[3]["rows"].as_array().unwrap().len(), 50);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c["chunk"], i);
            assert_eq!(c["chunks"], 4);
        }
    }

    #[test]
    fn metric_rows_precede_search_term_rows() {
        let chunks = report_chunks(&report_with_rows(2, 1));
        let rows = chunks[1]["rows"].as_array().unwrap();
        assert_eq!(rows[0]["rowType"], "CAMPAIGN_METRIC");
        assert_eq!(rows[2]["rowType"], "SEARCH_TERM");
    }

    #[test]
    fn log_cap_cuts_on_line_boundary() {
        let line = format!("{}\n", "x".repeat(1023));
        let full = line.repeat(300); // ~300 KiB
        let (capped, truncated) = cap_log_jsonl(&full);
        assert!(truncated);
        assert!(capped.len() <= MAX_REPORT_LOG_BYTES);
        assert!(capped.ends_with('\n'));
        assert_eq!(capped.len() % 1024, 0);
    }

    #[test]
    fn log_under_cap_untouched() {
        let full = "{\"seq\":0}\n";
        let (capped, truncated) = cap_log_jsonl(full);
        assert!(!truncated);
        assert_eq!(capped, full);
    }
}
