//! Transport seams for one run.
//!
//! The orchestrator never talks HTTP or holds fixtures itself; everything it
//! reads or writes crosses one of these traits.

use anyhow::Result;
use serde_json::Value;

use adrec_executor::PlatformClient;
use adrec_pacing::PaceSignal;
use adrec_reconcile::{LiveState, SearchTermRow};

/// Where tenant configuration comes from.
///
/// `Ok(None)` means the tenant has no configuration at all, which is a
/// DISABLED terminal for the run, not an error.
pub trait ConfigSource {
    fn fetch_config(&self, tenant_id: &str) -> Result<Option<Value>>;
}

/// Where externally computed pacing signals come from.
///
/// `Ok(None)` means no signal batch was published for this tenant; the
/// pacing pass is skipped without a warning.
pub trait SignalSource {
    fn fetch_signals(&self, tenant_id: &str) -> Result<Option<Vec<PaceSignal>>>;
}

/// Where run reports go. One call per chunk; chunk failures are isolated by
/// the caller.
pub trait ReportSink {
    fn upload_chunk(&self, tenant_id: &str, chunk: &Value) -> Result<()>;
}

/// Read side of the advertising platform.
pub trait LiveStateReader {
    /// One coherent snapshot of the account at run start.
    fn read_live_state(&self, tenant_id: &str) -> Result<LiveState>;

    /// Search-term performance rows over the lookback window.
    fn search_terms(&self, tenant_id: &str, lookback_days: u32) -> Result<Vec<SearchTermRow>>;

    /// Raw campaign metric rows for the report harvest. Shape is passed
    /// through untouched.
    fn campaign_metrics(&self, tenant_id: &str) -> Result<Vec<Value>>;
}

/// Full platform handle: reads plus the write choke-point.
pub trait Platform: PlatformClient + LiveStateReader {}

impl<T: PlatformClient + LiveStateReader> Platform for T {}
