//! adrec-runtime
//!
//! Per-tenant run orchestration.
//!
//! One run is a linear state machine:
//!
//! ```text
//! LOADING_CONFIG -> GATE_CHECK -> GUARDS_INIT -> RECONCILE -> REPORT
//!        |               |
//!        v               v
//!    DISABLED       GATE_BLOCKED          (terminals; plus COMPLETE)
//! ```
//!
//! No state is ever re-entered. The reconcile phase walks the families in a
//! fixed order (budget, bidding, schedule, negatives, mining, creative,
//! audience, pacing) so ledger output is comparable across runs.
//!
//! Error policy:
//! - Config missing/invalid/disabled is the DISABLED terminal. No live state
//!   is read for a disabled tenant.
//! - Gate derivation failure is the GATE_BLOCKED terminal.
//! - Per-entity platform errors are absorbed inside the executor.
//! - Transport errors degrade the feature they serve: no signals means the
//!   pacing pass is skipped this run, a failed report chunk is logged and the
//!   remaining chunks still upload.
//! In every terminal a RunReport is produced and offered to the sink.

mod orchestrator;
mod report;
mod sources;

pub use orchestrator::run_tenant;
pub use report::{report_chunks, RunReport, RunState, MAX_REPORT_LOG_BYTES, REPORT_CHUNK_ROWS};
pub use sources::{ConfigSource, LiveStateReader, Platform, ReportSink, SignalSource};
