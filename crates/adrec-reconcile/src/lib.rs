//! adrec-reconcile
//!
//! Desired-state reconciliation engine.
//!
//! Architectural decisions:
//! - Every reconciler is a pure function `(desired, live) -> [MutationIntent]`.
//!   No IO. No platform calls. No clock.
//! - All collections are BTree-ordered; given identical inputs the intent
//!   stream is byte-identical across runs.
//! - Safety state ([`RunContext`]) is derived once per run and read-only
//!   afterwards. There is no hidden cross-call state.
//! - Each family compares desired against live before emitting, so a second
//!   run over converged state emits zero intents for every family.

mod audience;
mod bidding;
mod budget;
mod context;
mod creative;
mod mining;
mod negatives;
mod schedule;
mod types;

pub use audience::audience_intents;
pub use bidding::bidding_intents;
pub use budget::budget_intents;
pub use context::{GateError, LabelSet, RunContext};
pub use creative::{
    creative_intents, lint_lines, MAX_DESCRIPTIONS, MAX_DESCRIPTION_LEN, MAX_HEADLINES,
    MAX_HEADLINE_LEN, MIN_ITEM_LEN,
};
pub use mining::{select_waste_terms, SearchTermRow};
pub use negatives::{adgroup_negative_intents, master_negative_intents, WasteMap};
pub use schedule::{parse_hhmm, schedule_intents};
pub use types::*;
