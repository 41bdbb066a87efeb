//! adrec-pacing
//!
//! Consumes externally computed profit/inventory signals and turns them into
//! at most one mutation intent each.
//!
//! Architectural decisions:
//! - Pure deterministic decision functions. No IO, no clock.
//! - Hysteresis on budget recalculation: changes under 5% are suppressed so
//!   noisy signals cannot oscillate a budget.
//! - Unknown wire actions degrade to `Maintain` (observability-only) instead
//!   of failing the signal batch.

mod engine;
mod types;

pub use engine::{
    pace_bid_modifier_intent, pace_budget_intent, pace_pause_intent, PACING_HYSTERESIS,
};
pub use types::{PaceAction, PaceSignal};
