//! Pacing decision functions.
//!
//! Budget moves are clamped hard: reductions never cut below 10% of current
//! or under 1.00 currency unit; increases never more than double or exceed
//! 100.00 units. Both passes suppress changes under 5% of current.

use adrec_reconcile::{EntityStatus, MutationIntent, MutationKind, TargetRef};
use serde_json::json;

use crate::{PaceAction, PaceSignal};

/// Relative change below which no intent is emitted.
pub const PACING_HYSTERESIS: f64 = 0.05;

const BUDGET_FLOOR_MICROS: i64 = 1_000_000; // 1.00 unit
const BUDGET_CAP_MICROS: i64 = 100_000_000; // 100.00 units

const REDUCE_FACTOR_FLOOR: f64 = 0.1;
const INCREASE_FACTOR_CAP: f64 = 2.0;

const MODIFIER_MIN: f64 = 0.1;
const MODIFIER_MAX: f64 = 2.0;

/// Pause pass: PAUSE signals against an ad group that is still serving.
/// An already-paused group is converged and emits nothing.
pub fn pace_pause_intent(
    signal: &PaceSignal,
    current_status: EntityStatus,
) -> Option<MutationIntent> {
    if signal.action != PaceAction::Pause || current_status == EntityStatus::Paused {
        return None;
    }
    Some(MutationIntent::new(
        MutationKind::AdgroupPause,
        TargetRef::ad_group(&signal.campaign_id, &signal.ad_group_id),
        json!({ "status": current_status }),
        json!({ "status": EntityStatus::Paused }),
        pace_reason(signal),
    ))
}

/// Budget pass: at most one intent per signal.
///
/// `current_budget_micros` is the owning campaign's live daily budget.
pub fn pace_budget_intent(
    signal: &PaceSignal,
    current_budget_micros: i64,
) -> Option<MutationIntent> {
    match signal.action {
        PaceAction::ReduceBudget | PaceAction::IncreaseBudget => {
            if current_budget_micros <= 0 {
                return None;
            }
            let factor = match signal.action {
                PaceAction::ReduceBudget => signal.pace_signal.max(REDUCE_FACTOR_FLOOR),
                _ => signal.pace_signal.min(INCREASE_FACTOR_CAP),
            };
            let raw = (current_budget_micros as f64 * factor).round() as i64;
            let new_budget = match signal.action {
                PaceAction::ReduceBudget => raw.max(BUDGET_FLOOR_MICROS),
                _ => raw.min(BUDGET_CAP_MICROS),
            };

            let delta = (new_budget - current_budget_micros).abs() as f64
                / current_budget_micros as f64;
            if delta < PACING_HYSTERESIS {
                return None;
            }

            Some(MutationIntent::new(
                MutationKind::CampaignBudgetChange,
                TargetRef::campaign(&signal.campaign_id),
                json!({ "budgetMicros": current_budget_micros }),
                json!({ "budgetMicros": new_budget }),
                pace_reason(signal),
            ))
        }
        PaceAction::Pause | PaceAction::MonitorMargin | PaceAction::Maintain => None,
    }
}

/// Secondary pass: margin-driven ad-group bid modifier.
///
/// Margin >= 30% scales up to 1.4x; margin <= 10% scales down toward 0.5x,
/// linear in between; the result is multiplied by min(paceSignal, 1.5) and
/// clamped to [0.1, 2.0]. No margin, no move.
pub fn pace_bid_modifier_intent(
    signal: &PaceSignal,
    current_modifier: f64,
) -> Option<MutationIntent> {
    let margin = signal.margin?;
    if current_modifier <= 0.0 {
        return None;
    }

    let margin_factor = if margin >= 0.30 {
        1.4
    } else if margin <= 0.10 {
        0.5
    } else {
        // Linear between (0.10, 0.5) and (0.30, 1.4).
        0.5 + (margin - 0.10) / 0.20 * 0.9
    };
    let new_modifier =
        (margin_factor * signal.pace_signal.min(1.5)).clamp(MODIFIER_MIN, MODIFIER_MAX);

    let delta = (new_modifier - current_modifier).abs() / current_modifier;
    if delta <= PACING_HYSTERESIS {
        return None;
    }

    Some(MutationIntent::new(
        MutationKind::BidModifierChange,
        TargetRef::ad_group(&signal.campaign_id, &signal.ad_group_id),
        json!({ "bidModifier": current_modifier }),
        json!({ "bidModifier": round2(new_modifier) }),
        format!("margin {margin:.2} pace {:.2}", signal.pace_signal),
    ))
}

fn pace_reason(signal: &PaceSignal) -> String {
    let action: String = signal.action.into();
    if signal.reason.is_empty() {
        format!("{action} pace {:.2}", signal.pace_signal)
    } else {
        format!("{action} pace {:.2}: {}", signal.pace_signal, signal.reason)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(action: PaceAction, pace: f64) -> PaceSignal {
        PaceSignal {
            campaign_id: "c1".into(),
            ad_group_id: "g1".into(),
            action,
            pace_signal: pace,
            reason: String::new(),
            min_stock: None,
            margin: None,
        }
    }

    #[test]
    fn pause_emits_adgroup_pause_for_serving_group() {
        let i = pace_pause_intent(&signal(PaceAction::Pause, 0.0), EntityStatus::Enabled).unwrap();
        assert_eq!(i.kind, MutationKind::AdgroupPause);
        assert_eq!(i.before["status"], "ENABLED");
        assert_eq!(i.after["status"], "PAUSED");
    }

    #[test]
    fn pause_on_paused_group_emits_nothing() {
        assert!(pace_pause_intent(&signal(PaceAction::Pause, 0.0), EntityStatus::Paused).is_none());
    }

    #[test]
    fn budget_pass_ignores_pause_signals() {
        assert!(pace_budget_intent(&signal(PaceAction::Pause, 0.0), 5_000_000).is_none());
    }

    #[test]
    fn reduce_clamps_factor_and_floor() {
        // pace 0.01 clamps to 0.1; 2.00 * 0.1 = 0.20 but floor is 1.00.
        let i = pace_budget_intent(&signal(PaceAction::ReduceBudget, 0.01), 2_000_000).unwrap();
        assert_eq!(i.after["budgetMicros"], 1_000_000);
    }

    #[test]
    fn increase_clamps_factor_and_cap() {
        let i = pace_budget_intent(&signal(PaceAction::IncreaseBudget, 5.0), 80_000_000).unwrap();
        // factor clamps to 2.0 -> 160.00, capped at 100.00.
        assert_eq!(i.after["budgetMicros"], 100_000_000);
    }

    #[test]
    fn hysteresis_suppresses_small_moves() {
        // pace 1.03 -> 3% change, under the 5% band.
        assert!(pace_budget_intent(&signal(PaceAction::IncreaseBudget, 1.03), 10_000_000).is_none());
        assert!(pace_budget_intent(&signal(PaceAction::ReduceBudget, 0.97), 10_000_000).is_none());
    }

    #[test]
    fn monitor_and_maintain_emit_nothing() {
        assert!(pace_budget_intent(&signal(PaceAction::MonitorMargin, 0.5), 10_000_000).is_none());
        assert!(pace_budget_intent(&signal(PaceAction::Maintain, 0.5), 10_000_000).is_none());
    }

    #[test]
    fn modifier_scales_with_margin() {
        let mut s = signal(PaceAction::MonitorMargin, 1.0);
        s.margin = Some(0.40);
        let i = pace_bid_modifier_intent(&s, 1.0).unwrap();
        assert_eq!(i.after["bidModifier"], 1.4);

        s.margin = Some(0.05);
        let i = pace_bid_modifier_intent(&s, 1.0).unwrap();
        assert_eq!(i.after["bidModifier"], 0.5);
    }

    #[test]
    fn modifier_clamped_and_hysteresis_applied() {
        let mut s = signal(PaceAction::MonitorMargin, 0.05);
        s.margin = Some(0.40);
        // 1.4 * 0.05 = 0.07 -> clamps to 0.1.
        let i = pace_bid_modifier_intent(&s, 1.0).unwrap();
        assert_eq!(i.after["bidModifier"], 0.1);

        // Change within 5% of current: suppressed.
        s.pace_signal = 1.0;
        assert!(pace_bid_modifier_intent(&s, 1.4).is_none());
    }

    #[test]
    fn missing_margin_skips_modifier_pass() {
        let s = signal(PaceAction::MonitorMargin, 1.0);
        assert!(pace_bid_modifier_intent(&s, 1.0).is_none());
    }

    #[test]
    fn unknown_wire_action_degrades_to_maintain() {
        let a: PaceAction = "EXPLODE_BUDGET".to_string().into();
        assert_eq!(a, PaceAction::Maintain);
    }
}
