use serde::{Deserialize, Serialize};

/// Action prescribed by the external pacing computation.
///
/// `MonitorMargin` and `Maintain` never mutate anything; they exist purely
/// for observability. Unknown wire strings degrade to `Maintain`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaceAction {
    Pause,
    ReduceBudget,
    IncreaseBudget,
    MonitorMargin,
    Maintain,
}

impl From<String> for PaceAction {
    fn from(s: String) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PAUSE" => PaceAction::Pause,
            "REDUCE_BUDGET" => PaceAction::ReduceBudget,
            "INCREASE_BUDGET" => PaceAction::IncreaseBudget,
            "MONITOR_MARGIN" => PaceAction::MonitorMargin,
            _ => PaceAction::Maintain,
        }
    }
}

impl From<PaceAction> for String {
    fn from(a: PaceAction) -> String {
        match a {
            PaceAction::Pause => "PAUSE",
            PaceAction::ReduceBudget => "REDUCE_BUDGET",
            PaceAction::IncreaseBudget => "INCREASE_BUDGET",
            PaceAction::MonitorMargin => "MONITOR_MARGIN",
            PaceAction::Maintain => "MAINTAIN",
        }
        .to_string()
    }
}

/// One externally computed per-ad-group signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaceSignal {
    pub campaign_id: String,
    pub ad_group_id: String,
    pub action: PaceAction,
    pub pace_signal: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub min_stock: Option<i64>,
    /// Profit margin in [0, 1] when the upstream computation knows it.
    #[serde(default)]
    pub margin: Option<f64>,
}
