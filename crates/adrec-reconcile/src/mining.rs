//! Search-term mining: read-time selection of wasted spend.
//!
//! Not a classic reconciler — it scans recent search-term performance rows,
//! selects terms with zero conversions and cost at or above the configured
//! threshold, and feeds the result into the ad-group negative path exactly
//! like waste-map entries. The raw rows also go to the report harvest.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::negatives::WasteMap;

/// One search-term performance row from the platform's report surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTermRow {
    pub campaign_name: String,
    pub ad_group_name: String,
    pub term: String,
    pub cost_micros: i64,
    #[serde(default)]
    pub conversions: f64,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub impressions: i64,
}

/// Select waste terms: zero conversions and cost >= threshold.
pub fn select_waste_terms(rows: &[SearchTermRow], cost_threshold_micros: i64) -> WasteMap {
    let mut map = WasteMap::new();
    for row in rows {
        if row.conversions > 0.0 || row.cost_micros < cost_threshold_micros {
            continue;
        }
        let term = row.term.trim();
        if term.is_empty() {
            continue;
        }
        map.entry(row.campaign_name.clone())
            .or_default()
            .entry(row.ad_group_name.clone())
            .or_insert_with(BTreeSet::new)
            .insert(term.to_string());
    }
    map
}
