//! Opaque capability interface over the external ad platform's client
//! library. One method per mutation class; implementations own the wire
//! protocol entirely.

use anyhow::Result;
use serde_json::Value;

pub trait PlatformClient {
    fn set_campaign_budget(&mut self, campaign_id: &str, budget_micros: i64) -> Result<()>;

    fn set_bidding_strategy(&mut self, campaign_id: &str, cpc_ceiling_micros: i64) -> Result<()>;

    /// `blocks` is the schedule day-block array from the intent's `after`.
    fn add_ad_schedule(&mut self, campaign_id: &str, blocks: &Value) -> Result<()>;

    /// Adds to the tenant-wide shared negative list, creating it if absent.
    fn add_master_negative(&mut self, term: &str) -> Result<()>;

    fn attach_negative_list(&mut self, campaign_id: &str) -> Result<()>;

    fn add_adgroup_negative(&mut self, ad_group_id: &str, term: &str) -> Result<()>;

    /// `ad` carries headlines/descriptions/finalUrl/labels.
    fn create_rsa(&mut self, ad_group_id: &str, ad: &Value) -> Result<()>;

    /// `attachment` carries listId/mode and optionally bidModifier.
    fn attach_audience(&mut self, campaign_id: &str, attachment: &Value) -> Result<()>;

    fn detach_audience(&mut self, campaign_id: &str, list_id: i64) -> Result<()>;

    fn pause_ad_group(&mut self, ad_group_id: &str) -> Result<()>;

    fn set_bid_modifier(&mut self, ad_group_id: &str, modifier: f64) -> Result<()>;
}
