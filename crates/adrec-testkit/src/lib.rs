//! adrec-testkit
//!
//! Deterministic in-memory stand-ins for the transport seams and the
//! advertising platform. `FakePlatform` applies mutations to its own
//! `LiveState` the way the real platform would, which is what makes the
//! two-pass idempotency harness meaningful: a second run reads back the
//! state the first run wrote.

use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use adrec_config::AudienceMode;
use adrec_executor::PlatformClient;
use adrec_pacing::PaceSignal;
use adrec_reconcile::{
    BiddingStrategy, EntityStatus, LiveAd, LiveAudienceAttachment, LiveState, NegativeList,
    SearchTermRow,
};
use adrec_runtime::{ConfigSource, LiveStateReader, ReportSink, SignalSource};

pub const FAKE_SHARED_LIST_ID: &str = "shared-neg-1";

// ---------------------------------------------------------------------------
// FakePlatform
// ---------------------------------------------------------------------------

/// In-memory advertising account. Reads snapshot it, writes mutate it.
pub struct FakePlatform {
    pub live: LiveState,
    pub search_term_rows: Vec<SearchTermRow>,
    pub metrics_rows: Vec<Value>,
    /// Campaign id whose budget writes fail, for failure-isolation tests.
    pub poison_budget_campaign: Option<String>,
    next_ad_id: u64,
    write_count: u64,
}

impl FakePlatform {
    pub fn new(live: LiveState) -> Self {
        Self {
            live,
            search_term_rows: Vec::new(),
            metrics_rows: Vec::new(),
            poison_budget_campaign: None,
            next_ad_id: 1,
            write_count: 0,
        }
    }

    /// Total successful writes across all runs.
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    fn campaign_mut(&mut self, id: &str) -> Result<&mut adrec_reconcile::LiveCampaign> {
        self.live
            .campaigns
            .get_mut(id)
            .ok_or_else(|| anyhow!("unknown campaign '{id}'"))
    }

    fn ad_group_mut(&mut self, id: &str) -> Result<&mut adrec_reconcile::LiveAdGroup> {
        self.live
            .ad_groups
            .get_mut(id)
            .ok_or_else(|| anyhow!("unknown ad group '{id}'"))
    }
}

impl LiveStateReader for FakePlatform {
    fn read_live_state(&self, _tenant_id: &str) -> Result<LiveState> {
        Ok(self.live.clone())
    }

    fn search_terms(&self, _tenant_id: &str, _lookback_days: u32) -> Result<Vec<SearchTermRow>> {
        Ok(self.search_term_rows.clone())
    }

    fn campaign_metrics(&self, _tenant_id: &str) -> Result<Vec<Value>> {
        Ok(self.metrics_rows.clone())
    }
}

impl PlatformClient for FakePlatform {
    fn set_campaign_budget(&mut self, campaign_id: &str, budget_micros: i64) -> Result<()> {
        if self.poison_budget_campaign.as_deref() == Some(campaign_id) {
            bail!("PLATFORM_REJECTED budget write for '{campaign_id}'");
        }
        self.campaign_mut(campaign_id)?.budget_micros = budget_micros;
        self.write_count += 1;
        Ok(())
    }

    fn set_bidding_strategy(&mut self, campaign_id: &str, cpc_ceiling_micros: i64) -> Result<()> {
        let campaign = self.campaign_mut(campaign_id)?;
        campaign.bidding_strategy = BiddingStrategy::TargetSpend;
        campaign.cpc_ceiling_micros = cpc_ceiling_micros;
        self.write_count += 1;
        Ok(())
    }

    fn add_ad_schedule(&mut self, campaign_id: &str, _blocks: &Value) -> Result<()> {
        self.campaign_mut(campaign_id)?.has_schedule = true;
        self.write_count += 1;
        Ok(())
    }

    fn add_master_negative(&mut self, term: &str) -> Result<()> {
        let list = self.live.shared_negative_list.get_or_insert_with(|| NegativeList {
            id: FAKE_SHARED_LIST_ID.to_string(),
            name: "master negatives".to_string(),
            terms: Default::default(),
        });
        list.terms.insert(term.to_string());
        self.write_count += 1;
        Ok(())
    }

    fn attach_negative_list(&mut self, campaign_id: &str) -> Result<()> {
        if !self.live.campaigns.contains_key(campaign_id) {
            bail!("unknown campaign '{campaign_id}'");
        }
        self.live.negative_list_attached.insert(campaign_id.to_string());
        self.write_count += 1;
        Ok(())
    }

    fn add_adgroup_negative(&mut self, ad_group_id: &str, term: &str) -> Result<()> {
        if !self.live.ad_groups.contains_key(ad_group_id) {
            bail!("unknown ad group '{ad_group_id}'");
        }
        self.live
            .adgroup_negatives
            .entry(ad_group_id.to_string())
            .or_default()
            .insert(term.to_string());
        self.write_count += 1;
        Ok(())
    }

    fn create_rsa(&mut self, ad_group_id: &str, spec: &Value) -> Result<()> {
        if !self.live.ad_groups.contains_key(ad_group_id) {
            bail!("unknown ad group '{ad_group_id}'");
        }
        let id = format!("ad-{}", self.next_ad_id);
        self.next_ad_id += 1;

        let strings = |key: &str| -> Vec<String> {
            spec[key]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };
        let ad = LiveAd {
            id: id.clone(),
            ad_group_id: ad_group_id.to_string(),
            headlines: strings("headlines"),
            descriptions: strings("descriptions"),
            final_url: spec["finalUrl"].as_str().unwrap_or_default().to_string(),
            labels: strings("labels").into_iter().collect(),
            is_dynamic_search_ad: false,
        };
        self.live.ads.insert(id, ad);
        self.write_count += 1;
        Ok(())
    }

    fn attach_audience(&mut self, campaign_id: &str, spec: &Value) -> Result<()> {
        if !self.live.campaigns.contains_key(campaign_id) {
            bail!("unknown campaign '{campaign_id}'");
        }
        let list_id = spec["listId"]
            .as_i64()
            .ok_or_else(|| anyhow!("attach spec missing listId"))?;
        let mode: AudienceMode =
            serde_json::from_value(spec["mode"].clone()).unwrap_or(AudienceMode::Observe);
        self.live.audience_attachments.push(LiveAudienceAttachment {
            list_id,
            campaign_id: campaign_id.to_string(),
            mode,
            bid_modifier: spec["bidModifier"].as_f64(),
        });
        self.write_count += 1;
        Ok(())
    }

    fn detach_audience(&mut self, campaign_id: &str, list_id: i64) -> Result<()> {
        let before = self.live.audience_attachments.len();
        self.live
            .audience_attachments
            .retain(|a| !(a.campaign_id == campaign_id && a.list_id == list_id));
        if self.live.audience_attachments.len() == before {
            bail!("audience {list_id} not attached to '{campaign_id}'");
        }
        self.write_count += 1;
        Ok(())
    }

    fn pause_ad_group(&mut self, ad_group_id: &str) -> Result<()> {
        self.ad_group_mut(ad_group_id)?.status = EntityStatus::Paused;
        self.write_count += 1;
        Ok(())
    }

    fn set_bid_modifier(&mut self, ad_group_id: &str, modifier: f64) -> Result<()> {
        self.ad_group_mut(ad_group_id)?.bid_modifier = Some(modifier);
        self.write_count += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transport fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeConfigSource {
    pub config: Option<Value>,
    pub fail: bool,
}

impl FakeConfigSource {
    pub fn with_config(config: Value) -> Self {
        Self {
            config: Some(config),
            fail: false,
        }
    }
}

impl ConfigSource for FakeConfigSource {
    fn fetch_config(&self, _tenant_id: &str) -> Result<Option<Value>> {
        if self.fail {
            bail!("config endpoint unreachable");
        }
        Ok(self.config.clone())
    }
}

#[derive(Default)]
pub struct FakeSignalSource {
    pub signals: Option<Vec<PaceSignal>>,
    pub fail: bool,
}

impl FakeSignalSource {
    pub fn with_signals(signals: Vec<PaceSignal>) -> Self {
        Self {
            signals: Some(signals),
            fail: false,
        }
    }
}

impl SignalSource for FakeSignalSource {
    fn fetch_signals(&self, _tenant_id: &str) -> Result<Option<Vec<PaceSignal>>> {
        if self.fail {
            bail!("signal endpoint unreachable");
        }
        Ok(self.signals.clone())
    }
}

/// Collects uploaded chunks; optionally rejects chosen chunk indices.
#[derive(Default)]
pub struct CollectingReportSink {
    chunks: Mutex<Vec<Value>>,
    pub reject_chunks: Vec<u64>,
}

impl CollectingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<Value> {
        self.chunks.lock().expect("sink poisoned").clone()
    }
}

impl ReportSink for CollectingReportSink {
    fn upload_chunk(&self, _tenant_id: &str, chunk: &Value) -> Result<()> {
        let idx = chunk["chunk"].as_u64().unwrap_or(0);
        if self.reject_chunks.contains(&idx) {
            bail!("chunk {idx} rejected");
        }
        self.chunks.lock().expect("sink poisoned").push(chunk.clone());
        Ok(())
    }
}
