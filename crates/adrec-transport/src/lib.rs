//! adrec-transport
//!
//! HTTP adapters behind the runtime's transport traits. Blocking on purpose:
//! a run is one linear pass and every call carries a bounded timeout. No
//! retries happen inside a run; the next scheduled run is the retry.
//!
//! Auth is a bearer token read by the caller (CLI) and passed in; do not log
//! it.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use adrec_pacing::PaceSignal;
use adrec_runtime::{ConfigSource, ReportSink, SignalSource};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings shared by the three adapters.
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub base_url: String,
    pub bearer_token: String,
    pub timeout: Duration,
}

impl HttpSettings {
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `ADREC_API_BASE_URL` and `ADREC_API_TOKEN` are required;
    /// `ADREC_HTTP_TIMEOUT_SECS` overrides the 10s default.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("ADREC_API_BASE_URL").context("ADREC_API_BASE_URL not set")?;
        let bearer_token = std::env::var("ADREC_API_TOKEN").context("ADREC_API_TOKEN not set")?;
        let timeout = match std::env::var("ADREC_HTTP_TIMEOUT_SECS") {
            Ok(s) => Duration::from_secs(
                s.parse::<u64>()
                    .context("ADREC_HTTP_TIMEOUT_SECS must be an integer")?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        Ok(Self {
            base_url,
            bearer_token,
            timeout,
        })
    }

    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .context("http client build failed")
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// GET one JSON resource; 404 is `Ok(None)`.
fn get_json(client: &Client, settings: &HttpSettings, path: &str) -> Result<Option<Value>> {
    let url = settings.url(path);
    debug!(%url, "GET");
    let resp = client
        .get(&url)
        .bearer_auth(&settings.bearer_token)
        .send()
        .with_context(|| format!("GET {url} failed"))?;
    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !resp.status().is_success() {
        bail!("GET {url} returned status {}", resp.status().as_u16());
    }
    let body = resp
        .json::<Value>()
        .with_context(|| format!("GET {url} returned undecodable json"))?;
    Ok(Some(body))
}

pub struct HttpConfigSource {
    settings: HttpSettings,
    client: Client,
}

impl HttpConfigSource {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = settings.client()?;
        Ok(Self { settings, client })
    }
}

impl ConfigSource for HttpConfigSource {
    fn fetch_config(&self, tenant_id: &str) -> Result<Option<Value>> {
        get_json(
            &self.client,
            &self.settings,
            &format!("tenants/{tenant_id}/config"),
        )
    }
}

pub struct HttpSignalSource {
    settings: HttpSettings,
    client: Client,
}

impl HttpSignalSource {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = settings.client()?;
        Ok(Self { settings, client })
    }
}

impl SignalSource for HttpSignalSource {
    fn fetch_signals(&self, tenant_id: &str) -> Result<Option<Vec<PaceSignal>>> {
        let raw = get_json(
            &self.client,
            &self.settings,
            &format!("tenants/{tenant_id}/pacing-signals"),
        )?;
        match raw {
            None => Ok(None),
            Some(value) => {
                let signals: Vec<PaceSignal> = serde_json::from_value(value)
                    .context("pacing signal batch failed to decode")?;
                Ok(Some(signals))
            }
        }
    }
}

pub struct HttpReportSink {
    settings: HttpSettings,
    client: Client,
}

impl HttpReportSink {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = settings.client()?;
        Ok(Self { settings, client })
    }
}

impl ReportSink for HttpReportSink {
    fn upload_chunk(&self, tenant_id: &str, chunk: &Value) -> Result<()> {
        let url = self.settings.url(&format!("tenants/{tenant_id}/report-chunks"));
        debug!(%url, "POST");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.bearer_token)
            .json(chunk)
            .send()
            .with_context(|| format!("POST {url} failed"))?;
        if !resp.status().is_success() {
            bail!("POST {url} returned status {}", resp.status().as_u16());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_trims_trailing_slash() {
        let s = HttpSettings::new("https://api.example.com/", "tok");
        assert_eq!(
            s.url("tenants/acme/config"),
            "https://api.example.com/tenants/acme/config"
        );
    }

    #[test]
    fn default_timeout_is_ten_seconds() {
        let s = HttpSettings::new("https://api.example.com", "tok");
        assert_eq!(s.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
