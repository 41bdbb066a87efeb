//! adrec entry point.
//!
//! Thin on purpose: parse args, set up tracing, wire sources, hand off to
//! `adrec_runtime::run_tenant`. The platform side of a run is always a
//! LiveState fixture here; `--base-url` switches the config, signal, and
//! report transports to HTTP.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use adrec_audit::{verify_jsonl, VerifyResult};
use adrec_config::{ConfigSnapshot, RunMode};
use adrec_pacing::PaceSignal;
use adrec_reconcile::LiveState;
use adrec_runtime::{run_tenant, ConfigSource, ReportSink, SignalSource};
use adrec_testkit::{FakeConfigSource, FakePlatform, FakeSignalSource};
use adrec_transport::{HttpConfigSource, HttpReportSink, HttpSettings, HttpSignalSource};

#[derive(Parser)]
#[command(name = "adrec")]
#[command(about = "Desired-state reconciliation for ad campaigns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one tenant.
    Run {
        /// Tenant id
        #[arg(long)]
        tenant: String,

        /// production | preview | idempotency-test
        #[arg(long, default_value = "preview")]
        mode: String,

        /// Tenant config JSON fixture (omit with --base-url to fetch over HTTP)
        #[arg(long)]
        config: Option<PathBuf>,

        /// LiveState JSON fixture for the platform side
        #[arg(long)]
        live: PathBuf,

        /// Pacing signal batch JSON fixture
        #[arg(long)]
        signals: Option<PathBuf>,

        /// API base URL; switches config/signal/report transport to HTTP.
        /// Requires ADREC_API_TOKEN.
        #[arg(long = "base-url")]
        base_url: Option<String>,

        /// Write the full run report JSON here
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Validate a config document and print its canonical hash.
    ConfigHash {
        path: PathBuf,
    },

    /// Verify the hash chain of an exported mutation ledger (JSONL).
    VerifyLog {
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run {
            tenant,
            mode,
            config,
            live,
            signals,
            base_url,
            out,
        } => cmd_run(&tenant, &mode, config, live, signals, base_url, out),
        Commands::ConfigHash { path } => cmd_config_hash(&path),
        Commands::VerifyLog { path } => cmd_verify_log(&path),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Report sink for fixture runs: one JSON line per chunk on stdout.
struct StdoutReportSink;

impl ReportSink for StdoutReportSink {
    fn upload_chunk(&self, _tenant_id: &str, chunk: &Value) -> Result<()> {
        println!("{chunk}");
        Ok(())
    }
}

fn read_json(path: &PathBuf) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    tenant: &str,
    mode: &str,
    config: Option<PathBuf>,
    live: PathBuf,
    signals: Option<PathBuf>,
    base_url: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mode: RunMode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let live_state: LiveState =
        serde_json::from_value(read_json(&live)?).context("live state fixture invalid")?;
    let mut platform = FakePlatform::new(live_state);

    let config_source: Box<dyn ConfigSource>;
    let signal_source: Box<dyn SignalSource>;
    let report_sink: Box<dyn ReportSink>;
    match base_url {
        Some(url) => {
            let token = std::env::var("ADREC_API_TOKEN").context("ADREC_API_TOKEN not set")?;
            let settings = HttpSettings::new(url, token);
            config_source = Box::new(HttpConfigSource::new(settings.clone())?);
            signal_source = Box::new(HttpSignalSource::new(settings.clone())?);
            report_sink = Box::new(HttpReportSink::new(settings)?);
        }
        None => {
            let raw = match config {
                Some(path) => Some(read_json(&path)?),
                None => None,
            };
            config_source = Box::new(FakeConfigSource {
                config: raw,
                fail: false,
            });
            let batch: Option<Vec<PaceSignal>> = match signals {
                Some(path) => Some(
                    serde_json::from_value(read_json(&path)?)
                        .context("signal fixture invalid")?,
                ),
                None => None,
            };
            signal_source = Box::new(FakeSignalSource {
                signals: batch,
                fail: false,
            });
            report_sink = Box::new(StdoutReportSink);
        }
    }

    let report = run_tenant(
        tenant,
        mode,
        config_source.as_ref(),
        signal_source.as_ref(),
        report_sink.as_ref(),
        &mut platform,
    );

    info!(
        tenant,
        state = report.state.as_str(),
        planned = report.planned.values().sum::<u64>(),
        applied = report.applied.values().sum::<u64>(),
        failed = report.failed.values().sum::<u64>(),
        "run done"
    );
    for w in &report.warnings {
        eprintln!("warning: {w}");
    }
    if let Some(path) = out {
        fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("write {}", path.display()))?;
        info!(report = %path.display(), "report written");
    }
    Ok(())
}

fn cmd_config_hash(path: &PathBuf) -> Result<()> {
    let raw = read_json(path)?;
    let cfg = ConfigSnapshot::from_json(raw)?;
    println!("config_hash={}", cfg.config_hash());
    for w in &cfg.validation_warnings {
        eprintln!("warning: {w}");
    }
    Ok(())
}

fn cmd_verify_log(path: &PathBuf) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    match verify_jsonl(&content)? {
        VerifyResult::Valid { lines } => {
            println!("chain_ok=true lines={lines}");
            Ok(())
        }
        VerifyResult::Broken { line, reason } => {
            bail!("chain_ok=false line={line} reason={reason}");
        }
    }
}
