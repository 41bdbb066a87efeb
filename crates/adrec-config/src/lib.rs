//! adrec-config
//!
//! Desired-state configuration for one tenant.
//!
//! Architectural decisions:
//! - One immutable, fully validated [`ConfigSnapshot`] per run. Loaded once,
//!   never mutated, shared by reference with every reconciler.
//! - Nested feature maps (waste negatives, RSA overrides, audience map) are
//!   validated here, at construction time. Reconcilers never re-check shape.
//! - A canonical config hash (sha256 over key-sorted compact JSON) is computed
//!   at load time and carried into the run report for audit.
//!
//! Deserialization accepts the config service's camelCase wire schema; all
//! currency amounts are converted to integer micros on entry.

mod snapshot;

pub use snapshot::{
    AudienceMode, AudienceSpec, ConfigSnapshot, RsaContent, ScheduleSpec, DEFAULT_RESERVED_TERMS,
};

use sha2::{Digest, Sha256};

/// Micros scale (1e-6) used for all currency amounts.
pub const MICROS_SCALE: i64 = 1_000_000;

/// Run mode set by the external harness before a run is invoked.
///
/// Only [`RunMode::Production`] can ever open the promote gate; the other two
/// modes compute and log every mutation without applying any.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Preview,
    IdempotencyTest,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Production => "PRODUCTION",
            RunMode::Preview => "PREVIEW",
            RunMode::IdempotencyTest => "IDEMPOTENCY_TEST",
        }
    }
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "PRODUCTION" => Ok(RunMode::Production),
            "PREVIEW" => Ok(RunMode::Preview),
            "IDEMPOTENCY_TEST" => Ok(RunMode::IdempotencyTest),
            other => Err(format!("unknown run mode '{other}'")),
        }
    }
}

/// Convert a currency amount in units (e.g. 3.50) to integer micros.
pub fn units_to_micros(units: f64) -> i64 {
    (units * MICROS_SCALE as f64).round() as i64
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
pub fn canonical_json(v: &serde_json::Value) -> String {
    serde_json::to_string(&sort_keys(v)).unwrap_or_default()
}

fn sort_keys(v: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
