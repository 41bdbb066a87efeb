//! adrec-executor
//!
//! The SINGLE choke-point for platform writes.
//!
//! # Invariants
//! - Every intent is appended to the mutation ledger exactly once, whether it
//!   was applied, gated off, or failed.
//! - The promote gate is evaluated inside `execute`; callers cannot inject a
//!   verdict. A closed gate means the platform is never touched.
//! - A failed platform call is absorbed here: logged with entity context,
//!   recorded as FAILED, and the run continues. One malformed campaign must
//!   not block caps from being applied to every other campaign.

mod client;
mod executor;

pub use client::PlatformClient;
pub use executor::{ExecOutcome, MutationExecutor};
