//! Booster Core Library
//!
//! Decides which background processes to close before a game session and
//! closes them. Provides the termination policy engine, snapshot providers,
//! process terminators and the report model.

pub mod close_policy;
pub mod error;
pub mod guard;
pub mod policy;
pub mod provider;
pub mod report;
pub mod terminator;
pub mod types;
pub mod variant;

pub use close_policy::ClosePolicy;
pub use error::{Error, Result, TerminateError};
pub use guard::ProcessGuard;
pub use policy::{MatchStrategy, Plan, PlanEntry, PolicyConfig, PolicyEngine};
pub use provider::{JsonSnapshotProvider, ProcessTableProvider, Snapshot, SnapshotProvider};
pub use report::{OutcomeResult, ReportSummary, TerminationOutcome, TerminationReport};
pub use terminator::{DryRunTerminator, ProcessTerminator, SignalTerminator};
pub use types::{BoostStats, Classification, ProcessRecord, TerminationMode};
pub use variant::{strategy_for, EnumerationStrategy, ManufacturerVariant};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
