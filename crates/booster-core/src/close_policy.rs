//! Caller-facing entry point: capture, evaluate, apply.

use crate::policy::{Plan, PolicyEngine};
use crate::provider::{Snapshot, SnapshotProvider};
use crate::report::TerminationReport;
use crate::terminator::ProcessTerminator;
use crate::types::TerminationMode;
use crate::Result;
use tracing::{error, info};

/// Composes a snapshot provider, the policy engine and a terminator.
///
/// Either a full report is returned or a single capture error; per-record
/// failures always land inside the report.
pub struct ClosePolicy {
    engine: PolicyEngine,
    provider: Box<dyn SnapshotProvider>,
    terminator: Box<dyn ProcessTerminator>,
    self_identifier: String,
}

impl ClosePolicy {
    pub fn new(
        engine: PolicyEngine,
        provider: Box<dyn SnapshotProvider>,
        terminator: Box<dyn ProcessTerminator>,
        self_identifier: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            provider,
            terminator,
            self_identifier: self_identifier.into(),
        }
    }

    pub fn self_identifier(&self) -> &str {
        &self.self_identifier
    }

    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.provider.capture(&self.self_identifier).map_err(|e| {
            error!("Snapshot capture failed: {}", e);
            e
        })
    }

    /// Capture and evaluate without terminating anything.
    pub fn plan(&mut self, mode: TerminationMode) -> Result<Plan> {
        let snapshot = self.snapshot()?;
        Ok(self
            .engine
            .evaluate(&snapshot.records, mode, &self.self_identifier)
            .with_restricted_enumeration(snapshot.restricted_enumeration))
    }

    pub fn run(&mut self, mode: TerminationMode) -> Result<TerminationReport> {
        let plan = self.plan(mode)?;
        info!(
            "{} mode: {} of {} processes eligible for closing",
            mode,
            plan.closable_count(),
            plan.len()
        );

        let report = self.engine.apply(&plan, self.terminator.as_mut());

        let summary = report.summary();
        info!(
            "Run finished: terminated={}, skipped={}, failed={} (permission denied: {})",
            summary.terminated, summary.skipped, summary.failed, summary.permission_denied
        );
        Ok(report)
    }
}
