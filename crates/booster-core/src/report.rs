//! Per-process outcomes and the report handed back to the caller.

use crate::types::{Classification, TerminationMode};
use serde::{Serialize, Serializer};
use std::fmt;

/// Failure reason recorded when the terminator refuses an identifier.
pub const PERMISSION_DENIED: &str = "permission-denied";

/// Failure reason recorded for a snapshot entry with an empty identifier.
pub const INVALID_IDENTIFIER: &str = "invalid-identifier";

/// Failure reason when no local process carries the identifier.
pub const NOT_RUNNING: &str = "not-running";

/// Failure reason when every matching process is init, a kernel thread,
/// or part of our own foreground chain.
pub const GUARDED_PROCESS: &str = "guarded-process";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeResult {
    Terminated,
    Skipped(Classification),
    Failed(String),
}

impl OutcomeResult {
    /// Literal tag: `terminated`, `skipped:<classification>` or `failed:<reason>`.
    pub fn tag(&self) -> String {
        match self {
            OutcomeResult::Terminated => "terminated".to_string(),
            OutcomeResult::Skipped(class) => format!("skipped:{}", class.label()),
            OutcomeResult::Failed(reason) => format!("failed:{}", reason),
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, OutcomeResult::Terminated)
    }
}

impl fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl Serialize for OutcomeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationOutcome {
    pub identifier: String,
    pub result: OutcomeResult,
}

impl TerminationOutcome {
    pub fn terminated(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            result: OutcomeResult::Terminated,
        }
    }

    pub fn skipped(identifier: impl Into<String>, classification: Classification) -> Self {
        Self {
            identifier: identifier.into(),
            result: OutcomeResult::Skipped(classification),
        }
    }

    pub fn failed(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            result: OutcomeResult::Failed(reason.into()),
        }
    }
}

/// Counts per outcome kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub terminated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub permission_denied: usize,
}

/// Complete, order-preserving list of outcomes for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    mode: TerminationMode,
    /// Snapshot handles may not be real pids.
    restricted_enumeration: bool,
    outcomes: Vec<TerminationOutcome>,
}

impl TerminationReport {
    pub fn new(
        mode: TerminationMode,
        restricted_enumeration: bool,
        outcomes: Vec<TerminationOutcome>,
    ) -> Self {
        Self {
            mode,
            restricted_enumeration,
            outcomes,
        }
    }

    pub fn mode(&self) -> TerminationMode {
        self.mode
    }

    pub fn restricted_enumeration(&self) -> bool {
        self.restricted_enumeration
    }

    pub fn outcomes(&self) -> &[TerminationOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Identifiers that were actually closed, in snapshot order.
    pub fn terminated(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_terminated())
            .map(|o| o.identifier.as_str())
            .collect()
    }

    /// `(identifier, tag)` pairs as exposed to the bridge layer.
    pub fn tags(&self) -> Vec<(String, String)> {
        self.outcomes
            .iter()
            .map(|o| (o.identifier.clone(), o.result.tag()))
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for outcome in &self.outcomes {
            match &outcome.result {
                OutcomeResult::Terminated => summary.terminated += 1,
                OutcomeResult::Skipped(_) => summary.skipped += 1,
                OutcomeResult::Failed(reason) => {
                    summary.failed += 1;
                    if reason == PERMISSION_DENIED {
                        summary.permission_denied += 1;
                    }
                }
            }
        }
        summary
    }
}
