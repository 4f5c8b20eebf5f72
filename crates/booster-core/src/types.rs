use crate::report::{OutcomeResult, TerminationReport};
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One observed running entity in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Process or package name, e.g. `com.android.launcher3`.
    pub identifier: String,

    /// Pid or task id. Zero when the enumeration strategy has no handle.
    #[serde(default)]
    pub native_handle: u32,

    /// Currently presented to the user.
    #[serde(default)]
    pub foreground: bool,

    #[serde(default)]
    pub is_self: bool,
}

impl ProcessRecord {
    pub fn new(identifier: impl Into<String>, native_handle: u32) -> Self {
        Self {
            identifier: identifier.into(),
            native_handle,
            foreground: false,
            is_self: false,
        }
    }

    pub fn foreground(mut self) -> Self {
        self.foreground = true;
        self
    }

    pub fn mark_self(mut self, self_identifier: &str) -> Self {
        self.is_self = self.identifier == self_identifier;
        self
    }
}

/// Caller intent for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationMode {
    #[default]
    Normal,
    /// Also closes essential apps (launcher, dialer).
    Extreme,
}

impl fmt::Display for TerminationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationMode::Normal => write!(f, "normal"),
            TerminationMode::Extreme => write!(f, "extreme"),
        }
    }
}

impl FromStr for TerminationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(TerminationMode::Normal),
            "extreme" => Ok(TerminationMode::Extreme),
            other => Err(Error::Parse(format!(
                "unknown termination mode '{}', expected normal or extreme",
                other
            ))),
        }
    }
}

/// Policy class of a record. Derived per evaluation, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// The caller's own process.
    #[serde(rename = "self")]
    SelfProcess,
    /// Malformed record (empty identifier).
    Invalid,
    Foreground,
    Protected,
    Essential,
    Closable,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::SelfProcess => "self",
            Classification::Invalid => "invalid",
            Classification::Foreground => "Foreground",
            Classification::Protected => "Protected",
            Classification::Essential => "Essential",
            Classification::Closable => "Closable",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run statistics accumulated by a long-lived caller
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BoostStats {
    pub total_runs: u64,
    pub total_terminated: u64,
    pub total_skipped: u64,
    pub total_failed: u64,
    pub permission_denials: u64,
    pub capture_failures: u64,
    pub last_run: Option<DateTime<Utc>>,
}

impl BoostStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_report(&mut self, report: &TerminationReport) {
        self.total_runs += 1;
        for outcome in report.outcomes() {
            match &outcome.result {
                OutcomeResult::Terminated => self.total_terminated += 1,
                OutcomeResult::Skipped(_) => self.total_skipped += 1,
                OutcomeResult::Failed(reason) => {
                    self.total_failed += 1;
                    if reason == crate::report::PERMISSION_DENIED {
                        self.permission_denials += 1;
                    }
                }
            }
        }
        self.last_run = Some(Utc::now());
    }

    pub fn record_capture_failure(&mut self) {
        self.total_runs += 1;
        self.capture_failures += 1;
        self.last_run = Some(Utc::now());
    }
}
