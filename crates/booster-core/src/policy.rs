//! Termination policy engine.
//!
//! Decides, for every record of a snapshot, whether it may be closed under
//! the requested mode, then drives a [`ProcessTerminator`] over the closable
//! records and collects one outcome per record.
//!
//! The engine is synchronous and holds no state between calls. Concurrent
//! `apply` calls against the same device must be serialized by the caller.

use crate::error::TerminateError;
use crate::report::{TerminationOutcome, TerminationReport, INVALID_IDENTIFIER, PERMISSION_DENIED};
use crate::terminator::ProcessTerminator;
use crate::types::{Classification, ProcessRecord, TerminationMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// How membership lists are matched against identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Case-sensitive substring containment; catches OEM-suffixed names
    /// such as `com.android.launcher3`.
    #[default]
    Contains,
    Exact,
}

/// Static membership configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Never closed, in any mode (system UI, telephony, settings).
    pub protected_apps: BTreeSet<String>,

    /// Closed only in extreme mode (launcher, dialer).
    pub essential_apps: BTreeSet<String>,

    pub match_strategy: MatchStrategy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            protected_apps: [
                "com.android.systemui",
                "com.android.phone",
                "com.android.settings",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            essential_apps: ["com.android.launcher", "com.android.dialer"]
                .into_iter()
                .map(String::from)
                .collect(),
            match_strategy: MatchStrategy::Contains,
        }
    }
}

/// One evaluated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub record: ProcessRecord,
    pub classification: Classification,
    pub should_close: bool,
}

/// Output of [`PolicyEngine::evaluate`], in snapshot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub mode: TerminationMode,
    pub restricted_enumeration: bool,
    pub entries: Vec<PlanEntry>,
}

impl Plan {
    pub fn with_restricted_enumeration(mut self, restricted: bool) -> Self {
        self.restricted_enumeration = restricted;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records that `apply` will hand to the terminator.
    pub fn closable_count(&self) -> usize {
        self.entries.iter().filter(|e| e.should_close).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Classify a single record. Rules are checked in order: self,
    /// foreground, protected, essential. Protected wins over essential when
    /// an identifier matches both lists.
    pub fn classify(&self, record: &ProcessRecord, self_identifier: &str) -> Classification {
        if record.identifier.is_empty() {
            Classification::Invalid
        } else if record.is_self || record.identifier == self_identifier {
            Classification::SelfProcess
        } else if record.foreground {
            Classification::Foreground
        } else if self.matches(&self.config.protected_apps, &record.identifier) {
            Classification::Protected
        } else if self.matches(&self.config.essential_apps, &record.identifier) {
            Classification::Essential
        } else {
            Classification::Closable
        }
    }

    /// Pure evaluation of a snapshot. Order-preserving; duplicates are
    /// evaluated independently.
    pub fn evaluate(
        &self,
        snapshot: &[ProcessRecord],
        mode: TerminationMode,
        self_identifier: &str,
    ) -> Plan {
        let entries = snapshot
            .iter()
            .map(|record| {
                let classification = self.classify(record, self_identifier);
                let should_close = match classification {
                    Classification::Closable => true,
                    Classification::Essential => mode == TerminationMode::Extreme,
                    _ => false,
                };
                debug!(
                    "{} -> {} (close: {})",
                    record.identifier, classification, should_close
                );
                PlanEntry {
                    record: record.clone(),
                    classification,
                    should_close,
                }
            })
            .collect();

        Plan {
            mode,
            restricted_enumeration: false,
            entries,
        }
    }

    /// Execute a plan: one terminator call per closable record, sequential,
    /// in plan order. A failing record never stops the batch.
    pub fn apply<T>(&self, plan: &Plan, terminator: &mut T) -> TerminationReport
    where
        T: ProcessTerminator + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(plan.entries.len());

        for entry in &plan.entries {
            let identifier = &entry.record.identifier;

            if entry.classification == Classification::Invalid {
                warn!(
                    "Snapshot entry with empty identifier (handle {})",
                    entry.record.native_handle
                );
                outcomes.push(TerminationOutcome::failed(identifier, INVALID_IDENTIFIER));
                continue;
            }

            if !entry.should_close {
                outcomes.push(TerminationOutcome::skipped(identifier, entry.classification));
                continue;
            }

            match terminator.terminate(identifier) {
                Ok(()) => {
                    info!("Closed {}", identifier);
                    outcomes.push(TerminationOutcome::terminated(identifier));
                }
                Err(TerminateError::PermissionDenied(msg)) => {
                    warn!("Permission denied closing {}: {}", identifier, msg);
                    outcomes.push(TerminationOutcome::failed(identifier, PERMISSION_DENIED));
                }
                Err(TerminateError::Other(msg)) => {
                    warn!("Failed to close {}: {}", identifier, msg);
                    outcomes.push(TerminationOutcome::failed(identifier, msg));
                }
            }
        }

        TerminationReport::new(plan.mode, plan.restricted_enumeration, outcomes)
    }

    fn matches(&self, members: &BTreeSet<String>, identifier: &str) -> bool {
        members
            .iter()
            .filter(|member| !member.is_empty())
            .any(|member| match self.config.match_strategy {
                MatchStrategy::Contains => identifier.contains(member.as_str()),
                MatchStrategy::Exact => identifier == member.as_str(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OutcomeResult;

    const SELF_ID: &str = "com.boostgamefaster";

    /// Records every call; denies identifiers listed in `deny`.
    #[derive(Default)]
    struct RecordingTerminator {
        calls: Vec<String>,
        deny: Vec<String>,
    }

    impl ProcessTerminator for RecordingTerminator {
        fn terminate(&mut self, identifier: &str) -> Result<(), TerminateError> {
            self.calls.push(identifier.to_string());
            if self.deny.iter().any(|d| d == identifier) {
                Err(TerminateError::PermissionDenied(identifier.to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn engine() -> PolicyEngine {
        PolicyEngine::new(PolicyConfig::default())
    }

    #[test]
    fn test_default_membership() {
        let config = PolicyConfig::default();
        assert!(config.protected_apps.contains("com.android.systemui"));
        assert!(config.protected_apps.contains("com.android.phone"));
        assert!(config.protected_apps.contains("com.android.settings"));
        assert!(config.essential_apps.contains("com.android.launcher"));
        assert!(config.essential_apps.contains("com.android.dialer"));
        assert_eq!(config.match_strategy, MatchStrategy::Contains);
    }

    #[test]
    fn test_classify_order() {
        let engine = engine();

        let own = ProcessRecord::new(SELF_ID, 1).foreground();
        assert_eq!(engine.classify(&own, SELF_ID), Classification::SelfProcess);

        let fg_settings = ProcessRecord::new("com.android.settings", 2).foreground();
        assert_eq!(engine.classify(&fg_settings, SELF_ID), Classification::Foreground);

        let ui = ProcessRecord::new("com.android.systemui", 3);
        assert_eq!(engine.classify(&ui, SELF_ID), Classification::Protected);

        let launcher = ProcessRecord::new("com.android.launcher3", 4);
        assert_eq!(engine.classify(&launcher, SELF_ID), Classification::Essential);

        let app = ProcessRecord::new("com.spotify.music", 5);
        assert_eq!(engine.classify(&app, SELF_ID), Classification::Closable);
    }

    #[test]
    fn test_is_self_flag_honored() {
        let record = ProcessRecord {
            identifier: "com.boostgamefaster:overlay".to_string(),
            native_handle: 9,
            foreground: false,
            is_self: true,
        };
        assert_eq!(engine().classify(&record, SELF_ID), Classification::SelfProcess);
    }

    #[test]
    fn test_protected_wins_over_essential() {
        let mut config = PolicyConfig::default();
        config.essential_apps.insert("com.android.phone".to_string());
        let engine = PolicyEngine::new(config);

        let phone = ProcessRecord::new("com.android.phone", 10);
        assert_eq!(engine.classify(&phone, SELF_ID), Classification::Protected);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let record = ProcessRecord::new("COM.ANDROID.SYSTEMUI", 11);
        assert_eq!(engine().classify(&record, SELF_ID), Classification::Closable);
    }

    #[test]
    fn test_exact_strategy() {
        let config = PolicyConfig {
            match_strategy: MatchStrategy::Exact,
            ..PolicyConfig::default()
        };
        let engine = PolicyEngine::new(config);

        let launcher3 = ProcessRecord::new("com.android.launcher3", 1);
        assert_eq!(engine.classify(&launcher3, SELF_ID), Classification::Closable);

        let launcher = ProcessRecord::new("com.android.launcher", 2);
        assert_eq!(engine.classify(&launcher, SELF_ID), Classification::Essential);
    }

    #[test]
    fn test_empty_member_never_matches() {
        let mut config = PolicyConfig::default();
        config.protected_apps.insert(String::new());
        let engine = PolicyEngine::new(config);

        let app = ProcessRecord::new("com.spotify.music", 1);
        assert_eq!(engine.classify(&app, SELF_ID), Classification::Closable);
    }

    #[test]
    fn test_essential_depends_on_mode() {
        let snapshot = vec![ProcessRecord::new("com.android.launcher3", 7)];
        let engine = engine();

        let normal = engine.evaluate(&snapshot, TerminationMode::Normal, SELF_ID);
        assert!(!normal.entries[0].should_close);

        let extreme = engine.evaluate(&snapshot, TerminationMode::Extreme, SELF_ID);
        assert!(extreme.entries[0].should_close);
    }

    #[test]
    fn test_evaluate_empty_snapshot() {
        let plan = engine().evaluate(&[], TerminationMode::Extreme, SELF_ID);
        assert!(plan.is_empty());
        assert_eq!(plan.closable_count(), 0);
    }

    #[test]
    fn test_apply_skips_without_calling_terminator() {
        let snapshot = vec![
            ProcessRecord::new(SELF_ID, 1),
            ProcessRecord::new("com.example.game", 2).foreground(),
            ProcessRecord::new("com.android.phone", 3),
            ProcessRecord::new("com.android.dialer", 4),
        ];
        let engine = engine();
        let plan = engine.evaluate(&snapshot, TerminationMode::Normal, SELF_ID);

        let mut terminator = RecordingTerminator::default();
        let report = engine.apply(&plan, &mut terminator);

        assert!(terminator.calls.is_empty());
        let results: Vec<_> = report.outcomes().iter().map(|o| o.result.tag()).collect();
        assert_eq!(
            results,
            vec![
                "skipped:self",
                "skipped:Foreground",
                "skipped:Protected",
                "skipped:Essential"
            ]
        );
    }

    #[test]
    fn test_apply_continues_after_permission_denied() {
        let snapshot = vec![
            ProcessRecord::new("com.a", 1),
            ProcessRecord::new("com.b", 2),
            ProcessRecord::new("com.c", 3),
        ];
        let engine = engine();
        let plan = engine.evaluate(&snapshot, TerminationMode::Normal, SELF_ID);

        let mut terminator = RecordingTerminator {
            deny: vec!["com.b".to_string()],
            ..Default::default()
        };
        let report = engine.apply(&plan, &mut terminator);

        assert_eq!(terminator.calls, vec!["com.a", "com.b", "com.c"]);
        let results: Vec<_> = report.outcomes().iter().map(|o| o.result.clone()).collect();
        assert_eq!(
            results,
            vec![
                OutcomeResult::Terminated,
                OutcomeResult::Failed(PERMISSION_DENIED.to_string()),
                OutcomeResult::Terminated,
            ]
        );
    }

    #[test]
    fn test_apply_records_other_failure_message() {
        struct Flaky;
        impl ProcessTerminator for Flaky {
            fn terminate(&mut self, _identifier: &str) -> Result<(), TerminateError> {
                Err(TerminateError::Other("binder died".to_string()))
            }
        }

        let engine = engine();
        let plan = engine.evaluate(
            &[ProcessRecord::new("com.a", 1)],
            TerminationMode::Normal,
            SELF_ID,
        );
        let report = engine.apply(&plan, &mut Flaky);

        assert_eq!(
            report.outcomes()[0].result,
            OutcomeResult::Failed("binder died".to_string())
        );
    }

    #[test]
    fn test_apply_invalid_identifier() {
        let engine = engine();
        let plan = engine.evaluate(
            &[ProcessRecord::new("", 1), ProcessRecord::new("com.a", 2)],
            TerminationMode::Extreme,
            SELF_ID,
        );

        let mut terminator = RecordingTerminator::default();
        let report = engine.apply(&plan, &mut terminator);

        assert_eq!(terminator.calls, vec!["com.a"]);
        assert_eq!(report.outcomes()[0].result.tag(), "failed:invalid-identifier");
    }

    #[test]
    fn test_duplicates_are_not_deduplicated() {
        let engine = engine();
        let plan = engine.evaluate(
            &[ProcessRecord::new("com.a", 1), ProcessRecord::new("com.a", 2)],
            TerminationMode::Normal,
            SELF_ID,
        );

        let mut terminator = RecordingTerminator::default();
        let report = engine.apply(&plan, &mut terminator);

        assert_eq!(terminator.calls, vec!["com.a", "com.a"]);
        assert_eq!(report.terminated(), vec!["com.a", "com.a"]);
    }

    #[test]
    fn test_report_carries_plan_metadata() {
        let engine = engine();
        let plan = engine
            .evaluate(&[], TerminationMode::Extreme, SELF_ID)
            .with_restricted_enumeration(true);
        let report = engine.apply(&plan, &mut RecordingTerminator::default());

        assert_eq!(report.mode(), TerminationMode::Extreme);
        assert!(report.restricted_enumeration());
    }
}
