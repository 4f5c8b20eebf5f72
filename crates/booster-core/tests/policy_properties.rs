// Integration tests for the termination policy engine
// Exercise the public API with in-test snapshots and terminators

use booster_core::{
    Classification, OutcomeResult, PolicyConfig, PolicyEngine, ProcessRecord, ProcessTerminator,
    TerminateError, TerminationMode,
};

const SELF_ID: &str = "com.app.self";

#[derive(Default)]
struct ScriptedTerminator {
    calls: Vec<String>,
    deny: Vec<&'static str>,
}

impl ProcessTerminator for ScriptedTerminator {
    fn terminate(&mut self, identifier: &str) -> Result<(), TerminateError> {
        self.calls.push(identifier.to_string());
        if self.deny.iter().any(|d| *d == identifier) {
            return Err(TerminateError::PermissionDenied(identifier.to_string()));
        }
        Ok(())
    }
}

fn mixed_snapshot() -> Vec<ProcessRecord> {
    vec![
        ProcessRecord::new(SELF_ID, 100),
        ProcessRecord::new("com.supercell.clashofclans", 101).foreground(),
        ProcessRecord::new("com.android.systemui", 102),
        ProcessRecord::new("com.android.phone", 103),
        ProcessRecord::new("com.android.settings", 104),
        ProcessRecord::new("com.android.launcher3", 105),
        ProcessRecord::new("com.android.dialer", 106),
        ProcessRecord::new("com.whatsapp", 107),
        ProcessRecord::new("com.spotify.music", 108),
        ProcessRecord::new("com.android.systemui", 109).foreground(),
    ]
}

const MODES: [TerminationMode; 2] = [TerminationMode::Normal, TerminationMode::Extreme];

#[test]
fn test_self_never_reaches_terminator() {
    let engine = PolicyEngine::default();

    for mode in MODES {
        let plan = engine.evaluate(&mixed_snapshot(), mode, SELF_ID);
        let mut terminator = ScriptedTerminator::default();
        let report = engine.apply(&plan, &mut terminator);

        assert!(!terminator.calls.iter().any(|c| c == SELF_ID));
        assert_eq!(
            report.outcomes()[0].result,
            OutcomeResult::Skipped(Classification::SelfProcess)
        );
    }
}

#[test]
fn test_foreground_always_skipped() {
    let engine = PolicyEngine::default();

    for mode in MODES {
        let snapshot = mixed_snapshot();
        let plan = engine.evaluate(&snapshot, mode, SELF_ID);
        let report = engine.apply(&plan, &mut ScriptedTerminator::default());

        for (record, outcome) in snapshot.iter().zip(report.outcomes()) {
            if record.foreground && record.identifier != SELF_ID {
                assert_eq!(outcome.result.tag(), "skipped:Foreground");
            }
        }
    }
}

#[test]
fn test_protected_skipped_in_every_mode() {
    let engine = PolicyEngine::default();

    for mode in MODES {
        let plan = engine.evaluate(&mixed_snapshot(), mode, SELF_ID);
        let report = engine.apply(&plan, &mut ScriptedTerminator::default());

        for index in [2, 3, 4] {
            assert_eq!(report.outcomes()[index].result.tag(), "skipped:Protected");
        }
    }
}

#[test]
fn test_essential_follows_mode() {
    let engine = PolicyEngine::default();

    let plan = engine.evaluate(&mixed_snapshot(), TerminationMode::Normal, SELF_ID);
    let report = engine.apply(&plan, &mut ScriptedTerminator::default());
    assert_eq!(report.outcomes()[5].result.tag(), "skipped:Essential");
    assert_eq!(report.outcomes()[6].result.tag(), "skipped:Essential");

    let plan = engine.evaluate(&mixed_snapshot(), TerminationMode::Extreme, SELF_ID);
    let report = engine.apply(&plan, &mut ScriptedTerminator::default());
    assert_eq!(report.outcomes()[5].result, OutcomeResult::Terminated);
    assert_eq!(report.outcomes()[6].result, OutcomeResult::Terminated);
}

#[test]
fn test_report_length_matches_plan() {
    let engine = PolicyEngine::default();

    for mode in MODES {
        let plan = engine.evaluate(&mixed_snapshot(), mode, SELF_ID);
        let report = engine.apply(&plan, &mut ScriptedTerminator::default());
        assert_eq!(plan.len(), report.len());
        assert_eq!(plan.len(), mixed_snapshot().len());
    }
}

#[test]
fn test_permission_denied_does_not_stop_batch() {
    let engine = PolicyEngine::default();
    let snapshot = vec![
        ProcessRecord::new("A", 1),
        ProcessRecord::new("B", 2),
        ProcessRecord::new("C", 3),
    ];
    let plan = engine.evaluate(&snapshot, TerminationMode::Normal, SELF_ID);

    let mut terminator = ScriptedTerminator {
        deny: vec!["B"],
        ..Default::default()
    };
    let report = engine.apply(&plan, &mut terminator);

    let tags: Vec<String> = report.outcomes().iter().map(|o| o.result.tag()).collect();
    assert_eq!(tags, vec!["terminated", "failed:permission-denied", "terminated"]);
    assert_eq!(terminator.calls, vec!["A", "B", "C"]);
}

#[test]
fn test_self_only_snapshot() {
    let engine = PolicyEngine::default();
    let snapshot = vec![ProcessRecord::new("com.app.self", 1)];
    let plan = engine.evaluate(&snapshot, TerminationMode::Extreme, "com.app.self");
    let report = engine.apply(&plan, &mut ScriptedTerminator::default());

    assert_eq!(report.tags(), vec![("com.app.self".to_string(), "skipped:self".to_string())]);
}

#[test]
fn test_launcher_scenario() {
    let engine = PolicyEngine::default();
    let snapshot = vec![ProcessRecord::new("com.android.launcher3", 1)];

    let plan = engine.evaluate(&snapshot, TerminationMode::Normal, SELF_ID);
    let report = engine.apply(&plan, &mut ScriptedTerminator::default());
    assert_eq!(report.outcomes()[0].result.tag(), "skipped:Essential");

    let plan = engine.evaluate(&snapshot, TerminationMode::Extreme, SELF_ID);
    let report = engine.apply(&plan, &mut ScriptedTerminator::default());
    assert_eq!(report.outcomes()[0].result.tag(), "terminated");
}

#[test]
fn test_evaluate_is_deterministic() {
    let engine = PolicyEngine::new(PolicyConfig::default());
    let snapshot = mixed_snapshot();

    for mode in MODES {
        let first = engine.evaluate(&snapshot, mode, SELF_ID);
        let second = engine.evaluate(&snapshot, mode, SELF_ID);
        assert_eq!(first, second);
    }
}

#[test]
fn test_plan_preserves_snapshot_order() {
    let engine = PolicyEngine::default();
    let snapshot = mixed_snapshot();
    let plan = engine.evaluate(&snapshot, TerminationMode::Extreme, SELF_ID);

    let planned: Vec<&ProcessRecord> = plan.entries.iter().map(|e| &e.record).collect();
    let original: Vec<&ProcessRecord> = snapshot.iter().collect();
    assert_eq!(planned, original);
}

#[test]
fn test_custom_membership_lists() {
    let config = PolicyConfig {
        protected_apps: ["com.discord".to_string()].into_iter().collect(),
        essential_apps: ["com.whatsapp".to_string()].into_iter().collect(),
        ..PolicyConfig::default()
    };
    let engine = PolicyEngine::new(config);
    let snapshot = vec![
        ProcessRecord::new("com.discord", 1),
        ProcessRecord::new("com.whatsapp", 2),
        ProcessRecord::new("com.android.systemui", 3),
    ];

    let plan = engine.evaluate(&snapshot, TerminationMode::Normal, SELF_ID);
    let classes: Vec<Classification> = plan.entries.iter().map(|e| e.classification).collect();
    assert_eq!(
        classes,
        vec![
            Classification::Protected,
            Classification::Essential,
            Classification::Closable
        ]
    );
}
