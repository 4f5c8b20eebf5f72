use crate::guard::ProcessGuard;
use crate::types::ProcessRecord;
use crate::variant::EnumerationStrategy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use sysinfo::System;
use tracing::{debug, warn};

/// Point-in-time enumeration of running processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub records: Vec<ProcessRecord>,
    pub strategy: EnumerationStrategy,
    pub restricted_enumeration: bool,
}

impl Snapshot {
    pub fn new(records: Vec<ProcessRecord>, strategy: EnumerationStrategy) -> Self {
        Self {
            records,
            strategy,
            restricted_enumeration: strategy.restricted_enumeration(),
        }
    }
}

/// Supplies the candidate list for one run.
///
/// Implementations must return records deduplicated by identifier, with
/// `foreground` reflecting activity at capture time.
pub trait SnapshotProvider {
    fn capture(&mut self, self_identifier: &str) -> Result<Snapshot>;
}

/// Keep the first record per identifier.
///
/// `foreground` and `is_self` of later duplicates carry over to the kept
/// record, so one foreground instance shields the whole identifier.
fn dedup_by_identifier(records: Vec<ProcessRecord>) -> Vec<ProcessRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<ProcessRecord> = Vec::with_capacity(records.len());

    for record in records {
        match index.get(&record.identifier) {
            Some(&i) => {
                debug!("Dropping duplicate snapshot entry {}", record.identifier);
                kept[i].foreground |= record.foreground;
                kept[i].is_self |= record.is_self;
            }
            None => {
                index.insert(record.identifier.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    kept
}

/// On-disk document written by the host bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub restricted_enumeration: bool,
    pub processes: Vec<ProcessRecord>,
}

/// Reads a snapshot the host bridge exported as JSON.
pub struct JsonSnapshotProvider {
    path: PathBuf,
    strategy: EnumerationStrategy,
}

impl JsonSnapshotProvider {
    pub fn new(path: impl Into<PathBuf>, strategy: EnumerationStrategy) -> Self {
        Self {
            path: path.into(),
            strategy,
        }
    }
}

impl SnapshotProvider for JsonSnapshotProvider {
    fn capture(&mut self, self_identifier: &str) -> Result<Snapshot> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Capture(format!("Failed to read snapshot {:?}: {}", self.path, e))
        })?;
        let document: SnapshotDocument = serde_json::from_str(&content).map_err(|e| {
            Error::Capture(format!("Failed to parse snapshot {:?}: {}", self.path, e))
        })?;

        let records = dedup_by_identifier(document.processes)
            .into_iter()
            .map(|r| {
                let already_self = r.is_self;
                let mut r = r.mark_self(self_identifier);
                r.is_self |= already_self;
                r
            })
            .collect();

        let mut snapshot = Snapshot::new(records, self.strategy);
        snapshot.restricted_enumeration |= document.restricted_enumeration;
        debug!(
            "Loaded {} records from {:?} (restricted: {})",
            snapshot.records.len(),
            self.path,
            snapshot.restricted_enumeration
        );
        Ok(snapshot)
    }
}

/// Enumerates the local process table.
///
/// The table carries no notion of a visible app. Foreground status comes
/// from our own ancestor chain, the controlling terminal's foreground
/// process group, and the identifiers configured as foreground. Init and
/// kernel threads never enter the snapshot.
pub struct ProcessTableProvider {
    system: System,
    foreground: BTreeSet<String>,
}

impl ProcessTableProvider {
    pub fn new(foreground: BTreeSet<String>) -> Self {
        Self {
            system: System::new(),
            foreground,
        }
    }

    /// Turn raw `(pid, name)` pairs into records, ascending pid order.
    fn build_records(
        &self,
        mut entries: Vec<(u32, String)>,
        guard: &ProcessGuard,
        self_identifier: &str,
    ) -> Vec<ProcessRecord> {
        entries.sort_by_key(|(pid, _)| *pid);

        let before = entries.len();
        entries.retain(|(pid, _)| !guard.is_protected(*pid));
        debug!("Excluded {} system processes", before - entries.len());

        let records = entries
            .into_iter()
            .map(|(pid, name)| {
                let mut record = ProcessRecord::new(name, pid).mark_self(self_identifier);
                record.is_self |= guard.is_self(pid);
                record.foreground =
                    guard.is_foreground(pid) || self.foreground.contains(&record.identifier);
                record
            })
            .collect();

        dedup_by_identifier(records)
    }
}

impl SnapshotProvider for ProcessTableProvider {
    fn capture(&mut self, self_identifier: &str) -> Result<Snapshot> {
        self.system.refresh_processes();

        let entries: Vec<(u32, String)> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| (pid.as_u32(), process.name().to_string()))
            .collect();

        if entries.is_empty() {
            warn!("Process table enumeration returned nothing");
            return Err(Error::Capture(
                "process enumeration returned no entries".to_string(),
            ));
        }

        let guard = ProcessGuard::from_system(&self.system);
        let records = self.build_records(entries, &guard, self_identifier);
        debug!("Captured {} processes from the process table", records.len());
        Ok(Snapshot::new(records, EnumerationStrategy::ProcessTable))
    }
}
