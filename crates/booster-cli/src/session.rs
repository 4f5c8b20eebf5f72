use crate::config::Config;
use booster_core::{
    error::Result, strategy_for, BoostStats, ClosePolicy, DryRunTerminator, JsonSnapshotProvider,
    ManufacturerVariant, Plan, PolicyEngine, ProcessTableProvider, ProcessTerminator,
    SignalTerminator, Snapshot, SnapshotProvider, TerminationMode, TerminationReport,
};
use booster_core::variant::needs_foreground_normalization;
use tracing::{debug, error, info, warn};

/// Boost session with run statistics
///
/// Wraps a [`ClosePolicy`] built from configuration, runs it once or
/// repeatedly, and accumulates statistics across runs.
pub struct BoostSession {
    policy: ClosePolicy,
    stats: BoostStats,
}

impl BoostSession {
    pub fn new(policy: ClosePolicy) -> Self {
        Self {
            policy,
            stats: BoostStats::new(),
        }
    }

    /// Build the session from configuration
    ///
    /// The snapshot source is the host-exported JSON file when configured,
    /// the local process table otherwise. `dry_run` swaps the signal
    /// terminator for one that only records requests.
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        let variant = ManufacturerVariant::from_manufacturer(&config.device.manufacturer);
        let strategy = strategy_for(variant, config.device.sdk_level);
        info!(
            "Device: {} (sdk {}), enumeration strategy {:?}",
            variant, config.device.sdk_level, strategy
        );
        if needs_foreground_normalization(strategy, config.device.sdk_level) {
            debug!("Foreground flags come from the snapshot source, not the platform");
        }

        let provider: Box<dyn SnapshotProvider> = match &config.device.snapshot_file {
            Some(path) => {
                debug!("Using snapshot file {:?}", path);
                Box::new(JsonSnapshotProvider::new(path, strategy))
            }
            None => {
                if strategy.restricted_enumeration() {
                    warn!(
                        "{} devices restrict enumeration; no snapshot file configured, falling back to the local process table",
                        variant
                    );
                }
                Box::new(ProcessTableProvider::new(config.device.foreground.clone()))
            }
        };

        let terminator: Box<dyn ProcessTerminator> = if dry_run {
            info!("Dry run: no process will be signalled");
            Box::new(DryRunTerminator::new())
        } else {
            if config.device.snapshot_file.is_some() {
                warn!(
                    "Snapshot identifiers are matched against local process names; entries with no local process fail as not-running"
                );
            }
            Box::new(SignalTerminator::new())
        };

        let policy = ClosePolicy::new(
            PolicyEngine::new(config.policy.clone()),
            provider,
            terminator,
            config.device.self_identifier.clone(),
        );
        info!("Running as {}", policy.self_identifier());

        Self::new(policy)
    }

    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.policy.snapshot()
    }

    pub fn plan(&mut self, mode: TerminationMode) -> Result<Plan> {
        self.policy.plan(mode)
    }

    /// Perform a single run and record it in the statistics
    pub fn run_once(&mut self, mode: TerminationMode) -> Result<TerminationReport> {
        match self.policy.run(mode) {
            Ok(report) => {
                self.stats.record_report(&report);
                debug!("Session run #{} recorded", self.stats.total_runs);
                Ok(report)
            }
            Err(e) => {
                self.stats.record_capture_failure();
                Err(e)
            }
        }
    }

    /// Run used by the watch loop: capture failures are logged, not fatal
    pub fn tick(&mut self, mode: TerminationMode) -> Option<TerminationReport> {
        match self.run_once(mode) {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Boost run failed: {}", e);
                None
            }
        }
    }

    pub fn stats(&self) -> &BoostStats {
        &self.stats
    }
}
