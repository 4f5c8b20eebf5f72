use crate::error::TerminateError;
use crate::guard::ProcessGuard;
use crate::report::{GUARDED_PROCESS, NOT_RUNNING};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use sysinfo::System;
use tracing::{debug, warn};

/// Closes processes by identifier.
///
/// One attempt per call. The engine never retries.
pub trait ProcessTerminator {
    fn terminate(&mut self, identifier: &str) -> Result<(), TerminateError>;
}

/// Sends SIGTERM to every local process whose name equals the identifier.
///
/// An identifier with no live process fails with `not-running`. Init,
/// kernel threads, this process, its ancestors and the terminal's
/// foreground group are never signalled.
pub struct SignalTerminator {
    system: System,
}

impl SignalTerminator {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn signal_pid(pid: u32) -> Result<(), TerminateError> {
        // pid 0 would signal our own process group
        let raw = i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .ok_or_else(|| TerminateError::Other(format!("pid {} out of range", pid)))?;

        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => Ok(()),
            // Exited between lookup and signal
            Err(Errno::ESRCH) => Ok(()),
            Err(Errno::EPERM) => Err(TerminateError::PermissionDenied(format!(
                "not allowed to signal process {}",
                pid
            ))),
            Err(e) => Err(TerminateError::Other(format!(
                "Failed to send SIGTERM to process {}: {}",
                pid, e
            ))),
        }
    }

    /// Narrow the pids matching `identifier` to the ones we may signal.
    fn signal_targets(
        identifier: &str,
        matches: Vec<u32>,
        guard: &ProcessGuard,
    ) -> Result<Vec<u32>, TerminateError> {
        if matches.is_empty() {
            debug!("{} is not running", identifier);
            return Err(TerminateError::Other(NOT_RUNNING.to_string()));
        }

        let (targets, held): (Vec<u32>, Vec<u32>) =
            matches.into_iter().partition(|pid| guard.may_signal(*pid));

        if !held.is_empty() {
            warn!("Not signalling guarded pids {:?} of {}", held, identifier);
        }
        if targets.is_empty() {
            return Err(TerminateError::Other(GUARDED_PROCESS.to_string()));
        }

        Ok(targets)
    }
}

impl Default for SignalTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTerminator for SignalTerminator {
    fn terminate(&mut self, identifier: &str) -> Result<(), TerminateError> {
        self.system.refresh_processes();

        let matches: Vec<u32> = self
            .system
            .processes_by_exact_name(identifier)
            .map(|p| p.pid().as_u32())
            .collect();

        let guard = ProcessGuard::from_system(&self.system);
        let pids = Self::signal_targets(identifier, matches, &guard)?;

        let mut first_error = None;
        for pid in pids {
            if let Err(e) = Self::signal_pid(pid) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Accepts every request without touching any process.
#[derive(Debug, Default)]
pub struct DryRunTerminator {
    requested: Vec<String>,
}

impl DryRunTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> &[String] {
        &self.requested
    }
}

impl ProcessTerminator for DryRunTerminator {
    fn terminate(&mut self, identifier: &str) -> Result<(), TerminateError> {
        debug!("[dry-run] would close {}", identifier);
        self.requested.push(identifier.to_string());
        Ok(())
    }
}
