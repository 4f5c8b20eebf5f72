//! Host process-tree guardrails.
//!
//! Works out which local pids must never be offered for closing (init,
//! kernel threads) and which count as foreground (our own ancestor chain and
//! the controlling terminal's foreground process group).

use std::collections::{HashMap, HashSet};
use sysinfo::System;
use tracing::trace;

/// Pid of the kernel thread daemon; its children are kernel threads.
const KTHREADD_PID: u32 = 2;

/// One node of the local process tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessNode {
    pub pid: u32,
    pub parent: Option<u32>,
    /// Process group id, when the platform exposes it.
    pub pgrp: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessGuard {
    protected: HashSet<u32>,
    foreground: HashSet<u32>,
    self_pid: Option<u32>,
}

impl ProcessGuard {
    /// Build from an already refreshed `System`.
    pub fn from_system(system: &System) -> Self {
        let nodes: Vec<ProcessNode> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessNode {
                pid: pid.as_u32(),
                parent: process.parent().map(|p| p.as_u32()),
                pgrp: process_group(pid.as_u32()),
            })
            .collect();

        let self_pid = sysinfo::get_current_pid().ok().map(|p| p.as_u32());
        Self::build(&nodes, self_pid, terminal_foreground_group())
    }

    /// Pure construction from a process tree.
    pub fn build(nodes: &[ProcessNode], self_pid: Option<u32>, tty_pgrp: Option<u32>) -> Self {
        let parents: HashMap<u32, Option<u32>> =
            nodes.iter().map(|n| (n.pid, n.parent)).collect();

        let protected: HashSet<u32> = nodes
            .iter()
            .filter(|n| n.pid <= 1 || n.pid == KTHREADD_PID || n.parent == Some(KTHREADD_PID))
            .map(|n| n.pid)
            .collect();

        let mut foreground = HashSet::new();

        // Self and every ancestor; the seen-check stops on cycles
        let mut cursor = self_pid;
        while let Some(pid) = cursor {
            if !foreground.insert(pid) {
                break;
            }
            cursor = parents.get(&pid).copied().flatten();
        }

        if let Some(group) = tty_pgrp.filter(|g| *g > 0) {
            foreground.extend(
                nodes
                    .iter()
                    .filter(|n| n.pgrp == Some(group))
                    .map(|n| n.pid),
            );
        }

        trace!(
            "Process guard: {} protected, {} foreground",
            protected.len(),
            foreground.len()
        );

        Self {
            protected,
            foreground,
            self_pid,
        }
    }

    /// Init or a kernel thread.
    pub fn is_protected(&self, pid: u32) -> bool {
        self.protected.contains(&pid)
    }

    pub fn is_foreground(&self, pid: u32) -> bool {
        self.foreground.contains(&pid)
    }

    pub fn is_self(&self, pid: u32) -> bool {
        self.self_pid == Some(pid)
    }

    /// Never signalled: protected, self, ancestors, terminal foreground group.
    pub fn may_signal(&self, pid: u32) -> bool {
        !self.is_protected(pid) && !self.is_foreground(pid)
    }
}

#[cfg(target_os = "linux")]
fn process_group(pid: u32) -> Option<u32> {
    let stat = procfs::process::Process::new(i32::try_from(pid).ok()?)
        .and_then(|p| p.stat())
        .ok()?;
    u32::try_from(stat.pgrp).ok()
}

#[cfg(not(target_os = "linux"))]
fn process_group(_pid: u32) -> Option<u32> {
    None
}

/// Foreground process group of our controlling terminal, if any.
#[cfg(target_os = "linux")]
fn terminal_foreground_group() -> Option<u32> {
    let stat = procfs::process::Process::myself()
        .and_then(|p| p.stat())
        .ok()?;
    u32::try_from(stat.tpgid).ok().filter(|g| *g > 0)
}

#[cfg(not(target_os = "linux"))]
fn terminal_foreground_group() -> Option<u32> {
    None
}
