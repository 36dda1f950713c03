//! Process ancestry walking.
//!
//! Finds the chain of parent processes from the caller up to init. The session
//! resolver matches this chain against the PIDs the terminal reports for each
//! of its sessions.
//!
//! - **Linux**: reads `/proc/<pid>/stat`
//! - **other Unix** (and Linux without `/proc`): `ps -o ppid= -p <pid>`

use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

pub type Pid = u32;

/// Upper bound on parent hops; guards against a cyclic or corrupted process table
pub const MAX_HOPS: usize = 256;

/// Resolves the parent of a process
pub trait ParentLookup {
    /// `None` when the process is gone or its parent cannot be determined
    fn parent_of(&self, pid: Pid) -> Option<Pid>;
}

/// Ancestor chain ordered from the starting process towards init
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorPidSet {
    chain: Vec<Pid>,
}

impl AncestorPidSet {
    pub fn contains(&self, pid: Pid) -> bool {
        self.chain.contains(&pid)
    }

    pub fn as_slice(&self) -> &[Pid] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

/// Walk parents starting at `start` (included) until init, a failed lookup,
/// a repeated PID or the hop cap.
pub fn ancestors_from(start: Pid, lookup: &dyn ParentLookup) -> AncestorPidSet {
    let mut chain = vec![start];
    let mut seen: HashSet<Pid> = HashSet::from([start]);
    let mut current = start;

    if start <= 1 {
        return AncestorPidSet { chain };
    }

    for _ in 0..MAX_HOPS {
        let parent = match lookup.parent_of(current) {
            Some(0) | None => break,
            Some(parent) => parent,
        };
        if !seen.insert(parent) {
            tracing::debug!(pid = current, parent, "ancestry cycle detected");
            break;
        }
        chain.push(parent);
        if parent == 1 {
            break;
        }
        current = parent;
    }

    AncestorPidSet { chain }
}

/// Ancestors of the calling process using the platform lookup
pub fn ancestors() -> AncestorPidSet {
    ancestors_from(std::process::id(), &SystemLookup::detect())
}

/// Parent lookup backed by the operating system's process table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemLookup {
    Procfs,
    Ps,
}

impl SystemLookup {
    pub fn detect() -> Self {
        if cfg!(target_os = "linux") && Path::new("/proc/self/stat").exists() {
            SystemLookup::Procfs
        } else {
            SystemLookup::Ps
        }
    }
}

impl ParentLookup for SystemLookup {
    fn parent_of(&self, pid: Pid) -> Option<Pid> {
        match self {
            SystemLookup::Procfs => {
                let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
                parse_proc_stat_ppid(&stat)
            }
            SystemLookup::Ps => {
                let output = Command::new("ps")
                    .args(["-o", "ppid=", "-p", &pid.to_string()])
                    .output()
                    .ok()?;
                if !output.status.success() {
                    return None;
                }
                parse_ps_output(&String::from_utf8_lossy(&output.stdout))
            }
        }
    }
}

/// Parent PID from the contents of `/proc/<pid>/stat`: "pid (comm) state ppid ..."
///
/// The command name may contain spaces and parentheses, so fields are counted
/// from the last ')'.
pub fn parse_proc_stat_ppid(stat: &str) -> Option<Pid> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    // fields[0] = state, fields[1] = ppid
    after_comm.split_whitespace().nth(1)?.parse().ok()
}

/// Parent PID from `ps -o ppid=` output
pub fn parse_ps_output(output: &str) -> Option<Pid> {
    output.trim().parse().ok()
}
