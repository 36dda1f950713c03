// Worker lifecycle
// Starts detached workers bound to a session, records their PID, and stops them idempotently

use super::state::{key_for, DaemonKind, StateStore};
use crate::surface::SessionIdentity;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Program and arguments used to launch a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new<I, A>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Re-invoke the running binary with a directive (`run`, `restore`, ...)
    pub fn current_exe(directive: &str) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        Ok(Self::new(exe, [directive]))
    }

    /// Another binary installed next to the running one
    pub fn sibling(name: &str, args: &[&str]) -> Result<Self> {
        let exe = std::env::current_exe().context("Failed to locate current executable")?;
        let dir = exe
            .parent()
            .with_context(|| format!("Executable has no parent directory: {}", exe.display()))?;
        Ok(Self::new(dir.join(name), args.iter().copied()))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// A worker that was started and recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub identity: Option<SessionIdentity>,
    pub pid: u32,
    pub kind: DaemonKind,
}

impl ProcessRecord {
    /// State-store key (`default` when the identity is unresolved)
    pub fn key(&self) -> String {
        key_for(self.identity.as_ref())
    }
}

/// What `stop` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No PID file
    NotRunning,
    /// SIGTERM delivered to the recorded worker
    Signalled(u32),
    /// PID file was unreadable or its process was gone
    Stale,
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("refusing to signal pid {0}")]
    InvalidPid(u32),
    #[error("no such process: {0}")]
    NoSuchProcess(u32),
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Ask a process to exit (SIGTERM)
///
/// PIDs 0 and 1, our own PID and values outside the platform PID range are
/// rejected so a corrupted PID file can never signal a process group or init.
#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<(), LifecycleError> {
    let raw = i32::try_from(pid).map_err(|_| LifecycleError::InvalidPid(pid))?;
    if raw <= 1 || pid == std::process::id() {
        return Err(LifecycleError::InvalidPid(pid));
    }

    // SAFETY: `libc::kill` takes plain integers; errno is read immediately after
    // the call on this thread.
    let rc = unsafe { libc::kill(raw, libc::SIGTERM) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Err(LifecycleError::NoSuchProcess(pid))
    } else {
        Err(LifecycleError::Signal { pid, source: err })
    }
}

/// Spawn a worker detached from the caller
///
/// Standard streams are discarded and the child gets its own session, so it
/// outlives the launching shell. `identity` is passed through `forward_env`
/// (or removed from the child's environment when unresolved). Returns as soon
/// as the process exists.
pub fn spawn_detached(
    command: &WorkerCommand,
    forward_env: &str,
    identity: Option<&SessionIdentity>,
    extra_env: &[(&str, &str)],
) -> Result<u32> {
    let mut cmd = command.command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    match identity {
        Some(identity) => cmd.env(forward_env, identity.as_str()),
        None => cmd.env_remove(forward_env),
    };
    for (name, value) in extra_env {
        cmd.env(name, value);
    }

    #[cfg(unix)]
    {
        // SAFETY: pre-exec runs in the child before exec and only calls setsid.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let child = cmd
        .spawn()
        .with_context(|| format!("Failed to start worker {}", command.program.display()))?;

    Ok(child.id())
}

/// Start/stop of one worker kind, at most one per session
#[derive(Debug, Clone)]
pub struct DaemonManager {
    store: StateStore,
    command: WorkerCommand,
}

impl DaemonManager {
    pub fn new(store: StateStore, command: WorkerCommand) -> Self {
        Self { store, command }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn kind(&self) -> DaemonKind {
        self.store.kind()
    }

    /// Stop any recorded worker, spawn a fresh one and record its PID
    ///
    /// No lock is taken: two near-simultaneous starts for one session can both
    /// spawn, and the later PID file wins.
    pub fn start(
        &self,
        identity: Option<&SessionIdentity>,
        extra_env: &[(&str, &str)],
    ) -> Result<ProcessRecord> {
        self.stop(identity);

        let kind = self.kind();
        let pid = spawn_detached(&self.command, kind.forward_env(), identity, extra_env)?;
        self.store
            .write_pid(identity, pid)
            .with_context(|| format!("Failed to record {} worker pid {}", kind, pid))?;

        tracing::info!(
            kind = %kind,
            pid,
            key = %key_for(identity),
            "worker started"
        );

        Ok(ProcessRecord {
            identity: identity.cloned(),
            pid,
            kind,
        })
    }

    /// Signal the recorded worker (if any) and delete its PID file
    ///
    /// Never fails: unreadable PID files and vanished processes are cleaned up
    /// the same way.
    pub fn stop(&self, identity: Option<&SessionIdentity>) -> StopOutcome {
        if !self.store.has_pid_file(identity) {
            return StopOutcome::NotRunning;
        }

        let outcome = match self.store.read_pid(identity) {
            Some(pid) => match terminate(pid) {
                Ok(()) => {
                    tracing::info!(kind = %self.kind(), pid, "worker signalled");
                    StopOutcome::Signalled(pid)
                }
                Err(e) => {
                    tracing::debug!(kind = %self.kind(), error = %e, "stale worker record");
                    StopOutcome::Stale
                }
            },
            None => {
                tracing::debug!(kind = %self.kind(), "unreadable pid file");
                StopOutcome::Stale
            }
        };

        if let Err(e) = self.store.remove_pid(identity) {
            tracing::debug!(kind = %self.kind(), error = %e, "failed to remove pid file");
        }

        outcome
    }
}
