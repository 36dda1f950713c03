// Session resolution
// Maps environment signals or the process ancestry to one terminal session

use crate::ancestry::{self, AncestorPidSet, ParentLookup, Pid, SystemLookup};
use crate::surface::{ControlSurface, SessionIdentity, SurfaceError, PID_VARIABLE};

/// Identity convention exported by the hosting terminal (`w0t0p0:<uuid>`)
pub const TERMINAL_SESSION_ENV: &str = "ITERM_SESSION_ID";

/// Resolution strategies in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Identity handed down by a tabglow launcher
    Forwarded,
    /// Identity exported by the terminal itself
    TerminalEnv,
    /// Process ancestry matched against session PIDs
    Ancestry,
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: SessionIdentity,
    pub source: Strategy,
}

/// Environment inputs to resolution, captured once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSignals {
    pub forwarded: Option<String>,
    pub terminal: Option<String>,
}

impl EnvSignals {
    /// Read the signals from the process environment
    ///
    /// `forward_env` is the launcher variable for the caller's worker kind;
    /// `None` skips the forwarded strategy.
    pub fn capture(forward_env: Option<&str>) -> Self {
        Self {
            forwarded: forward_env.and_then(|name| std::env::var(name).ok()),
            terminal: std::env::var(TERMINAL_SESSION_ENV).ok(),
        }
    }
}

/// Drop the `window/tab/pane` prefix some terminals put before the first colon
pub fn strip_terminal_prefix(raw: &str) -> &str {
    match raw.split_once(':') {
        Some((_, rest)) => rest,
        None => raw,
    }
}

/// First session in the layout whose root PID is one of our ancestors
///
/// Sessions whose PID cannot be read or parsed are skipped. A failure to list
/// the layout yields `None`.
pub fn find_by_ancestry<S: ControlSurface + ?Sized>(
    surface: &mut S,
    ancestors: &AncestorPidSet,
) -> Option<SessionIdentity> {
    let layout = match surface.layout() {
        Ok(layout) => layout,
        Err(e) => {
            tracing::debug!(error = %e, "cannot list sessions for ancestry match");
            return None;
        }
    };

    for session in layout.sessions() {
        let pid = match surface.variable(session, PID_VARIABLE) {
            Ok(Some(value)) => value.trim().parse::<Pid>().ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(session = %session, error = %e, "pid lookup failed");
                None
            }
        };

        if pid.is_some_and(|pid| ancestors.contains(pid)) {
            return Some(session.clone());
        }
    }

    None
}

/// Ordered resolution chain, short-circuiting on the first strategy that yields
pub struct SessionResolver<'a> {
    env: EnvSignals,
    lookup: &'a dyn ParentLookup,
    start_pid: Pid,
}

impl<'a> SessionResolver<'a> {
    pub fn new(env: EnvSignals, lookup: &'a dyn ParentLookup, start_pid: Pid) -> Self {
        Self {
            env,
            lookup,
            start_pid,
        }
    }

    pub fn resolve<S: ControlSurface + ?Sized>(&self, surface: &mut S) -> Option<Resolution> {
        if let Some(identity) = self.env.forwarded.as_deref().and_then(SessionIdentity::new) {
            return Some(Resolution {
                identity,
                source: Strategy::Forwarded,
            });
        }

        if let Some(identity) = self
            .env
            .terminal
            .as_deref()
            .map(strip_terminal_prefix)
            .and_then(SessionIdentity::new)
        {
            return Some(Resolution {
                identity,
                source: Strategy::TerminalEnv,
            });
        }

        let ancestors = ancestry::ancestors_from(self.start_pid, self.lookup);
        find_by_ancestry(surface, &ancestors).map(|identity| Resolution {
            identity,
            source: Strategy::Ancestry,
        })
    }
}

/// Identity a launcher handed to this worker, if any
///
/// Workers only use this; they never walk their own ancestry.
pub fn forwarded_identity(forward_env: &str) -> Option<SessionIdentity> {
    std::env::var(forward_env)
        .ok()
        .and_then(SessionIdentity::new)
}

/// Resolve the session of the calling process from its real environment
pub fn resolve_current<S: ControlSurface + ?Sized>(
    surface: &mut S,
    forward_env: Option<&str>,
) -> Option<SessionIdentity> {
    let lookup = SystemLookup::detect();
    let resolver = SessionResolver::new(
        EnvSignals::capture(forward_env),
        &lookup,
        std::process::id(),
    );

    let resolution = resolver.resolve(surface)?;
    tracing::debug!(
        session = %resolution.identity,
        source = ?resolution.source,
        "session resolved"
    );
    Some(resolution.identity)
}

/// Session a worker should act on
///
/// The given identity when it is still open in the terminal, else the focused
/// session. The focused fallback can pick the wrong session when several
/// windows are open.
pub fn resolve_target<S: ControlSurface + ?Sized>(
    surface: &mut S,
    identity: Option<&SessionIdentity>,
) -> Result<SessionIdentity, SurfaceError> {
    let layout = surface.layout()?;

    if let Some(identity) = identity {
        if layout.contains(identity) {
            return Ok(identity.clone());
        }
        tracing::warn!(session = %identity, "session not in layout, using focused session");
    }

    layout.focused_session().cloned().ok_or_else(|| {
        SurfaceError::Protocol("terminal reported no focused session".to_string())
    })
}

/// The given identity if it is still open; no focused fallback
pub fn find_session<S: ControlSurface + ?Sized>(
    surface: &mut S,
    identity: Option<&SessionIdentity>,
) -> Option<SessionIdentity> {
    let identity = identity?;
    match surface.layout() {
        Ok(layout) if layout.contains(identity) => Some(identity.clone()),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "cannot list sessions");
            None
        }
    }
}
