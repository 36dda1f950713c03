// Keystroke monitor
// Clears the tab colour of the watched session whenever the user types

use crate::session::lifecycle::WorkerCommand;
use crate::session::resolver::find_session;
use crate::surface::{ControlSurface, ProfileFlag, SessionIdentity, SurfaceError};
use anyhow::Result;
use std::io;
use std::process::{Child, Command, Stdio};

/// Reset used when the monitor has no resolved session of its own
pub trait ResetFallback {
    fn reset(&mut self) -> io::Result<()>;
}

/// Launches `tab-color clear` for every keystroke
///
/// The launched process resolves its session on its own. Finished children are
/// reaped on the next launch.
pub struct SpawnTabColorReset {
    command: WorkerCommand,
    children: Vec<Child>,
}

impl SpawnTabColorReset {
    pub fn new(command: WorkerCommand) -> Self {
        Self {
            command,
            children: Vec::new(),
        }
    }

    /// `tab-color clear` installed next to the running binary
    pub fn sibling() -> Result<Self> {
        Ok(Self::new(WorkerCommand::sibling("tab-color", &["clear"])?))
    }

    fn reap(&mut self) {
        self.children
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));
    }
}

impl ResetFallback for SpawnTabColorReset {
    fn reset(&mut self) -> io::Result<()> {
        self.reap();
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.children.push(child);
        Ok(())
    }
}

pub struct KeystrokeMonitor<S, F> {
    surface: S,
    fallback: F,
}

impl<S: ControlSurface, F: ResetFallback> KeystrokeMonitor<S, F> {
    pub fn new(surface: S, fallback: F) -> Self {
        Self { surface, fallback }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Block on keystrokes until the stream ends
    ///
    /// The subscription is scoped to `identity` when one was forwarded. Each
    /// keystroke turns the tab colour off on the session, or runs the fallback
    /// when that session is not open. Returns `Ok` when the terminal closes the
    /// stream; the subscription is released on return.
    pub fn run(&mut self, identity: Option<&SessionIdentity>) -> Result<()> {
        let target = find_session(&mut self.surface, identity);
        let mut stream = self.surface.subscribe_keystrokes(identity)?;

        tracing::info!(
            session = ?target.as_ref().map(SessionIdentity::as_str),
            "keystroke monitor running"
        );

        loop {
            let keystroke = match stream.next_keystroke() {
                Ok(keystroke) => keystroke,
                Err(SurfaceError::StreamClosed) => {
                    tracing::info!("keystroke stream closed");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            tracing::trace!(characters = %keystroke.characters, "keystroke");

            match &target {
                Some(session) => {
                    if let Err(e) =
                        self.surface
                            .set_flag_both(session, ProfileFlag::UseTabColor, false)
                    {
                        tracing::debug!(session = %session, error = %e, "failed to clear tab colour");
                    }
                }
                None => {
                    if let Err(e) = self.fallback.reset() {
                        tracing::warn!(error = %e, "tab colour reset fallback failed");
                    }
                }
            }
        }
    }
}
