// Control surface of the hosting terminal
// The terminal application is an external collaborator. This module defines the
// operations tabglow needs from it and the value types exchanged with it.

pub mod client;
pub mod protocol;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use client::SocketSurface;
pub use protocol::ErrorCode;

/// Session variable holding the PID of the session's root process
pub const PID_VARIABLE: &str = "pid";

/// Opaque token identifying one terminal session
///
/// Discovered, never created by tabglow. Stable for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Wrap a raw token; empty or whitespace-only tokens are not identities
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 8-bit RGB colour as used by terminal profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Multiply every channel by `factor`, truncating like an int() cast
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |channel: u8| (f32::from(channel) * factor).clamp(0.0, 255.0) as u8;
        Self::new(scale(self.red), scale(self.green), scale(self.blue))
    }
}

/// Colour-valued profile properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSlot {
    Background,
    Foreground,
    Bold,
    Tab,
}

/// Boolean profile properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileFlag {
    UseTabColor,
}

/// Light/dark-mode variant of a profile property
///
/// Profiles with separate light and dark settings only look consistent when
/// both variants are written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Appearance {
    Light,
    Dark,
}

impl Appearance {
    pub const BOTH: [Appearance; 2] = [Appearance::Light, Appearance::Dark];
}

/// One tab: its sessions (split panes) in display order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub sessions: Vec<SessionIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_session: Option<usize>,
}

/// One terminal window and its tabs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub tabs: Vec<Tab>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tab: Option<usize>,
}

/// Snapshot of every open window, tab and session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub windows: Vec<Window>,
    pub current_window: Option<usize>,
}

impl Layout {
    /// All sessions, window by window, tab by tab
    pub fn sessions(&self) -> impl Iterator<Item = &SessionIdentity> {
        self.windows
            .iter()
            .flat_map(|window| window.tabs.iter())
            .flat_map(|tab| tab.sessions.iter())
    }

    pub fn contains(&self, session: &SessionIdentity) -> bool {
        self.sessions().any(|candidate| candidate == session)
    }

    /// Session in the current tab of the current window, if any
    pub fn focused_session(&self) -> Option<&SessionIdentity> {
        let window = self.windows.get(self.current_window?)?;
        let tab = window.tabs.get(window.current_tab?)?;
        tab.sessions.get(tab.current_session?)
    }
}

/// A keystroke reported by the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keystroke {
    pub session_id: Option<SessionIdentity>,
    pub characters: String,
    pub modifiers: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("control surface unavailable: {0}")]
    Unavailable(#[source] std::io::Error),
    #[error("control surface protocol error: {0}")]
    Protocol(String),
    #[error("control surface rejected request ({code}): {message}")]
    Remote { code: ErrorCode, message: String },
    #[error("session {0} not found")]
    SessionNotFound(SessionIdentity),
    #[error("keystroke stream closed")]
    StreamClosed,
}

pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Operations tabglow needs from the terminal application
///
/// Every call may fail independently; callers decide per call site whether a
/// failure skips one step or ends the operation.
pub trait ControlSurface {
    /// Enumerate all windows, tabs and sessions
    fn layout(&mut self) -> SurfaceResult<Layout>;

    /// Read a session variable (`pid`, ...); `None` when unset
    fn variable(&mut self, session: &SessionIdentity, name: &str)
        -> SurfaceResult<Option<String>>;

    /// Current display name (title) of a session
    fn name(&mut self, session: &SessionIdentity) -> SurfaceResult<Option<String>>;

    fn set_name(&mut self, session: &SessionIdentity, name: &str) -> SurfaceResult<()>;

    fn color(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
    ) -> SurfaceResult<Rgb>;

    fn set_color(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
        color: Rgb,
    ) -> SurfaceResult<()>;

    fn set_flag(
        &mut self,
        session: &SessionIdentity,
        flag: ProfileFlag,
        appearance: Appearance,
        value: bool,
    ) -> SurfaceResult<()>;

    /// Open a keystroke subscription, scoped to one session when given
    ///
    /// The subscription is released when the returned stream is dropped.
    fn subscribe_keystrokes(
        &mut self,
        session: Option<&SessionIdentity>,
    ) -> SurfaceResult<Box<dyn KeystrokeStream>>;

    /// Set a colour in both appearance variants
    ///
    /// Both writes are attempted; the first failure is returned.
    fn set_color_both(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        color: Rgb,
    ) -> SurfaceResult<()> {
        let light = self.set_color(session, slot, Appearance::Light, color);
        let dark = self.set_color(session, slot, Appearance::Dark, color);
        light.and(dark)
    }

    /// Set a flag in both appearance variants
    fn set_flag_both(
        &mut self,
        session: &SessionIdentity,
        flag: ProfileFlag,
        value: bool,
    ) -> SurfaceResult<()> {
        let light = self.set_flag(session, flag, Appearance::Light, value);
        let dark = self.set_flag(session, flag, Appearance::Dark, value);
        light.and(dark)
    }
}

/// Blocking source of keystroke events
pub trait KeystrokeStream {
    /// Block until the next keystroke; `StreamClosed` once the source is gone
    fn next_keystroke(&mut self) -> SurfaceResult<Keystroke>;
}
