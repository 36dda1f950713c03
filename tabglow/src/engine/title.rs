// Title animation
// Timed frame loop, bounded burst and restore, all driven through the control surface

use super::frames::FrameTable;
use crate::session::resolver::resolve_target;
use crate::session::state::StateStore;
use crate::surface::{ControlSurface, SessionIdentity};
use std::thread;
use std::time::Duration;

/// Delay between animation frames
pub const FRAME_INTERVAL: Duration = Duration::from_millis(100);
/// Delay between burst frames
pub const BURST_INTERVAL: Duration = Duration::from_millis(100);
/// Baseline used when the session has no name (or none was saved)
pub const FALLBACK_TITLE: &str = "Terminal";

/// Session being animated and the title it had before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationTarget {
    pub session: SessionIdentity,
    pub baseline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No saved title; nothing was touched
    NothingSaved,
    /// Saved title written back
    Restored,
    /// A title was saved but could not be written back
    NoTarget,
}

pub struct TitleAnimator<S> {
    surface: S,
    store: StateStore,
    frames: FrameTable,
    frame_interval: Duration,
    burst_interval: Duration,
}

impl<S: ControlSurface> TitleAnimator<S> {
    pub fn new(surface: S, store: StateStore) -> Self {
        Self {
            surface,
            store,
            frames: FrameTable::default(),
            frame_interval: FRAME_INTERVAL,
            burst_interval: BURST_INTERVAL,
        }
    }

    pub fn with_frames(mut self, frames: FrameTable) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_intervals(mut self, frame_interval: Duration, burst_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self.burst_interval = burst_interval;
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Acquire the target session and save its current title
    ///
    /// `identity` is the one forwarded by the launcher; state files are keyed
    /// by it even when the focused session stands in for it. `None` means
    /// there is nothing to animate.
    pub fn begin(&mut self, identity: Option<&SessionIdentity>) -> Option<AnimationTarget> {
        let session = match resolve_target(&mut self.surface, identity) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "no session to animate");
                return None;
            }
        };

        let baseline = match self.surface.name(&session) {
            Ok(name) => name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            Err(e) => {
                tracing::warn!(session = %session, error = %e, "cannot read session title");
                return None;
            }
        };

        if let Err(e) = self.store.save_display_state(identity, &baseline) {
            tracing::warn!(error = %e, "failed to save original title");
        }

        tracing::info!(session = %session, baseline = %baseline, "animation target acquired");
        Some(AnimationTarget { session, baseline })
    }

    /// Push one composed title per frame index, sleeping between frames
    ///
    /// A failed update skips that frame only.
    pub fn animate<I>(&mut self, target: &AnimationTarget, frames: I)
    where
        I: IntoIterator<Item = u64>,
    {
        for frame in frames {
            let title = self.frames.compose(frame, &target.baseline);
            if let Err(e) = self.surface.set_name(&target.session, &title) {
                tracing::debug!(frame, error = %e, "frame skipped");
            }
            thread::sleep(self.frame_interval);
        }
    }

    /// Timed loop; returns only when the target cannot be acquired
    pub fn run(&mut self, identity: Option<&SessionIdentity>) {
        if let Some(target) = self.begin(identity) {
            self.animate(&target, 0..);
        }
    }

    /// Play the burst once, then set the plain saved title
    ///
    /// The saved title is read again for the final reset; the frames keep the
    /// one read up front.
    pub fn burst(&mut self, identity: Option<&SessionIdentity>) {
        let baseline = self
            .store
            .load_display_state(identity)
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());

        let session = match resolve_target(&mut self.surface, identity) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "no session for burst");
                return;
            }
        };

        for (index, title) in self.frames.burst_frames(&baseline).iter().enumerate() {
            if let Err(e) = self.surface.set_name(&session, title) {
                tracing::debug!(frame = index, error = %e, "burst frame skipped");
            }
            thread::sleep(self.burst_interval);
        }

        let final_title = self.store.load_display_state(identity).unwrap_or(baseline);
        if let Err(e) = self.surface.set_name(&session, &final_title) {
            tracing::warn!(session = %session, error = %e, "failed to reset title after burst");
        }
    }

    /// Write the saved title back and delete the saved file
    ///
    /// The file is deleted even when the write fails, so a later restore is a
    /// no-op.
    pub fn restore(&mut self, identity: Option<&SessionIdentity>) -> RestoreOutcome {
        let Some(saved) = self.store.load_display_state(identity) else {
            return RestoreOutcome::NothingSaved;
        };

        let outcome = match resolve_target(&mut self.surface, identity)
            .and_then(|session| self.surface.set_name(&session, &saved))
        {
            Ok(()) => RestoreOutcome::Restored,
            Err(e) => {
                tracing::warn!(error = %e, "failed to restore title");
                RestoreOutcome::NoTarget
            }
        };

        if let Err(e) = self.store.remove_display_state(identity) {
            tracing::debug!(error = %e, "failed to remove saved title");
        }

        outcome
    }
}
