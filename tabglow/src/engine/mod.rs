// Worker-side behaviour: what runs once a session is resolved

pub mod colors;
pub mod frames;
pub mod monitor;
pub mod title;

pub use frames::FrameTable;
pub use monitor::{KeystrokeMonitor, ResetFallback, SpawnTabColorReset};
pub use title::{RestoreOutcome, TitleAnimator, BURST_INTERVAL, FALLBACK_TITLE, FRAME_INTERVAL};
