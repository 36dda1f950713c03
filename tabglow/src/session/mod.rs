// Session module - everything keyed by a terminal session
// Resolves which session we belong to, keeps its state files, and runs its workers

pub mod config;
pub mod lifecycle;
pub mod resolver;
pub mod state;

pub use crate::surface::SessionIdentity;
pub use lifecycle::{DaemonManager, ProcessRecord, StopOutcome, WorkerCommand};
pub use state::{key_for, DaemonKind, StateStore};
