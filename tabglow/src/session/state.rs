// Per-session state files
// PID files and saved display state live in a shared temp area, keyed by session identity

use super::config::Config;
use crate::surface::SessionIdentity;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Key used when no session identity could be resolved
pub const DEFAULT_KEY: &str = "default";

/// Environment variable a launcher sets to hand its resolved identity to a worker
pub const TITLE_SESSION_ENV: &str = "TABGLOW_TITLE_SESSION_ID";
pub const MONITOR_SESSION_ENV: &str = "TABGLOW_MONITOR_SESSION_ID";

/// Kind of background worker; each kind has its own file namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonKind {
    /// Title animation (timed loop and burst)
    Animation,
    /// Keystroke monitor
    Monitor,
}

impl DaemonKind {
    pub fn label(self) -> &'static str {
        match self {
            DaemonKind::Animation => "animation",
            DaemonKind::Monitor => "monitor",
        }
    }

    fn pid_prefix(self) -> &'static str {
        match self {
            DaemonKind::Animation => "tabglow_animation_",
            DaemonKind::Monitor => "tabglow_typing_monitor_",
        }
    }

    fn display_state_prefix(self) -> &'static str {
        match self {
            DaemonKind::Animation => "tabglow_original_title_",
            DaemonKind::Monitor => "tabglow_monitor_display_",
        }
    }

    /// Variable carrying the session identity into this kind's worker
    pub fn forward_env(self) -> &'static str {
        match self {
            DaemonKind::Animation => TITLE_SESSION_ENV,
            DaemonKind::Monitor => MONITOR_SESSION_ENV,
        }
    }
}

impl std::fmt::Display for DaemonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Filesystem-safe key for a session identity
///
/// Characters outside `[A-Za-z0-9._-]` become `_`. When anything was replaced,
/// a short hash of the raw identity is appended so identities that differ only
/// in replaced characters keep distinct keys.
pub fn key_for(identity: Option<&SessionIdentity>) -> String {
    let Some(identity) = identity else {
        return DEFAULT_KEY.to_string();
    };

    let raw = identity.as_str();
    let mut substituted = false;
    let mut key: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                substituted = true;
                '_'
            }
        })
        .collect();

    // "." and ".." would name directories, not files
    if key.chars().all(|c| c == '.') {
        substituted = true;
    }

    if substituted {
        let digest = hex::encode(Sha256::digest(raw.as_bytes()));
        key.push('-');
        key.push_str(&digest[..8]);
    }

    key
}

/// Whole-file state for one worker kind
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
    kind: DaemonKind,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>, kind: DaemonKind) -> Self {
        Self {
            dir: dir.into(),
            kind,
        }
    }

    pub fn from_config(config: &Config, kind: DaemonKind) -> Self {
        Self::new(config.state_dir().clone(), kind)
    }

    pub fn kind(&self) -> DaemonKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pid_file_for(&self, identity: Option<&SessionIdentity>) -> PathBuf {
        self.dir.join(format!(
            "{}{}.pid",
            self.kind.pid_prefix(),
            key_for(identity)
        ))
    }

    pub fn display_state_file_for(&self, identity: Option<&SessionIdentity>) -> PathBuf {
        self.dir.join(format!(
            "{}{}.txt",
            self.kind.display_state_prefix(),
            key_for(identity)
        ))
    }

    /// Record the worker PID for this identity
    pub fn write_pid(&self, identity: Option<&SessionIdentity>, pid: u32) -> Result<()> {
        atomic_write(&self.pid_file_for(identity), &pid.to_string())
    }

    /// Recorded worker PID; `None` when missing or unparsable
    pub fn read_pid(&self, identity: Option<&SessionIdentity>) -> Option<u32> {
        fs::read_to_string(self.pid_file_for(identity))
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }

    pub fn has_pid_file(&self, identity: Option<&SessionIdentity>) -> bool {
        self.pid_file_for(identity).exists()
    }

    /// Remove the PID file
    pub fn remove_pid(&self, identity: Option<&SessionIdentity>) -> std::io::Result<()> {
        remove_if_exists(&self.pid_file_for(identity))
    }

    /// Persist the baseline display value
    pub fn save_display_state(&self, identity: Option<&SessionIdentity>, value: &str) -> Result<()> {
        atomic_write(&self.display_state_file_for(identity), value)
    }

    /// Saved baseline display value, exactly as written
    pub fn load_display_state(&self, identity: Option<&SessionIdentity>) -> Option<String> {
        fs::read_to_string(self.display_state_file_for(identity)).ok()
    }

    pub fn remove_display_state(&self, identity: Option<&SessionIdentity>) -> std::io::Result<()> {
        remove_if_exists(&self.display_state_file_for(identity))
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Write a file atomically (write to temp file, then rename)
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Invalid path: {}", path.display()))?;

    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create state directory: {}", parent.display()))?;

    // Create temp file in same directory to ensure same filesystem for rename
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown"),
        std::process::id()
    ));

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
