// Environment configuration helpers
// Handles platform-specific paths for state files, the bridge socket and the log file

use std::path::PathBuf;

/// Overrides the directory holding PID and saved-title files
pub const STATE_DIR_ENV: &str = "TABGLOW_STATE_DIR";
/// Overrides the bridge socket path
pub const BRIDGE_SOCKET_ENV: &str = "TABGLOW_BRIDGE_SOCKET";
/// Overrides the log file path
pub const LOG_FILE_ENV: &str = "TABGLOW_LOG_FILE";
/// Tracing filter directives (EnvFilter syntax)
pub const LOG_FILTER_ENV: &str = "TABGLOW_LOG";

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Configuration for paths and settings
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared temp area for per-session state files
    pub state_dir: PathBuf,
    /// Unix socket served by the terminal bridge
    pub bridge_socket: PathBuf,
    /// Where workers append their logs
    pub log_file: PathBuf,
    /// Tracing filter directives
    pub log_filter: String,
}

impl Config {
    /// Create configuration using default paths
    pub fn default_paths() -> Self {
        Self {
            state_dir: std::env::temp_dir(),
            bridge_socket: Self::default_runtime_dir().join("bridge.sock"),
            log_file: std::env::temp_dir().join("tabglow.log"),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default_paths();

        Self {
            state_dir: env_path(STATE_DIR_ENV).unwrap_or(defaults.state_dir),
            bridge_socket: env_path(BRIDGE_SOCKET_ENV).unwrap_or(defaults.bridge_socket),
            log_file: env_path(LOG_FILE_ENV).unwrap_or(defaults.log_file),
            log_filter: std::env::var(LOG_FILTER_ENV)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        }
    }

    /// Get the default runtime directory (bridge socket)
    fn default_runtime_dir() -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            // macOS: the bridge lives next to the terminal's own support files
            dirs::data_dir()
                .map(|d| d.join("tabglow"))
                .unwrap_or_else(Self::fallback_runtime_dir)
        }

        #[cfg(target_os = "linux")]
        {
            // Linux: prefer XDG_RUNTIME_DIR if set
            if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
                PathBuf::from(runtime_dir).join("tabglow")
            } else {
                Self::fallback_runtime_dir()
            }
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            Self::fallback_runtime_dir()
        }
    }

    /// ~/.tabglow (or /tmp/tabglow if home unavailable)
    fn fallback_runtime_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".tabglow"))
            .unwrap_or_else(|| PathBuf::from("/tmp/tabglow"))
    }

    /// Get the state directory
    pub fn state_dir(&self) -> &PathBuf {
        &self.state_dir
    }

    /// Ensure the state directory exists
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.state_dir)
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
