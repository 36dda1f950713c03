// Bridge protocol - shared structs for tabglow <-> terminal bridge communication
// Uses newline-framed JSON messages over a Unix socket

use super::{Appearance, ColorSlot, Layout, ProfileFlag, Rgb, SessionIdentity, Window};
use serde::{Deserialize, Serialize};

/// Protocol version sent in the handshake
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest request frame a bridge is expected to accept (1 MiB)
pub const MAX_REQUEST_FRAME_SIZE: usize = 1024 * 1024;

/// Largest response or notification frame the client will read (1 MiB)
pub const MAX_RESPONSE_FRAME_SIZE: usize = 1024 * 1024;

/// Machine-readable error codes carried by `SurfaceResponse::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    VersionMismatch,
    SessionNotFound,
    InvalidRequest,
    Unsupported,
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::VersionMismatch => write!(f, "version_mismatch"),
            ErrorCode::SessionNotFound => write!(f, "session_not_found"),
            ErrorCode::InvalidRequest => write!(f, "invalid_request"),
            ErrorCode::Unsupported => write!(f, "unsupported"),
            ErrorCode::Internal => write!(f, "internal"),
        }
    }
}

// ============================================================================
// tabglow -> bridge requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceRequest {
    /// First message on every connection
    Handshake { client_version: u32 },
    /// Enumerate windows -> tabs -> sessions
    ListWindows,
    /// Read a session variable
    GetVariable {
        session_id: SessionIdentity,
        name: String,
    },
    /// Read the session's display name
    GetName { session_id: SessionIdentity },
    /// Replace the session's display name
    SetName {
        session_id: SessionIdentity,
        name: String,
    },
    /// Read a colour from the session's profile
    GetColor {
        session_id: SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
    },
    /// Write a colour to the session's profile
    SetColor {
        session_id: SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
        color: Rgb,
    },
    /// Write a boolean profile property
    SetFlag {
        session_id: SessionIdentity,
        flag: ProfileFlag,
        appearance: Appearance,
        value: bool,
    },
    /// Turn this connection into a keystroke stream
    SubscribeKeystrokes {
        /// Only report keystrokes for this session (all sessions when absent)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionIdentity>,
    },
}

// ============================================================================
// bridge -> tabglow responses
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceResponse {
    Handshake {
        protocol_version: u32,
    },
    Windows {
        windows: Vec<Window>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_window: Option<usize>,
    },
    Variable {
        #[serde(default)]
        value: Option<String>,
    },
    Name {
        #[serde(default)]
        name: Option<String>,
    },
    Color {
        color: Rgb,
    },
    /// Mutation applied
    Ok,
    /// Keystroke notifications follow on this connection
    Subscribed,
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl SurfaceResponse {
    /// Build a `Windows` response from a layout snapshot
    pub fn windows(layout: Layout) -> Self {
        SurfaceResponse::Windows {
            windows: layout.windows,
            current_window: layout.current_window,
        }
    }
}

// ============================================================================
// bridge -> tabglow push notifications (subscription connections only)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceNotification {
    Keystroke {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionIdentity>,
        characters: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        modifiers: Vec<String>,
    },
}

// ============================================================================
// Helpers for message framing
// ============================================================================

/// Serialize a message to JSON bytes with newline delimiter
pub fn serialize_message<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(msg)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Deserialize a message from JSON bytes (strips trailing newline)
pub fn deserialize_message<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, serde_json::Error> {
    let trimmed = if bytes.last() == Some(&b'\n') {
        &bytes[..bytes.len() - 1]
    } else {
        bytes
    };
    serde_json::from_slice(trimmed)
}
