// Bridge client
// Talks to the terminal bridge over its Unix socket and implements ControlSurface on top of it

use super::protocol::{
    deserialize_message, serialize_message, ErrorCode, SurfaceNotification, SurfaceRequest,
    SurfaceResponse, MAX_RESPONSE_FRAME_SIZE, PROTOCOL_VERSION,
};
use super::{
    Appearance, ColorSlot, ControlSurface, Keystroke, KeystrokeStream, Layout, ProfileFlag, Rgb,
    SessionIdentity, SurfaceError, SurfaceResult,
};
use crate::session::config::Config;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a request waits for the bridge before giving up
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// One handshaken connection to the bridge
struct Connection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Connection {
    fn open(socket_path: &Path, read_timeout: Option<Duration>) -> SurfaceResult<Self> {
        let stream = UnixStream::connect(socket_path).map_err(SurfaceError::Unavailable)?;
        stream
            .set_read_timeout(read_timeout)
            .map_err(SurfaceError::Unavailable)?;
        let writer = stream.try_clone().map_err(SurfaceError::Unavailable)?;

        let mut conn = Self {
            reader: BufReader::new(stream),
            writer,
        };

        let handshake = SurfaceRequest::Handshake {
            client_version: PROTOCOL_VERSION,
        };
        match conn.exchange(&handshake)? {
            SurfaceResponse::Handshake { protocol_version } => {
                tracing::debug!(
                    socket = %socket_path.display(),
                    protocol_version,
                    "connected to bridge"
                );
                Ok(conn)
            }
            SurfaceResponse::Error { code, message } => {
                Err(SurfaceError::Remote { code, message })
            }
            other => Err(unexpected("handshake", &other)),
        }
    }

    fn send(&mut self, request: &SurfaceRequest) -> SurfaceResult<()> {
        let bytes = serialize_message(request)
            .map_err(|e| SurfaceError::Protocol(format!("failed to serialize request: {}", e)))?;
        self.writer
            .write_all(&bytes)
            .and_then(|_| self.writer.flush())
            .map_err(SurfaceError::Unavailable)
    }

    /// Read one newline-terminated frame; `None` when the bridge closed the connection
    fn read_frame(&mut self) -> SurfaceResult<Option<String>> {
        let mut line = String::new();
        let read = (&mut self.reader)
            .take(MAX_RESPONSE_FRAME_SIZE as u64 + 1)
            .read_line(&mut line)
            .map_err(|e| match e.kind() {
                io::ErrorKind::InvalidData => {
                    SurfaceError::Protocol("bridge sent a frame that is not UTF-8".to_string())
                }
                _ => SurfaceError::Unavailable(e),
            })?;

        if read == 0 {
            return Ok(None);
        }

        // Enforce max response frame size
        if line.len() > MAX_RESPONSE_FRAME_SIZE {
            return Err(SurfaceError::Protocol(format!(
                "response frame too large: more than {} bytes",
                MAX_RESPONSE_FRAME_SIZE
            )));
        }

        Ok(Some(line))
    }

    /// Send a request and wait for its response
    /// Notifications that arrive before the response are skipped
    fn exchange(&mut self, request: &SurfaceRequest) -> SurfaceResult<SurfaceResponse> {
        self.send(request)?;

        loop {
            let line = self.read_frame()?.ok_or_else(|| {
                SurfaceError::Unavailable(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "bridge closed connection unexpectedly",
                ))
            })?;

            if deserialize_message::<SurfaceNotification>(line.as_bytes()).is_ok() {
                tracing::debug!("skipping notification on request connection");
                continue;
            }

            return deserialize_message::<SurfaceResponse>(line.as_bytes()).map_err(|e| {
                SurfaceError::Protocol(format!(
                    "failed to parse bridge response: {} (line: {})",
                    e,
                    line.trim()
                ))
            });
        }
    }
}

fn unexpected(expected: &str, got: &SurfaceResponse) -> SurfaceError {
    SurfaceError::Protocol(format!("expected {} response, got: {:?}", expected, got))
}

/// Session a request is about, used to report `session_not_found` precisely
fn target_of(request: &SurfaceRequest) -> Option<&SessionIdentity> {
    match request {
        SurfaceRequest::GetVariable { session_id, .. }
        | SurfaceRequest::GetName { session_id }
        | SurfaceRequest::SetName { session_id, .. }
        | SurfaceRequest::GetColor { session_id, .. }
        | SurfaceRequest::SetColor { session_id, .. }
        | SurfaceRequest::SetFlag { session_id, .. } => Some(session_id),
        SurfaceRequest::SubscribeKeystrokes { session_id } => session_id.as_ref(),
        SurfaceRequest::Handshake { .. } | SurfaceRequest::ListWindows => None,
    }
}

/// Turn an error response into the matching `SurfaceError`
fn remote_error(request: &SurfaceRequest, code: ErrorCode, message: String) -> SurfaceError {
    match (code, target_of(request)) {
        (ErrorCode::SessionNotFound, Some(session)) => {
            SurfaceError::SessionNotFound(session.clone())
        }
        _ => SurfaceError::Remote { code, message },
    }
}

/// `ControlSurface` backed by the bridge socket
///
/// Requests share one persistent connection. A transport failure drops it and
/// the next request reconnects.
pub struct SocketSurface {
    socket_path: PathBuf,
    read_timeout: Duration,
    conn: Option<Connection>,
}

impl SocketSurface {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            conn: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bridge_socket.clone())
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn connection(&mut self) -> SurfaceResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => Connection::open(&self.socket_path, Some(self.read_timeout))?,
        };
        Ok(self.conn.insert(conn))
    }

    fn call(&mut self, request: SurfaceRequest) -> SurfaceResult<SurfaceResponse> {
        let result = self.connection()?.exchange(&request);
        match result {
            Ok(SurfaceResponse::Error { code, message }) => {
                Err(remote_error(&request, code, message))
            }
            Ok(response) => Ok(response),
            Err(e) => {
                // The connection state is unknown after a transport or framing error
                self.conn = None;
                Err(e)
            }
        }
    }

    fn call_ok(&mut self, request: SurfaceRequest) -> SurfaceResult<()> {
        match self.call(request)? {
            SurfaceResponse::Ok => Ok(()),
            other => Err(unexpected("ok", &other)),
        }
    }
}

impl ControlSurface for SocketSurface {
    fn layout(&mut self) -> SurfaceResult<Layout> {
        match self.call(SurfaceRequest::ListWindows)? {
            SurfaceResponse::Windows {
                windows,
                current_window,
            } => Ok(Layout {
                windows,
                current_window,
            }),
            other => Err(unexpected("windows", &other)),
        }
    }

    fn variable(
        &mut self,
        session: &SessionIdentity,
        name: &str,
    ) -> SurfaceResult<Option<String>> {
        match self.call(SurfaceRequest::GetVariable {
            session_id: session.clone(),
            name: name.to_string(),
        })? {
            SurfaceResponse::Variable { value } => Ok(value),
            other => Err(unexpected("variable", &other)),
        }
    }

    fn name(&mut self, session: &SessionIdentity) -> SurfaceResult<Option<String>> {
        match self.call(SurfaceRequest::GetName {
            session_id: session.clone(),
        })? {
            SurfaceResponse::Name { name } => Ok(name),
            other => Err(unexpected("name", &other)),
        }
    }

    fn set_name(&mut self, session: &SessionIdentity, name: &str) -> SurfaceResult<()> {
        self.call_ok(SurfaceRequest::SetName {
            session_id: session.clone(),
            name: name.to_string(),
        })
    }

    fn color(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
    ) -> SurfaceResult<Rgb> {
        match self.call(SurfaceRequest::GetColor {
            session_id: session.clone(),
            slot,
            appearance,
        })? {
            SurfaceResponse::Color { color } => Ok(color),
            other => Err(unexpected("color", &other)),
        }
    }

    fn set_color(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
        color: Rgb,
    ) -> SurfaceResult<()> {
        self.call_ok(SurfaceRequest::SetColor {
            session_id: session.clone(),
            slot,
            appearance,
            color,
        })
    }

    fn set_flag(
        &mut self,
        session: &SessionIdentity,
        flag: ProfileFlag,
        appearance: Appearance,
        value: bool,
    ) -> SurfaceResult<()> {
        self.call_ok(SurfaceRequest::SetFlag {
            session_id: session.clone(),
            flag,
            appearance,
            value,
        })
    }

    fn subscribe_keystrokes(
        &mut self,
        session: Option<&SessionIdentity>,
    ) -> SurfaceResult<Box<dyn KeystrokeStream>> {
        // Subscriptions get a dedicated connection that blocks without a timeout
        let mut conn = Connection::open(&self.socket_path, Some(self.read_timeout))?;
        let request = SurfaceRequest::SubscribeKeystrokes {
            session_id: session.cloned(),
        };

        match conn.exchange(&request)? {
            SurfaceResponse::Subscribed => {}
            SurfaceResponse::Error { code, message } => {
                return Err(remote_error(&request, code, message))
            }
            other => return Err(unexpected("subscribed", &other)),
        }

        conn.reader
            .get_ref()
            .set_read_timeout(None)
            .map_err(SurfaceError::Unavailable)?;

        Ok(Box::new(SocketKeystrokeStream { conn }))
    }
}

/// Keystroke notifications read from a subscription connection
///
/// Dropping the stream shuts the connection down, which ends the subscription.
pub struct SocketKeystrokeStream {
    conn: Connection,
}

impl KeystrokeStream for SocketKeystrokeStream {
    fn next_keystroke(&mut self) -> SurfaceResult<Keystroke> {
        loop {
            let line = match self.conn.read_frame() {
                Ok(Some(line)) => line,
                Ok(None) => return Err(SurfaceError::StreamClosed),
                Err(SurfaceError::Protocol(message)) => {
                    tracing::warn!(%message, "dropping malformed keystroke frame");
                    continue;
                }
                Err(e) => return Err(e),
            };

            match deserialize_message::<SurfaceNotification>(line.as_bytes()) {
                Ok(SurfaceNotification::Keystroke {
                    session_id,
                    characters,
                    modifiers,
                }) => {
                    return Ok(Keystroke {
                        session_id,
                        characters,
                        modifiers,
                    })
                }
                Err(e) => {
                    tracing::warn!(error = %e, line = line.trim(), "ignoring non-keystroke frame");
                }
            }
        }
    }
}

impl Drop for SocketKeystrokeStream {
    fn drop(&mut self) {
        let _ = self.conn.writer.shutdown(Shutdown::Both);
    }
}
