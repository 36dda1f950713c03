// In-process terminal bridge for integration tests
// Serves the newline-JSON bridge protocol from a Unix socket in a temp dir

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use tabglow_lib::surface::protocol::{
    deserialize_message, serialize_message, ErrorCode, SurfaceNotification, SurfaceRequest,
    SurfaceResponse, PROTOCOL_VERSION,
};
use tabglow_lib::surface::{
    Appearance, ColorSlot, Layout, ProfileFlag, Rgb, SessionIdentity, Tab, Window,
};
use tempfile::TempDir;

/// Everything the fake terminal knows and everything it was asked
pub struct BridgeState {
    pub accepted_version: u32,
    pub layout: Layout,
    pub names: HashMap<String, String>,
    pub variables: HashMap<(String, String), String>,
    pub colors: HashMap<(String, ColorSlot, Appearance), Rgb>,
    pub flags: HashMap<(String, ProfileFlag, Appearance), bool>,
    /// Every `set_name`, in order
    pub name_history: Vec<(String, String)>,
    /// Every request after the handshake, in order
    pub requests: Vec<SurfaceRequest>,
    /// Pushed to the next subscriber, filtered by its scope
    pub keystrokes: Vec<SurfaceNotification>,
    /// Keep subscriptions open after the queued keystrokes instead of closing them
    pub hold_subscriptions: bool,
    pub subscriptions: Vec<Option<SessionIdentity>>,
    pub released_subscriptions: usize,
    pub connections: usize,
    open: Vec<UnixStream>,
}

impl BridgeState {
    fn new(layout: Layout) -> Self {
        Self {
            accepted_version: PROTOCOL_VERSION,
            layout,
            names: HashMap::new(),
            variables: HashMap::new(),
            colors: HashMap::new(),
            flags: HashMap::new(),
            name_history: Vec::new(),
            requests: Vec::new(),
            keystrokes: Vec::new(),
            hold_subscriptions: false,
            subscriptions: Vec::new(),
            released_subscriptions: 0,
            connections: 0,
            open: Vec::new(),
        }
    }

    fn handle(&mut self, request: SurfaceRequest) -> SurfaceResponse {
        if let SurfaceRequest::Handshake { client_version } = request {
            return if client_version == self.accepted_version {
                SurfaceResponse::Handshake {
                    protocol_version: self.accepted_version,
                }
            } else {
                error(
                    ErrorCode::VersionMismatch,
                    format!(
                        "client version {} != bridge version {}",
                        client_version, self.accepted_version
                    ),
                )
            };
        }

        self.requests.push(request.clone());

        match request {
            SurfaceRequest::Handshake { .. } => unreachable!(),
            SurfaceRequest::ListWindows => SurfaceResponse::windows(self.layout.clone()),
            SurfaceRequest::SubscribeKeystrokes { session_id } => {
                self.subscriptions.push(session_id);
                SurfaceResponse::Subscribed
            }
            SurfaceRequest::GetVariable { session_id, name } => {
                self.known(&session_id, |state| SurfaceResponse::Variable {
                    value: state
                        .variables
                        .get(&(session_id.to_string(), name.clone()))
                        .cloned(),
                })
            }
            SurfaceRequest::GetName { session_id } => {
                self.known(&session_id, |state| SurfaceResponse::Name {
                    name: state.names.get(session_id.as_str()).cloned(),
                })
            }
            SurfaceRequest::SetName { session_id, name } => self.known(&session_id, |state| {
                state.names.insert(session_id.to_string(), name.clone());
                state.name_history.push((session_id.to_string(), name.clone()));
                SurfaceResponse::Ok
            }),
            SurfaceRequest::GetColor {
                session_id,
                slot,
                appearance,
            } => self.known(&session_id, |state| SurfaceResponse::Color {
                color: state
                    .colors
                    .get(&(session_id.to_string(), slot, appearance))
                    .copied()
                    .unwrap_or(Rgb::BLACK),
            }),
            SurfaceRequest::SetColor {
                session_id,
                slot,
                appearance,
                color,
            } => self.known(&session_id, |state| {
                state
                    .colors
                    .insert((session_id.to_string(), slot, appearance), color);
                SurfaceResponse::Ok
            }),
            SurfaceRequest::SetFlag {
                session_id,
                flag,
                appearance,
                value,
            } => self.known(&session_id, |state| {
                state
                    .flags
                    .insert((session_id.to_string(), flag, appearance), value);
                SurfaceResponse::Ok
            }),
        }
    }

    fn known<F>(&mut self, session: &SessionIdentity, f: F) -> SurfaceResponse
    where
        F: FnOnce(&mut Self) -> SurfaceResponse,
    {
        if self.layout.contains(session) {
            f(self)
        } else {
            error(
                ErrorCode::SessionNotFound,
                format!("no session {}", session),
            )
        }
    }

    /// Queued keystrokes a subscriber with this scope should see
    fn take_keystrokes(&mut self, scope: Option<&SessionIdentity>) -> Vec<SurfaceNotification> {
        let (matching, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.keystrokes)
            .into_iter()
            .partition(|SurfaceNotification::Keystroke { session_id, .. }| match scope {
                Some(scope) => session_id.as_ref() == Some(scope),
                None => true,
            });
        self.keystrokes = rest;
        matching
    }
}

fn error(code: ErrorCode, message: String) -> SurfaceResponse {
    SurfaceResponse::Error { code, message }
}

/// One window, one tab per session, first session focused
pub fn layout_of(sessions: &[&str]) -> Layout {
    Layout {
        windows: vec![Window {
            tabs: sessions
                .iter()
                .map(|id| Tab {
                    sessions: vec![SessionIdentity::new(*id).unwrap()],
                    current_session: Some(0),
                })
                .collect(),
            current_tab: if sessions.is_empty() { None } else { Some(0) },
        }],
        current_window: Some(0),
    }
}

pub fn keystroke(session: Option<&str>, characters: &str) -> SurfaceNotification {
    SurfaceNotification::Keystroke {
        session_id: session.map(|id| SessionIdentity::new(id).unwrap()),
        characters: characters.to_string(),
        modifiers: Vec::new(),
    }
}

/// Fake bridge listening until the test process exits
pub struct FakeBridge {
    _dir: TempDir,
    socket_path: PathBuf,
    state: Arc<Mutex<BridgeState>>,
}

impl FakeBridge {
    pub fn start(sessions: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("bridge.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();
        let state = Arc::new(Mutex::new(BridgeState::new(layout_of(sessions))));

        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                {
                    let mut state = accept_state.lock().unwrap();
                    state.connections += 1;
                    if let Ok(clone) = stream.try_clone() {
                        state.open.push(clone);
                    }
                }
                let conn_state = Arc::clone(&accept_state);
                thread::spawn(move || serve(stream, conn_state));
            }
        });

        Self {
            _dir: dir,
            socket_path,
            state,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn state(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap()
    }

    pub fn set_name(&self, session: &str, name: &str) {
        self.state().names.insert(session.to_string(), name.to_string());
    }

    pub fn name_of(&self, session: &str) -> Option<String> {
        self.state().names.get(session).cloned()
    }

    pub fn set_variable(&self, session: &str, name: &str, value: &str) {
        self.state()
            .variables
            .insert((session.to_string(), name.to_string()), value.to_string());
    }

    pub fn color_of(&self, session: &str, slot: ColorSlot, appearance: Appearance) -> Option<Rgb> {
        self.state()
            .colors
            .get(&(session.to_string(), slot, appearance))
            .copied()
    }

    pub fn flag_of(
        &self,
        session: &str,
        flag: ProfileFlag,
        appearance: Appearance,
    ) -> Option<bool> {
        self.state()
            .flags
            .get(&(session.to_string(), flag, appearance))
            .copied()
    }

    pub fn push_keystroke(&self, session: Option<&str>, characters: &str) {
        self.state().keystrokes.push(keystroke(session, characters));
    }

    /// Drop every open connection, as a restarting terminal would
    pub fn disconnect_all(&self) {
        for stream in self.state().open.drain(..) {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

fn write_frame<T: serde::Serialize>(stream: &mut UnixStream, message: &T) -> std::io::Result<()> {
    let bytes = serialize_message(message)?;
    stream.write_all(&bytes)?;
    stream.flush()
}

fn serve(stream: UnixStream, state: Arc<Mutex<BridgeState>>) {
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        let request: SurfaceRequest = match deserialize_message(line.as_bytes()) {
            Ok(request) => request,
            Err(e) => {
                let response = error(ErrorCode::InvalidRequest, e.to_string());
                if write_frame(&mut writer, &response).is_err() {
                    return;
                }
                continue;
            }
        };

        let scope = match &request {
            SurfaceRequest::SubscribeKeystrokes { session_id } => Some(session_id.clone()),
            _ => None,
        };

        let response = state.lock().unwrap().handle(request);
        if write_frame(&mut writer, &response).is_err() {
            return;
        }

        if let (Some(scope), SurfaceResponse::Subscribed) = (scope, &response) {
            stream_keystrokes(reader, writer, &state, scope.as_ref());
            return;
        }
    }
}

fn stream_keystrokes(
    mut reader: BufReader<UnixStream>,
    mut writer: UnixStream,
    state: &Arc<Mutex<BridgeState>>,
    scope: Option<&SessionIdentity>,
) {
    let (keystrokes, hold) = {
        let mut state = state.lock().unwrap();
        (state.take_keystrokes(scope), state.hold_subscriptions)
    };

    for notification in &keystrokes {
        if write_frame(&mut writer, notification).is_err() {
            return;
        }
    }

    if hold {
        // Blocks until the subscriber goes away
        let mut sink = Vec::new();
        let _ = reader.read_to_end(&mut sink);
        state.lock().unwrap().released_subscriptions += 1;
    } else {
        let _ = writer.shutdown(Shutdown::Both);
    }
}
