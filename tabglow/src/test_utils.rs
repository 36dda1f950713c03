//! Test utilities shared by the unit tests
//!
//! This module is only compiled in test builds. `FakeSurface` stands in for the
//! terminal: an in-memory layout with per-session names, variables, colours and
//! flags, injectable failures, a call log and a scripted keystroke queue.

use crate::surface::{
    Appearance, ColorSlot, ControlSurface, Keystroke, KeystrokeStream, Layout, ProfileFlag, Rgb,
    SessionIdentity, SurfaceError, SurfaceResult, Tab, Window,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Shorthand for a known-good identity
pub fn sid(raw: &str) -> SessionIdentity {
    SessionIdentity::new(raw).unwrap()
}

/// Serialise tests that touch process environment variables
pub fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub layout: Layout,
    pub names: HashMap<SessionIdentity, String>,
    pub variables: HashMap<(SessionIdentity, String), String>,
    pub colors: HashMap<(SessionIdentity, ColorSlot, Appearance), Rgb>,
    pub flags: HashMap<(SessionIdentity, ProfileFlag, Appearance), bool>,

    pub fail_layout: bool,
    /// Sessions whose variable reads fail
    pub failing_variables: HashSet<SessionIdentity>,
    /// Methods that always fail (`"name"`, `"set_color"`, ...)
    pub failing_calls: HashSet<&'static str>,
    /// Zero-based indices of `set_name` calls that fail
    pub failing_set_name_calls: HashSet<usize>,

    /// Every method call, in order
    pub calls: Vec<&'static str>,
    /// Successful title writes, in order
    pub name_updates: Vec<(SessionIdentity, String)>,
    set_name_calls: usize,

    pub keystrokes: VecDeque<Keystroke>,
    pub subscriptions: Vec<Option<SessionIdentity>>,
    pub released_streams: usize,
}

impl FakeState {
    fn check(&mut self, call: &'static str) -> SurfaceResult<()> {
        self.calls.push(call);
        if self.failing_calls.contains(call) {
            return Err(SurfaceError::Protocol(format!("injected {} failure", call)));
        }
        Ok(())
    }

    fn check_session(&mut self, call: &'static str, session: &SessionIdentity) -> SurfaceResult<()> {
        self.check(call)?;
        if !self.layout.contains(session) {
            return Err(SurfaceError::SessionNotFound(session.clone()));
        }
        Ok(())
    }
}

/// In-memory `ControlSurface`; clones share state
#[derive(Debug, Clone, Default)]
pub struct FakeSurface {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeSurface {
    /// One window with one tab per session; the first session is focused
    pub fn with_sessions(ids: &[&str]) -> Self {
        let layout = Layout {
            windows: vec![Window {
                tabs: ids
                    .iter()
                    .map(|id| Tab {
                        sessions: vec![sid(id)],
                        current_session: Some(0),
                    })
                    .collect(),
                current_tab: if ids.is_empty() { None } else { Some(0) },
            }],
            current_window: Some(0),
        };

        let surface = Self::default();
        surface.state.borrow_mut().layout = layout;
        surface
    }

    pub fn focus(&self, id: &str) {
        let target = sid(id);
        let mut state = self.state.borrow_mut();
        let mut found = None;
        for (w, window) in state.layout.windows.iter().enumerate() {
            for (t, tab) in window.tabs.iter().enumerate() {
                if let Some(s) = tab.sessions.iter().position(|s| *s == target) {
                    found = Some((w, t, s));
                }
            }
        }
        let (w, t, s) = found.unwrap();
        state.layout.current_window = Some(w);
        state.layout.windows[w].current_tab = Some(t);
        state.layout.windows[w].tabs[t].current_session = Some(s);
    }

    pub fn set_name_of(&self, id: &str, name: &str) {
        self.state.borrow_mut().names.insert(sid(id), name.to_string());
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        self.state.borrow().names.get(&sid(id)).cloned()
    }

    pub fn set_variable(&self, id: &str, name: &str, value: &str) {
        self.state
            .borrow_mut()
            .variables
            .insert((sid(id), name.to_string()), value.to_string());
    }

    pub fn fail_variable(&self, id: &str) {
        self.state.borrow_mut().failing_variables.insert(sid(id));
    }

    pub fn fail_layout(&self, fail: bool) {
        self.state.borrow_mut().fail_layout = fail;
    }

    pub fn fail_call(&self, call: &'static str) {
        self.state.borrow_mut().failing_calls.insert(call);
    }

    pub fn fail_set_name_call(&self, index: usize) {
        self.state.borrow_mut().failing_set_name_calls.insert(index);
    }

    pub fn set_color_of(&self, id: &str, slot: ColorSlot, appearance: Appearance, color: Rgb) {
        self.state
            .borrow_mut()
            .colors
            .insert((sid(id), slot, appearance), color);
    }

    pub fn color_of(&self, id: &str, slot: ColorSlot, appearance: Appearance) -> Option<Rgb> {
        self.state
            .borrow()
            .colors
            .get(&(sid(id), slot, appearance))
            .copied()
    }

    pub fn flag_of(&self, id: &str, flag: ProfileFlag, appearance: Appearance) -> Option<bool> {
        self.state
            .borrow()
            .flags
            .get(&(sid(id), flag, appearance))
            .copied()
    }

    pub fn push_keystroke(&self, session: Option<&str>, characters: &str) {
        self.state.borrow_mut().keystrokes.push_back(Keystroke {
            session_id: session.map(sid),
            characters: characters.to_string(),
            modifiers: Vec::new(),
        });
    }

    pub fn name_updates(&self) -> Vec<String> {
        self.state
            .borrow()
            .name_updates
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }
}

impl ControlSurface for FakeSurface {
    fn layout(&mut self) -> SurfaceResult<Layout> {
        let mut state = self.state.borrow_mut();
        state.check("layout")?;
        if state.fail_layout {
            return Err(SurfaceError::Protocol("injected layout failure".to_string()));
        }
        Ok(state.layout.clone())
    }

    fn variable(
        &mut self,
        session: &SessionIdentity,
        name: &str,
    ) -> SurfaceResult<Option<String>> {
        let mut state = self.state.borrow_mut();
        state.check_session("variable", session)?;
        if state.failing_variables.contains(session) {
            return Err(SurfaceError::Protocol("injected variable failure".to_string()));
        }
        Ok(state
            .variables
            .get(&(session.clone(), name.to_string()))
            .cloned())
    }

    fn name(&mut self, session: &SessionIdentity) -> SurfaceResult<Option<String>> {
        let mut state = self.state.borrow_mut();
        state.check_session("name", session)?;
        Ok(state.names.get(session).cloned())
    }

    fn set_name(&mut self, session: &SessionIdentity, name: &str) -> SurfaceResult<()> {
        let mut state = self.state.borrow_mut();
        let index = state.set_name_calls;
        state.set_name_calls += 1;
        state.check_session("set_name", session)?;
        if state.failing_set_name_calls.contains(&index) {
            return Err(SurfaceError::Protocol("injected set_name failure".to_string()));
        }
        state.names.insert(session.clone(), name.to_string());
        state
            .name_updates
            .push((session.clone(), name.to_string()));
        Ok(())
    }

    fn color(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
    ) -> SurfaceResult<Rgb> {
        let mut state = self.state.borrow_mut();
        state.check_session("color", session)?;
        Ok(state
            .colors
            .get(&(session.clone(), slot, appearance))
            .copied()
            .unwrap_or(Rgb::BLACK))
    }

    fn set_color(
        &mut self,
        session: &SessionIdentity,
        slot: ColorSlot,
        appearance: Appearance,
        color: Rgb,
    ) -> SurfaceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_session("set_color", session)?;
        state
            .colors
            .insert((session.clone(), slot, appearance), color);
        Ok(())
    }

    fn set_flag(
        &mut self,
        session: &SessionIdentity,
        flag: ProfileFlag,
        appearance: Appearance,
        value: bool,
    ) -> SurfaceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_session("set_flag", session)?;
        state
            .flags
            .insert((session.clone(), flag, appearance), value);
        Ok(())
    }

    fn subscribe_keystrokes(
        &mut self,
        session: Option<&SessionIdentity>,
    ) -> SurfaceResult<Box<dyn KeystrokeStream>> {
        let mut state = self.state.borrow_mut();
        state.check("subscribe_keystrokes")?;
        state.subscriptions.push(session.cloned());
        Ok(Box::new(FakeKeystrokeStream {
            state: Rc::clone(&self.state),
        }))
    }
}

/// Drains the scripted keystroke queue, then reports the stream closed
pub struct FakeKeystrokeStream {
    state: Rc<RefCell<FakeState>>,
}

impl KeystrokeStream for FakeKeystrokeStream {
    fn next_keystroke(&mut self) -> SurfaceResult<Keystroke> {
        self.state
            .borrow_mut()
            .keystrokes
            .pop_front()
            .ok_or(SurfaceError::StreamClosed)
    }
}

impl Drop for FakeKeystrokeStream {
    fn drop(&mut self) {
        self.state.borrow_mut().released_streams += 1;
    }
}
