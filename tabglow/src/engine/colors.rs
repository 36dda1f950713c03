// Tab and window colours
// Named colour tables and the profile writes behind the tab-color and window-color commands

use crate::session::resolver::resolve_target;
use crate::surface::{
    Appearance, ColorSlot, ControlSurface, ProfileFlag, Rgb, SessionIdentity, SurfaceResult,
};
use anyhow::Result;

/// Tab colour used when no name is given
pub const DEFAULT_TAB_COLOR: &str = "dark";

/// Name that turns the tab colour off
pub const CLEAR_TAB_COLOR: &str = "clear";

/// Named tab colours; `None` entries turn the tab colour off
#[derive(Debug, Clone, PartialEq)]
pub struct TabColorTable {
    entries: Vec<(String, Option<Rgb>)>,
}

impl Default for TabColorTable {
    fn default() -> Self {
        let entries = [
            ("white", Some(Rgb::new(255, 255, 255))),
            ("light", Some(Rgb::new(220, 220, 220))),
            ("dark", Some(Rgb::new(30, 30, 40))),
            ("blue", Some(Rgb::new(20, 40, 80))),
            ("purple", Some(Rgb::new(50, 30, 70))),
            ("green", Some(Rgb::new(20, 50, 30))),
            ("red", Some(Rgb::new(60, 20, 20))),
            ("orange", Some(Rgb::new(70, 40, 10))),
            (CLEAR_TAB_COLOR, None),
        ];
        Self::new(entries.map(|(name, color)| (name.to_string(), color)))
    }
}

impl TabColorTable {
    pub fn new(entries: impl IntoIterator<Item = (String, Option<Rgb>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Colour for `name`; `None` for `clear` and for unknown names
    pub fn lookup(&self, name: &str) -> Option<Rgb> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .and_then(|(_, color)| *color)
    }
}

/// Enable and set the tab colour, or turn it off when `color` is `None`
///
/// Every write is attempted; the first failure is returned.
pub fn apply_tab_color<S: ControlSurface + ?Sized>(
    surface: &mut S,
    session: &SessionIdentity,
    color: Option<Rgb>,
) -> SurfaceResult<()> {
    match color {
        Some(color) => {
            let enabled = surface.set_flag_both(session, ProfileFlag::UseTabColor, true);
            let painted = surface.set_color_both(session, ColorSlot::Tab, color);
            enabled.and(painted)
        }
        None => surface.set_flag_both(session, ProfileFlag::UseTabColor, false),
    }
}

/// Background tints for the window-color command
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPalette {
    /// Names visited by cycling, in order
    sequence: Vec<String>,
    /// Every colour that can be chosen by name
    base: Vec<(String, Rgb)>,
    /// Applied to every channel of every entry
    darken: f32,
}

/// Default cycle order
pub const COLOR_SEQUENCE: [&str; 7] = ["red", "green", "blue", "purple", "orange", "black", "white"];

/// Colour chosen for unknown names
pub const RESET_WINDOW_COLOR: &str = "black";

impl Default for WindowPalette {
    fn default() -> Self {
        let base = [
            // 10% tints
            ("red", Rgb::new(25, 0, 0)),
            ("green", Rgb::new(0, 25, 0)),
            ("blue", Rgb::new(0, 0, 25)),
            ("purple", Rgb::new(16, 0, 25)),
            ("pink", Rgb::new(16, 0, 25)),
            ("orange", Rgb::new(25, 8, 0)),
            ("brown", Rgb::new(25, 8, 0)),
            ("black", Rgb::BLACK),
            ("white", Rgb::WHITE),
            // softer "done" colours
            ("done", Rgb::new(50, 50, 55)),
            ("dim", Rgb::new(35, 35, 40)),
            ("glow", Rgb::new(60, 50, 35)),
            ("cool", Rgb::new(35, 45, 60)),
        ];
        Self::new(
            COLOR_SEQUENCE.iter().map(|name| name.to_string()),
            base.map(|(name, rgb)| (name.to_string(), rgb)),
        )
    }
}

impl WindowPalette {
    pub fn new(
        sequence: impl IntoIterator<Item = String>,
        base: impl IntoIterator<Item = (String, Rgb)>,
    ) -> Self {
        Self {
            sequence: sequence.into_iter().collect(),
            base: base.into_iter().collect(),
            darken: 1.0,
        }
    }

    pub fn with_darken(mut self, darken: f32) -> Self {
        self.darken = darken;
        self
    }

    /// Darkened colour for `name`
    pub fn color(&self, name: &str) -> Option<Rgb> {
        self.base
            .iter()
            .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
            .map(|(_, rgb)| rgb.scaled(self.darken))
    }

    /// Sequence entries that exist in the base table, darkened
    fn cycle(&self) -> Vec<(&str, Rgb)> {
        self.sequence
            .iter()
            .filter_map(|name| self.color(name).map(|rgb| (name.as_str(), rgb)))
            .collect()
    }

    /// Entry after the one matching `current`, wrapping; the first entry when
    /// `current` is not in the sequence
    pub fn next_after(&self, current: Option<Rgb>) -> Option<(&str, Rgb)> {
        let cycle = self.cycle();
        if cycle.is_empty() {
            return None;
        }
        let next = current
            .and_then(|current| cycle.iter().position(|(_, rgb)| *rgb == current))
            .map_or(0, |index| (index + 1) % cycle.len());
        Some(cycle[next])
    }

    /// Text colour to pair with a background: black on white, white otherwise
    pub fn foreground_for(name: &str) -> Rgb {
        if name.eq_ignore_ascii_case("white") {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }
}

/// Background picked by `apply_window_color`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowColorChoice {
    pub name: String,
    pub background: Rgb,
    pub foreground: Rgb,
}

/// Set the session background by name, or cycle when `name` is `None`
///
/// Unknown names reset to black. Background, foreground and bold colours are
/// written in both appearances; every write is attempted and the first
/// failure is returned.
pub fn apply_window_color<S: ControlSurface + ?Sized>(
    surface: &mut S,
    session: &SessionIdentity,
    palette: &WindowPalette,
    name: Option<&str>,
) -> SurfaceResult<WindowColorChoice> {
    let (name, background) = match name {
        Some(name) => match palette.color(name) {
            Some(rgb) => (name.to_string(), rgb),
            None => {
                tracing::debug!(name, "unknown window colour, resetting");
                (RESET_WINDOW_COLOR.to_string(), Rgb::BLACK)
            }
        },
        None => {
            let current = match surface.color(session, ColorSlot::Background, Appearance::Light) {
                Ok(rgb) => Some(rgb),
                Err(e) => {
                    tracing::debug!(error = %e, "cannot read background, cycling from start");
                    None
                }
            };
            match palette.next_after(current) {
                Some((name, rgb)) => (name.to_string(), rgb),
                None => (RESET_WINDOW_COLOR.to_string(), Rgb::BLACK),
            }
        }
    };

    // Keyed on the chosen name, so cycling onto white also gets black text
    let foreground = WindowPalette::foreground_for(&name);
    let results = [
        surface.set_color_both(session, ColorSlot::Background, background),
        surface.set_color_both(session, ColorSlot::Foreground, foreground),
        surface.set_color_both(session, ColorSlot::Bold, foreground),
    ];
    results.into_iter().collect::<SurfaceResult<Vec<()>>>()?;

    Ok(WindowColorChoice {
        name,
        background,
        foreground,
    })
}

/// `tab-color [name]` for the session the caller belongs to
pub fn tab_color_command<S: ControlSurface>(
    surface: &mut S,
    identity: Option<&SessionIdentity>,
    table: &TabColorTable,
    name: &str,
) -> Result<()> {
    let session = resolve_target(surface, identity)?;
    let color = table.lookup(name);
    apply_tab_color(surface, &session, color)?;
    tracing::info!(session = %session, name, enabled = color.is_some(), "tab colour applied");
    Ok(())
}

/// `window-color [name]` for the session the caller belongs to
pub fn window_color_command<S: ControlSurface>(
    surface: &mut S,
    identity: Option<&SessionIdentity>,
    palette: &WindowPalette,
    name: Option<&str>,
) -> Result<WindowColorChoice> {
    let session = resolve_target(surface, identity)?;
    let choice = apply_window_color(surface, &session, palette, name)?;
    tracing::info!(session = %session, name = %choice.name, "window colour applied");
    Ok(choice)
}
