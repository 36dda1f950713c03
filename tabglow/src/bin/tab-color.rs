// tab-color: set the tab / title bar colour of the current session
//
// Usage: tab-color [color]   (white, light, dark, blue, purple, green, red, orange, clear)
// Defaults to `dark`. `clear` or an unknown name turns the tab colour off.

use anyhow::Result;
use std::env;
use tabglow_lib::{
    engine::colors::{tab_color_command, TabColorTable, DEFAULT_TAB_COLOR},
    logging,
    session::{config::Config, resolver::resolve_current},
    surface::SocketSurface,
};

fn main() -> Result<()> {
    let name = env::args()
        .nth(1)
        .map(|arg| arg.to_lowercase())
        .unwrap_or_else(|| DEFAULT_TAB_COLOR.to_string());

    let config = Config::from_env();
    let _span = logging::init(&config, "tab-color").entered();

    let mut surface = SocketSurface::from_config(&config);
    let identity = resolve_current(&mut surface, None);
    tab_color_command(
        &mut surface,
        identity.as_ref(),
        &TabColorTable::default(),
        &name,
    )
}
