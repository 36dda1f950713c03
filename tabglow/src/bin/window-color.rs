// window-color: tint the current session's background
//
// Usage: window-color [color]
// Without a colour, cycles red -> green -> blue -> purple -> orange -> black -> white.
// Named colours also include pink, brown, done, dim, glow and cool; unknown names reset to black.

use anyhow::Result;
use std::env;
use tabglow_lib::{
    engine::colors::{window_color_command, WindowPalette},
    logging,
    session::{config::Config, resolver::resolve_current},
    surface::SocketSurface,
};

fn main() -> Result<()> {
    let name = env::args().nth(1).map(|arg| arg.to_lowercase());

    let config = Config::from_env();
    let _span = logging::init(&config, "window-color").entered();

    let mut surface = SocketSurface::from_config(&config);
    let identity = resolve_current(&mut surface, None);
    window_color_command(
        &mut surface,
        identity.as_ref(),
        &WindowPalette::default(),
        name.as_deref(),
    )?;
    Ok(())
}
