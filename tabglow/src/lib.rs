// tabglow: ambient terminal feedback driven through the terminal's control surface.
// Shared between the animate-title, typing-monitor, tab-color and window-color binaries.

// Parent-process walking used to find the session that launched us
pub mod ancestry;

// Frame loop, burst, keystroke monitor and colour operations
pub mod engine;

// Tracing setup (workers have no terminal, so logs go to a file)
pub mod logging;

// Session resolution, per-session state files and worker lifecycle
pub mod session;

// Contract with the hosting terminal's control surface
pub mod surface;

#[cfg(test)]
pub(crate) mod test_utils;
