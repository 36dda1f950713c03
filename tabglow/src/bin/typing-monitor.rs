// typing-monitor: turn the tab colour off as soon as the user types
//
// - start: stop any running monitor for this session and spawn a detached `run` worker
// - stop:  stop the monitor
// - run:   (worker) block on keystrokes and clear the tab colour on each one

use anyhow::Result;
use std::env;
use tabglow_lib::{
    engine::{KeystrokeMonitor, SpawnTabColorReset},
    logging,
    session::{
        config::Config,
        lifecycle::{DaemonManager, WorkerCommand},
        resolver::{forwarded_identity, resolve_current},
        state::{DaemonKind, StateStore},
    },
    surface::{SessionIdentity, SocketSurface},
};

const KIND: DaemonKind = DaemonKind::Monitor;

fn print_help() {
    println!("typing-monitor - clear the tab colour when you start typing");
    println!();
    println!("Usage:");
    println!("  typing-monitor start    Start monitoring this session");
    println!("  typing-monitor stop     Stop monitoring this session");
}

fn launcher_identity(config: &Config) -> Option<SessionIdentity> {
    let mut surface = SocketSurface::from_config(config);
    resolve_current(&mut surface, Some(KIND.forward_env()))
}

fn manager(config: &Config) -> Result<DaemonManager> {
    config.ensure_dirs()?;
    Ok(DaemonManager::new(
        StateStore::from_config(config, KIND),
        WorkerCommand::current_exe("run")?,
    ))
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        std::process::exit(1);
    }

    let command = args[1].as_str();
    let config = Config::from_env();
    let _span = logging::init(&config, &format!("typing-monitor/{}", command)).entered();

    match command {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }

        "start" => {
            let identity = launcher_identity(&config);
            let record = manager(&config)?.start(identity.as_ref(), &[])?;
            println!(
                "Typing monitor started (pid: {}, session: {})",
                record.pid,
                identity
                    .as_ref()
                    .map(SessionIdentity::as_str)
                    .unwrap_or("unknown")
            );
            Ok(())
        }

        "stop" => {
            let identity = launcher_identity(&config);
            manager(&config)?.stop(identity.as_ref());
            println!("Typing monitor stopped");
            Ok(())
        }

        "run" => {
            let identity = forwarded_identity(KIND.forward_env());
            let mut monitor = KeystrokeMonitor::new(
                SocketSurface::from_config(&config),
                SpawnTabColorReset::sibling()?,
            );
            if let Err(e) = monitor.run(identity.as_ref()) {
                tracing::error!(error = %e, "keystroke monitor stopped");
                return Err(e);
            }
            Ok(())
        }

        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
}
