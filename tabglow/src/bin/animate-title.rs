// animate-title: animated session title while the terminal is busy
//
// Foreground commands (run from shell hooks):
// - start: stop any running animation and spawn a detached `run` worker
// - stop:  stop the animation and launch a detached `restore`
// - burst: stop the animation and launch a detached `run_burst`
//
// Worker commands (spawned by the above, identity passed via the environment):
// - run, restore, run_burst

use anyhow::Result;
use std::env;
use tabglow_lib::{
    engine::TitleAnimator,
    logging,
    session::{
        config::Config,
        lifecycle::{spawn_detached, DaemonManager, WorkerCommand},
        resolver::{forwarded_identity, resolve_current},
        state::{DaemonKind, StateStore},
    },
    surface::{SessionIdentity, SocketSurface},
};

const KIND: DaemonKind = DaemonKind::Animation;

fn print_help() {
    println!("animate-title - animated terminal session title");
    println!();
    println!("Usage:");
    println!("  animate-title start    Start animating this session's title");
    println!("  animate-title stop     Stop the animation and restore the title");
    println!("  animate-title burst    Play a short fire burst, then restore the title");
}

/// Session of the shell that invoked us
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

/// Stop the animation, then hand `directive` to a detached, unrecorded worker
fn stop_then_launch(config: &Config, directive: &str) -> Result<()> {
    let identity = launcher_identity(config);
    manager(config)?.stop(identity.as_ref());
    spawn_detached(
        &WorkerCommand::current_exe(directive)?,
        KIND.forward_env(),
        identity.as_ref(),
        &[],
    )?;
    Ok(())
}

fn animator(config: &Config) -> TitleAnimator<SocketSurface> {
    TitleAnimator::new(
        SocketSurface::from_config(config),
        StateStore::from_config(config, KIND),
    )
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        std::process::exit(1);
    }

    let command = args[1].as_str();
    let config = Config::from_env();
    let _span = logging::init(&config, &format!("animate-title/{}", command)).entered();

    match command {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }

        "start" => {
            let identity = launcher_identity(&config);
            manager(&config)?.start(identity.as_ref(), &[])?;
            Ok(())
        }

        "stop" => stop_then_launch(&config, "restore"),

        "burst" => stop_then_launch(&config, "run_burst"),

        "run" => {
            let identity = forwarded_identity(KIND.forward_env());
            animator(&config).run(identity.as_ref());
            Ok(())
        }

        "restore" => {
            let identity = forwarded_identity(KIND.forward_env());
            let outcome = animator(&config).restore(identity.as_ref());
            tracing::info!(?outcome, "restore finished");
            Ok(())
        }

        "run_burst" => {
            let identity = forwarded_identity(KIND.forward_env());
            animator(&config).burst(identity.as_ref());
            Ok(())
        }

        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
}
