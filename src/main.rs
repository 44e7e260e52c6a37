mod config;
mod error;
mod executor;
mod filter;
mod handoff;
mod loader;
mod model;
mod overlay;
mod remote;
mod search;
mod sources;
mod state;
mod ui;

#[cfg(test)]
mod fixtures;

use std::path::PathBuf;
use anyhow::{Context, Result};
use calloop::signals::{Signal, Signals};
use calloop::EventLoop;
use calloop_wayland_source::WaylandSource;
use clap::{Parser, Subcommand};
use log::{info, warn};
use wayland_client::{Connection, globals::registry_queue_init};
use crate::config::load_config;
use crate::executor::SystemLauncher;
use crate::remote::{Command, PidFile};
use crate::sources::{CatalogSource, CompositeSource, custom::ConfigSource, desktop::DesktopSource};
use crate::state::Launcher;
use crate::ui::icons::{IconCache, IconReply};
use crate::ui::render::Renderer;
use crate::ui::wayland::WaylandApp;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start without showing the popup
    #[arg(long)]
    hidden: bool,

    #[command(subcommand)]
    command: Option<Remote>,
}

/// Control an already running launcher
#[derive(Subcommand, Debug, Clone, Copy)]
enum Remote {
    /// Show the popup if hidden, hide it otherwise
    Toggle,
    /// Show the popup (refreshes the list if already shown)
    Open,
    /// Hide the popup
    Close,
}

impl From<Remote> for Command {
    fn from(remote: Remote) -> Self {
        match remote {
            Remote::Toggle => Command::Toggle,
            Remote::Open => Command::Open,
            Remote::Close => Command::Close,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(remote) = args.command {
        remote::send(remote.into(), &remote::pid_file_path())?;
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let pid_file = PidFile::create(remote::pid_file_path())?;
    SystemLauncher::install_child_reaper()?;

    let mut sources: Vec<Box<dyn CatalogSource>> = vec![Box::new(ConfigSource::new(config.catalog.groups.clone()))];
    if config.catalog.desktop {
        sources.push(Box::new(DesktopSource::from_env()));
    }
    let source = CompositeSource::new(sources).with_hide_patterns(&config.catalog.hide)?;

    let mut event_loop: EventLoop<WaylandApp> = EventLoop::try_new()?;

    // Blocks the control signals for this thread; must happen before any
    // worker thread is spawned so they inherit the mask.
    let signals = Signals::new(&[Signal::SIGUSR1, Signal::SIGUSR2, Signal::SIGHUP])?;

    let conn = Connection::connect_to_env().context("no Wayland compositor")?;
    let (globals, mut event_queue) = registry_queue_init::<WaylandApp>(&conn)?;
    let qh = event_queue.handle();

    let (tx_icons, rx_icons) = calloop::channel::channel::<IconReply>();
    let renderer = Renderer::new(IconCache::new(tx_icons, config.theme.fallback_icon.clone()));

    let hidden = args.hidden;
    let launcher = Launcher::new(config, Box::new(source), Box::new(SystemLauncher));
    let mut app = WaylandApp::new(&globals, &qh, launcher, renderer)?;

    // Learn outputs and seat capabilities before the first open.
    event_queue.roundtrip(&mut app)?;

    event_loop.handle().insert_source(rx_icons, |event, _, app: &mut WaylandApp| {
        if let calloop::channel::Event::Msg(reply) = event {
            app.renderer.insert_icon(reply);
            app.draw();
        }
    }).map_err(|e| anyhow::anyhow!("icon channel: {}", e.error))?;

    event_loop.handle().insert_source(signals, |event, _, app: &mut WaylandApp| {
        let signal = nix::sys::signal::Signal::try_from(event.signal() as i32).ok();
        match signal.and_then(Command::from_signal) {
            Some(command) => app.run_command(command),
            None => warn!("Ignoring signal {:?}", event.signal()),
        }
    }).map_err(|e| anyhow::anyhow!("signal source: {}", e.error))?;

    event_loop.handle().insert_source(
        WaylandSource::new(conn.clone(), event_queue),
        |_, queue, app| queue.dispatch_pending(app),
    ).map_err(|e| anyhow::anyhow!("wayland source: {}", e.error))?;

    info!("panel-launcher running (pid {}, pid file {})", std::process::id(), pid_file.path().display());

    if !hidden {
        app.run_command(Command::Open);
    }

    loop {
        if app.should_exit {
            break;
        }
        event_loop.dispatch(None, &mut app)?;
    }

    Ok(())
}
