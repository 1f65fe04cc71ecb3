// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! fanctl-daemon: system service that samples temperature sensors and keeps
//! each fan at the level its threshold bands select.

use anyhow::Context;
use clap::Parser;
use fanctl::config;
use fanctl::service::{Service, SuspendForwarder};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "fanctl-daemon", about = "Linux fan level daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Print debug messages.
    #[arg(short, long)]
    debug: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    run(&cli).await
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config_path = config::resolve_config_path(Some(&cli.config));
    let cfg = config::load_config(&config_path).context("config load error")?;

    let mut service = Service::new(&cfg);
    service.init().context("service init error")?;

    log::info!(
        "Controlling {} fan(s), sampling every {:?}",
        service.fans().len(),
        service.period()
    );

    // Suspend notifications arrive as SIGUSR1 from the system sleep hook.
    // The handler is installed even with suspend disabled so the signal
    // never falls through to its default action.
    let (suspend_tx, suspend_rx) = mpsc::channel(1);
    let mut usr1 = signal(SignalKind::user_defined1()).context("install SIGUSR1 handler")?;
    let forwarder = SuspendForwarder::new(cfg.suspend, suspend_tx.clone());
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            if !forwarder.notify().await {
                break;
            }
        }
    });

    let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        log::info!("Received shutdown signal");
    };

    let result = service.run(shutdown, suspend_rx).await;
    // Held until here so the receiver never reports a closed channel.
    drop(suspend_tx);
    result.context("service run error")
}
