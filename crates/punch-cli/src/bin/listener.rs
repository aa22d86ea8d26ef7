//! `punch-listener` entry point.
//!
//! ```bash
//! WITS_USERNAME=.. WITS_PASSWORD=.. TELEGRAM_BOT_TOKEN=.. TELEGRAM_CHAT_ID=.. punch-listener
//! ```

use std::sync::Arc;

use clap::Parser;
use punch_browser::{BrowserLauncher, ChromiumLauncher};
use punch_core::{load_env_files, CommandListener, PunchConfig, PunchWorker, WorkflowRunner};
use punch_relay::{MessageRelay, TelegramRelay};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use punch_cli::cli::ListenerArgs;
use punch_cli::logging;

#[tokio::main]
async fn main() {
    let args = ListenerArgs::parse();
    logging::init(args.verbose);
    load_env_files();

    if let Err(e) = run().await {
        eprintln!("💥 Listener failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> punch_core::Result<()> {
    let config = PunchConfig::from_env()?;
    let settings = config.require_relay()?.clone();

    let relay: Arc<dyn MessageRelay> = Arc::new(TelegramRelay::new(settings.bot_token.clone()));
    let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromiumLauncher::new(config.launch_options()));
    let runner = Arc::new(WorkflowRunner::new(config, launcher, Arc::clone(&relay))?);

    let (report_tx, report_rx) = mpsc::unbounded_channel();
    let worker = PunchWorker::new(runner, report_tx);
    let mut listener = CommandListener::new(relay, settings.chat_id, worker, report_rx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("ctrl-c received, shutting down"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
        }
        let _ = shutdown_tx.send(true);
    });

    println!("👂 Listening for \"pi\" / \"po\" from chat {}", settings.chat_id);
    println!("   Press Ctrl+C to stop");
    listener.run(shutdown_rx).await;
    Ok(())
}
