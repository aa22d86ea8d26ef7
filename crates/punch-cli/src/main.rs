//! `punch` entry point.

use std::sync::Arc;

use clap::Parser;
use punch_browser::{BrowserLauncher, ChromiumLauncher};
use punch_core::{
    load_env_files, ApprovalChannel, EvidenceSink, InteractiveApproval, PunchConfig, PunchResult,
    PunchWorkflow, RemoteApproval,
};
use punch_relay::{MessageRelay, TelegramRelay};

use punch_cli::cli::{ChannelArg, PunchArgs};
use punch_cli::logging;

#[tokio::main]
async fn main() {
    let args = PunchArgs::parse();
    logging::init(args.verbose);
    load_env_files();

    match run(args).await {
        Ok(result) => {
            println!("{}", result.summary());
            println!("Screenshot: {}", result.screenshot_path.display());
            println!("🎉 Process completed successfully");
        }
        Err(e) => {
            eprintln!("💥 Process failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: PunchArgs) -> punch_core::Result<PunchResult> {
    let config = PunchConfig::from_env()?;
    let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromiumLauncher::new(config.launch_options()));
    let evidence = EvidenceSink::new(config.screenshot_dir.clone());

    let (approval, evidence): (Arc<dyn ApprovalChannel>, EvidenceSink) = match args.channel {
        ChannelArg::Readline => (
            Arc::new(InteractiveApproval::new()),
            evidence.with_local_display(true),
        ),
        ChannelArg::Telegram => {
            let settings = config.require_relay()?;
            let relay: Arc<dyn MessageRelay> = Arc::new(TelegramRelay::new(settings.bot_token.clone()));
            (
                Arc::new(RemoteApproval::new(Arc::clone(&relay), settings.chat_id)),
                evidence.with_relay(relay, settings.chat_id),
            )
        }
    };

    let mut workflow = PunchWorkflow::new(&config, launcher, approval).with_evidence(evidence);
    workflow.run(args.action.into()).await
}
