//! Timecard punch automation.
//!
//! This crate drives the web timecard portal and coordinates the human who
//! answers its CAPTCHA:
//! - `PunchWorkflow` - one login-and-punch run against a fresh browser
//! - `ApprovalChannel` - terminal or relay-based CAPTCHA answers
//! - `EvidenceSink` - screenshot archive, local display and relay
//! - `PunchWorker` / `CommandListener` - remote `pi` / `po` commands
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use punch_browser::ChromiumLauncher;
//! use punch_core::{InteractiveApproval, PunchAction, PunchConfig, PunchWorkflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PunchConfig::from_env()?;
//!     let launcher = Arc::new(ChromiumLauncher::new(config.launch_options()));
//!     let mut workflow = PunchWorkflow::new(&config, launcher, Arc::new(InteractiveApproval::new()));
//!
//!     let result = workflow.run(PunchAction::In).await?;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```
//!
//! # Key Concepts
//!
//! ## Idempotent punching
//!
//! The portal disables a punch control once it has been used for the day.
//! The workflow waits for the control's state to settle and reports
//! `AlreadyPunched` instead of clicking a disabled control.
//!
//! ## Cleanup
//!
//! Every run that launched a browser closes it and deletes the CAPTCHA file
//! before returning, on success or failure.

pub mod action;
pub mod approval;
pub mod challenge;
pub mod config;
pub mod error;
pub mod evidence;
pub mod listener;
pub mod portal;
pub mod viewer;
pub mod worker;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use action::{PunchAction, PunchOutcome, PunchResult};
pub use approval::{AnswerWatermark, ApprovalChannel, ChannelKind, InteractiveApproval, RemoteApproval};
pub use challenge::Challenge;
pub use config::{load_env_files, Credentials, PunchConfig, RelaySettings};
pub use error::{ConfigError, PunchError, Result};
pub use evidence::{screenshot_path, EvidenceSink};
pub use listener::{CommandListener, RemoteCommand, UpdateCursor};
pub use portal::Portal;
pub use worker::{PunchRunner, PunchWorker, RunReport, WorkerBusy, WorkflowRunner};
pub use workflow::{PunchWorkflow, WorkflowState, WorkflowTimings};
