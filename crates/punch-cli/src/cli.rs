//! Command-line interface definition using clap.

use clap::{Parser, ValueEnum};
use punch_core::PunchAction;

/// Punch the web timecard in or out
#[derive(Parser, Debug)]
#[command(name = "punch")]
#[command(author, version, about, long_about = None)]
pub struct PunchArgs {
    /// Which control to press
    #[arg(value_enum)]
    pub action: ActionArg,

    /// Where the CAPTCHA answer comes from
    #[arg(value_enum, default_value_t = ChannelArg::Readline)]
    pub channel: ChannelArg,

    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Listen for remote punch commands
#[derive(Parser, Debug)]
#[command(name = "punch-listener")]
#[command(author, version, about, long_about = None)]
pub struct ListenerArgs {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionArg {
    In,
    Out,
}

impl From<ActionArg> for PunchAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::In => PunchAction::In,
            ActionArg::Out => PunchAction::Out,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelArg {
    /// Send the CAPTCHA to the operator chat and wait for a reply
    Telegram,
    /// Open the CAPTCHA locally and read the answer from the terminal
    #[value(alias = "interactive")]
    Readline,
}
