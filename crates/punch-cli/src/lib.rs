//! Timecard puncher binaries.
//!
//! - `punch <in|out> [telegram|readline]` runs one punch
//! - `punch-listener` waits for `pi` / `po` commands from the operator chat

pub mod cli;
pub mod logging;
