//! CLI module
//!
//! Command-line interface for the authenticating pipeline.
//!
//! # Commands
//!
//! - `check` - Validate the configuration and show the strategy in use
//! - `login` - Perform the login round-trip and print the session material
//! - `request` - Send one authenticated request and print the response

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
