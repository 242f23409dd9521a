//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Authenticated requests against the Reddit API
#[derive(Parser, Debug)]
#[command(name = "reddit-auth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration and show which strategy requests will use
    Check,

    /// Log in and print the session cookie and modhash
    Login {
        /// Print the session cookie (it is a credential)
        #[arg(long)]
        show_cookie: bool,
    },

    /// Send one authenticated request
    Request {
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Target URL
        url: String,
    },
}
