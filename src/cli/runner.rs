//! CLI runner - executes commands

use crate::auth::Strategy;
use crate::cli::commands::{Cli, Commands};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::pipeline::RequestEnvelope;
use reqwest::Method;
use std::str::FromStr;

/// Page requested by `login` to drive the login flow
const LOGIN_PROBE_URL: &str = "https://www.reddit.com/api/me.json";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Login { show_cookie } => self.login(*show_cookie).await,
            Commands::Request {
                method,
                headers,
                url,
            } => self.request(method, headers, url).await,
        }
    }

    /// Load settings from the `--config` file
    fn load_settings(&self) -> Result<Settings> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        Settings::load(path)
    }

    async fn check(&self) -> Result<()> {
        let settings = self.load_settings()?;
        let auth = settings.build_pipeline()?;
        let strategy = auth.strategy().await;

        println!("Configuration OK");
        println!("Strategy: {}", describe(strategy));
        Ok(())
    }

    async fn login(&self, show_cookie: bool) -> Result<()> {
        let settings = self.load_settings()?;
        let auth = settings.build_pipeline()?;

        if auth.strategy().await != Strategy::Login {
            return Err(Error::config(
                "login needs user and password without a configured cookie or access token",
            ));
        }

        let mut probe = RequestEnvelope::get(LOGIN_PROBE_URL)?;
        auth.authenticate(&mut probe).await?;

        let session = auth.session().await;
        println!("Logged in");
        println!(
            "Modhash: {}",
            session.modhash.as_deref().unwrap_or("(none returned)")
        );
        if show_cookie {
            println!("Cookie: {}", session.cookie.as_deref().unwrap_or_default());
        }
        Ok(())
    }

    async fn request(&self, method: &str, headers: &[String], url: &str) -> Result<()> {
        let settings = self.load_settings()?;
        let auth = settings.build_pipeline()?;
        let request = build_request(method, headers, url)?;

        let response = auth.intercept(request).await?;
        println!("HTTP {}", response.status);
        println!("{}", response.text());
        Ok(())
    }
}

/// Build a request from command-line pieces
fn build_request(method: &str, headers: &[String], url: &str) -> Result<RequestEnvelope> {
    let method = Method::from_str(&method.to_uppercase())
        .map_err(|e| Error::config(format!("Invalid HTTP method '{method}': {e}")))?;

    let mut request = RequestEnvelope::parse(method, url)?;
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        request = request.header(name, value)?;
    }
    Ok(request)
}

/// Split `Name: value`
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::config(format!("Header must look like 'Name: value', got '{raw}'")))?;
    Ok((name.trim(), value.trim()))
}

fn describe(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Token => "token (bearer token against oauth.reddit.com)",
        Strategy::Cookie => "cookie (configured session cookie)",
        Strategy::Login => "login (user and password exchanged for a session on first request)",
    }
}
