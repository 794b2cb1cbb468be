//! `loopauth`: obtain, refresh and check OAuth tokens from a terminal.
//!
//! Logs go to stderr; results are printed to stdout as JSON so they can be
//! piped into other tools.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use loopauth_domain::{ClientCredentials, DesktopOAuthConfig, StatusKind, TokenSet};
use loopauth_infra::{config, FlowResult, OAuthDesktopClient};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loopauth")]
#[command(about = "Desktop OAuth2 client: loopback login, token refresh and validation")]
struct Cli {
    /// Config file (TOML or JSON). Standard locations are probed when omitted.
    #[arg(long, global = true, env = "LOOPAUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in through the browser and print the issued tokens
    Login {
        #[command(flatten)]
        client: ClientArgs,

        /// Space-separated scopes to request
        #[arg(long, default_value = "openid email")]
        scopes: String,

        /// Loopback port receiving the redirect
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Exchange a refresh token for a new access token
    Refresh {
        #[command(flatten)]
        client: ClientArgs,

        #[arg(long, env = "LOOPAUTH_REFRESH_TOKEN")]
        refresh_token: String,
    },
    /// Check an access token against the identity endpoint
    Validate {
        #[arg(long, env = "LOOPAUTH_ACCESS_TOKEN")]
        access_token: String,
    },
}

#[derive(Args)]
struct ClientArgs {
    #[arg(long, env = "LOOPAUTH_CLIENT_ID")]
    client_id: String,

    #[arg(long, env = "LOOPAUTH_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
}

impl ClientArgs {
    fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(self.client_id.clone(), self.client_secret.clone())
    }
}

#[derive(Serialize)]
struct Report<'a> {
    status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    tokens: Option<&'a TokenSet>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = load_config(cli.config)?;
    let client = OAuthDesktopClient::from_config(config).context("failed to build OAuth client")?;

    let status = match cli.command {
        Command::Login { client: args, scopes, port } => {
            let flow = client.manual_flow(args.credentials(), &scopes, port);
            info!(url = %flow.authorization_url(), "Waiting for the browser sign-in; open the URL manually if no browser appears");
            let outcome = match flow.run().await {
                FlowResult::Completed(result) => result,
                FlowResult::Superseded => Err(StatusKind::UnknownError),
            };
            client.shutdown().await.context("failed to stop the loopback listener")?;
            report_tokens(&outcome)?
        }
        Command::Refresh { client: args, refresh_token } => {
            let outcome = client.refresh_access_token(&args.credentials(), &refresh_token).await;
            report_tokens(&outcome)?
        }
        Command::Validate { access_token } => {
            let status = client.validate_access_token(&access_token).await;
            print_report(&Report { status, tokens: None })?;
            status
        }
    };

    if status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(status = %status, "Request failed");
        Ok(ExitCode::from(status.code()))
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<PathBuf>) -> Result<DesktopOAuthConfig> {
    let loaded = match path {
        Some(path) => config::load_from_file(Some(path))
            .and_then(config::apply_env_overrides)
            .and_then(|loaded| config::validate(&loaded).map(|()| loaded)),
        None => config::load(),
    };
    loaded.context("failed to load configuration")
}

fn report_tokens(outcome: &Result<TokenSet, StatusKind>) -> Result<StatusKind> {
    let report = match outcome {
        Ok(tokens) => Report { status: StatusKind::Success, tokens: Some(tokens) },
        Err(kind) => Report { status: *kind, tokens: None },
    };
    print_report(&report)?;
    Ok(report.status)
}

fn print_report(report: &Report<'_>) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report).context("failed to render result")?;
    println!("{rendered}");
    Ok(())
}
