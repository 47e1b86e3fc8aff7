//! agentgate-token
//!
//! Operator tool for the delegated OAuth flow: mint a refresh token through
//! the browser, trade it for access tokens, and check that the warehouse
//! accepts them.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dialoguer::Input;
use tracing::{debug, info};

use agentgate_core::config::load_config;
use agentgate_core::oauth::{CallbackParams, IdpClient, TokenResponse};
use agentgate_core::tracing_init::init_tracing;
use agentgate_core::warehouse::StatementClient;

#[derive(Debug, Parser)]
#[command(name = "agentgate-token", version, about)]
struct Cli {
    /// JSON config file (same format as the server's).
    #[arg(long, global = true, env = "AGENTGATE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign in through the browser and print the refresh token
    Authorize,
    /// Exchange a refresh token for a fresh access token
    Refresh {
        #[arg(long, env = "REFRESH_TOKEN")]
        refresh_token: String,
    },
    /// Open a warehouse session with an access token and print its context
    Validate {
        #[arg(long, env = "ACCESS_TOKEN")]
        access_token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("agentgate_cli=info,agentgate_core=warn", false);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Authorize => {
            let idp = IdpClient::new(&config.oauth)?;
            authorize(&idp).await
        }
        Commands::Refresh { refresh_token } => {
            let idp = IdpClient::new(&config.oauth)?;
            let tokens = idp
                .refresh(&refresh_token)
                .await
                .context("token refresh failed")?;
            print_tokens(&tokens)
        }
        Commands::Validate { access_token } => {
            let timeout = Duration::from_secs(config.server.upstream_timeout_secs);
            let statements = StatementClient::new(&config.warehouse, timeout)?;
            info!(host = %config.warehouse.host(), "Checking token against the warehouse");
            let context = statements
                .session_context(&access_token)
                .await
                .context("warehouse rejected the token")?;
            print_json(&serde_json::to_value(&context)?)
        }
    }
}

async fn authorize(idp: &IdpClient) -> Result<()> {
    let request = idp.authorization_url()?;
    show_login_instructions(&request.url);

    let pasted: String = Input::new()
        .with_prompt("Paste the full redirect URL")
        .interact_text()?;
    let params = CallbackParams::from_redirect_url(pasted.trim())
        .context("that does not look like a URL")?;

    if let Some(error) = params.error {
        bail!(
            "authorization failed: {error} {}",
            params.error_description.unwrap_or_default()
        );
    }
    if params.state.as_deref() != Some(request.state.as_str()) {
        bail!("state mismatch: the URL belongs to a different login attempt");
    }
    let Some(code) = params.code else {
        bail!("no `code` parameter in the pasted URL");
    };
    debug!("Exchanging authorization code");

    let tokens = idp
        .exchange_code(&code, &request.code_verifier)
        .await
        .context("code exchange failed")?;
    if tokens.refresh_token.is_none() {
        bail!("the identity provider issued no refresh token; request the offline_access scope");
    }
    print_tokens(&tokens)
}

#[allow(clippy::print_stdout)]
fn show_login_instructions(url: &str) {
    println!("Open this URL in a browser and sign in:");
    println!();
    println!("  {url}");
    println!();
    println!("The browser then lands on the redirect URI. The page may fail to load;");
    println!("copy the whole address from the address bar.");
    println!();
}

fn print_tokens(tokens: &TokenResponse) -> Result<()> {
    print_json(&serde_json::json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "expires_in": tokens.expires_in,
        "scope": tokens.scope,
    }))
}

#[allow(clippy::print_stdout)]
fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
