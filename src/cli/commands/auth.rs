//! Authentication commands

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use is_terminal::IsTerminal;
use log::{info, warn};

use crate::api::logging::redact;
use crate::api::{AuthHint, AuthOutcome, Credentials, ForceClient, Session};

#[derive(Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommands,
}

#[derive(Subcommand)]
pub enum AuthSubcommands {
    /// Print the authorize URL to open in a browser
    Login {
        /// Redirect target registered for the connected app
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Finish the browser sign-in with the URL you were redirected to
    Callback {
        /// Full callback URL, including its #access_token fragment
        url: String,
    },
    /// Sign in with a token obtained elsewhere
    Token {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: Option<String>,
        #[arg(long)]
        instance_url: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Show the current session
    Status,
    /// Forget the session and its stored copy
    Logout {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn auth_command(client: &ForceClient, args: AuthCommands) -> Result<()> {
    match args.command {
        AuthSubcommands::Login { redirect_uri } => login(client, redirect_uri),
        AuthSubcommands::Callback { url } => callback(client, url).await,
        AuthSubcommands::Token {
            access_token,
            refresh_token,
            instance_url,
            user_id,
        } => {
            let credentials = Credentials {
                access_token,
                instance_url,
                refresh_token,
                user_id,
            };
            sign_in(client, AuthHint::Credentials(credentials)).await
        }
        AuthSubcommands::Status => status(client).await,
        AuthSubcommands::Logout { force } => logout(client, force).await,
    }
}

fn login(client: &ForceClient, redirect_uri: Option<String>) -> Result<()> {
    let Some(redirect_uri) = redirect_uri.or_else(|| client.config().redirect_uri.clone()) else {
        bail!("No redirect URI: pass --redirect-uri or set redirect_uri in the config");
    };

    println!("Open this URL in a browser to sign in:");
    println!();
    println!("  {}", client.auth().authorize_url(&redirect_uri).cyan());
    println!();
    println!(
        "Then run {} with the URL the browser lands on.",
        "shinchoku-cli auth callback <url>".bold()
    );
    Ok(())
}

async fn callback(client: &ForceClient, url: String) -> Result<()> {
    let hint = AuthHint::Redirect {
        redirect_uri: client.config().redirect_uri.clone().unwrap_or_default(),
        callback_url: Some(url),
    };
    sign_in(client, hint).await
}

async fn sign_in(client: &ForceClient, hint: AuthHint) -> Result<()> {
    info!("Executing auth sign-in");

    let session = match client.auth().begin(hint).await.context("Sign-in failed")? {
        AuthOutcome::Authenticated(session) => session,
        AuthOutcome::Redirect(_) => bail!("The callback URL carries no access token"),
    };

    println!("{} Signed in to {}", "✓".green(), session.instance_url.as_deref().unwrap_or("-"));
    greet(client).await;
    Ok(())
}

async fn status(client: &ForceClient) -> Result<()> {
    println!("shinchoku-cli Session Status");
    println!("============================");

    let session = match super::ensure_session(client).await {
        Ok(session) => session,
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            return Ok(());
        }
    };

    print_session(&session);
    greet(client).await;
    Ok(())
}

async fn logout(client: &ForceClient, force: bool) -> Result<()> {
    if !force && std::io::stdin().is_terminal() {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Forget the current session?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    client.logout().await.context("Failed to clear the session")?;
    println!("{} Signed out", "✓".green());
    Ok(())
}

fn print_session(session: &Session) {
    println!("  Instance:      {}", session.instance_url.as_deref().unwrap_or("-"));
    println!("  API version:   {}", session.api_version);
    println!("  User id:       {}", session.user_id.as_deref().unwrap_or("-"));
    println!(
        "  Access token:  {}",
        session.access_token.as_deref().map(redact).unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  Refresh token: {}",
        session.refresh_token.as_deref().map(redact).unwrap_or_else(|| "-".to_string())
    );
    println!("  Persisted:     {}", if session.persist { "yes" } else { "no" });
}

/// Best-effort current-user lookup; failures only warn
async fn greet(client: &ForceClient) {
    if client.session().get().await.user_id.is_none() {
        return;
    }
    match client.load_current_user().await {
        Ok(user) => println!(
            "  Signed in as {}",
            user.name.as_deref().unwrap_or(user.id.as_str()).bold()
        ),
        Err(e) => {
            warn!("Current user lookup failed: {}", e);
            println!("  {} {}", "Could not look up the current user:".yellow(), e);
        }
    }
}
