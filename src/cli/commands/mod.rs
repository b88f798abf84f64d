pub mod auth;
pub mod chatter;
pub mod output;
pub mod query;
pub mod raw;

use anyhow::{bail, Context, Result};
use log::info;

use super::app::{Cli, Commands};
use crate::api::{AuthHint, AuthOutcome, ForceClient, Session};
use crate::config::ClientConfig;

pub use auth::{auth_command, AuthCommands};
pub use chatter::{comment_command, nudge_command, CommentCommand, NudgeCommand};
pub use query::{query_command, soql_command, QueryCommands, SoqlCommand};
pub use raw::{raw_command, RawCommand};

/// Load the configuration, build the one client and dispatch
pub async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let client = ForceClient::connect(config)
        .await
        .context("Failed to set up the client")?;

    info!("Client ready, running command");

    match cli.command {
        Commands::Auth(args) => auth_command(&client, args).await,
        Commands::Query(args) => query_command(&client, args).await,
        Commands::Soql(args) => soql_command(&client, args).await,
        Commands::Nudge(args) => nudge_command(&client, args).await,
        Commands::Comment(args) => comment_command(&client, args).await,
        Commands::Raw(args) => raw_command(&client, args).await,
    }
}

/// Session for commands that talk to the API
///
/// Uses the host-supplied session id when one is configured, otherwise the
/// persisted session from an earlier `auth` command.
pub async fn ensure_session(client: &ForceClient) -> Result<Session> {
    if client.session().is_authenticated().await {
        return Ok(client.session().get().await);
    }

    let config = client.config();
    let hint = if config.session_id.is_some() {
        AuthHint::Embedded
    } else {
        AuthHint::Redirect {
            redirect_uri: config.redirect_uri.clone().unwrap_or_default(),
            callback_url: None,
        }
    };

    match client.auth().begin(hint).await {
        Ok(AuthOutcome::Authenticated(session)) => Ok(session),
        Ok(AuthOutcome::Redirect(url)) if config.redirect_uri.is_some() => bail!(
            "Not signed in. Open {} and pass the URL you are sent back to \
             to 'shinchoku-cli auth callback'",
            url
        ),
        Ok(AuthOutcome::Redirect(_)) => bail!(
            "Not signed in. Run 'shinchoku-cli auth token' \
             or configure a redirect URI for 'auth login'"
        ),
        Err(e) => Err(e).context("Authentication failed"),
    }
}
