use super::commands::{
    AuthCommands, CommentCommand, NudgeCommand, QueryCommands, RawCommand, SoqlCommand,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shinchoku-cli")]
#[command(about = "Nudge coworkers for status updates through Salesforce Chatter")]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, inspect or clear the session
    Auth(AuthCommands),
    /// List records built from select/where/order-by options
    Query(QueryCommands),
    /// Run a hand-written SOQL statement
    Soql(SoqlCommand),
    /// Ask a coworker how it's going with a Chatter mention
    Nudge(NudgeCommand),
    /// Reply to a feed item
    Comment(CommentCommand),
    /// Send an arbitrary request through the authenticated pipeline
    Raw(RawCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::auth::AuthSubcommands;

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "shinchoku-cli",
            "query",
            "--from",
            "Contact",
            "--select",
            "Name,CreatedDate:date",
            "--where",
            "IsActive=true",
            "--where",
            "Name=%smith%",
            "--order-by",
            "Name:desc",
            "--page-size",
            "25",
            "--page",
            "3",
        ])
        .unwrap();

        let Commands::Query(query) = cli.command else {
            panic!("expected query command");
        };
        assert_eq!(query.from, "Contact");
        assert_eq!(query.select, vec!["Name", "CreatedDate:date"]);
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.page_size, Some(25));
        assert_eq!(query.page, 3);
    }

    #[test]
    fn test_parse_auth_token() {
        let cli = Cli::try_parse_from([
            "shinchoku-cli",
            "--config",
            "/tmp/shinchoku.toml",
            "auth",
            "token",
            "--access-token",
            "abc",
            "--instance-url",
            "https://x.example.com",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/shinchoku.toml")));
        let Commands::Auth(auth) = cli.command else {
            panic!("expected auth command");
        };
        assert!(matches!(
            auth.command,
            AuthSubcommands::Token {
                ref access_token,
                refresh_token: None,
                ..
            } if access_token == "abc"
        ));
    }

    #[test]
    fn test_nudge_requires_text() {
        assert!(Cli::try_parse_from(["shinchoku-cli", "nudge", "005xx"]).is_err());
    }
}
