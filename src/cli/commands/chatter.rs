//! Chatter nudges and replies

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use log::info;
use serde_json::Value;

use crate::api::ForceClient;

#[derive(Args)]
pub struct NudgeCommand {
    /// User id of the coworker to mention
    pub user_id: String,
    /// Message posted after the mention
    pub text: String,
}

#[derive(Args)]
pub struct CommentCommand {
    /// Feed item to reply to
    pub feed_item_id: String,
    /// Reply text
    pub text: String,
}

pub async fn nudge_command(client: &ForceClient, args: NudgeCommand) -> Result<()> {
    info!("Executing nudge command for {}", args.user_id);
    super::ensure_session(client).await?;

    let text = format!(" {}", args.text.trim_start());
    let item = client
        .post_feed_with_mention(&args.user_id, &text)
        .await
        .context("Posting the feed item failed")?;

    println!("{} Nudged {} (feed item {})", "✓".green(), args.user_id.bold(), item_id(&item));
    Ok(())
}

pub async fn comment_command(client: &ForceClient, args: CommentCommand) -> Result<()> {
    info!("Executing comment command on {}", args.feed_item_id);
    super::ensure_session(client).await?;

    let comment = client
        .post_comment(&args.feed_item_id, &args.text)
        .await
        .context("Posting the comment failed")?;

    println!(
        "{} Commented on {} (comment {})",
        "✓".green(),
        args.feed_item_id.bold(),
        item_id(&comment)
    );
    Ok(())
}

fn item_id(item: &Value) -> &str {
    item.get("id").and_then(|id| id.as_str()).unwrap_or("-")
}
