//! Arbitrary requests through the authenticated pipeline

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use log::info;
use reqwest::Method;
use std::path::PathBuf;

use super::output::print_json;
use crate::api::{ForceClient, RequestDescriptor};

#[derive(Args)]
pub struct RawCommand {
    /// Path relative to the instance URL, e.g. /services/data/v29.0/limits
    pub path: String,
    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    pub method: String,
    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
    /// Save the raw response body to a file instead of printing JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn raw_command(client: &ForceClient, args: RawCommand) -> Result<()> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;
    info!("Executing raw {} {}", method, args.path);

    let mut descriptor = RequestDescriptor::new(method, &args.path);
    if let Some(data) = &args.data {
        let body = serde_json::from_str(data).context("--data is not valid JSON")?;
        descriptor = descriptor.with_body(body);
    }

    super::ensure_session(client).await?;

    match &args.output {
        Some(path) => {
            let bytes = client.send_bytes(descriptor).await.context("Request failed")?;
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Saved {} bytes to {}",
                "✓".green(),
                bytes.len(),
                path.display().to_string().cyan()
            );
        }
        None => {
            let response = client.send(descriptor).await.context("Request failed")?;
            println!("{}", format!("HTTP {}", response.status).dimmed());
            print_json(&response.body)?;
        }
    }
    Ok(())
}
