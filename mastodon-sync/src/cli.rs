//! CLI interface for mastodon-sync: command parsing, argument validation and
//! user-visible entrypoints.
//!
//! Subcommands:
//! - `run` — one full sync pass: read new statuses from Mastodon, publish
//!   them to the destination log.
//! - `test` — fetch and render statuses without publishing anything.
//! - `test-status` — fetch and render a single status by ID or URL.
//! - `get-token` — interactively obtain a Mastodon API token.
//!
//! The async [`run`] entrypoint exists separately from `main` so integration
//! tests can invoke the CLI programmatically.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use tracing::info;

use mastodon_sync_core::contract::Timeline;
use mastodon_sync_core::mastodon::Client;
use mastodon_sync_core::synchronise::{run_sync, SyncCandidate};

use crate::debug::print_status;
use crate::load_config::load_config;
use crate::log_client::DiskutoClient;
use crate::token::get_token;

/// CLI for mastodon-sync: mirror a Mastodon home timeline into a Diskuto log.
#[derive(Parser)]
#[clap(
    name = "mastodon-sync",
    version,
    about = "One-way, resumable sync from a Mastodon timeline into a signed Diskuto content log"
)]
pub struct Cli {
    /// Config file to use
    #[clap(short, long, global = true, default_value = "./mastodon-sync.toml")]
    pub config: PathBuf,

    /// Max # statuses to read from Mastodon in one pass
    #[clap(long, global = true, default_value_t = 500)]
    pub max_statuses: usize,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read new statuses from Mastodon and publish them to the Diskuto log
    Run,
    /// Fetch and render statuses without writing any updates
    Test {
        /// How many statuses to fetch and render
        count: usize,
    },
    /// Fetch and render one particular status, by ID or by URL
    TestStatus {
        /// A status ID, or a status URL ending in one
        id: String,
    },
    /// Obtain an auth token from your Mastodon instance
    GetToken,
}

/// Async CLI entrypoint, shared by `main()` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run => {
            let config = load_config(&cli.config)?;
            info!(command = "run", max_statuses = cli.max_statuses, "Starting sync");
            let source = Client::new(&config.mastodon.url, &config.mastodon.token);
            let log = DiskutoClient::new(&config.log.api_url);
            let published = run_sync(
                &source,
                &log,
                &config.log.user_id,
                &config.log.signing_key,
                cli.max_statuses,
            )
            .await?;
            println!("Published {published} new statuses");
            Ok(())
        }
        Commands::Test { count } => {
            let config = load_config(&cli.config)?;
            let client = Client::new(&config.mastodon.url, &config.mastodon.token);
            client.verify_credentials().await?;

            let mut shown = 0;
            let mut timeline = client.stream_timeline();
            while let Some(item) = timeline.try_next().await? {
                let candidate = SyncCandidate::new(item);
                if !candidate.is_public() {
                    continue;
                }
                print_status(&candidate.item);
                shown += 1;
                if shown >= count {
                    break;
                }
            }
            println!("Got {shown} statuses");
            Ok(())
        }
        Commands::TestStatus { id } => {
            let config = load_config(&cli.config)?;
            let client = Client::new(&config.mastodon.url, &config.mastodon.token);
            let status_id = parse_status_reference(&id)?;
            let item = client.fetch_status(status_id).await?;
            print_status(&item);
            Ok(())
        }
        Commands::GetToken => get_token().await,
    }
}

/// Accept either a bare numeric status ID or a status URL whose final path
/// segment is one.
fn parse_status_reference(input: &str) -> Result<&str> {
    let tail = input
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(input);
    if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
        Ok(tail)
    } else {
        bail!("invalid status reference {input:?}: expected a status ID or a URL ending in one");
    }
}
