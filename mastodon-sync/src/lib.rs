#![doc = "mastodon-sync: CLI for syncing a Mastodon timeline into a Diskuto log."]

//! All business logic (timeline client, rendering, cursor resolution, sync
//! orchestration) lives in the [`mastodon-sync-core`] crate. This crate is
//! strictly CLI glue: argument parsing, config file loading, the concrete
//! destination log client, interactive token acquisition and diagnostic
//! output.
//!
//! [`mastodon-sync-core`]: ../mastodon_sync_core/

pub mod cli;
pub mod debug;
pub mod load_config;
pub mod log_client;
pub mod token;
