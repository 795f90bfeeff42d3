#![doc = "mastodon-sync-core: core logic library for mastodon-sync."]

//! This crate contains the sync engine, content pipeline and collaborator
//! contracts for mastodon-sync. CLI glue (argument parsing, config file
//! loading, interactive token acquisition) lives in the binary crate.
//!
//! # Usage
//! Add this as a dependency for the timeline client, rendering, cursor
//! resolution and sync orchestration code.

pub mod config;
pub mod contract;
pub mod cursor;
pub mod mastodon;
pub mod record;
pub mod render;
pub mod synchronise;
