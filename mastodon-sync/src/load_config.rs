//! `load_config`: parses and validates the TOML config file into the core's
//! resolved [`Config`].
//!
//! This is the only place where untrusted TOML is parsed and mapped to rich,
//! strongly-typed structs. Field-level validation happens here — non-empty
//! checks, base58 key decoding, and the identity/signing-key match — so the
//! sync engine can assume its inputs are well-formed.
//!
//! Accepted schema:
//!
//! ```toml
//! [mastodon]
//! url = "https://mastodon.social"
//! token = "..."
//!
//! [diskuto]
//! api_url = "https://blog.example.com"
//!
//! [diskuto.write]
//! user_id = "..."   # base58 ed25519 public key
//! password = "..."  # base58 ed25519 signing key
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use mastodon_sync_core::config::{
    parse_signing_key, Config, ConfigError, LogConfig, MastodonConfig, UserId,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    mastodon: RawMastodon,
    diskuto: RawDiskuto,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMastodon {
    url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDiskuto {
    api_url: String,
    write: RawWrite,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWrite {
    user_id: String,
    password: String,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    info!(config_path = ?path, "Loading configuration");

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path:?}"))?;
    let raw: RawConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {path:?} as TOML"))?;

    require_non_empty("mastodon.url", &raw.mastodon.url)?;
    if raw.mastodon.token.trim().is_empty() {
        bail!("mastodon.token is empty; run `mastodon-sync get-token` to obtain one");
    }
    require_non_empty("diskuto.api_url", &raw.diskuto.api_url)?;
    require_non_empty("diskuto.write.user_id", &raw.diskuto.write.user_id)?;
    require_non_empty("diskuto.write.password", &raw.diskuto.write.password)?;

    let user_id = UserId::from_base58(raw.diskuto.write.user_id.trim())
        .context("in diskuto.write.user_id")?;
    let signing_key = parse_signing_key(raw.diskuto.write.password.trim())
        .context("in diskuto.write.password")?;
    let log = LogConfig::new(raw.diskuto.api_url, user_id, signing_key)?;

    Ok(Config {
        mastodon: MastodonConfig {
            url: raw.mastodon.url,
            token: raw.mastodon.token,
        },
        log,
    })
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { field });
    }
    Ok(())
}
