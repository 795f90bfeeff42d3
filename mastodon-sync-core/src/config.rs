//! Resolved configuration consumed by the core.
//!
//! The CLI crate owns parsing the TOML config file; what arrives here is
//! already strongly typed. Key material is validated on construction: a
//! [`LogConfig`] can only be built from a signing key that derives the
//! configured [`UserId`], so downstream code never has to re-check the pair.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use thiserror::Error;

/// Everything a sync pass needs, already validated.
#[derive(Debug, Clone)]
pub struct Config {
    pub mastodon: MastodonConfig,
    pub log: LogConfig,
}

/// Connection details for the Mastodon instance we read from.
#[derive(Debug, Clone)]
pub struct MastodonConfig {
    /// Instance base URL, e.g. `https://mastodon.social`.
    pub url: String,
    /// Bearer token with read access to the home timeline.
    pub token: String,
}

/// Connection and identity details for the destination log we write to.
#[derive(Clone)]
pub struct LogConfig {
    pub api_url: String,
    pub user_id: UserId,
    pub signing_key: SigningKey,
}

impl fmt::Debug for LogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogConfig")
            .field("api_url", &self.api_url)
            .field("user_id", &self.user_id)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

impl LogConfig {
    /// Build a validated destination config. Fails if the signing key does
    /// not derive `user_id`, since publishing with a mismatched pair would
    /// only be rejected by the server after rendering and signing.
    pub fn new(
        api_url: String,
        user_id: UserId,
        signing_key: SigningKey,
    ) -> Result<Self, ConfigError> {
        if signing_key.verifying_key() != user_id.0 {
            return Err(ConfigError::KeyMismatch {
                user_id: user_id.to_string(),
            });
        }
        Ok(Self {
            api_url,
            user_id,
            signing_key,
        })
    }
}

/// A destination-log author identity: a base58-encoded ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(VerifyingKey);

impl UserId {
    pub fn from_base58(s: &str) -> Result<Self, ConfigError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| ConfigError::InvalidUserId {
                reason: e.to_string(),
            })?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| ConfigError::InvalidUserId {
                reason: format!("expected 32 bytes, got {}", v.len()),
            })?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|e| ConfigError::InvalidUserId {
            reason: e.to_string(),
        })?;
        Ok(Self(key))
    }

    pub fn from_verifying_key(key: VerifyingKey) -> Self {
        Self(key)
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0.as_bytes()).into_string())
    }
}

/// Parse a base58-encoded ed25519 signing key (the config's `password`).
pub fn parse_signing_key(s: &str) -> Result<SigningKey, ConfigError> {
    let bytes = bs58::decode(s)
        .into_vec()
        .map_err(|e| ConfigError::InvalidSigningKey {
            reason: e.to_string(),
        })?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| ConfigError::InvalidSigningKey {
            reason: format!("expected 32 bytes, got {}", v.len()),
        })?;
    Ok(SigningKey::from_bytes(&bytes))
}

/// Malformed or inconsistent configuration. Fatal before any sync attempt.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid user ID: {reason}")]
    InvalidUserId { reason: String },

    #[error("invalid signing key: {reason}")]
    InvalidSigningKey { reason: String },

    #[error("signing key does not derive the configured user ID {user_id}")]
    KeyMismatch { user_id: String },
}
