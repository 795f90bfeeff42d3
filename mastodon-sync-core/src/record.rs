//! Destination log record format: canonical bytes and ed25519 signatures.
//!
//! Serialization uses MessagePack with named fields, which is deterministic
//! for a fixed struct definition. Both serialization and signing are pure;
//! the destination log verifies the signature against the author's public
//! key before accepting a record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// One post record, as committed to the destination log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    /// The source status's own timestamp. Mastodon reports UTC times, so no
    /// offset handling is needed.
    pub timestamp_ms_utc: i64,
    /// Rendered Markdown body.
    pub body: String,
}

impl PostRecord {
    /// Canonical byte representation. Encoding the same record twice yields
    /// identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Serialize and sign in one step, returning the bytes that were signed
    /// together with their signature.
    pub fn sign(&self, key: &SigningKey) -> Result<(Vec<u8>, Signature), EncodeError> {
        let bytes = self.to_bytes()?;
        let signature = key.sign(&bytes);
        Ok((bytes, signature))
    }
}

/// Base58 wire encoding of a signature, used in destination log URLs.
pub fn encode_signature(signature: &Signature) -> String {
    bs58::encode(signature.to_bytes()).into_string()
}

#[derive(Debug, Error)]
#[error("encoding post record")]
pub struct EncodeError(#[from] rmp_serde::encode::Error);

#[derive(Debug, Error)]
#[error("decoding post record")]
pub struct DecodeError(#[from] rmp_serde::decode::Error);
