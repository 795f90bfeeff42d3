//! # contract: collaborator interfaces for the sync engine
//!
//! This module defines the two traits the sync engine orchestrates over and
//! the plain data types they exchange.
//!
//! ## Interface & Extensibility
//! - [`Timeline`] is the read side: a lazily paginated, reverse-chronological
//!   stream of statuses. Implemented by the real Mastodon client and by mocks.
//! - [`LogClient`] is the write side: the append-only destination log. The
//!   concrete HTTP implementation lives in the binary crate; the core only
//!   ever sees this trait.
//! - All network-facing methods return structured errors; the engine treats
//!   every failure as fatal for the current run (resumption happens through
//!   cursor resolution on the next run, not through retries).
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall` so the integration tests can
//! script timelines and destination logs deterministically, without any
//! network access. Mocks are exported under the `test-export-mocks` feature
//! (on by default), the same arrangement the tests in `tests/` rely on.

use async_trait::async_trait;
use ed25519_dalek::Signature;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::UserId;
use crate::mastodon::{FetchError, StatusContext};

/// The source timeline, seen as a forward-only lazy sequence of statuses in
/// reverse chronological order. Pagination is hidden behind the stream; the
/// consumer owns the stopping condition and may drop the stream early
/// without exhausting the remote history.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Timeline: Send + Sync {
    fn stream_timeline(&self) -> BoxStream<'static, Result<StatusContext, FetchError>>;
}

/// One entry of the destination log, as seen by cursor resolution. The log
/// stores more per entry (signatures, bodies); the core only needs the kind
/// and the timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: EntryKind,
    pub timestamp_ms_utc: i64,
}

/// Entry kinds the destination log may contain. Only [`EntryKind::Post`]
/// participates in cursor resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Post,
    Profile,
    Comment,
    #[serde(other)]
    Other,
}

/// The append-only destination log, keyed by author identity.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait LogClient: Send + Sync {
    /// The author's existing entries, newest-first, as a lazy stream.
    fn stream_user_items(&self, user_id: &UserId)
        -> BoxStream<'static, Result<LogEntry, LogError>>;

    /// Append one signed, serialized record to the author's log.
    async fn put_item(
        &self,
        user_id: &UserId,
        signature: &Signature,
        item_bytes: &[u8],
    ) -> Result<(), LogError>;
}

/// A destination-log read or write failure. Fatal for the current run.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("destination log request failed ({context}): HTTP {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    #[error("destination log request failed ({context})")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding destination log response ({context})")]
    Decode {
        context: String,
        #[source]
        source: reqwest::Error,
    },
}
