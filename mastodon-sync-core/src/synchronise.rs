//! High-level pipeline: orchestrates fetch → filter → order → publish for
//! one sync pass.
//!
//! This module implements the top-level coordination logic for mirroring a
//! Mastodon timeline into the destination log:
//!   - Resolves the cursor (timestamp of the last previously-synced post)
//!     from the destination log itself
//!   - Consumes the lazy timeline stream newest-first, stopping at the
//!     cursor, skipping non-public statuses, and bounding the total count
//!   - Publishes the accumulated candidates oldest-first, rendering, signing
//!     and appending one at a time
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first fetch or publish error aborts the
//!   run. There is no retry loop; the oldest-first publish order means the
//!   next run's cursor resolution resumes exactly after the last record that
//!   was durably appended, with no gap and no duplicate.
//! - Holds no state across invocations. Each run owns its cursor and its
//!   candidate list exclusively; nothing is cached between runs.
//! - Invokes logging throughout for traceability (see tracing events)
//!
//! # Callable From
//! - Used by both the CLI crate and the integration tests
//! - Expects [`Timeline`] and [`LogClient`] implementations (real clients or
//!   mocks from `contract`)
//!
//! # Navigation
//! - Main entrypoint: [`run_sync`]
//! - Supporting type: [`SyncCandidate`]

use futures::TryStreamExt;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::UserId;
use crate::contract::{LogClient, LogError, Timeline};
use crate::cursor::resolve_cursor;
use crate::mastodon::{FetchError, StatusContext, Visibility};
use crate::record::{EncodeError, PostRecord, SigningKey};
use crate::render;

/// A fetched status under consideration during one sync pass. Created per
/// item, discarded after publish or rejection; never persisted.
#[derive(Debug, Clone)]
pub struct SyncCandidate {
    pub item: StatusContext,
    /// The status's `created_at`, resolved once to epoch milliseconds.
    pub timestamp_ms: i64,
}

impl SyncCandidate {
    pub fn new(item: StatusContext) -> Self {
        let timestamp_ms = item.status.created_at.timestamp_millis();
        Self { item, timestamp_ms }
    }

    /// Only public and unlisted statuses are mirrored.
    pub fn is_public(&self) -> bool {
        matches!(
            self.item.status.visibility,
            Visibility::Public | Visibility::Unlisted
        )
    }
}

/// Run one full sync pass and return the number of statuses published.
///
/// The timeline arrives newest-first, so consumption stops entirely at the
/// first status whose timestamp is at or before the cursor: everything past
/// that point is already synced or older. Non-public statuses are skipped
/// without stopping. Collection is additionally bounded by `max_statuses`.
///
/// Publishing is oldest-first. If the run is interrupted after k appends,
/// the cursor resolved by the next run sits exactly at the k-th status, so
/// the remainder is published next time, each status exactly once.
pub async fn run_sync<S, L>(
    source: &S,
    log: &L,
    user_id: &UserId,
    signing_key: &SigningKey,
    max_statuses: usize,
) -> Result<usize, SyncError>
where
    S: Timeline + ?Sized,
    L: LogClient + ?Sized,
{
    info!(user_id = %user_id, "[SYNC] Starting sync pass");

    let cursor = resolve_cursor(log, user_id)
        .await
        .map_err(SyncError::CursorLookup)?;
    info!(cursor = ?cursor, "[SYNC] Resolved cursor");

    let mut candidates: Vec<SyncCandidate> = Vec::new();
    {
        let mut timeline = source.stream_timeline();
        while let Some(item) = timeline.try_next().await? {
            let candidate = SyncCandidate::new(item);
            if let Some(last_published) = cursor {
                if candidate.timestamp_ms <= last_published {
                    debug!(
                        timestamp_ms = candidate.timestamp_ms,
                        "[SYNC] Reached already-synced statuses, stopping fetch"
                    );
                    break;
                }
            }
            if !candidate.is_public() {
                debug!(
                    status_id = %candidate.item.status.id,
                    "[SYNC] Skipping non-public status"
                );
                continue;
            }
            candidates.push(candidate);
            if candidates.len() >= max_statuses {
                debug!(max_statuses, "[SYNC] Reached max status count, stopping fetch");
                break;
            }
        }
    }
    info!(count = candidates.len(), "[SYNC] Found new statuses");

    // Publish oldest first so an interrupted run can resume. Equal
    // timestamps fall back to the source status id, which keeps the order
    // deterministic within a run.
    candidates.sort_by(|a, b| {
        a.timestamp_ms
            .cmp(&b.timestamp_ms)
            .then_with(|| a.item.status.id.cmp(&b.item.status.id))
    });

    let mut published = 0;
    for candidate in &candidates {
        let document = render::render(&candidate.item);
        let record = PostRecord {
            timestamp_ms_utc: candidate.timestamp_ms,
            body: document.body,
        };
        let (bytes, signature) = record.sign(signing_key)?;
        if let Err(e) = log.put_item(user_id, &signature, &bytes).await {
            error!(
                error = %e,
                status_id = %candidate.item.status.id,
                published,
                "[SYNC][ERROR] Publish failed, aborting run"
            );
            return Err(SyncError::Publish(e));
        }
        debug!(
            timestamp_ms = candidate.timestamp_ms,
            status_id = %candidate.item.status.id,
            "[SYNC] Published status"
        );
        published += 1;
    }

    info!(published, "[SYNC] Sync pass complete");
    Ok(published)
}

/// Anything that aborts a sync pass. All variants are fatal for the run and
/// propagate unmodified to the process boundary; recovery happens through
/// the next run's cursor resolution, not through handling here.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("resolving sync cursor from destination log")]
    CursorLookup(#[source] LogError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("publishing to destination log")]
    Publish(#[source] LogError),
}
