//! Cursor resolution: where did the previous sync run leave off?
//!
//! The cursor is never cached locally. It is recomputed from the destination
//! log at the start of every run, which trades one extra read for never
//! having a stale "last seen" value: guessing a cursor would either
//! re-publish duplicates or silently skip statuses.

use futures::TryStreamExt;
use tracing::debug;

use crate::config::UserId;
use crate::contract::{EntryKind, LogClient, LogError};

/// Timestamp (epoch ms) of the author's most recent post in the destination
/// log, or `None` if the author has no posts yet ("sync everything up to the
/// fetch limit"). Entries of other kinds are skipped; the log lists items
/// newest-first, so the first post found is the boundary.
pub async fn resolve_cursor<L>(log: &L, user_id: &UserId) -> Result<Option<i64>, LogError>
where
    L: LogClient + ?Sized,
{
    let mut entries = log.stream_user_items(user_id);
    while let Some(entry) = entries.try_next().await? {
        if entry.kind == EntryKind::Post {
            debug!(
                timestamp_ms = entry.timestamp_ms_utc,
                "Resolved cursor from destination log"
            );
            return Ok(Some(entry.timestamp_ms_utc));
        }
    }
    debug!("No prior posts in destination log; cursor is empty");
    Ok(None)
}
