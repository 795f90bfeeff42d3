//! Concrete Diskuto log client: bridges the core's [`LogClient`] contract to
//! the remote append-only log API.
//!
//! Reads are a paginated per-user item listing exposed as a lazy stream;
//! writes are one `PUT` per signed record. All transport and status-code
//! handling is encapsulated here; the core only sees [`LogError`].

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use mastodon_sync_core::config::UserId;
use mastodon_sync_core::contract::{EntryKind, LogClient, LogEntry, LogError};
use mastodon_sync_core::record::{encode_signature, Signature};

/// HTTP client for one Diskuto API endpoint.
#[derive(Clone)]
pub struct DiskutoClient {
    http: reqwest::Client,
    api_url: String,
}

/// One page of a user's item listing.
#[derive(Debug, Deserialize)]
struct ItemListPage {
    items: Vec<ItemSummary>,
    #[serde(default)]
    no_more_items: bool,
}

#[derive(Debug, Deserialize)]
struct ItemSummary {
    item_type: EntryKind,
    timestamp_ms_utc: i64,
}

impl DiskutoClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one page of the user's items, newest-first, continuing before
    /// `before` (epoch ms) when set.
    async fn fetch_items_page(
        &self,
        user_id: &UserId,
        before: Option<i64>,
    ) -> Result<ItemListPage, LogError> {
        let path = match before {
            Some(ts) => format!("/u/{user_id}/items?before={ts}"),
            None => format!("/u/{user_id}/items"),
        };
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LogError::Transport {
                context: path.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to decode response body>".to_string());
            return Err(LogError::Status {
                context: path,
                status: status.as_u16(),
                body,
            });
        }
        let page: ItemListPage = response.json().await.map_err(|e| LogError::Decode {
            context: path.clone(),
            source: e,
        })?;
        debug!(count = page.items.len(), before = ?before, "Fetched log item page");
        Ok(page)
    }
}

struct ListState {
    client: DiskutoClient,
    user_id: UserId,
    before: Option<i64>,
    buffer: VecDeque<LogEntry>,
    done: bool,
}

#[async_trait]
impl LogClient for DiskutoClient {
    fn stream_user_items(
        &self,
        user_id: &UserId,
    ) -> BoxStream<'static, Result<LogEntry, LogError>> {
        let state = ListState {
            client: self.clone(),
            user_id: *user_id,
            before: None,
            buffer: VecDeque::new(),
            done: false,
        };
        stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(entry) = state.buffer.pop_front() {
                    return Ok(Some((entry, state)));
                }
                if state.done {
                    return Ok(None);
                }
                let page = state
                    .client
                    .fetch_items_page(&state.user_id, state.before)
                    .await?;
                if page.items.is_empty() || page.no_more_items {
                    state.done = true;
                }
                if let Some(last) = page.items.last() {
                    state.before = Some(last.timestamp_ms_utc);
                }
                state.buffer.extend(page.items.into_iter().map(|item| LogEntry {
                    kind: item.item_type,
                    timestamp_ms_utc: item.timestamp_ms_utc,
                }));
            }
        })
        .boxed()
    }

    async fn put_item(
        &self,
        user_id: &UserId,
        signature: &Signature,
        item_bytes: &[u8],
    ) -> Result<(), LogError> {
        let path = format!("/u/{user_id}/i/{}", encode_signature(signature));
        let url = format!("{}{}", self.api_url, path);
        info!(user_id = %user_id, bytes = item_bytes.len(), "Appending record to log");

        let response = self
            .http
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(item_bytes.to_vec())
            .send()
            .await
            .map_err(|e| LogError::Transport {
                context: path.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to decode response body>".to_string());
            return Err(LogError::Status {
                context: path,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
