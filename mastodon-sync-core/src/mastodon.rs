//! Mastodon API client: paginated read access to the home timeline.
//!
//! Exposes the timeline as a lazy, reverse-chronological stream (see the
//! [`Timeline`] contract) plus a point lookup used only by the diagnostic
//! path. The wire types here are the subset of the Mastodon status entity
//! that the pipeline consumes; unknown response fields are ignored.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::contract::Timeline;

/// The account that authored a status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// "foo" for users local to the serving instance, "foo@remote.host"
    /// otherwise.
    pub acct: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// The account's own profile URL, on its origin server.
    pub url: String,
}

/// One media attachment of a status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// image/video/audio, possibly others.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
}

/// A subset of <https://docs.joinmastodon.org/entities/Status/>.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    /// Only meaningful for pagination with `max_id`.
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub account: Account,
    /// A link to the status's HTML representation.
    ///
    /// ... so say the docs. When the status is a boost, this is instead a
    /// `.../statuses/{id}/activity` URL, which is not an HTML page.
    #[serde(default)]
    pub url: Option<String>,
    /// The status URI used for federation.
    pub uri: String,
    /// Rich-text body, as HTML.
    pub content: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub media_attachments: Vec<Attachment>,
    /// Set when this status is a boost of another status.
    #[serde(default)]
    pub reblog: Option<Box<Status>>,
}

impl Status {
    /// The URL of this status on its origin server.
    pub fn origin_url(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.uri)
    }
}

/// A status paired with the base URL of the connection that fetched it.
///
/// Mastodon's JSON does not include an instance-qualified URL for a status,
/// so the instance-local link has to be reconstructed from the URL the
/// request was made to. That base URL is a property of the connection, not
/// of the status, so it travels side-band here instead of living on
/// [`Status`].
#[derive(Debug, Clone)]
pub struct StatusContext {
    pub status: Status,
    pub base_url: Arc<str>,
}

impl StatusContext {
    /// Instance-local URL for `status` (the outer status or its reblog).
    ///
    /// Preferred over `status.url` for links: the feed's main reader is
    /// likely logged in on the syncing instance, and other readers get
    /// forwarded to the origin anyway.
    pub fn local_url(&self, status: &Status) -> String {
        format!("{}/{}", self.local_account_url(&status.account), status.id)
    }

    /// Instance-local URL for an account's page.
    pub fn local_account_url(&self, account: &Account) -> String {
        format!("{}/@{}", self.base_url, account.acct)
    }
}

/// A failed or undecodable response from the source instance. Fatal for the
/// current run; never retried here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetching {context}: HTTP {status}: {body}")]
    Status {
        context: String,
        status: u16,
        body: String,
    },

    #[error("fetching {context}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding response from {context}")]
    Decode {
        context: String,
        #[source]
        source: reqwest::Error,
    },
}

/// A client for querying one Mastodon instance with a bearer token.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Arc<str>,
    token: String,
}

impl Client {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Assert the configured token is valid. Errors otherwise.
    pub async fn verify_credentials(&self) -> Result<(), FetchError> {
        self.checked_get("/api/v1/apps/verify_credentials").await?;
        Ok(())
    }

    /// Fetch one page of the home timeline, newest-first. `before_id` is the
    /// last status id of the previous page; `None` starts at the newest
    /// status. Page size is whatever the instance returns.
    pub async fn fetch_page(&self, before_id: Option<&str>) -> Result<Vec<Status>, FetchError> {
        let path = match before_id {
            Some(id) => format!("/api/v1/timelines/home?max_id={id}"),
            None => "/api/v1/timelines/home".to_string(),
        };
        let page: Vec<Status> = self.get_json(&path).await?;
        debug!(count = page.len(), before_id = ?before_id, "Fetched timeline page");
        Ok(page)
    }

    /// Point lookup of a single status. Diagnostic path only; the sync path
    /// always goes through the timeline stream.
    pub async fn fetch_status(&self, id: &str) -> Result<StatusContext, FetchError> {
        let status = self.get_json(&format!("/api/v1/statuses/{id}")).await?;
        Ok(StatusContext {
            status,
            base_url: self.base_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let response = self.checked_get(path).await?;
        response.json().await.map_err(|e| FetchError::Decode {
            context: path.to_string(),
            source: e,
        })
    }

    async fn checked_get(&self, path: &str) -> Result<reqwest::Response, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                context: path.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to decode response body>".to_string());
            error!(status = %status, url = %url, "Mastodon API returned an error");
            return Err(FetchError::Status {
                context: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

struct TimelineState {
    client: Client,
    before_id: Option<String>,
    buffer: VecDeque<Status>,
    done: bool,
}

impl Timeline for Client {
    /// Lazily paginate through the home timeline. One page is fetched at a
    /// time, only when the buffered statuses are exhausted; dropping the
    /// stream early stops fetching. Terminates when the instance returns an
    /// empty page.
    fn stream_timeline(&self) -> BoxStream<'static, Result<StatusContext, FetchError>> {
        let state = TimelineState {
            client: self.clone(),
            before_id: None,
            buffer: VecDeque::new(),
            done: false,
        };
        stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(status) = state.buffer.pop_front() {
                    let item = StatusContext {
                        status,
                        base_url: state.client.base_url.clone(),
                    };
                    return Ok(Some((item, state)));
                }
                if state.done {
                    return Ok(None);
                }
                let page = state.client.fetch_page(state.before_id.as_deref()).await?;
                match page.last() {
                    Some(last) => state.before_id = Some(last.id.clone()),
                    None => state.done = true,
                }
                state.buffer.extend(page);
            }
        })
        .boxed()
    }
}
