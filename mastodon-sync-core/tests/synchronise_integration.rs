use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};

use mastodon_sync_core::config::UserId;
use mastodon_sync_core::contract::{EntryKind, LogEntry, LogError, MockLogClient, MockTimeline};
use mastodon_sync_core::mastodon::{Account, FetchError, Status, StatusContext, Visibility};
use mastodon_sync_core::record::{PostRecord, SigningKey, Verifier};
use mastodon_sync_core::synchronise::{run_sync, SyncError};

const BASE_URL: &str = "https://mastodon.example";

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn user_id() -> UserId {
    UserId::from_verifying_key(signing_key().verifying_key())
}

fn status_at(id: &str, timestamp_ms: i64, visibility: Visibility) -> StatusContext {
    let created_at =
        chrono::DateTime::from_timestamp_millis(timestamp_ms).expect("valid timestamp");
    StatusContext {
        status: Status {
            id: id.to_string(),
            created_at,
            account: Account {
                acct: "alice".to_string(),
                display_name: None,
                url: "https://origin.example/@alice".to_string(),
            },
            url: None,
            uri: format!("https://origin.example/users/alice/statuses/{id}"),
            content: format!("<p>status {id}</p>"),
            visibility,
            media_attachments: vec![],
            reblog: None,
        },
        base_url: Arc::from(BASE_URL),
    }
}

fn public_at(id: &str, timestamp_ms: i64) -> StatusContext {
    status_at(id, timestamp_ms, Visibility::Public)
}

/// A timeline mock that replays the given statuses, newest-first.
fn timeline_of(items: Vec<StatusContext>) -> MockTimeline {
    let mut timeline = MockTimeline::new();
    timeline
        .expect_stream_timeline()
        .returning(move || stream::iter(items.clone().into_iter().map(Ok)).boxed());
    timeline
}

/// A log mock whose item listing replays `entries` and whose `put_item`
/// records the decoded timestamp of every accepted record into `published`.
fn log_with(entries: Vec<LogEntry>, published: Arc<Mutex<Vec<i64>>>) -> MockLogClient {
    let mut log = MockLogClient::new();
    log.expect_stream_user_items()
        .returning(move |_| stream::iter(entries.clone().into_iter().map(Ok)).boxed());
    log.expect_put_item().returning(move |_, _, bytes| {
        let record = PostRecord::from_bytes(bytes).expect("valid record bytes");
        published.lock().unwrap().push(record.timestamp_ms_utc);
        Ok(())
    });
    log
}

fn post_entry(timestamp_ms: i64) -> LogEntry {
    LogEntry {
        kind: EntryKind::Post,
        timestamp_ms_utc: timestamp_ms,
    }
}

#[tokio::test]
async fn publishes_everything_oldest_first_when_log_is_empty() {
    let timeline = timeline_of(vec![public_at("2", 200), public_at("1", 100)]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![], published.clone());

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");

    assert_eq!(count, 2);
    assert_eq!(
        *published.lock().unwrap(),
        vec![100, 200],
        "publish order must be oldest first"
    );
}

#[tokio::test]
async fn published_records_verify_against_the_author_key() {
    let timeline = timeline_of(vec![public_at("1", 100)]);
    let verified = Arc::new(AtomicUsize::new(0));

    let mut log = MockLogClient::new();
    log.expect_stream_user_items()
        .returning(|_| stream::iter(vec![]).boxed());
    let verified_in_mock = verified.clone();
    log.expect_put_item().returning(move |uid, signature, bytes| {
        uid.verifying_key()
            .verify(bytes, signature)
            .expect("signature must verify against the author's public key");
        verified_in_mock.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");
    assert_eq!(count, 1);
    assert_eq!(verified.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cursor_short_circuits_already_synced_statuses() {
    let timeline = timeline_of(vec![public_at("2", 200), public_at("1", 100)]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![post_entry(150)], published.clone());

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");

    assert_eq!(count, 1);
    assert_eq!(*published.lock().unwrap(), vec![200]);
}

#[tokio::test]
async fn cursor_boundary_is_exclusive() {
    // Exactly equal to the cursor: excluded.
    let timeline = timeline_of(vec![public_at("2", 200), public_at("1", 100)]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![post_entry(200)], published.clone());
    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");
    assert_eq!(count, 0);
    assert!(published.lock().unwrap().is_empty());

    // One millisecond past the cursor: included.
    let timeline = timeline_of(vec![public_at("3", 201)]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![post_entry(200)], published.clone());
    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");
    assert_eq!(count, 1);
    assert_eq!(*published.lock().unwrap(), vec![201]);
}

#[tokio::test]
async fn second_run_with_no_new_statuses_publishes_nothing() {
    let items = vec![public_at("2", 200), public_at("1", 100)];

    // First run against an empty log.
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![], published.clone());
    let first = run_sync(
        &timeline_of(items.clone()),
        &log,
        &user_id(),
        &signing_key(),
        10,
    )
    .await
    .expect("first run should succeed");
    assert_eq!(first, 2);

    // Second run: the log now reports the newest published post.
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![post_entry(200)], published.clone());
    let second = run_sync(&timeline_of(items), &log, &user_id(), &signing_key(), 10)
        .await
        .expect("second run should succeed");
    assert_eq!(second, 0, "an unchanged timeline must publish nothing");
    assert!(published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_public_statuses_are_skipped_without_stopping() {
    let timeline = timeline_of(vec![
        public_at("4", 400),
        status_at("3", 300, Visibility::Private),
        status_at("2", 200, Visibility::Direct),
        public_at("1", 100),
    ]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![], published.clone());

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");

    assert_eq!(count, 2);
    assert_eq!(
        *published.lock().unwrap(),
        vec![100, 400],
        "private and direct statuses must never be published"
    );
}

#[tokio::test]
async fn max_statuses_bounds_collection_to_the_newest() {
    let timeline = timeline_of(vec![
        public_at("5", 500),
        public_at("4", 400),
        public_at("3", 300),
        public_at("2", 200),
        public_at("1", 100),
    ]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![], published.clone());

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 2)
        .await
        .expect("sync should succeed");

    assert_eq!(count, 2);
    assert_eq!(*published.lock().unwrap(), vec![400, 500]);
}

#[tokio::test]
async fn equal_timestamps_publish_in_stable_id_order() {
    let timeline = timeline_of(vec![
        public_at("22", 100),
        public_at("11", 100),
        public_at("03", 100),
    ]);
    let published = Arc::new(Mutex::new(Vec::new()));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut log = MockLogClient::new();
    log.expect_stream_user_items()
        .returning(|_| stream::iter(vec![]).boxed());
    let order_in_mock = order.clone();
    let published_in_mock = published.clone();
    log.expect_put_item().returning(move |_, _, bytes| {
        let record = PostRecord::from_bytes(bytes).expect("valid record bytes");
        published_in_mock.lock().unwrap().push(record.timestamp_ms_utc);
        // The rendered body embeds the status id, which exposes the order.
        order_in_mock.lock().unwrap().push(record.body);
        Ok(())
    });

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");
    assert_eq!(count, 3);

    let bodies = order.lock().unwrap();
    let position = |needle: &str| {
        bodies
            .iter()
            .position(|b| b.contains(needle))
            .unwrap_or_else(|| panic!("no body mentions {needle}"))
    };
    assert!(position("status 03") < position("status 11"));
    assert!(position("status 11") < position("status 22"));
}

#[tokio::test]
async fn cursor_stops_timeline_consumption_early() {
    let consumed = Arc::new(AtomicUsize::new(0));
    let items = vec![
        public_at("4", 400),
        public_at("3", 300),
        public_at("2", 200),
        public_at("1", 100),
    ];

    let mut timeline = MockTimeline::new();
    let consumed_in_mock = consumed.clone();
    timeline.expect_stream_timeline().returning(move || {
        let counter = consumed_in_mock.clone();
        stream::iter(items.clone())
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .map(Ok)
            .boxed()
    });

    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![post_entry(300)], published.clone());

    let count = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect("sync should succeed");

    assert_eq!(count, 1);
    assert_eq!(*published.lock().unwrap(), vec![400]);
    assert_eq!(
        consumed.load(Ordering::SeqCst),
        2,
        "consumption must stop at the first already-synced status"
    );
}

#[tokio::test]
async fn fetch_error_aborts_the_run_before_publishing() {
    let mut timeline = MockTimeline::new();
    timeline.expect_stream_timeline().returning(|| {
        stream::iter(vec![
            Ok(public_at("2", 200)),
            Err(FetchError::Status {
                context: "/api/v1/timelines/home".to_string(),
                status: 500,
                body: "server exploded".to_string(),
            }),
        ])
        .boxed()
    });

    let published = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![], published.clone());

    let err = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect_err("a failed page fetch must abort the run");
    assert!(matches!(err, SyncError::Fetch(_)), "got: {err:?}");
    assert!(
        published.lock().unwrap().is_empty(),
        "nothing may be published when collection fails"
    );
}

#[tokio::test]
async fn publish_failure_preserves_the_ordered_prefix() {
    let timeline = timeline_of(vec![
        public_at("3", 300),
        public_at("2", 200),
        public_at("1", 100),
    ]);

    let published = Arc::new(Mutex::new(Vec::new()));
    let mut log = MockLogClient::new();
    log.expect_stream_user_items()
        .returning(|_| stream::iter(vec![]).boxed());
    let published_in_mock = published.clone();
    let calls = AtomicUsize::new(0);
    log.expect_put_item().returning(move |_, _, bytes| {
        if calls.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(LogError::Status {
                context: "put".to_string(),
                status: 500,
                body: "rejected".to_string(),
            });
        }
        let record = PostRecord::from_bytes(bytes).expect("valid record bytes");
        published_in_mock.lock().unwrap().push(record.timestamp_ms_utc);
        Ok(())
    });

    let err = run_sync(&timeline, &log, &user_id(), &signing_key(), 10)
        .await
        .expect_err("a rejected append must abort the run");
    assert!(matches!(err, SyncError::Publish(_)), "got: {err:?}");
    assert_eq!(
        *published.lock().unwrap(),
        vec![100],
        "only the oldest-first prefix before the failure may be committed"
    );
}

#[tokio::test]
async fn interrupted_run_resumes_without_gap_or_duplicate() {
    let items = vec![public_at("3", 300), public_at("2", 200), public_at("1", 100)];

    // First run: the append of the second (timestamp 200) record fails,
    // leaving only timestamp 100 durably published.
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut log = MockLogClient::new();
    log.expect_stream_user_items()
        .returning(|_| stream::iter(vec![]).boxed());
    let published_in_mock = published.clone();
    let calls = AtomicUsize::new(0);
    log.expect_put_item().returning(move |_, _, bytes| {
        if calls.fetch_add(1, Ordering::SeqCst) >= 1 {
            return Err(LogError::Status {
                context: "put".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        let record = PostRecord::from_bytes(bytes).expect("valid record bytes");
        published_in_mock.lock().unwrap().push(record.timestamp_ms_utc);
        Ok(())
    });
    run_sync(
        &timeline_of(items.clone()),
        &log,
        &user_id(),
        &signing_key(),
        10,
    )
    .await
    .expect_err("interrupted run");
    assert_eq!(*published.lock().unwrap(), vec![100]);

    // Fresh run: the cursor now resolves to 100, and exactly the remaining
    // statuses are published, oldest first.
    let resumed = Arc::new(Mutex::new(Vec::new()));
    let log = log_with(vec![post_entry(100)], resumed.clone());
    let count = run_sync(&timeline_of(items), &log, &user_id(), &signing_key(), 10)
        .await
        .expect("resumed run should succeed");
    assert_eq!(count, 2);
    assert_eq!(*resumed.lock().unwrap(), vec![200, 300]);
}
