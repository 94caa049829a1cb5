//! Coordinator tests against a scripted object store: commit-or-abort on
//! every exit path, part numbering, and the zero-part no-op.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use tokio::sync::Mutex;

use overdub_upload::{upload_stream, CompletedPart, MultipartUpload, ObjectStore, UploadError};

#[derive(Default)]
struct StoreState {
    upload_open: bool,
    /// (part_number, size) in upload order.
    received_parts: Vec<(i32, usize)>,
    committed: Option<Vec<CompletedPart>>,
    aborted: bool,
}

/// Object store double. `fail_after_parts` makes `upload_part` fail once
/// that many parts have been accepted.
struct MockStore {
    state: Mutex<StoreState>,
    fail_after_parts: Option<usize>,
}

impl MockStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState::default()),
            fail_after_parts: None,
        })
    }

    fn failing_after(parts: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState::default()),
            fail_after_parts: Some(parts),
        })
    }

    /// Whether an object is visible at the destination key.
    async fn object_visible(&self) -> bool {
        self.state.lock().await.committed.is_some()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn create_multipart_upload(&self, _: &str, _: &str) -> Result<String, UploadError> {
        self.state.lock().await.upload_open = true;
        Ok("upload-1".to_string())
    }

    async fn upload_part(
        &self,
        _: &str,
        _: &str,
        _: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, UploadError> {
        let mut state = self.state.lock().await;
        if self
            .fail_after_parts
            .is_some_and(|limit| state.received_parts.len() >= limit)
        {
            return Err(UploadError::Store("part upload rejected".into()));
        }
        state.received_parts.push((part_number, body.len()));
        Ok(format!("etag-{part_number}"))
    }

    async fn complete_multipart_upload(
        &self,
        _: &str,
        _: &str,
        _: &str,
        parts: &[CompletedPart],
    ) -> Result<(), UploadError> {
        let mut state = self.state.lock().await;
        assert!(state.upload_open, "complete without create");
        assert!(!state.aborted, "complete after abort");
        state.committed = Some(parts.to_vec());
        Ok(())
    }

    async fn abort_multipart_upload(&self, _: &str, _: &str, _: &str) -> Result<(), UploadError> {
        self.state.lock().await.aborted = true;
        Ok(())
    }
}

fn body_of_chunks(count: usize, chunk_size: usize) -> impl futures::Stream<Item = Result<Bytes, UploadError>> {
    stream::iter((0..count).map(move |_| Ok(Bytes::from(vec![0u8; chunk_size]))))
}

const CHUNK: usize = 4;

#[tokio::test]
async fn clean_upload_commits_all_parts_in_order() {
    let store = MockStore::new();
    let uploaded = upload_stream(
        store.as_ref(),
        "input",
        "s1/track/V.mp3",
        body_of_chunks(3, CHUNK),
        CHUNK,
        |_| async {},
    )
    .await
    .unwrap();

    assert_eq!(uploaded, 12);
    let state = store.state.lock().await;
    let committed = state.committed.as_ref().expect("upload not committed");
    assert_eq!(
        committed.iter().map(|p| p.part_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(committed[0].etag, "etag-1");
    assert!(!state.aborted);
}

#[tokio::test]
async fn failure_mid_upload_aborts_and_leaves_no_object() {
    // Five chunks, the store dies after accepting two.
    let store = MockStore::failing_after(2);
    let result = upload_stream(
        store.as_ref(),
        "input",
        "s1/track/V.mp3",
        body_of_chunks(5, CHUNK),
        CHUNK,
        |_| async {},
    )
    .await;

    assert!(matches!(result, Err(UploadError::Store(_))));
    assert!(!store.object_visible().await);
    let state = store.state.lock().await;
    assert!(state.aborted);
    assert_eq!(state.received_parts.len(), 2);
}

#[tokio::test]
async fn body_error_aborts_and_propagates() {
    let store = MockStore::new();
    let body = stream::iter(vec![
        Ok(Bytes::from(vec![0u8; CHUNK])),
        Err(UploadError::Body("client went away".into())),
    ]);
    let result = upload_stream(store.as_ref(), "input", "k", body, CHUNK, |_| async {}).await;

    assert!(matches!(result, Err(UploadError::Body(_))));
    assert!(store.state.lock().await.aborted);
    assert!(!store.object_visible().await);
}

#[tokio::test]
async fn empty_body_skips_commit_entirely() {
    let store = MockStore::new();
    let uploaded = upload_stream(
        store.as_ref(),
        "input",
        "k",
        body_of_chunks(0, CHUNK),
        CHUNK,
        |_| async {},
    )
    .await
    .unwrap();

    assert_eq!(uploaded, 0);
    let state = store.state.lock().await;
    assert!(state.committed.is_none());
    assert!(!state.aborted);
    assert!(state.received_parts.is_empty());
}

#[tokio::test]
async fn final_partial_part_is_sent_unpadded() {
    let store = MockStore::new();
    let body = stream::iter(vec![Ok(Bytes::from(vec![0u8; CHUNK * 2 + 1]))]);
    upload_stream(store.as_ref(), "input", "k", body, CHUNK, |_| async {})
        .await
        .unwrap();

    let state = store.state.lock().await;
    assert_eq!(state.received_parts, vec![(1, CHUNK), (2, CHUNK), (3, 1)]);
}

#[tokio::test]
async fn on_chunk_reports_running_count() {
    let store = MockStore::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_cb = seen.clone();

    upload_stream(
        store.as_ref(),
        "input",
        "k",
        body_of_chunks(3, CHUNK),
        CHUNK,
        move |count| {
            let seen = seen_in_cb.clone();
            async move {
                seen.lock().await.push(count);
            }
        },
    )
    .await
    .unwrap();

    assert_eq!(*seen.lock().await, vec![1, 2, 3]);
}

#[tokio::test]
async fn manual_session_exposes_parts_and_id() {
    let store = MockStore::new();
    let mut session = MultipartUpload::begin(store.as_ref(), "input", "k")
        .await
        .unwrap();
    assert_eq!(session.upload_id(), "upload-1");

    session.put_part(Bytes::from_static(b"data")).await.unwrap();
    assert_eq!(session.parts().len(), 1);
    assert_eq!(session.parts()[0].part_number, 1);

    session.commit().await.unwrap();
    assert!(store.object_visible().await);
}
