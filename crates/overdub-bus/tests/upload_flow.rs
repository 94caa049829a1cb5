//! End-to-end flow: an upload streams to the object store while the
//! caller emits progress events through the bus, and a listening client
//! sees 33/66/100 followed by the completion notice.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt};
use serde_json::Value;
use tokio::time::{timeout, Duration};

use overdub_bus::{notify, EventBus, MemoryBroker};
use overdub_core::{BusConfig, EventData, SseMessage};
use overdub_upload::{
    progress, upload_stream, CompletedPart, ObjectStore, UploadError,
};

struct AcceptingStore;

#[async_trait]
impl ObjectStore for AcceptingStore {
    async fn create_multipart_upload(&self, _: &str, _: &str) -> Result<String, UploadError> {
        Ok("upload-1".to_string())
    }
    async fn upload_part(
        &self,
        _: &str,
        _: &str,
        _: &str,
        part_number: i32,
        _: Bytes,
    ) -> Result<String, UploadError> {
        Ok(format!("etag-{part_number}"))
    }
    async fn complete_multipart_upload(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: &[CompletedPart],
    ) -> Result<(), UploadError> {
        Ok(())
    }
    async fn abort_multipart_upload(&self, _: &str, _: &str, _: &str) -> Result<(), UploadError> {
        Ok(())
    }
}

async fn next_data(stream: &mut (impl Stream<Item = SseMessage> + Unpin)) -> EventData {
    let msg = timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended unexpectedly");
    serde_json::from_str(&msg.data).unwrap()
}

#[tokio::test]
async fn upload_drives_progress_events_to_the_listener() {
    const CHUNK: usize = 4;
    let session_id = "s1";
    let bus = EventBus::new(Arc::new(MemoryBroker::new()), BusConfig::default());
    let store = AcceptingStore;

    let mut client = Box::pin(bus.listen(session_id));
    // Prime the lazy stream so the subscription is live before the upload.
    notify::session_message(&bus, session_id, "upload starting").await;
    assert_eq!(next_data(&mut client).await.message, "upload starting");

    // A 12-byte body in 4-byte chunks: three parts, like two 6 MiB tracks
    // in 5 MiB parts.
    let total_bytes = 12u64;
    let total = progress::total_chunks(total_bytes, CHUNK);
    let body = stream::iter(vec![Ok(Bytes::from(vec![0u8; total_bytes as usize]))]);

    let bus_for_chunks = bus.clone();
    let uploaded = upload_stream(
        &store,
        "overdub-input",
        "s1/track/V.mp3",
        body,
        CHUNK,
        move |count| {
            let bus = bus_for_chunks.clone();
            async move {
                notify::upload_progress(&bus, session_id, progress::percent(count, total)).await;
            }
        },
    )
    .await
    .unwrap();
    assert_eq!(uploaded, total_bytes);

    notify::upload_complete(&bus, session_id).await;

    for expected in ["Progress state: 33", "Progress state: 66", "Progress state: 100"] {
        let data = next_data(&mut client).await;
        assert_eq!(data.message, expected);
    }
    let done = next_data(&mut client).await;
    assert_eq!(done.message, "Upload has been successfully completed");
}

#[tokio::test]
async fn broadcast_reaches_every_upload_session() {
    let bus = EventBus::new(Arc::new(MemoryBroker::new()), BusConfig::default());

    let mut client1 = Box::pin(bus.listen("s1"));
    let mut client2 = Box::pin(bus.listen("s2"));
    notify::session_message(&bus, "s1", "ready").await;
    notify::session_message(&bus, "s2", "ready").await;
    next_data(&mut client1).await;
    next_data(&mut client2).await;

    notify::broadcast_message(&bus, "maintenance in 5 minutes").await;

    for client in [&mut client1, &mut client2] {
        let data = next_data(client).await;
        assert_eq!(data.message, "maintenance in 5 minutes");
        assert_eq!(
            data.info.as_ref().and_then(|m| m.get("broadcast")),
            Some(&Value::Bool(true))
        );
    }
}
