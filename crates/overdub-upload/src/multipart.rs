//! Multipart upload session and the scoped coordinator.
//!
//! A [`MultipartUpload`] is owned by exactly one upload invocation and
//! never shared across tasks. Part numbers start at 1 and are assigned
//! internally; callers only hand over chunk bodies in order.
//! [`upload_stream`] wraps the whole lifecycle: on a clean run it commits
//! every uploaded part, on any failure it aborts first and then
//! propagates the original error, and a run that produced zero parts
//! skips the commit call entirely (a no-op upload, not an error).

use std::future::Future;

use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use tracing::{debug, error, info};

use crate::chunker::chunks;
use crate::error::UploadError;
use crate::store::{CompletedPart, ObjectStore};

/// One in-flight multipart upload.
pub struct MultipartUpload<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    bucket: String,
    key: String,
    upload_id: String,
    parts: Vec<CompletedPart>,
    next_part_number: i32,
}

impl<'a, S: ObjectStore + ?Sized> MultipartUpload<'a, S> {
    /// Open a multipart upload with the store.
    pub async fn begin(store: &'a S, bucket: &str, key: &str) -> Result<Self, UploadError> {
        let upload_id = store.create_multipart_upload(bucket, key).await?;
        info!(bucket = %bucket, object_key = %key, upload_id = %upload_id, "multipart upload opened");
        Ok(Self {
            store,
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
            next_part_number: 1,
        })
    }

    /// Upload the next chunk as the next part. Chunks must arrive in the
    /// order they were produced; the session does not reorder.
    pub async fn put_part(&mut self, body: Bytes) -> Result<(), UploadError> {
        let part_number = self.next_part_number;
        let size = body.len();
        let etag = self
            .store
            .upload_part(&self.bucket, &self.key, &self.upload_id, part_number, body)
            .await?;
        debug!(
            upload_id = %self.upload_id,
            part_number,
            bytes = size,
            "part uploaded"
        );
        self.parts.push(CompletedPart { part_number, etag });
        self.next_part_number += 1;
        Ok(())
    }

    /// Commit the upload, referencing every uploaded part in part-number
    /// order. With zero parts the commit call is skipped — the store
    /// would reject it, and an empty upload is a no-op by contract.
    pub async fn commit(self) -> Result<(), UploadError> {
        if self.parts.is_empty() {
            debug!(upload_id = %self.upload_id, "no parts uploaded, skipping completion");
            return Ok(());
        }
        self.store
            .complete_multipart_upload(&self.bucket, &self.key, &self.upload_id, &self.parts)
            .await?;
        info!(
            upload_id = %self.upload_id,
            parts = self.parts.len(),
            "multipart upload committed"
        );
        Ok(())
    }

    /// Abort the upload, discarding every part uploaded so far.
    pub async fn abort(self) -> Result<(), UploadError> {
        self.store
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await?;
        info!(upload_id = %self.upload_id, "multipart upload aborted");
        Ok(())
    }

    /// Parts acknowledged so far, in part-number order.
    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }
}

/// Stream `body` to `bucket`/`key` in `chunk_size` parts with guaranteed
/// commit-or-abort, calling `on_chunk` with the running chunk count after
/// each successful part (the hook callers use to emit progress events).
/// Returns the number of bytes uploaded.
pub async fn upload_stream<S, B, F, Fut>(
    store: &S,
    bucket: &str,
    key: &str,
    body: B,
    chunk_size: usize,
    mut on_chunk: F,
) -> Result<u64, UploadError>
where
    S: ObjectStore + ?Sized,
    B: Stream<Item = Result<Bytes, UploadError>> + Send,
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut session = MultipartUpload::begin(store, bucket, key).await?;
    let chunk_stream = chunks(body, chunk_size);
    pin_mut!(chunk_stream);

    let mut bytes_uploaded = 0u64;
    let mut chunks_uploaded = 0u64;

    while let Some(chunk) = chunk_stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                abort_logged(session).await;
                return Err(e);
            }
        };
        bytes_uploaded += chunk.len() as u64;
        if let Err(e) = session.put_part(chunk).await {
            abort_logged(session).await;
            return Err(e);
        }
        chunks_uploaded += 1;
        on_chunk(chunks_uploaded).await;
    }

    session.commit().await?;
    Ok(bytes_uploaded)
}

/// Abort before propagating the original failure; an abort failure is
/// logged but never masks the error that caused it.
async fn abort_logged<S: ObjectStore + ?Sized>(session: MultipartUpload<'_, S>) {
    let upload_id = session.upload_id().to_string();
    if let Err(e) = session.abort().await {
        error!(upload_id = %upload_id, error = %e, "abort after failed upload also failed");
    }
}
