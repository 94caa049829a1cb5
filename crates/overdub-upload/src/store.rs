//! Object-store seam for multipart uploads.
//!
//! The concrete store (S3 or compatible) lives behind this trait; the
//! SDK client is an external collaborator wired in at the edge. Tests
//! drive the coordinator with a scripted implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::UploadError;

/// A part uploaded and acknowledged by the store, referenced at
/// completion time in part-number order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: i32,
    /// Store-assigned checksum tag (ETag) for the part.
    pub etag: String,
}

/// Minimal multipart-upload surface of an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open a multipart upload; returns the store-assigned upload id.
    async fn create_multipart_upload(&self, bucket: &str, key: &str)
        -> Result<String, UploadError>;

    /// Upload one part; returns its checksum tag.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String, UploadError>;

    /// Commit the upload, making the object visible with exactly the
    /// referenced parts.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), UploadError>;

    /// Discard the upload and every part uploaded so far.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), UploadError>;
}
