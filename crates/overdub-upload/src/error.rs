//! Upload error type.

use thiserror::Error;

/// Any failure during begin/upload/commit of a multipart upload. The
/// coordinator aborts the remote upload before propagating one of these,
/// so the store never retains a partial object.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The object store rejected or failed a call.
    #[error("object store error: {0}")]
    Store(String),

    /// The upload body stream failed mid-read.
    #[error("upload body failed: {0}")]
    Body(String),

    /// Local I/O failure while producing the body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
