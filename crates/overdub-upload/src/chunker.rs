//! Fixed-size re-chunking of an arbitrary byte stream.
//!
//! Upload bodies arrive in whatever fragment sizes the transport
//! produces; the store wants exact `chunk_size` parts (its minimum part
//! size), with only the final part allowed to be smaller. No padding —
//! the final partial chunk is sent as-is.

use bytes::{Bytes, BytesMut};
use futures::{pin_mut, Stream, StreamExt};

use crate::error::UploadError;

/// Re-chunk `body` into `chunk_size` pieces, passing the final partial
/// chunk through unchanged. A body error ends the output stream with
/// that error; buffered bytes before it are discarded.
pub fn chunks<B>(
    body: B,
    chunk_size: usize,
) -> impl Stream<Item = Result<Bytes, UploadError>> + Send
where
    B: Stream<Item = Result<Bytes, UploadError>> + Send,
{
    async_stream::stream! {
        pin_mut!(body);
        let mut buffer = BytesMut::new();

        while let Some(fragment) = body.next().await {
            match fragment {
                Ok(data) => buffer.extend_from_slice(&data),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
            while buffer.len() >= chunk_size {
                yield Ok(buffer.split_to(chunk_size).freeze());
            }
        }

        if !buffer.is_empty() {
            yield Ok(buffer.freeze());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body_of(fragments: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, UploadError>> {
        stream::iter(fragments.into_iter().map(|f| Ok(Bytes::from(f))))
    }

    async fn collect_sizes(
        stream: impl Stream<Item = Result<Bytes, UploadError>>,
    ) -> Vec<usize> {
        stream
            .map(|chunk| chunk.unwrap().len())
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn rechunks_across_fragment_boundaries() {
        let body = body_of(vec![vec![0u8; 3], vec![0u8; 7], vec![0u8; 5]]);
        assert_eq!(collect_sizes(chunks(body, 5)).await, vec![5, 5, 5]);
    }

    #[tokio::test]
    async fn final_partial_chunk_passes_through() {
        let body = body_of(vec![vec![0u8; 8], vec![0u8; 4]]);
        assert_eq!(collect_sizes(chunks(body, 5)).await, vec![5, 5, 2]);
    }

    #[tokio::test]
    async fn empty_body_yields_nothing() {
        let body = body_of(vec![]);
        assert!(collect_sizes(chunks(body, 5)).await.is_empty());
    }

    #[tokio::test]
    async fn chunk_content_is_preserved_in_order() {
        let body = body_of(vec![b"abc".to_vec(), b"defg".to_vec()]);
        let collected: Vec<Bytes> = chunks(body, 4)
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec![Bytes::from("abcd"), Bytes::from("efg")]);
    }

    #[tokio::test]
    async fn body_error_ends_the_stream() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"abcdef")),
            Err(UploadError::Body("connection reset".into())),
        ]);
        let collected: Vec<Result<Bytes, UploadError>> = chunks(body, 4).collect().await;
        // One full chunk was produced before the error; the buffered tail
        // is discarded.
        assert_eq!(collected.len(), 2);
        assert!(collected[0].is_ok());
        assert!(collected[1].is_err());
    }
}
