//! Progress arithmetic for chunked uploads.
//!
//! `total_chunks = ceil(total_bytes / chunk_size)`, and the reported
//! percentage is `floor(chunks_done * 100 / total_chunks)`. A zero-byte
//! upload counts as one chunk already completed, so it reports 100%
//! instead of dividing by zero.

/// Number of chunks a body of `total_bytes` splits into.
pub fn total_chunks(total_bytes: u64, chunk_size: usize) -> u64 {
    if total_bytes == 0 {
        return 1;
    }
    let chunk_size = chunk_size.max(1) as u64;
    (total_bytes + chunk_size - 1) / chunk_size
}

/// Percentage complete after `chunks_done` of `total_chunks` chunks.
pub fn percent(chunks_done: u64, total_chunks: u64) -> u8 {
    if total_chunks == 0 {
        return 100;
    }
    ((chunks_done * 100 / total_chunks).min(100)) as u8
}

/// Running progress for one upload, fed from the coordinator's per-chunk
/// callback.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total_chunks: u64,
    chunks_done: u64,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64, chunk_size: usize) -> Self {
        let chunks_done = u64::from(total_bytes == 0);
        Self {
            total_chunks: total_chunks(total_bytes, chunk_size),
            chunks_done,
        }
    }

    /// Record one completed chunk and return the new percentage.
    pub fn advance(&mut self) -> u8 {
        self.chunks_done = (self.chunks_done + 1).min(self.total_chunks);
        self.percent()
    }

    pub fn percent(&self) -> u8 {
        percent(self.chunks_done, self.total_chunks)
    }

    pub fn is_complete(&self) -> bool {
        self.chunks_done == self.total_chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_MIB: usize = 5 * 1024 * 1024;

    #[test]
    fn three_chunk_upload_reports_33_66_100() {
        // 12 MiB body in 5 MiB chunks.
        let mut tracker = ProgressTracker::new(12_582_912, FIVE_MIB);
        assert_eq!(total_chunks(12_582_912, FIVE_MIB), 3);
        assert_eq!(tracker.advance(), 33);
        assert_eq!(tracker.advance(), 66);
        assert_eq!(tracker.advance(), 100);
        assert!(tracker.is_complete());
    }

    #[test]
    fn exact_multiple_has_no_partial_chunk() {
        assert_eq!(total_chunks(10 * FIVE_MIB as u64, FIVE_MIB), 10);
    }

    #[test]
    fn zero_byte_body_is_one_chunk_at_100() {
        let tracker = ProgressTracker::new(0, FIVE_MIB);
        assert_eq!(tracker.percent(), 100);
        assert!(tracker.is_complete());
    }

    #[test]
    fn percent_is_floored() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        // Over-reporting clamps rather than exceeding 100.
        assert_eq!(percent(4, 3), 100);
    }
}
