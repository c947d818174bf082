//! Chunk type and range planning.

use crate::fetch::ByteRange;

/// One worker's share of the resource: inclusive byte range `[start, end_inclusive]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Worker index this chunk was planned for (0-based).
    pub index: usize,
    pub start: u64,
    pub end_inclusive: u64,
}

impl Chunk {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end_inclusive + 1 - self.start
    }

    pub fn byte_range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end_inclusive)
    }
}

/// `total_len / workers`, the step between chunk boundaries.
pub fn nominal_chunk_size(total_len: u64, workers: usize) -> u64 {
    if workers == 0 {
        return 0;
    }
    total_len / workers as u64
}

/// Builds the chunk plan for `total_len` bytes and `workers` workers.
///
/// With `size = total_len / workers`, chunk 0 is `[0, size]` and chunk `i > 0`
/// is `[i*size + 1, (i+1)*size]`; the last chunk always ends at
/// `total_len - 1` and so absorbs the division remainder. Every byte is
/// covered exactly once. Chunks whose span would be empty are left out, so
/// the result can be shorter than `workers`. Returns an empty vec if
/// `total_len` or `workers` is 0.
pub fn plan_chunks(total_len: u64, workers: usize) -> Vec<Chunk> {
    if total_len == 0 || workers == 0 {
        return Vec::new();
    }

    let size = nominal_chunk_size(total_len, workers);
    let last_byte = total_len - 1;
    let last_index = workers - 1;

    (0..workers)
        .filter_map(|index| {
            let i = index as u64;
            let start = if index == 0 { 0 } else { i * size + 1 };
            let end_inclusive = if index == last_index {
                last_byte
            } else {
                ((i + 1) * size).min(last_byte)
            };
            (start <= end_inclusive).then_some(Chunk {
                index,
                start,
                end_inclusive,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(chunks: &[Chunk], total_len: u64) {
        let mut next = 0u64;
        for c in chunks {
            assert_eq!(c.start, next, "gap or overlap before chunk {}", c.index);
            assert!(c.len() > 0);
            next = c.end_inclusive + 1;
        }
        assert_eq!(next, total_len);
    }

    #[test]
    fn plan_chunks_thousand_bytes_four_workers() {
        let chunks = plan_chunks(1000, 4);
        assert_eq!(nominal_chunk_size(1000, 4), 250);
        assert_eq!(chunks.len(), 4);
        let starts: Vec<u64> = chunks.iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![0, 251, 501, 751]);
        assert_eq!(chunks[0].end_inclusive, 250);
        assert_eq!(chunks[3].end_inclusive, 999);
        assert_exact_cover(&chunks, 1000);
    }

    #[test]
    fn plan_chunks_remainder_goes_to_last() {
        let chunks = plan_chunks(10, 4);
        // size 2: [0,2] [3,4] [5,6] [7,9]
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3].start, 7);
        assert_eq!(chunks[3].len(), 3);
        assert_exact_cover(&chunks, 10);
    }

    #[test]
    fn plan_chunks_one_worker() {
        let chunks = plan_chunks(100, 1);
        assert_eq!(
            chunks,
            vec![Chunk {
                index: 0,
                start: 0,
                end_inclusive: 99
            }]
        );
        assert_eq!(chunks[0].byte_range().header_value(), "bytes=0-99");
    }

    #[test]
    fn plan_chunks_more_workers_than_bytes_skips_empty() {
        let chunks = plan_chunks(3, 5);
        assert!(chunks.len() <= 3);
        assert_exact_cover(&chunks, 3);
    }

    #[test]
    fn plan_chunks_empty() {
        assert!(plan_chunks(0, 4).is_empty());
        assert!(plan_chunks(100, 0).is_empty());
    }

    #[test]
    fn plan_chunks_cover_exactly_once_for_many_shapes() {
        for total_len in 1..=200u64 {
            for workers in 1..=24usize {
                let chunks = plan_chunks(total_len, workers);
                assert!(chunks.len() <= workers);
                assert_exact_cover(&chunks, total_len);
            }
        }
    }
}
