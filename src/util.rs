//! Small shared helpers: chunk-range math and UTC micros timestamps.
//!
//! This replaces the teacher's gRPC-channel connect helper (no longer
//! applicable once the transport became HTTP/JSON) with the byte-range
//! math AS needs for both the read and write paths (spec §4.3), kept here
//! rather than duplicated in both handler modules.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time in microseconds, as carried in heartbeat payloads
/// (spec §6: `timestamp(int64_t utc micros)`).
pub fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_micros() as i64
}

/// Inclusive `[first, last]` chunk-index range covering byte range
/// `[begin_pos, end_pos)`. Returns `None` for an empty range.
pub fn chunk_index_range(begin_pos: u64, end_pos: u64, chunk_size: u64) -> Option<(u64, u64)> {
    if end_pos <= begin_pos {
        return None;
    }
    let first = begin_pos / chunk_size;
    let last = (end_pos - 1) / chunk_size;
    Some((first, last))
}

/// Offset of `pos` within its own chunk.
pub fn offset_within_chunk(pos: u64, chunk_size: u64) -> u64 {
    pos % chunk_size
}

/// Splits `content` into the per-chunk byte windows a write touches,
/// in chunk order. The first window starts at `begin_pos`'s offset within
/// its chunk; every subsequent window starts at offset 0 of its chunk
/// (spec §4.3.2 step 7).
pub fn slice_for_write(content: &[u8], begin_pos: u64, chunk_size: u64) -> Vec<Vec<u8>> {
    if content.is_empty() {
        return Vec::new();
    }
    let mut slices = Vec::new();
    let mut consumed = 0usize;
    let first_offset = offset_within_chunk(begin_pos, chunk_size) as usize;
    let first_len = (chunk_size as usize - first_offset).min(content.len());
    slices.push(content[..first_len].to_vec());
    consumed += first_len;

    while consumed < content.len() {
        let take = (chunk_size as usize).min(content.len() - consumed);
        slices.push(content[consumed..consumed + take].to_vec());
        consumed += take;
    }
    slices
}

/// Trims a stream of whole chunk bodies down to the requested byte range,
/// given the chunk index each body corresponds to (spec §4.3.1 step 4).
pub fn trim_chunk_body(
    body: &[u8],
    chunk_idx: u64,
    first_idx: u64,
    last_idx: u64,
    begin_pos: u64,
    end_pos: u64,
    chunk_size: u64,
) -> Vec<u8> {
    let start = if chunk_idx == first_idx {
        offset_within_chunk(begin_pos, chunk_size) as usize
    } else {
        0
    };
    let end = if chunk_idx == last_idx {
        let e = (end_pos - chunk_idx * chunk_size) as usize;
        e.min(body.len())
    } else {
        body.len()
    };
    if start >= end {
        Vec::new()
    } else {
        body[start..end].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_is_none() {
        assert_eq!(chunk_index_range(3, 3, 4), None);
        assert_eq!(chunk_index_range(5, 3, 4), None);
    }

    #[test]
    fn range_within_one_chunk() {
        assert_eq!(chunk_index_range(0, 3, 4), Some((0, 0)));
        assert_eq!(chunk_index_range(2, 4, 4), Some((0, 0)));
    }

    #[test]
    fn range_spanning_chunks() {
        // chunk_size=4, bytes [0,7) -> chunks 0 and 1
        assert_eq!(chunk_index_range(0, 7, 4), Some((0, 1)));
        // [3,5) touches chunk 0 (byte 3) and chunk 1 (byte 4)
        assert_eq!(chunk_index_range(3, 5, 4), Some((0, 1)));
    }

    #[test]
    fn slice_for_write_single_chunk() {
        let slices = slice_for_write(b"ab", 2, 4);
        assert_eq!(slices, vec![b"ab".to_vec()]);
    }

    #[test]
    fn slice_for_write_spans_boundary() {
        // chunk_size=4, begin_pos=2, content="abcdefg" (7 bytes)
        // chunk 0 gets offset 2..4 (2 bytes: "ab"), chunk 1 gets next 4 ("cdef"), chunk 2 gets rest ("g")
        let slices = slice_for_write(b"abcdefg", 2, 4);
        assert_eq!(
            slices,
            vec![b"ab".to_vec(), b"cdef".to_vec(), b"g".to_vec()]
        );
    }

    #[test]
    fn trim_first_and_last_chunk() {
        // scenario (b) from spec §8: chunk_size=4, file "abcdefg" -> chunks [0..4)="abcd", [4..7)="efg"
        // get_file("y", 2, 6) => "cdef"
        let first = trim_chunk_body(b"abcd", 0, 0, 1, 2, 6, 4);
        assert_eq!(first, b"cd");
        let last = trim_chunk_body(b"efg", 1, 0, 1, 2, 6, 4);
        assert_eq!(last, b"ef");
    }

    #[test]
    fn trim_middle_chunk_is_verbatim() {
        let body = trim_chunk_body(b"mid!", 1, 0, 2, 0, 20, 4);
        assert_eq!(body, b"mid!");
    }
}
