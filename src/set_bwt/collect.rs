//! Chunked bucketizer for the string set. The counting pass streams chunks
//! of strings and accumulates the global bucket histogram; a collecting
//! pass re-streams the set and materialises the suffix identifiers of one
//! super-block of buckets, grouped by bucket in ascending order. Within a
//! bucket the collected order is `(string, offset)` ascending, which the
//! stable sorter preserves for identical suffixes.

use super::{PackedStringSet, SetSuffix, SetSuffixes};
use crate::par;
use crate::radix::{bucket_count, bucket_of, SuffixRadix};
use std::ops::Range;

/// Contiguous string range of chunk `chunk` out of `chunks`.
fn chunk_strings(set: &PackedStringSet, chunk: usize, chunks: usize) -> Range<u32> {
    let m = set.strings() as u64;
    let lo = m * chunk as u64 / chunks as u64;
    let hi = m * (chunk as u64 + 1) / chunks as u64;
    lo as u32..hi as u32
}

/// Counting pass: one stream over the whole set, histogram merged by
/// commutative addition. `Σ counts` equals the number of non-empty
/// suffixes.
pub(crate) fn count_buckets(set: &PackedStringSet, width: u32) -> Vec<u32> {
    let buckets = bucket_count(width);
    let suffixes = set.total_symbols() as usize;
    let chunks = Ord::min(
        par::chunk_count(set.strings()),
        Ord::max(1, suffixes / buckets),
    );

    let src = SetSuffixes { set };
    let bits = set.bits();
    par::histogram(chunks, buckets, move |chunk, counts| {
        for s in chunk_strings(set, chunk, chunks) {
            for p in 0..set.str_len(s) {
                let key = src.radix_word(SetSuffix { string: s, offset: p }, 0);
                counts[bucket_of(key, width, bits) as usize] += 1;
            }
        }
    })
}

/// Collecting pass: re-stream the set and scatter the suffixes whose bucket
/// lies in `range` into `out`, grouped by bucket ascending. The scatter is
/// a single in-order stream, so collection order inside a bucket is
/// `(string, offset)` ascending.
pub(crate) fn collect_superblock(
    set: &PackedStringSet,
    width: u32,
    range: Range<usize>,
    counts: &[u32],
    out: &mut Vec<SetSuffix>,
) {
    let mut cursor = vec![0u32; range.len()];
    let mut total = 0u32;
    for (i, b) in range.clone().enumerate() {
        cursor[i] = total;
        total += counts[b];
    }
    out.clear();
    out.resize(
        total as usize,
        SetSuffix {
            string: 0,
            offset: 0,
        },
    );

    let src = SetSuffixes { set };
    let bits = set.bits();
    for s in 0..set.strings() as u32 {
        for p in 0..set.str_len(s) {
            let id = SetSuffix { string: s, offset: p };
            let b = bucket_of(src.radix_word(id, 0), width, bits) as usize;
            if b >= range.start && b < range.end {
                let slot = &mut cursor[b - range.start];
                out[*slot as usize] = id;
                *slot += 1;
            }
        }
    }
}
