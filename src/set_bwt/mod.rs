//! String-set BWT construction. After a counting pass fixes the bucketing
//! width, contiguous bucket ranges are collected into a host-sized buffer
//! (super-blocks), sorted in device-sized batches (sub-blocks) and emitted
//! in destination-slot order. Short-string buckets hold only copies of one
//! identical string; they are copied straight to the sink in collection
//! order and never reach the sorter.
//!
//! The output stream carries one terminator token per input string; its
//! position and owner are recorded in the primary map.

mod collect;

use crate::block::{BlockSorter, TieBreak};
use crate::error::Error;
use crate::packed::{dna_code, BitOrder, PackedStream, SymbolBits};
use crate::radix::{
    bucket_count, bucket_of, is_short_bucket, syms_per_word, SuffixRadix, BUCKET_WIDTHS,
    DIST_BITS, DIST_MAX,
};
use crate::sink::BwtSink;
use crate::{BwtParams, JobControl, DOLLAR, MAX_SET_SUFFIXES};

/// Symbols staged per `process` call during emission.
const EMIT_CHUNK: usize = 1 << 20;

/// A set of short strings packed into one stream. Strings are addressed by
/// index; every string carries an implicit terminator after its last
/// symbol.
#[derive(Clone, Debug)]
pub struct PackedStringSet {
    stream: PackedStream,
    offsets: Vec<u64>,
    max_len: u32,
}

impl PackedStringSet {
    pub fn new(bits: SymbolBits) -> Self {
        PackedStringSet {
            stream: PackedStream::new(bits, BitOrder::MsbFirst),
            offsets: vec![0],
            max_len: 0,
        }
    }

    /// Append one string of symbol codes. Empty strings are refused: an
    /// empty member has no predecessor symbol for its terminator row.
    pub fn push(&mut self, symbols: &[u8]) -> Result<(), Error> {
        if symbols.is_empty() {
            return Err(Error::InputFormat("empty string in set".to_owned()));
        }
        assert!(self.total_symbols() + symbols.len() as u64 <= MAX_SET_SUFFIXES);
        assert!(self.strings() < std::u32::MAX as usize);

        self.stream.pack_at(self.stream.len(), symbols);
        self.offsets.push(self.stream.len() as u64);
        self.max_len = Ord::max(self.max_len, symbols.len() as u32);
        Ok(())
    }

    /// Append one ASCII DNA record as 2-bit codes.
    pub fn push_dna(&mut self, record: &[u8]) -> Result<(), Error> {
        let mut codes = Vec::with_capacity(record.len());
        for (i, &b) in record.iter().enumerate() {
            codes.push(dna_code(b).ok_or_else(|| {
                Error::InputFormat(format!("byte {:#04x} at offset {} is not a DNA base", b, i))
            })?);
        }
        self.push(&codes)
    }

    /// Pack a batch of ASCII DNA records.
    pub fn from_dna_records<'r, I>(records: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = &'r [u8]>,
    {
        let mut set = PackedStringSet::new(SymbolBits::Two);
        for record in records {
            set.push_dna(record)?;
        }
        Ok(set)
    }

    /// Number of strings.
    pub fn strings(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total symbol count over all strings, terminators excluded.
    pub fn total_symbols(&self) -> u64 {
        self.offsets[self.strings()]
    }

    pub fn str_len(&self, s: u32) -> u32 {
        (self.offsets[s as usize + 1] - self.offsets[s as usize]) as u32
    }

    pub fn max_len(&self) -> u32 {
        self.max_len
    }

    pub fn bits(&self) -> SymbolBits {
        self.stream.bits()
    }

    /// Symbol `offset` of string `s`.
    #[inline]
    pub fn symbol(&self, s: u32, offset: u32) -> u8 {
        debug_assert!(offset < self.str_len(s));
        self.stream.get((self.offsets[s as usize] + offset as u64) as usize)
    }
}

/// One non-empty suffix of a string set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetSuffix {
    pub string: u32,
    pub offset: u32,
}

/// Radix view over the suffixes of a set. Reads past a string's end observe
/// that string's terminator, never the next string.
pub struct SetSuffixes<'a> {
    pub set: &'a PackedStringSet,
}

impl<'a> SuffixRadix for SetSuffixes<'a> {
    type Id = SetSuffix;

    fn radix_word(&self, id: SetSuffix, word: u32) -> u32 {
        let set = self.set;
        let bits = set.bits();
        let spw = syms_per_word(bits) as u64;
        let start = set.offsets[id.string as usize];
        let end = set.offsets[id.string as usize + 1];
        let base = start + id.offset as u64 + word as u64 * spw;

        let mut key = 0u32;
        let mut dist = DIST_MAX;
        for k in 0..spw {
            let i = base + k;
            key <<= bits.get();
            if i < end {
                key |= set.stream.get(i as usize) as u32;
            } else if dist == DIST_MAX {
                dist = k as u32;
            }
        }
        (key << DIST_BITS) | dist
    }
}

/// One terminator token of the concatenated BWT: its destination slot and
/// the string owning it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimaryEntry {
    pub position: u64,
    pub string: u32,
}

/// Result of a string-set job.
#[derive(Debug)]
pub struct SetBwt {
    /// Dollar-token positions, strictly increasing; every string appears
    /// exactly once.
    pub primary_map: Vec<PrimaryEntry>,
}

/// Emit the concatenated BWT of `set` to `sink` and return the primary
/// map. Exactly `set.total_symbols() + set.strings()` symbols reach the
/// sink, terminator tokens included.
pub fn bwt_of_set<S: BwtSink>(
    set: &PackedStringSet,
    params: &BwtParams,
    ctl: &JobControl,
    sink: &mut S,
) -> Result<SetBwt, Error> {
    let m = set.strings();

    // 1. the terminator suffixes sort first, by string index; each row's
    // symbol is the last symbol of its string
    ctl.checkpoint()?;
    let mut batch: Vec<u8> = Vec::with_capacity(Ord::min(m, EMIT_CHUNK));
    for s in 0..m as u32 {
        batch.push(set.symbol(s, set.str_len(s) - 1));
        if batch.len() == EMIT_CHUNK {
            sink.process(&batch)?;
            batch.clear();
        }
    }
    sink.process(&batch)?;

    // 2. counting pass with width escalation; short buckets bypass the
    // sorter and are exempt from the budget check
    let capacity = params.sorter_capacity();
    let mut chosen = None;
    let mut refused = None;
    for &width in BUCKET_WIDTHS.iter() {
        ctl.checkpoint()?;
        let counts = collect::count_buckets(set, width);
        let mut worst = (0usize, 0u32);
        for (b, &c) in counts.iter().enumerate() {
            if c > worst.1 && !is_short_bucket(b as u32) {
                worst = (b, c);
            }
        }
        if worst.1 as usize <= capacity {
            ctl.note(|| {
                format!(
                    "width {}: largest sortable bucket holds {} suffixes",
                    width, worst.1
                )
            });
            chosen = Some((width, counts));
            break;
        }
        ctl.note(|| {
            format!(
                "bucket {:#x} of width {} holds {} suffixes; escalating",
                worst.0, width, worst.1
            )
        });
        refused = Some(Error::MemoryBudget {
            bucket: worst.0 as u32,
            count: worst.1 as u64,
            min_device_memory: worst.1 as u64 * 32,
        });
    }
    let (width, counts) = match chosen {
        Some(found) => found,
        None => return Err(refused.unwrap_or(Error::Cancelled)),
    };

    // 3. super-blocks in ascending bucket order
    let buckets = bucket_count(width);
    let superblock = params.superblock_capacity();
    let src = SetSuffixes { set };
    let depth = set.max_len() / syms_per_word(set.bits()) + 1;
    let mut sorter: BlockSorter<SetSuffix> = BlockSorter::new(capacity);
    let mut collected: Vec<SetSuffix> = Vec::new();
    let mut map: Vec<PrimaryEntry> = Vec::with_capacity(m);
    let mut slot = m as u64;

    let mut b_lo = 0usize;
    while b_lo < buckets {
        if counts[b_lo] == 0 {
            b_lo += 1;
            continue;
        }
        ctl.checkpoint()?;

        // an oversized short bucket never materialises: one dedicated
        // streaming pass copies it to the sink
        if counts[b_lo] as usize > superblock {
            debug_assert!(is_short_bucket(b_lo as u32));
            emit_bucket_streamed(set, width, b_lo, &mut slot, &mut map, sink)?;
            b_lo += 1;
            continue;
        }

        // grow the super-block while the host budget holds
        let mut b_hi = b_lo;
        let mut total = 0usize;
        while b_hi < buckets {
            let c = counts[b_hi] as usize;
            if c > superblock || total + c > superblock {
                break;
            }
            total += c;
            b_hi += 1;
        }
        collect::collect_superblock(set, width, b_lo..b_hi, &counts, &mut collected);

        // 4. sub-blocks: consecutive sortable buckets are batched up to the
        // device budget; short buckets are copied out in collection order
        let mut off = 0usize;
        let mut run = 0usize..0usize;
        for b in b_lo..b_hi {
            let c = counts[b] as usize;
            let here = off..off + c;
            off += c;
            if c == 0 {
                continue;
            }
            if is_short_bucket(b as u32) {
                if run.len() > 0 {
                    sort_and_emit(
                        set, &src, &mut sorter, &mut collected, run.clone(), depth, &mut slot,
                        &mut map, sink,
                    )?;
                }
                run = here.end..here.end;
                emit_ids(set, &collected[here], &mut slot, &mut map, sink)?;
            } else {
                debug_assert!(c <= capacity);
                if run.len() + c > capacity {
                    if run.len() > 0 {
                        sort_and_emit(
                            set, &src, &mut sorter, &mut collected, run.clone(), depth,
                            &mut slot, &mut map, sink,
                        )?;
                    }
                    run = here;
                } else if run.len() == 0 {
                    run = here;
                } else {
                    run.end = here.end;
                }
            }
        }
        if run.len() > 0 {
            sort_and_emit(
                set, &src, &mut sorter, &mut collected, run, depth, &mut slot, &mut map, sink,
            )?;
        }

        b_lo = b_hi;
    }
    sink.finish()?;

    debug_assert_eq!(map.len(), m);
    debug_assert_eq!(slot, m as u64 + set.total_symbols());
    Ok(SetBwt { primary_map: map })
}

fn sort_and_emit<S: BwtSink>(
    set: &PackedStringSet,
    src: &SetSuffixes<'_>,
    sorter: &mut BlockSorter<SetSuffix>,
    collected: &mut Vec<SetSuffix>,
    run: std::ops::Range<usize>,
    depth: u32,
    slot: &mut u64,
    map: &mut Vec<PrimaryEntry>,
    sink: &mut S,
) -> Result<(), Error> {
    sorter.sort(src, &mut collected[run.clone()], depth, TieBreak::Stable)?;
    emit_ids(set, &collected[run], slot, map, sink)
}

/// Emit the BWT symbols of a batch of suffixes: the symbol preceding each
/// suffix, or the terminator token for whole-string suffixes, which also
/// gain a primary-map entry.
fn emit_ids<S: BwtSink>(
    set: &PackedStringSet,
    ids: &[SetSuffix],
    slot: &mut u64,
    map: &mut Vec<PrimaryEntry>,
    sink: &mut S,
) -> Result<(), Error> {
    let mut batch: Vec<u8> = Vec::with_capacity(Ord::min(ids.len(), EMIT_CHUNK));
    for chunk in ids.chunks(EMIT_CHUNK) {
        batch.clear();
        for id in chunk {
            if id.offset == 0 {
                map.push(PrimaryEntry {
                    position: *slot,
                    string: id.string,
                });
                batch.push(DOLLAR);
            } else {
                batch.push(set.symbol(id.string, id.offset - 1));
            }
            *slot += 1;
        }
        sink.process(&batch)?;
    }
    Ok(())
}

/// Copy one short-string bucket to the sink without materialising it: a
/// dedicated in-order pass over the set.
fn emit_bucket_streamed<S: BwtSink>(
    set: &PackedStringSet,
    width: u32,
    bucket: usize,
    slot: &mut u64,
    map: &mut Vec<PrimaryEntry>,
    sink: &mut S,
) -> Result<(), Error> {
    let src = SetSuffixes { set };
    let bits = set.bits();
    let mut batch: Vec<u8> = Vec::with_capacity(EMIT_CHUNK);
    for s in 0..set.strings() as u32 {
        for p in 0..set.str_len(s) {
            let id = SetSuffix { string: s, offset: p };
            if bucket_of(src.radix_word(id, 0), width, bits) as usize != bucket {
                continue;
            }
            if p == 0 {
                map.push(PrimaryEntry {
                    position: *slot,
                    string: s,
                });
                batch.push(DOLLAR);
            } else {
                batch.push(set.symbol(s, p - 1));
            }
            *slot += 1;
            if batch.len() == EMIT_CHUNK {
                sink.process(&batch)?;
                batch.clear();
            }
        }
    }
    sink.process(&batch)?;
    Ok(())
}
