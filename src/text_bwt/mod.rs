//! Single-string blockwise BWT construction. Suffixes are partitioned into
//! leading-radix buckets, each bucket is sorted with the bounded block
//! sorter (deep ties resolved by the difference cover sampler) and the BWT
//! symbols are emitted to the sink strictly in destination-slot order.
//!
//! The terminator's own symbol is never emitted: under ordered emission,
//! skipping it is the removal pass, and its slot is returned as the primary
//! marker in `[0, N]`.


use crate::block::{BlockSorter, TieBreak};
use crate::dcs::Dcs;
use crate::error::Error;
use crate::packed::PackedStream;
use crate::par;
use crate::radix::{
    bucket_count, bucket_of, syms_per_word, text_radix_word, TextSuffixes, BUCKET_WIDTHS,
};
use crate::sink::BwtSink;
use crate::ssa::SampledSuffixArray;
use crate::{BwtParams, JobControl, MAX_TEXT_LEN};

/// Result of a single-string job.
#[derive(Debug)]
pub struct TextBwt {
    /// Position of the terminator in the BWT of `T$`, before removal.
    pub primary: u64,
    /// Suffix array samples, when a sampling rate was requested.
    pub samples: Option<SampledSuffixArray>,
}

/// Emit the BWT of `text` to `sink` and return the primary marker.
///
/// Exactly `text.len()` symbols reach the sink; the bucketing width
/// escalates across [`BUCKET_WIDTHS`] if a bucket overflows the device
/// budget, and nothing is emitted before a width is accepted.
pub fn bwt_of_text<S: BwtSink>(
    text: &PackedStream,
    params: &BwtParams,
    ctl: &JobControl,
    sink: &mut S,
) -> Result<TextBwt, Error> {
    bwt_of_text_sampled(text, params, ctl, None, sink)
}

/// As [`bwt_of_text`], additionally sampling every `rate`-th entry of the
/// suffix array in sorted order.
pub fn bwt_of_text_sampled<S: BwtSink>(
    text: &PackedStream,
    params: &BwtParams,
    ctl: &JobControl,
    sample_rate: Option<u32>,
    sink: &mut S,
) -> Result<TextBwt, Error> {
    assert!(text.len() <= MAX_TEXT_LEN);

    if text.is_empty() {
        sink.finish()?;
        return Ok(TextBwt {
            primary: 0,
            samples: sample_rate.map(SampledSuffixArray::new),
        });
    }

    ctl.checkpoint()?;
    ctl.note(|| format!("building difference cover sampler over {} symbols", text.len()));
    let dcs = Dcs::build(text)?;

    let mut refused = None;
    for &width in BUCKET_WIDTHS.iter() {
        ctl.checkpoint()?;
        match run_with_width(text, &dcs, width, params, ctl, sample_rate, sink) {
            Err(Error::MemoryBudget {
                bucket,
                count,
                min_device_memory,
            }) => {
                ctl.note(|| {
                    format!(
                        "bucket {:#x} of width {} holds {} suffixes; escalating",
                        bucket, width, count
                    )
                });
                refused = Some(Error::MemoryBudget {
                    bucket,
                    count,
                    min_device_memory,
                });
            }
            done => return done,
        }
    }
    Err(refused.unwrap_or(Error::Cancelled))
}

/// One attempt at a fixed bucketing width. The histogram is counted and the
/// largest bucket checked against the device budget before any symbol is
/// emitted, so a refused width leaves the sink untouched.
pub fn bwt_of_text_with_width<S: BwtSink>(
    text: &PackedStream,
    width: u32,
    params: &BwtParams,
    ctl: &JobControl,
    sample_rate: Option<u32>,
    sink: &mut S,
) -> Result<TextBwt, Error> {
    assert!(text.len() <= MAX_TEXT_LEN);
    if text.is_empty() {
        sink.finish()?;
        return Ok(TextBwt {
            primary: 0,
            samples: sample_rate.map(SampledSuffixArray::new),
        });
    }
    let dcs = Dcs::build(text)?;
    run_with_width(text, &dcs, width, params, ctl, sample_rate, sink)
}

fn run_with_width<S: BwtSink>(
    text: &PackedStream,
    dcs: &Dcs<'_>,
    width: u32,
    params: &BwtParams,
    ctl: &JobControl,
    sample_rate: Option<u32>,
    sink: &mut S,
) -> Result<TextBwt, Error> {
    let n = text.len();
    let bits = text.bits();
    let buckets = bucket_count(width);
    let capacity = params.sorter_capacity();

    // 1. counting pass; no more chunk histograms than the input amortises
    let chunks = Ord::min(par::chunk_count(n), Ord::max(1, n / buckets));
    let chunk_len = (n + chunks - 1) / chunks;
    let counts = par::histogram(chunks, buckets, |chunk, counts| {
        let start = chunk * chunk_len;
        let end = Ord::min(start + chunk_len, n);
        for p in start..end {
            let key = text_radix_word(text, p as u32, 0);
            counts[bucket_of(key, width, bits) as usize] += 1;
        }
    });

    // 2. refuse the width before emitting anything
    let (worst, &largest) = counts
        .iter()
        .enumerate()
        .max_by_key(|&(_, &c)| c)
        .unwrap_or((0, &0));
    if largest as usize > capacity {
        return Err(Error::MemoryBudget {
            bucket: worst as u32,
            count: largest as u64,
            min_device_memory: largest as u64 * 32,
        });
    }
    ctl.note(|| {
        format!(
            "width {}: {} buckets, largest holds {} suffixes",
            width, buckets, largest
        )
    });

    // 3. destination offsets and the suffix partition, stable by position
    let mut starts = vec![0u32; buckets + 1];
    for b in 0..buckets {
        starts[b + 1] = starts[b] + counts[b];
    }
    let mut cursor: Vec<u32> = starts[..buckets].to_vec();
    let mut partition = vec![0u32; n];
    for p in 0..n {
        let key = text_radix_word(text, p as u32, 0);
        let b = bucket_of(key, width, bits) as usize;
        partition[cursor[b] as usize] = p as u32;
        cursor[b] += 1;
    }

    // 4. slot 0 belongs to the terminator suffix; its preceding symbol is
    // the last symbol of the text
    let mut ssa = sample_rate.map(SampledSuffixArray::new);
    sink.process(&[text.get(n - 1)])?;
    if let Some(ssa) = ssa.as_mut() {
        ssa.observe(0, n as u32);
    }

    // 5. per-bucket sort and ordered emission
    let src = TextSuffixes { text };
    let oracle = |a: u32, b: u32| dcs.compare(a, b);
    let spw = syms_per_word(bits);
    let depth = (dcs.period() + spw - 1) / spw;
    let mut sorter = BlockSorter::new(capacity);
    let mut batch: Vec<u8> = Vec::new();
    let mut slot: u64 = 1;
    let mut primary = 0u64;
    let mut seen_dollar = false;

    for b in 0..buckets {
        let range = starts[b] as usize..starts[b + 1] as usize;
        if range.is_empty() {
            continue;
        }
        ctl.checkpoint()?;
        let ids = &mut partition[range];
        sorter.sort(&src, ids, depth, TieBreak::Oracle(&oracle))?;

        batch.clear();
        for &p in ids.iter() {
            if let Some(ssa) = ssa.as_mut() {
                ssa.observe(slot, p);
            }
            if p == 0 {
                primary = slot;
                seen_dollar = true;
            } else {
                batch.push(text.get(p as usize - 1));
            }
            slot += 1;
        }
        sink.process(&batch)?;
    }
    sink.finish()?;

    debug_assert!(seen_dollar);
    debug_assert_eq!(slot, n as u64 + 1);
    Ok(TextBwt {
        primary,
        samples: ssa,
    })
}
