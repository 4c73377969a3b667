//! Difference cover sampler: a periodic sample of suffix positions whose
//! ranks, once computed, give a constant-time total order on arbitrary
//! suffixes of one text. For any two positions `p`, `q` there is an offset
//! `δ < period` landing both on sampled positions, so a query compares at
//! most `δ` symbols and one pair of precomputed ranks.
//!
//! Covers and the sample-ranking scheme follow [Burkhardt and Kärkkäinen.
//! Fast Lightweight Suffix Array Construction and
//! Checking.](https://doi.org/10.1007/3-540-44888-8_5)


use std::cmp::Ordering;

use crate::block::{BlockSorter, TieBreak};
use crate::error::Error;
use crate::packed::PackedStream;
use crate::par;
use crate::radix::{masked_word, syms_per_word, text_radix_word, SuffixRadix};

/// A verified difference cover: every residue difference modulo the period
/// is realised by some pair of members.
#[derive(Clone, Copy, Debug)]
pub struct DifferenceCover {
    pub period: u32,
    pub members: &'static [u32],
}

/// Cover table keyed by text length. Longer texts take sparser samples at
/// the price of more symbol comparisons per oracle query.
pub const COVERS: [DifferenceCover; 5] = [
    DifferenceCover {
        period: 7,
        members: &[0, 1, 3],
    },
    DifferenceCover {
        period: 13,
        members: &[0, 1, 3, 9],
    },
    DifferenceCover {
        period: 21,
        members: &[0, 1, 6, 8, 18],
    },
    DifferenceCover {
        period: 31,
        members: &[0, 1, 3, 8, 12, 18],
    },
    DifferenceCover {
        period: 64,
        members: &[1, 2, 3, 6, 15, 17, 35, 43, 60],
    },
];

/// Pick a cover period for a text length.
pub fn cover_for(len: usize) -> DifferenceCover {
    if len < 1 << 16 {
        COVERS[0]
    } else if len < 1 << 20 {
        COVERS[1]
    } else if len < 1 << 24 {
        COVERS[2]
    } else if len < 1 << 28 {
        COVERS[3]
    } else {
        COVERS[4]
    }
}

/// The sampled-suffix rank oracle over one text. Built once per job,
/// immutable afterwards.
pub struct Dcs<'t> {
    text: &'t PackedStream,
    cover: DifferenceCover,
    res_index: [u8; 64],
    delta: Vec<u8>,
    ranks: Vec<u32>,
}

impl<'t> Dcs<'t> {
    /// Build the sampler with the period keyed by text length.
    pub fn build(text: &'t PackedStream) -> Result<Self, Error> {
        Dcs::build_with_cover(text, cover_for(text.len()))
    }

    /// Build the sampler for a specific cover: enumerate the sampled
    /// positions, rank them by their period-length symbol windows, and, if
    /// windows collide, refine by prefix doubling over the rank-reduced
    /// string.
    pub fn build_with_cover(
        text: &'t PackedStream,
        cover: DifferenceCover,
    ) -> Result<Self, Error> {
        let v = cover.period;
        debug_assert!(v <= 64 && !cover.members.is_empty());

        let mut res_index = [0xffu8; 64];
        for (i, &d) in cover.members.iter().enumerate() {
            res_index[d as usize] = i as u8;
        }
        let delta = delta_table(&cover);

        // Samples cover [0, n + v) so that every oracle offset lands on a
        // sampled slot; positions at or past the end read as terminators.
        let n = text.len() as u64;
        let end = n + v as u64;
        let blocks = (n / v as u64) + 2;
        let mut samples: Vec<u32> = Vec::with_capacity(blocks as usize * cover.members.len());
        for q in 0..blocks {
            for &d in cover.members.iter() {
                let p = q * v as u64 + d as u64;
                if p < end {
                    samples.push(p as u32);
                }
            }
        }
        let m = samples.len();

        let slot_of = |p: u32| -> usize {
            (p / v) as usize * cover.members.len() + res_index[(p % v) as usize] as usize
        };
        let mut ranks = vec![0u32; blocks as usize * cover.members.len()];

        // 1. order the samples by their period-length windows; the delayed
        // ranges are exactly the groups of equal windows
        let spw = syms_per_word(text.bits());
        let depth = (v + spw - 1) / spw;
        let windows = WindowSuffixes { text, window: v };
        let mut sorted = samples.clone();
        let mut sorter = BlockSorter::new(m);
        let mut groups = Vec::new();
        sorter.sort(&windows, &mut sorted[..], depth, TieBreak::Delay(&mut groups))?;

        // 2. dense window ranks in sorted order
        let mut tied = vec![false; m];
        for range in groups.iter() {
            for i in range.start + 1..range.end {
                tied[i] = true;
            }
        }
        let mut wrank = vec![0u32; m];
        let mut r = 0u32;
        for i in 1..m {
            if !tied[i] {
                r += 1;
            }
            wrank[i] = r;
        }
        let distinct = if m == 0 { 0 } else { r as usize + 1 };

        if distinct == m {
            // all windows distinct: window order is sampled-suffix order
            for (i, &p) in sorted.iter().enumerate() {
                ranks[slot_of(p)] = wrank[i];
            }
            return Ok(Dcs {
                text,
                cover,
                res_index,
                delta,
                ranks,
            });
        }

        // 3. reduce each sample to its window rank, samples grouped by
        // cover residue; suffix ranks of the reduced string are the
        // sampled-suffix ranks
        let mut counts = vec![0u32; cover.members.len()];
        for &p in samples.iter() {
            counts[res_index[(p % v) as usize] as usize] += 1;
        }
        let mut group_start = vec![0u32; cover.members.len() + 1];
        for g in 0..counts.len() {
            group_start[g + 1] = group_start[g] + counts[g];
        }
        let image = |p: u32| -> usize {
            (group_start[res_index[(p % v) as usize] as usize] + p / v) as usize
        };

        let mut reduced = vec![0u32; m];
        for (i, &p) in sorted.iter().enumerate() {
            reduced[image(p)] = wrank[i];
        }

        let round_limit = if n < 2 {
            2
        } else {
            34 - ((n - 1) as u32).leading_zeros()
        };
        let refined = rank_suffixes(&reduced, round_limit)?;
        for &p in samples.iter() {
            ranks[slot_of(p)] = refined[image(p)];
        }

        Ok(Dcs {
            text,
            cover,
            res_index,
            delta,
            ranks,
        })
    }

    pub fn period(&self) -> u32 {
        self.cover.period
    }

    #[inline]
    fn rank_at(&self, p: u32) -> u32 {
        let v = self.cover.period;
        let slot =
            (p / v) as usize * self.cover.members.len() + self.res_index[(p % v) as usize] as usize;
        self.ranks[slot]
    }

    #[inline]
    fn symbol_at(&self, p: u64) -> Option<u8> {
        if (p as usize) < self.text.len() {
            Some(self.text.get(p as usize))
        } else {
            None
        }
    }

    /// Total order of the suffixes starting at `p` and `q`: compare at most
    /// `δ < period` symbols (`None`, the terminator, below every symbol),
    /// then one pair of sampled ranks.
    pub fn compare(&self, p: u32, q: u32) -> Ordering {
        if p == q {
            return Ordering::Equal;
        }
        let v = self.cover.period;
        let d = self.delta[((p % v) * v + (q % v)) as usize] as u64;
        for i in 0..d {
            let a = self.symbol_at(p as u64 + i);
            let b = self.symbol_at(q as u64 + i);
            if a != b {
                return a.cmp(&b);
            }
        }
        self.rank_at(p + d as u32).cmp(&self.rank_at(q + d as u32))
    }
}

/// The sampled suffixes restricted to their first `window` symbols: radix
/// words past the window boundary are masked, so equal keys mean equal
/// windows.
struct WindowSuffixes<'a> {
    text: &'a PackedStream,
    window: u32,
}

impl<'a> SuffixRadix for WindowSuffixes<'a> {
    type Id = u32;

    #[inline]
    fn radix_word(&self, pos: u32, word: u32) -> u32 {
        let bits = self.text.bits();
        let spw = syms_per_word(bits);
        let key = text_radix_word(self.text, pos, word);
        let covered = self.window.saturating_sub(word * spw);
        if covered >= spw {
            key
        } else {
            masked_word(key, covered, bits)
        }
    }
}

/// `δ(i, j)`: the smallest offset landing both residues on cover members.
fn delta_table(cover: &DifferenceCover) -> Vec<u8> {
    let v = cover.period as usize;
    let mut member = [false; 64];
    for &d in cover.members.iter() {
        member[d as usize] = true;
    }

    let mut table = vec![0u8; v * v];
    for i in 0..v {
        for j in 0..v {
            let mut found = v;
            for d in 0..v {
                if member[(i + d) % v] && member[(j + d) % v] {
                    found = d;
                    break;
                }
            }
            debug_assert!(found < v, "not a difference cover");
            table[i * v + j] = found as u8;
        }
    }
    table
}

/// Dense suffix ranks of an integer string by prefix doubling. Each round
/// sorts by (rank, rank `k` ahead) and doubles `k`; ranks are total after
/// at most `⌈log₂ n⌉` rounds, and exceeding `round_limit` aborts with
/// [`Error::ConstructionLimit`].
fn rank_suffixes(s: &[u32], round_limit: u32) -> Result<Vec<u32>, Error> {
    let n = s.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let idx: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = s.to_vec();
    let mut pairs: Vec<(u64, u32)> = Vec::new();
    let mut k = 1usize;
    let mut rounds = 0u32;
    loop {
        par::map_into(&idx, &mut pairs, |&i| {
            let hi = rank[i as usize] as u64 + 1;
            let lo = if i as usize + k < n {
                rank[i as usize + k] as u64 + 1
            } else {
                0
            };
            ((hi << 32) | lo, i)
        });
        par::sort_by_key(&mut pairs, |&(key, _)| key);

        let mut next = vec![0u32; n];
        let mut r = 0u32;
        for j in 1..n {
            if pairs[j].0 != pairs[j - 1].0 {
                r += 1;
            }
            next[pairs[j].1 as usize] = r;
        }
        rank = next;
        if r as usize == n - 1 {
            return Ok(rank);
        }

        rounds += 1;
        if rounds > round_limit {
            return Err(Error::ConstructionLimit { rounds });
        }
        k *= 2;
    }
}
