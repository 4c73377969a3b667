//! Bounded-capacity batch sorter: stable LSD radix sort over 32-bit suffix
//! radix words, deepest word first, so that every pass preserves the order
//! already established by the deeper passes. Groups still tied after the
//! maximum depth are detected and handled by a caller-chosen policy.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::ops::Range;

use crate::error::Error;
use crate::par;
use crate::radix::SuffixRadix;

/// Policy for groups still tied after the maximum word depth.
pub enum TieBreak<'a, Id> {
    /// Leave tied groups in stable (input) order.
    Stable,
    /// Leave tied groups in stable order and report their index ranges.
    Delay(&'a mut Vec<Range<usize>>),
    /// Resolve each tied group with a comparison oracle.
    Oracle(&'a (dyn Fn(Id, Id) -> Ordering + Sync)),
}

/// Sorts one bounded batch of suffix identifiers by their first `depth`
/// radix words. The scratch buffer is reserved once and reused across
/// batches; batches above the reserved capacity are refused.
pub struct BlockSorter<Id> {
    capacity: usize,
    scratch: Vec<(u32, Id)>,
}

impl<Id: Copy + Send + Sync> BlockSorter<Id> {
    pub fn new(capacity: usize) -> Self {
        BlockSorter {
            capacity,
            scratch: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permute `ids` into sorted order with respect to the first `depth`
    /// radix words of each suffix.
    pub fn sort<S>(
        &mut self,
        src: &S,
        ids: &mut [Id],
        depth: u32,
        tie: TieBreak<'_, Id>,
    ) -> Result<(), Error>
    where
        S: SuffixRadix<Id = Id>,
    {
        if ids.len() > self.capacity {
            return Err(Error::BufferOverflow {
                needed: ids.len(),
                capacity: self.capacity,
            });
        }
        if ids.len() > 1 {
            // 1. LSD passes, least significant word first
            for word in (0..depth).rev() {
                par::map_into(ids, &mut self.scratch, |&id| (src.radix_word(id, word), id));
                par::sort_by_key(&mut self.scratch, |&(key, _)| key);
                for (slot, &(_, id)) in self.scratch.iter().enumerate() {
                    ids[slot] = id;
                }
            }

            // 2. handle groups equal over every sorted word
            match tie {
                TieBreak::Stable => {}
                TieBreak::Delay(delayed) => collect_ties(src, ids, depth, delayed),
                TieBreak::Oracle(cmp) => {
                    let mut tied = Vec::new();
                    collect_ties(src, ids, depth, &mut tied);
                    for range in tied {
                        ids[range].sort_by(|&a, &b| cmp(a, b));
                    }
                }
            }
        }
        Ok(())
    }
}

fn keys_equal<S: SuffixRadix>(src: &S, a: S::Id, b: S::Id, depth: u32) -> bool {
    (0..depth).all(|word| src.radix_word(a, word) == src.radix_word(b, word))
}

/// Append the index range of every maximal run of suffixes whose first
/// `depth` radix words are all equal.
fn collect_ties<S: SuffixRadix>(
    src: &S,
    ids: &[S::Id],
    depth: u32,
    out: &mut Vec<Range<usize>>,
) {
    let mut start = 0;
    for i in 1..=ids.len() {
        let tied = i < ids.len() && keys_equal(src, ids[i - 1], ids[i], depth);
        if !tied {
            if i - start > 1 {
                out.push(start..i);
            }
            start = i;
        }
    }
}
