//! Dispatch between the work-stealing pool and plain loops, depending on
//! the `parallel` feature. Every primitive here is deterministic: sorts are
//! stable, mapped outputs keep their index order, and histogram merging is
//! elementwise addition reduced to a single canonical vector.

use std::cmp::Ordering;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Number of work chunks a pass over `n` items should be split into.
pub fn chunk_count(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    chunk_count_nonempty(n)
}

#[cfg(feature = "parallel")]
fn chunk_count_nonempty(n: usize) -> usize {
    Ord::min(n, rayon::current_num_threads() * 4)
}

#[cfg(not(feature = "parallel"))]
fn chunk_count_nonempty(n: usize) -> usize {
    Ord::min(n, 1)
}

/// Stable sort by an extracted key.
#[cfg(feature = "parallel")]
pub fn sort_by_key<T, K, F>(v: &mut [T], f: F)
where
    T: Send,
    K: Ord + Send,
    F: Fn(&T) -> K + Sync,
{
    v.par_sort_by_key(f);
}

#[cfg(not(feature = "parallel"))]
pub fn sort_by_key<T, K, F>(v: &mut [T], f: F)
where
    K: Ord,
    F: Fn(&T) -> K,
{
    v.sort_by_key(f);
}

/// Stable sort by a comparator.
#[cfg(feature = "parallel")]
pub fn sort_by<T, F>(v: &mut [T], cmp: F)
where
    T: Send,
    F: Fn(&T, &T) -> Ordering + Sync,
{
    v.par_sort_by(cmp);
}

#[cfg(not(feature = "parallel"))]
pub fn sort_by<T, F>(v: &mut [T], cmp: F)
where
    F: Fn(&T, &T) -> Ordering,
{
    v.sort_by(cmp);
}

/// Map `src` into `dst`, preserving index order.
#[cfg(feature = "parallel")]
pub fn map_into<I, O, F>(src: &[I], dst: &mut Vec<O>, f: F)
where
    I: Sync,
    O: Send,
    F: Fn(&I) -> O + Sync,
{
    src.par_iter().map(|item| f(item)).collect_into_vec(dst);
}

#[cfg(not(feature = "parallel"))]
pub fn map_into<I, O, F>(src: &[I], dst: &mut Vec<O>, f: F)
where
    F: Fn(&I) -> O,
{
    dst.clear();
    dst.extend(src.iter().map(f));
}

/// Accumulate per-chunk histograms of `size` counters into one vector.
/// `count_into(chunk, counts)` adds chunk `chunk`'s contributions; merging
/// is commutative addition.
#[cfg(feature = "parallel")]
pub fn histogram<F>(chunks: usize, size: usize, count_into: F) -> Vec<u32>
where
    F: Fn(usize, &mut [u32]) + Sync,
{
    (0..chunks)
        .into_par_iter()
        .map(|chunk| {
            let mut counts = vec![0u32; size];
            count_into(chunk, &mut counts);
            counts
        })
        .reduce(
            || vec![0u32; size],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        )
}

#[cfg(not(feature = "parallel"))]
pub fn histogram<F>(chunks: usize, size: usize, count_into: F) -> Vec<u32>
where
    F: Fn(usize, &mut [u32]),
{
    let mut counts = vec![0u32; size];
    for chunk in 0..chunks {
        count_into(chunk, &mut counts);
    }
    counts
}
