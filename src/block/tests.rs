use super::{BlockSorter, TieBreak};
use crate::packed::{BitOrder, PackedStream, SymbolBits};
use crate::radix::{syms_per_word, TextSuffixes};
use rand::random;
use std::cmp::Ordering;

fn gen_text(len: usize, scale: u8) -> Vec<u8> {
    (0..len).map(|_| random::<u8>() % scale).collect()
}

fn pack(symbols: &[u8]) -> PackedStream {
    PackedStream::from_symbols(SymbolBits::Two, BitOrder::MsbFirst, symbols)
}

// Lexicographic order of the suffixes of `s` with the implicit terminator:
// a proper prefix sorts before its extensions, which is slice order.
fn naive_suffix_sort(s: &[u8]) -> Vec<u32> {
    let mut ids: Vec<u32> = (0..s.len() as u32).collect();
    ids.sort_by(|&a, &b| s[a as usize..].cmp(&s[b as usize..]));
    ids
}

fn full_depth(len: usize) -> u32 {
    len as u32 / syms_per_word(SymbolBits::Two) + 1
}

#[test]
fn sort_matches_naive_suffix_order() {
    for &len in &[0usize, 1, 2, 13, 64, 200, 1000] {
        for &scale in &[1u8, 2, 4] {
            let symbols = gen_text(len, scale);
            let text = pack(&symbols);
            let src = TextSuffixes { text: &text };
            let mut ids: Vec<u32> = (0..len as u32).collect();
            let mut sorter = BlockSorter::new(len + 1);
            sorter
                .sort(&src, &mut ids[..], full_depth(len), TieBreak::Stable)
                .unwrap();
            assert_eq!(ids, naive_suffix_sort(&symbols), "len={} scale={}", len, scale);
        }
    }
}

#[test]
fn shallow_sort_delays_tied_groups() {
    // one radix word covers 14 symbols; suffixes of a long run of equal
    // symbols stay tied at depth 1
    let symbols = vec![1u8; 40];
    let text = pack(&symbols);
    let src = TextSuffixes { text: &text };
    let mut ids: Vec<u32> = (0..40).collect();
    let mut delayed = Vec::new();
    let mut sorter = BlockSorter::new(64);
    sorter
        .sort(&src, &mut ids[..], 1, TieBreak::Delay(&mut delayed))
        .unwrap();

    // suffixes 0..=26 all read fourteen 1-symbols in their first word
    assert_eq!(delayed, vec![13..40]);
    // suffixes 27..39 see the terminator inside their first word and sort
    // fully by distance, shortest suffix first
    let expect_head: Vec<u32> = (27..40).rev().collect();
    assert_eq!(&ids[..13], &expect_head[..]);
    // stable passes keep input order inside the tied group
    let tied: Vec<u32> = ids[13..].to_vec();
    let mut in_order = tied.clone();
    in_order.sort();
    assert_eq!(tied, in_order);
}

#[test]
fn oracle_resolves_ties() {
    let symbols = gen_text(300, 2);
    let text = pack(&symbols);
    let src = TextSuffixes { text: &text };
    let naive = naive_suffix_sort(&symbols);

    let oracle = |a: u32, b: u32| -> Ordering { symbols[a as usize..].cmp(&symbols[b as usize..]) };
    let mut ids: Vec<u32> = (0..300).collect();
    let mut sorter = BlockSorter::new(512);
    sorter
        .sort(&src, &mut ids[..], 1, TieBreak::Oracle(&oracle))
        .unwrap();
    assert_eq!(ids, naive);
}

#[test]
fn oversized_batch_is_refused() {
    let symbols = gen_text(10, 4);
    let text = pack(&symbols);
    let src = TextSuffixes { text: &text };
    let mut ids: Vec<u32> = (0..10).collect();
    let mut sorter = BlockSorter::new(4);
    match sorter.sort(&src, &mut ids[..], 1, TieBreak::Stable) {
        Err(crate::Error::BufferOverflow { needed, capacity }) => {
            assert_eq!((needed, capacity), (10, 4));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn trivial_batches_sort() {
    let symbols = gen_text(5, 4);
    let text = pack(&symbols);
    let src = TextSuffixes { text: &text };
    let mut sorter = BlockSorter::new(8);
    let mut empty: Vec<u32> = Vec::new();
    sorter.sort(&src, &mut empty[..], 3, TieBreak::Stable).unwrap();
    let mut one = vec![2u32];
    sorter.sort(&src, &mut one[..], 3, TieBreak::Stable).unwrap();
    assert_eq!(one, vec![2]);
}
