use crate::packed::{BitOrder, PackedStream, SymbolBits};
use crate::radix::{bucket_of, text_radix_word, BUCKET_WIDTHS};
use crate::set_bwt::{bwt_of_set, PackedStringSet, PrimaryEntry};
use crate::sink::{
    read_primary_ascii, read_primary_ascii_file, read_primary_binary, read_primary_binary_file,
    write_primary_ascii, write_primary_ascii_file, write_primary_binary,
    write_primary_binary_file, AsciiSink, BwtSink, Packed2Sink, VecSink,
};
use crate::text_bwt::{bwt_of_text, bwt_of_text_sampled};
use crate::unbwt;
use crate::{BwtParams, Error, JobControl, DOLLAR};
use proptest::prelude::*;
use rand::random;

fn pack(symbols: &[u8]) -> PackedStream {
    PackedStream::from_symbols(SymbolBits::Two, BitOrder::MsbFirst, symbols)
}

fn gen_symbols(len: usize, scale: u8) -> Vec<u8> {
    (0..len).map(|_| random::<u8>() % scale).collect()
}

// Unsigned radix-key order and bucket order are both prefixes of
// lexicographic suffix order.
#[test]
fn radix_and_bucket_order_refine_suffix_order() {
    for &scale in &[1u8, 2, 4] {
        let symbols = gen_symbols(150, scale);
        let text = pack(&symbols);
        for p in 0..symbols.len() as u32 {
            for q in 0..symbols.len() as u32 {
                let order = symbols[p as usize..].cmp(&symbols[q as usize..]);
                let kp = text_radix_word(&text, p, 0);
                let kq = text_radix_word(&text, q, 0);
                if kp != kq {
                    assert_eq!(kp.cmp(&kq), order, "keys reorder p={} q={}", p, q);
                }
                for &width in BUCKET_WIDTHS.iter() {
                    let bp = bucket_of(kp, width, SymbolBits::Two);
                    let bq = bucket_of(kq, width, SymbolBits::Two);
                    if bp != bq {
                        assert_eq!(bp.cmp(&bq), order, "buckets reorder p={} q={}", p, q);
                    }
                }
            }
        }
    }
}

#[test]
fn end_to_end_dna_text_ascii() {
    let text = PackedStream::from_dna(b"ACGTACGT").unwrap();
    let mut sink = AsciiSink::dna(Vec::new());
    let out = bwt_of_text(
        &text,
        &BwtParams::default(),
        &JobControl::default(),
        &mut sink,
    )
    .unwrap();
    assert_eq!(out.primary, 2);
    assert_eq!(sink.into_inner(), b"TTAACCGG".to_vec());
}

#[test]
fn identical_inputs_produce_identical_output() {
    let symbols = gen_symbols(5000, 4);
    let text = pack(&symbols);
    let mut first = VecSink::new();
    let mut second = VecSink::new();
    let a = bwt_of_text(
        &text,
        &BwtParams::default(),
        &JobControl::default(),
        &mut first,
    )
    .unwrap();
    let b = bwt_of_text(
        &text,
        &BwtParams::default(),
        &JobControl::default(),
        &mut second,
    )
    .unwrap();
    assert_eq!(first.codes(), second.codes());
    assert_eq!(a.primary, b.primary);

    let reads: Vec<Vec<u8>> = (0..200)
        .map(|_| gen_symbols(1 + random::<usize>() % 30, 4))
        .collect();
    let mut set = PackedStringSet::new(SymbolBits::Two);
    for read in reads.iter() {
        set.push(read).unwrap();
    }
    let mut sa = VecSink::new();
    let mut sb = VecSink::new();
    let ma = bwt_of_set(&set, &BwtParams::default(), &JobControl::default(), &mut sa).unwrap();
    let mb = bwt_of_set(&set, &BwtParams::default(), &JobControl::default(), &mut sb).unwrap();
    assert_eq!(sa.codes(), sb.codes());
    assert_eq!(ma.primary_map, mb.primary_map);
}

// A thousand random 100-bp reads: re-expanding the BWT and primary map by
// the standard inversion recovers the set exactly.
#[test]
fn set_round_trip_thousand_reads() {
    let reads: Vec<Vec<u8>> = (0..1000).map(|_| gen_symbols(100, 4)).collect();
    let mut set = PackedStringSet::new(SymbolBits::Two);
    for read in reads.iter() {
        set.push(read).unwrap();
    }

    let mut sink = VecSink::new();
    let out = bwt_of_set(&set, &BwtParams::default(), &JobControl::default(), &mut sink).unwrap();

    assert_eq!(sink.emitted(), 1000 * 100 + 1000);
    assert_eq!(out.primary_map.len(), 1000);
    assert!(out
        .primary_map
        .windows(2)
        .all(|w| w[0].position < w[1].position));
    let mut ids: Vec<u32> = out.primary_map.iter().map(|e| e.string).collect();
    ids.sort();
    assert_eq!(ids, (0..1000).collect::<Vec<u32>>());

    assert_eq!(
        unbwt::invert_set(sink.codes(), &out.primary_map).unwrap(),
        reads
    );
}

// The packed encoding agrees with ASCII after the dollars are re-inserted
// at the mapped positions.
#[test]
fn packed_set_output_matches_ascii_after_reinsertion() {
    let reads: Vec<Vec<u8>> = (0..100)
        .map(|_| gen_symbols(1 + random::<usize>() % 20, 4))
        .collect();
    let mut set = PackedStringSet::new(SymbolBits::Two);
    for read in reads.iter() {
        set.push(read).unwrap();
    }

    let mut ascii = AsciiSink::dna(Vec::new());
    let map_a = bwt_of_set(&set, &BwtParams::default(), &JobControl::default(), &mut ascii).unwrap();
    let mut packed = Packed2Sink::new(Vec::new());
    let map_p = bwt_of_set(&set, &BwtParams::default(), &JobControl::default(), &mut packed).unwrap();
    assert_eq!(map_a.primary_map, map_p.primary_map);

    let total = packed.emitted() as usize;
    let bytes = packed.into_inner();
    let mut symbols: Vec<u8> = Vec::new();
    for chunk in bytes.chunks(4) {
        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        for i in 0..16 {
            symbols.push(b"ACGT"[((word >> (2 * i)) & 3) as usize]);
        }
    }
    symbols.truncate(total - map_p.primary_map.len());
    for entry in map_p.primary_map.iter() {
        symbols.insert(entry.position as usize, b'$');
    }
    assert_eq!(symbols, ascii.into_inner());
}

#[test]
fn primary_map_files_round_trip_engine_output() {
    let mut set = PackedStringSet::new(SymbolBits::Two);
    for read in &[&[0u8, 1][..], &[2, 3, 1][..], &[1][..]] {
        set.push(read).unwrap();
    }
    let mut sink = VecSink::new();
    let out = bwt_of_set(&set, &BwtParams::default(), &JobControl::default(), &mut sink).unwrap();

    let mut ascii = Vec::new();
    write_primary_ascii(&mut ascii, &out.primary_map).unwrap();
    assert_eq!(read_primary_ascii(&ascii[..]).unwrap(), out.primary_map);

    let mut binary = Vec::new();
    write_primary_binary(&mut binary, &out.primary_map).unwrap();
    assert_eq!(read_primary_binary(&binary[..]).unwrap(), out.primary_map);

    let dir = std::env::temp_dir();
    let ascii_path = dir.join(format!("blockwise_bwt_{}.pri", std::process::id()));
    let binary_path = dir.join(format!("blockwise_bwt_{}.prib", std::process::id()));
    write_primary_ascii_file(&ascii_path, &out.primary_map).unwrap();
    write_primary_binary_file(&binary_path, &out.primary_map).unwrap();
    assert_eq!(read_primary_ascii_file(&ascii_path).unwrap(), out.primary_map);
    assert_eq!(
        read_primary_binary_file(&binary_path).unwrap(),
        out.primary_map
    );
    let _ = std::fs::remove_file(ascii_path);
    let _ = std::fs::remove_file(binary_path);
}

#[cfg(feature = "pack")]
#[test]
fn sampled_suffix_array_pack_round_trip() {
    use crate::ssa::SampledSuffixArray;

    let symbols = gen_symbols(3000, 4);
    let text = pack(&symbols);
    let mut sink = VecSink::new();
    let out = bwt_of_text_sampled(
        &text,
        &BwtParams::default(),
        &JobControl::default(),
        Some(32),
        &mut sink,
    )
    .unwrap();
    let samples = out.samples.unwrap();
    assert_eq!(samples.len(), (3000 + 32) / 32);

    let bytes = samples.dump_bytes().unwrap();
    assert_eq!(SampledSuffixArray::load_bytes(&bytes).unwrap(), samples);

    let mut file = Vec::new();
    samples.dump(&mut file).unwrap();
    assert_eq!(SampledSuffixArray::load(&file[..]).unwrap(), samples);

    let path = std::env::temp_dir().join(format!("blockwise_bwt_{}.ssa", std::process::id()));
    samples.dump_file(&path).unwrap();
    assert_eq!(SampledSuffixArray::load_file(&path).unwrap(), samples);
    let _ = std::fs::remove_file(path);
}

#[test]
fn inversion_rejects_malformed_transforms() {
    // primary outside the stream
    match unbwt::invert_text(&[0, 1], 3) {
        Err(Error::InputFormat(_)) => {}
        other => panic!("unexpected: {:?}", other),
    }
    // a lone symbol with primary 0 walks straight into the terminator
    match unbwt::invert_text(&[0], 0) {
        Err(Error::InputFormat(_)) => {}
        other => panic!("unexpected: {:?}", other),
    }

    // map/token mismatches
    let codes = [1u8, 3, DOLLAR, 0, DOLLAR, 2];
    let entry = |position, string| PrimaryEntry { position, string };
    match unbwt::invert_set(&codes, &[entry(2, 0)]) {
        Err(Error::InputFormat(_)) => {}
        other => panic!("unexpected: {:?}", other),
    }
    match unbwt::invert_set(&codes, &[entry(2, 0), entry(3, 1)]) {
        Err(Error::InputFormat(_)) => {}
        other => panic!("unexpected: {:?}", other),
    }
    match unbwt::invert_set(&codes, &[entry(2, 0), entry(4, 0)]) {
        Err(Error::InputFormat(_)) => {}
        other => panic!("unexpected: {:?}", other),
    }

    // the intact transform of {"AC", "GT"} still inverts
    let strings = unbwt::invert_set(&codes, &[entry(2, 0), entry(4, 1)]).unwrap();
    assert_eq!(strings, vec![vec![0, 1], vec![2, 3]]);
}

proptest! {
    #[test]
    fn bwt_inversion_round_trip(s in prop::collection::vec(0u8..4, 0..600_usize)) {
        let text = pack(&s[..]);
        let mut sink = VecSink::new();
        let out = bwt_of_text(&text, &BwtParams::default(), &JobControl::default(), &mut sink).unwrap();
        prop_assert_eq!(unbwt::invert_text(sink.codes(), out.primary).unwrap(), s);
    }
}
