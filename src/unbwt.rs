//! Reversing a finished BWT. Both directions of the transform travel
//! through the LF mapping: row `r` of the sorted-rotation matrix is
//! preceded in the text by the symbol in column `L[r]`, and `LF(r)` is the
//! row starting with that symbol occurrence. Walking LF from a terminator
//! row therefore spells one string backwards.

use crate::error::Error;
use crate::set_bwt::PrimaryEntry;
use crate::DOLLAR;

/// Rebuild the original text from a single-string BWT as emitted by
/// [`crate::text_bwt::bwt_of_text`]: the terminator-free symbol stream plus
/// the primary marker.
pub fn invert_text(emitted: &[u8], primary: u64) -> Result<Vec<u8>, Error> {
    let n = emitted.len();
    if primary as usize > n {
        return Err(Error::InputFormat(format!(
            "primary {} outside a {}-symbol transform",
            primary, n
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut codes = Vec::with_capacity(n + 1);
    codes.extend_from_slice(&emitted[..primary as usize]);
    codes.push(DOLLAR);
    codes.extend_from_slice(&emitted[primary as usize..]);
    let lf = lf_table(&codes);

    // row 0 starts with the terminator; its column-L symbol is the last
    // symbol of the text
    let mut out = Vec::with_capacity(n);
    let mut row = 0u64;
    for _ in 0..n {
        let sym = codes[row as usize];
        if sym == DOLLAR {
            return Err(not_a_bwt());
        }
        out.push(sym);
        row = lf[row as usize];
    }
    if row != primary {
        return Err(not_a_bwt());
    }
    out.reverse();
    Ok(out)
}

/// Rebuild every string of a concatenated string-set BWT from its primary
/// map, as emitted by [`crate::set_bwt::bwt_of_set`]. `codes` must carry
/// the terminator tokens in-stream as [`DOLLAR`] (the in-memory form; a
/// 2-bit stream is re-expanded from the map first).
pub fn invert_set(codes: &[u8], map: &[PrimaryEntry]) -> Result<Vec<Vec<u8>>, Error> {
    let m = map.len();
    let n = codes.len();
    let dollars = codes.iter().filter(|&&sym| sym == DOLLAR).count();
    if dollars != m {
        return Err(Error::InputFormat(format!(
            "{} terminator tokens for {} map entries",
            dollars, m
        )));
    }

    let mut dollar_of = vec![None; m];
    let mut previous = None;
    for entry in map {
        if previous.map_or(false, |p| p >= entry.position) {
            return Err(Error::InputFormat("primary map not increasing".to_owned()));
        }
        previous = Some(entry.position);
        if entry.position as usize >= n || codes[entry.position as usize] != DOLLAR {
            return Err(Error::InputFormat(format!(
                "map position {} is not a terminator token",
                entry.position
            )));
        }
        let slot = dollar_of
            .get_mut(entry.string as usize)
            .ok_or_else(|| Error::InputFormat(format!("string id {} out of range", entry.string)))?;
        if slot.replace(entry.position).is_some() {
            return Err(Error::InputFormat(format!(
                "string id {} mapped twice",
                entry.string
            )));
        }
    }

    let lf = lf_table(codes);
    let mut out = Vec::with_capacity(m);
    for k in 0..m {
        // terminator rows occupy the first m slots in string order
        let mut string = Vec::new();
        let mut row = k as u64;
        loop {
            if string.len() > n {
                return Err(not_a_bwt());
            }
            let sym = codes[row as usize];
            if sym == DOLLAR {
                break;
            }
            string.push(sym);
            row = lf[row as usize];
        }
        if dollar_of[k] != Some(row) {
            return Err(not_a_bwt());
        }
        string.reverse();
        out.push(string);
    }
    Ok(out)
}

/// `LF(r)`: occurrences counted with the terminator below every symbol.
fn lf_table(codes: &[u8]) -> Vec<u64> {
    fn rank(sym: u8) -> usize {
        if sym == DOLLAR {
            0
        } else {
            sym as usize + 1
        }
    }

    let mut starts = [0u64; 257];
    for &sym in codes {
        starts[rank(sym) + 1] += 1;
    }
    for i in 1..257 {
        starts[i] += starts[i - 1];
    }

    let mut seen = vec![0u64; 256];
    let mut lf = Vec::with_capacity(codes.len());
    for &sym in codes {
        let r = rank(sym);
        lf.push(starts[r] + seen[r]);
        seen[r] += 1;
    }
    lf
}

fn not_a_bwt() -> Error {
    Error::InputFormat("not the transform of any input".to_owned())
}
