//! BWT symbol sinks and the primary-map file formats. A sink accepts symbol
//! batches strictly in destination-slot order and appends to an underlying
//! writer; the packed variants keep a word accumulator and flush the
//! trailing partial word on `finish`. Compression is the caller's concern:
//! any `io::Write` (including a gzip encoder) can back a sink.


use std::io::{self, Read, Write};

use crate::error::Error;
use crate::set_bwt::PrimaryEntry;
use crate::DOLLAR;

/// Receiver of emitted BWT symbols, called in destination-slot order.
pub trait BwtSink {
    /// Accept the next batch of symbols. [`DOLLAR`] marks a terminator
    /// token; each variant decides its representation.
    fn process(&mut self, symbols: &[u8]) -> Result<(), Error>;

    /// Flush buffered state. Call exactly once, after the final batch.
    fn finish(&mut self) -> Result<(), Error>;

    /// Symbols accepted so far, terminator tokens included.
    fn emitted(&self) -> u64;
}

/// One byte per symbol through a decode table; terminators as `$`.
pub struct AsciiSink<W: Write> {
    out: W,
    table: Vec<u8>,
    buf: Vec<u8>,
    emitted: u64,
}

impl<W: Write> AsciiSink<W> {
    pub fn new(out: W, table: &[u8]) -> Self {
        AsciiSink {
            out,
            table: table.to_vec(),
            buf: Vec::new(),
            emitted: 0,
        }
    }

    /// `A`, `C`, `G`, `T` for the 2-bit DNA codes.
    pub fn dna(out: W) -> Self {
        AsciiSink::new(out, b"ACGT")
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BwtSink for AsciiSink<W> {
    fn process(&mut self, symbols: &[u8]) -> Result<(), Error> {
        self.buf.clear();
        self.buf.reserve(symbols.len());
        for &sym in symbols {
            self.buf.push(if sym == DOLLAR {
                b'$'
            } else {
                self.table[sym as usize]
            });
        }
        self.out.write_all(&self.buf)?;
        self.emitted += symbols.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.out.flush()?;
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// 2-bit packed symbols, least significant first within a 32-bit word,
/// words serialized little-endian. Terminator tokens occupy no bits; they
/// are side-channelled through the primary marker or map.
pub struct Packed2Sink<W: Write> {
    out: W,
    word: u32,
    fill: u32,
    emitted: u64,
}

impl<W: Write> Packed2Sink<W> {
    pub fn new(out: W) -> Self {
        Packed2Sink {
            out,
            word: 0,
            fill: 0,
            emitted: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BwtSink for Packed2Sink<W> {
    fn process(&mut self, symbols: &[u8]) -> Result<(), Error> {
        for &sym in symbols {
            self.emitted += 1;
            if sym == DOLLAR {
                continue;
            }
            debug_assert!(sym < 4);
            self.word |= (sym as u32) << (2 * self.fill);
            self.fill += 1;
            if self.fill == 16 {
                self.out.write_all(&self.word.to_le_bytes())?;
                self.word = 0;
                self.fill = 0;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        if self.fill > 0 {
            self.out.write_all(&self.word.to_le_bytes())?;
            self.word = 0;
            self.fill = 0;
        }
        self.out.flush()?;
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// 4-bit packed symbols, least significant first within a 32-bit word,
/// words serialized little-endian. Terminator tokens are in-stream as the
/// value 4.
pub struct Packed4Sink<W: Write> {
    out: W,
    word: u32,
    fill: u32,
    emitted: u64,
}

impl<W: Write> Packed4Sink<W> {
    pub fn new(out: W) -> Self {
        Packed4Sink {
            out,
            word: 0,
            fill: 0,
            emitted: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> BwtSink for Packed4Sink<W> {
    fn process(&mut self, symbols: &[u8]) -> Result<(), Error> {
        for &sym in symbols {
            self.emitted += 1;
            let nibble = if sym == DOLLAR { 4 } else { sym as u32 };
            debug_assert!(nibble < 16);
            self.word |= nibble << (4 * self.fill);
            self.fill += 1;
            if self.fill == 8 {
                self.out.write_all(&self.word.to_le_bytes())?;
                self.word = 0;
                self.fill = 0;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        if self.fill > 0 {
            self.out.write_all(&self.word.to_le_bytes())?;
            self.word = 0;
            self.fill = 0;
        }
        self.out.flush()?;
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// Counts symbols and drops them; for measurement runs.
#[derive(Default)]
pub struct DiscardSink {
    emitted: u64,
}

impl DiscardSink {
    pub fn new() -> Self {
        DiscardSink::default()
    }
}

impl BwtSink for DiscardSink {
    fn process(&mut self, symbols: &[u8]) -> Result<(), Error> {
        self.emitted += symbols.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// Collects raw symbol codes in memory, terminator tokens as [`DOLLAR`].
#[derive(Default)]
pub struct VecSink {
    codes: Vec<u8>,
}

impl VecSink {
    pub fn new() -> Self {
        VecSink::default()
    }

    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    pub fn into_codes(self) -> Vec<u8> {
        self.codes
    }
}

impl BwtSink for VecSink {
    fn process(&mut self, symbols: &[u8]) -> Result<(), Error> {
        self.codes.extend_from_slice(symbols);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn emitted(&self) -> u64 {
        self.codes.len() as u64
    }
}

/// Write a primary map in ASCII: a `#PRI` header, then one
/// `<position> <string_id>` line per entry, sorted by position.
pub fn write_primary_ascii<W: Write>(mut out: W, entries: &[PrimaryEntry]) -> io::Result<()> {
    debug_assert!(entries.windows(2).all(|w| w[0].position < w[1].position));
    out.write_all(b"#PRI\n")?;
    for entry in entries {
        writeln!(out, "{} {}", entry.position, entry.string)?;
    }
    Ok(())
}

/// Read a map written by [`write_primary_ascii`].
pub fn read_primary_ascii<R: Read>(mut input: R) -> io::Result<Vec<PrimaryEntry>> {
    let mut text = String::new();
    input.read_to_string(&mut text)?;
    let mut lines = text.lines();
    if lines.next() != Some("#PRI") {
        return Err(bad_map("missing #PRI header"));
    }

    let mut entries = Vec::new();
    for line in lines {
        let mut fields = line.splitn(2, ' ');
        let position = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| bad_map("bad position field"))?;
        let string = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| bad_map("bad string_id field"))?;
        entries.push(PrimaryEntry { position, string });
    }
    Ok(entries)
}

/// Write a primary map in binary: the `PRIB` magic, then little-endian
/// `{u64 position, u32 string_id}` records, sorted by position.
pub fn write_primary_binary<W: Write>(mut out: W, entries: &[PrimaryEntry]) -> io::Result<()> {
    debug_assert!(entries.windows(2).all(|w| w[0].position < w[1].position));
    out.write_all(b"PRIB")?;
    for entry in entries {
        out.write_all(&entry.position.to_le_bytes())?;
        out.write_all(&entry.string.to_le_bytes())?;
    }
    Ok(())
}

/// Create a file and write the map in ASCII.
pub fn write_primary_ascii_file<P: AsRef<std::path::Path>>(
    name: P,
    entries: &[PrimaryEntry],
) -> io::Result<()> {
    use std::fs::File;
    use std::io::BufWriter;

    write_primary_ascii(BufWriter::new(File::create(name)?), entries)
}

/// Read an ASCII map file.
pub fn read_primary_ascii_file<P: AsRef<std::path::Path>>(
    name: P,
) -> io::Result<Vec<PrimaryEntry>> {
    use std::fs::File;
    use std::io::BufReader;

    read_primary_ascii(BufReader::new(File::open(name)?))
}

/// Create a file and write the map in binary.
pub fn write_primary_binary_file<P: AsRef<std::path::Path>>(
    name: P,
    entries: &[PrimaryEntry],
) -> io::Result<()> {
    use std::fs::File;
    use std::io::BufWriter;

    write_primary_binary(BufWriter::new(File::create(name)?), entries)
}

/// Read a binary map file.
pub fn read_primary_binary_file<P: AsRef<std::path::Path>>(
    name: P,
) -> io::Result<Vec<PrimaryEntry>> {
    use std::fs::File;
    use std::io::BufReader;

    read_primary_binary(BufReader::new(File::open(name)?))
}

/// Read a map written by [`write_primary_binary`].
pub fn read_primary_binary<R: Read>(mut input: R) -> io::Result<Vec<PrimaryEntry>> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    if bytes.len() < 4 || &bytes[..4] != b"PRIB" {
        return Err(bad_map("missing PRIB magic"));
    }
    let body = &bytes[4..];
    if body.len() % 12 != 0 {
        return Err(bad_map("truncated record"));
    }

    let mut entries = Vec::with_capacity(body.len() / 12);
    for record in body.chunks(12) {
        let mut position = [0u8; 8];
        position.copy_from_slice(&record[..8]);
        let mut string = [0u8; 4];
        string.copy_from_slice(&record[8..]);
        entries.push(PrimaryEntry {
            position: u64::from_le_bytes(position),
            string: u32::from_le_bytes(string),
        });
    }
    Ok(entries)
}

fn bad_map(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("primary map: {}", what))
}
