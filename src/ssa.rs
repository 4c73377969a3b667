//! Sampled suffix array: every `rate`-th entry of the suffix array in
//! sorted order, enough to recover genomic positions when paired with a
//! rank structure over the finished BWT. The `pack` feature adds a
//! bit-packed on-disk form.

#[cfg(feature = "pack")]
use bincode::config as bincode_config;
#[cfg(feature = "pack")]
use bitpacking::{BitPacker, BitPacker4x as Packer};
#[cfg(feature = "pack")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "pack")]
use std::io::prelude::*;
#[cfg(feature = "pack")]
use std::io::Result;

/// Suffix array samples over the sorted suffix order of `T$`; rank 0 is the
/// terminator suffix at position `N`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampledSuffixArray {
    rate: u32,
    samples: Vec<u32>,
}

impl SampledSuffixArray {
    pub fn new(rate: u32) -> Self {
        assert!(rate > 0);
        SampledSuffixArray {
            rate,
            samples: Vec::new(),
        }
    }

    /// Record the suffix position at a sorted rank, keeping every `rate`-th.
    pub(crate) fn observe(&mut self, rank: u64, position: u32) {
        if rank % self.rate as u64 == 0 {
            self.samples.push(position);
        }
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// The sampled positions; entry `i` is the suffix at sorted rank
    /// `i * rate`.
    pub fn samples(&self) -> &[u32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Write the samples in the bit-packed form.
    #[cfg(feature = "pack")]
    pub fn dump<W: Write>(&self, file: W) -> Result<()> {
        PackedSamples::from_samples(self).dump(file)
    }

    /// Dump the samples in the bit-packed form as bytes.
    #[cfg(feature = "pack")]
    pub fn dump_bytes(&self) -> Result<Vec<u8>> {
        PackedSamples::from_samples(self).dump_bytes()
    }

    /// Create a file and write the samples in the bit-packed form.
    #[cfg(feature = "pack")]
    pub fn dump_file<P: AsRef<std::path::Path>>(&self, name: P) -> Result<()> {
        use std::fs::File;
        use std::io::BufWriter;

        let file = BufWriter::new(File::create(name)?);
        PackedSamples::from_samples(self).dump(file)
    }

    /// Read samples written by [`SampledSuffixArray::dump`].
    #[cfg(feature = "pack")]
    pub fn load<R: Read>(file: R) -> Result<Self> {
        Ok(PackedSamples::load(file)?.into_samples())
    }

    /// Read a sample file.
    #[cfg(feature = "pack")]
    pub fn load_file<P: AsRef<std::path::Path>>(name: P) -> Result<Self> {
        use std::fs::File;
        use std::io::BufReader;

        let file = BufReader::new(File::open(name)?);
        Ok(PackedSamples::load(file)?.into_samples())
    }

    /// Load samples from bytes written by [`SampledSuffixArray::dump_bytes`].
    #[cfg(feature = "pack")]
    pub fn load_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(PackedSamples::load_bytes(bytes)?.into_samples())
    }
}

// Little endian of b"SSA4", i.e. Sampled Suffix Array using BitPacker4x.
#[cfg(feature = "pack")]
const MAGIC_SSA4: u32 = 876696403;

#[cfg(feature = "pack")]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PackedSamples {
    magic: u32,
    rate: u32,
    length: u32,
    width: u8,
    data: Vec<u8>,
}

#[cfg(feature = "pack")]
impl PackedSamples {
    fn from_samples(ssa: &SampledSuffixArray) -> Self {
        let mut samples = &ssa.samples[..];
        assert!(samples.len() as u64 <= std::u32::MAX as u64);

        let width = value_bits(samples.iter().cloned().max().unwrap_or(0));
        let u32_chunk_size = Packer::BLOCK_LEN;
        let u8_chunk_size = width as usize * Packer::BLOCK_LEN / 8;
        let chunk_count = ceiling_div(samples.len(), u32_chunk_size);

        let packer = Packer::new();
        let mut data = Vec::with_capacity(u8_chunk_size * chunk_count);
        let mut buf = vec![0u8; u8_chunk_size];
        while samples.len() >= u32_chunk_size {
            let (chunk, tail) = samples.split_at(u32_chunk_size);
            packer.compress(chunk, &mut buf[..], width);
            data.extend_from_slice(&buf[..]);
            samples = tail;
        }
        if samples.len() > 0 {
            let mut chunk = vec![0; u32_chunk_size];
            chunk[..samples.len()].copy_from_slice(samples);
            packer.compress(&chunk[..], &mut buf[..], width);

            let mut tail = buf.len();
            while tail > 0 && buf[tail - 1] == 0 {
                tail -= 1;
            }
            data.extend_from_slice(&buf[..tail]);
        }

        PackedSamples {
            magic: MAGIC_SSA4,
            rate: ssa.rate,
            length: ssa.samples.len() as u32,
            width,
            data,
        }
    }

    fn into_samples(self) -> SampledSuffixArray {
        assert_eq!(self.magic, MAGIC_SSA4);
        let width = self.width;
        let u32_chunk_size = Packer::BLOCK_LEN;
        let u8_chunk_size = width as usize * Packer::BLOCK_LEN / 8;

        let packer = Packer::new();
        let mut data = &self.data[..];
        let mut remain = self.length as usize;
        let mut samples = Vec::with_capacity(remain);
        let mut buf = vec![0u32; u32_chunk_size];
        while data.len() >= u8_chunk_size && remain > 0 {
            let (chunk, tail) = data.split_at(u8_chunk_size);
            packer.decompress(chunk, &mut buf[..], width);
            let n = if tail.len() == 0 {
                remain
            } else {
                u32_chunk_size
            };
            samples.extend_from_slice(&buf[..n]);
            data = tail;
            remain -= n;
        }
        if data.len() > 0 && remain > 0 {
            let mut chunk = vec![0; u8_chunk_size];
            chunk[..data.len()].copy_from_slice(data);
            packer.decompress(&chunk[..], &mut buf[..], width);
            samples.extend_from_slice(&buf[..remain]);
        }

        SampledSuffixArray {
            rate: self.rate,
            samples,
        }
    }

    fn dump<W: Write>(&self, file: W) -> Result<()> {
        let mut cfg = bincode_config();
        cfg.little_endian();
        match cfg.serialize_into(file, self) {
            Ok(_) => Ok(()),
            Err(e) => Err(error_conv(e)),
        }
    }

    fn dump_bytes(&self) -> Result<Vec<u8>> {
        let mut cfg = bincode_config();
        cfg.little_endian();
        match cfg.serialize(self) {
            Ok(bytes) => Ok(bytes),
            Err(e) => Err(error_conv(e)),
        }
    }

    fn load<R: Read>(file: R) -> Result<Self> {
        let mut cfg = bincode_config();
        cfg.little_endian();
        match cfg.deserialize_from(file) {
            Ok(packed) => Ok(packed),
            Err(e) => Err(error_conv(e)),
        }
    }

    fn load_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cfg = bincode_config();
        cfg.little_endian();
        match cfg.deserialize(bytes) {
            Ok(packed) => Ok(packed),
            Err(e) => Err(error_conv(e)),
        }
    }
}

#[cfg(feature = "pack")]
fn value_bits(max: u32) -> u8 {
    Ord::max(32 - max.leading_zeros(), 1) as u8
}

#[cfg(feature = "pack")]
fn ceiling_div(x: usize, y: usize) -> usize {
    x / y + usize::from(x % y != 0)
}

#[cfg(feature = "pack")]
fn error_conv(err: bincode::Error) -> std::io::Error {
    use bincode::ErrorKind as BincodeErrorKind;
    use std::io::{Error, ErrorKind as IoErrorKind};

    match *err {
        BincodeErrorKind::Io(e) => e,
        BincodeErrorKind::SizeLimit => {
            Error::new(IoErrorKind::Other, BincodeErrorKind::SizeLimit)
        }
        BincodeErrorKind::Custom(e) => Error::new(IoErrorKind::Other, e),
        e => Error::new(IoErrorKind::InvalidData, e),
    }
}
