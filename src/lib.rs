//! Blockwise suffix sorting and Burrows-Wheeler transform construction for
//! large genomic texts and short-read sets under bounded working memory.
//!
//! Two orchestrators form the entry points:
//!
//! * [`text_bwt::bwt_of_text`] partitions the suffixes of one long string
//!   into leading-radix buckets, sorts each bucket with bounded scratch and
//!   emits the BWT of `T$` (terminator removed) plus the primary marker,
//!   breaking deep ties with a difference cover sampler.
//! * [`set_bwt::bwt_of_set`] sorts the suffixes of a set of short strings
//!   through a counting/collecting pipeline bounded by a host and a device
//!   working-set budget, and emits the concatenated BWT together with the
//!   dollar-token primary map.
//!
//! The difference cover machinery is based on [Burkhardt and Kärkkäinen.
//! Fast Lightweight Suffix Array Construction and
//! Checking.](https://doi.org/10.1007/3-540-44888-8_5)

mod par;

pub mod block;
pub mod dcs;
pub mod error;
pub mod packed;
pub mod radix;
pub mod set_bwt;
pub mod sink;
pub mod ssa;
pub mod text_bwt;
pub mod unbwt;

#[cfg(test)]
mod tests;

pub use error::Error;
pub use packed::{BitOrder, PackedStream, SymbolBits};
pub use set_bwt::{PackedStringSet, PrimaryEntry, SetBwt};
pub use sink::BwtSink;
pub use ssa::SampledSuffixArray;
pub use text_bwt::TextBwt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Unpacked code of the terminator symbol. Never stored in a packed stream;
/// ordered below every alphabet symbol wherever suffixes are compared.
/// Alphabets are limited to 255 distinct codes: `0xff` is reserved.
pub const DOLLAR: u8 = 0xff;

/// Maximum length of a single input text. Suffix positions plus one sampler
/// period must stay addressable by `u32`.
pub const MAX_TEXT_LEN: usize = (std::u32::MAX - 64) as usize;

/// Maximum total number of suffixes in a string set.
pub const MAX_SET_SUFFIXES: u64 = std::u32::MAX as u64;

/// Working-set budgets of a BWT job, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BwtParams {
    /// Cap on the outer-pipeline scratch; sizes super-blocks.
    pub host_memory: u64,
    /// Cap on the inner-sorter scratch; sizes sub-blocks and the block
    /// sorter's reserved capacity.
    pub device_memory: u64,
}

impl Default for BwtParams {
    fn default() -> Self {
        BwtParams {
            host_memory: 8 << 30,
            device_memory: 2 << 30,
        }
    }
}

impl BwtParams {
    /// Number of suffixes one inner sort may hold.
    pub(crate) fn sorter_capacity(&self) -> usize {
        Ord::max(self.device_memory / 32, 1) as usize
    }

    /// Number of suffix identifiers one collected super-block may hold.
    /// Never smaller than the sorter capacity, so that every sortable
    /// bucket fits in a super-block of its own.
    pub(crate) fn superblock_capacity(&self) -> usize {
        let ids = self.host_memory.saturating_sub(128 << 20) / 8;
        Ord::max(ids as usize, self.sorter_capacity())
    }
}

/// Shared flag for coarse-grained cooperative cancellation. Orchestrators
/// poll it at stage boundaries and return [`Error::Cancelled`] once set;
/// partial sink output is not rewound.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-job control handles: the cancellation flag and an injected log
/// callback. The crate keeps no process-wide state.
#[derive(Default)]
pub struct JobControl<'a> {
    pub cancel: CancelToken,
    pub log: Option<&'a (dyn Fn(&str) + Sync)>,
}

impl<'a> JobControl<'a> {
    /// Stage boundary: observe cancellation.
    pub(crate) fn checkpoint(&self) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn note<F: FnOnce() -> String>(&self, line: F) {
        if let Some(log) = self.log {
            log(&line());
        }
    }
}
