//! Typed failures of the construction pipeline. Every orchestrator entry
//! point returns these; the only error recovered internally is
//! [`Error::MemoryBudget`], which the bucketing-width escalation retries at
//! a wider width before surfacing it.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input record; surfaces at ingestion only.
    #[error("malformed input record: {0}")]
    InputFormat(String),

    /// A single bucket exceeds the device budget at the widest bucketing.
    /// Raising `device_memory` to at least `min_device_memory` would let the
    /// job proceed.
    #[error(
        "bucket {bucket:#x} holds {count} suffixes, exceeding the device \
         budget at the maximum bucketing width (device_memory of at least \
         {min_device_memory} bytes required)"
    )]
    MemoryBudget {
        bucket: u32,
        count: u64,
        min_device_memory: u64,
    },

    /// A fixed-capacity scratch structure would overflow. Indicates a tuning
    /// bug in the caller's block scheduling; fatal.
    #[error("block of {needed} suffixes exceeds the reserved sorter capacity of {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    /// The sampler's rank refinement failed to converge within its round
    /// limit.
    #[error("sampler rank refinement exceeded {rounds} rounds")]
    ConstructionLimit { rounds: u32 },

    /// Cooperative cancellation observed at a stage boundary.
    #[error("job cancelled")]
    Cancelled,

    /// The underlying output stream failed to accept bytes.
    #[error("sink error: {0}")]
    Sink(#[from] io::Error),
}
