//! Error taxonomy for the counting pipeline.
//!
//! Invalid input is rejected at the boundary, before any collective runs.
//! Once extraction has started, every error is fatal to the run and carries
//! the rank it originated on.

use thiserror::Error;

/// Errors produced by the counting pipeline
#[derive(Error, Debug)]
pub enum CountError {
    /// Bad input at the boundary: a read with a non-{0,1,2,3} base code,
    /// or an invalid (K, M) configuration.
    #[error("rank {rank}: invalid input: {reason}")]
    InvalidInput {
        /// Rank that rejected the input
        rank: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A collective operation (all-reduce or all-to-all) did not complete.
    /// Fatal to the run on every rank.
    #[error("rank {rank}: collective {op} failed: {reason}")]
    CollectiveFailure {
        /// Rank that observed the failure
        rank: usize,
        /// Which collective failed
        op: &'static str,
        /// Transport-level detail
        reason: String,
    },

    /// The local count table could not reserve memory for insertion.
    #[error("rank {rank}: failed to reserve count table capacity for {kmers} k-mers")]
    CapacityExhausted {
        /// Rank that ran out of memory
        rank: usize,
        /// Reservation size that failed
        kmers: usize,
    },
}

impl CountError {
    /// The rank the error originated on
    pub fn rank(&self) -> usize {
        match self {
            CountError::InvalidInput { rank, .. }
            | CountError::CollectiveFailure { rank, .. }
            | CountError::CapacityExhausted { rank, .. } => *rank,
        }
    }
}
