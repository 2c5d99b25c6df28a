// minikc: load-balanced minimizer-based distributed k-mer counting.
//
// Each rank extracts super-mers from its reads, the ranks agree on a
// load-balanced minimizer-to-rank assignment from a global histogram, the
// super-mers are shuffled to their owners, and every rank aggregates the
// counts for the k-mers it owns.

#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod binning;
pub mod comm;
pub mod constants;
pub mod count_table;
pub mod encoding;
pub mod error;
pub mod hasher;
pub mod histogram;
pub mod kmer;
pub mod minimizer;
pub mod pipeline;
pub mod superkmer;
pub mod wire;

// Re-export the common types at crate root
pub use binning::{greedy_assign, hash_mod_assign, BinningMode, RankMap};
pub use comm::{Collective, SelfComm, ThreadComm};
pub use count_table::CountTable;
pub use error::CountError;
pub use hasher::DeterministicHasher;
pub use histogram::LoadHistogram;
pub use kmer::{Kmer, KmerBits};
pub use minimizer::{Mmer, MinimizerWindow};
pub use pipeline::{CountConfiguration, CountStatistics, KmerCounter};
pub use superkmer::{SuperKmer, SuperKmerExtractor};

/// Version information
pub fn version() -> (u8, u8, u8) {
    (0, 1, 0)
}
