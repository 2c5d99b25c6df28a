//! The counting pipeline: configuration and the per-rank driver.
//!
//! Each rank constructs a [`KmerCounter`] over its collective transport and
//! feeds it the local shard of reads; the result is the rank's share of the
//! global count table, partitioned exactly by minimizer ownership.

pub mod config;
pub mod counter;

pub use config::CountConfiguration;
pub use counter::{CountStatistics, KmerCounter};
