//! Per-minimizer k-mer load histogram.
//!
//! A dense array with one u64 cell per minimizer value (4^M cells). Each
//! rank accumulates the number of k-mers (not super-mers) whose minimizer
//! equals each value, then an all-reduce makes the totals global and
//! identical on every rank — the input to the greedy binner.

use crate::comm::Collective;
use crate::constants::minimizer_space;
use crate::error::CountError;

/// Dense minimizer-indexed k-mer counts
#[derive(Clone, Debug)]
pub struct LoadHistogram {
    m: usize,
    counts: Vec<u64>,
}

impl LoadHistogram {
    /// Create a zeroed histogram for minimizers of length `m`
    pub fn new(m: usize) -> Self {
        Self {
            m,
            counts: vec![0; minimizer_space(m)],
        }
    }

    /// Minimizer length
    pub fn m(&self) -> usize {
        self.m
    }

    /// Number of cells (4^M)
    pub fn num_minimizers(&self) -> usize {
        self.counts.len()
    }

    /// Attribute `kmers` k-mer occurrences to `minimizer`
    #[inline]
    pub fn add(&mut self, minimizer: u64, kmers: u64) {
        self.counts[minimizer as usize] += kmers;
    }

    /// The count for one minimizer value
    #[inline]
    pub fn get(&self, minimizer: u64) -> u64 {
        self.counts[minimizer as usize]
    }

    /// Total k-mer occurrences across all cells
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// The raw cell array
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Sum-reduce with every other rank; afterwards the histogram holds
    /// the global totals on every rank.
    pub fn all_reduce<C: Collective>(&mut self, comm: &C) -> Result<(), CountError> {
        comm.all_reduce_sum(&mut self.counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{SelfComm, ThreadComm};
    use std::thread;

    #[test]
    fn test_accumulation_and_total() {
        let mut hist = LoadHistogram::new(3);
        assert_eq!(hist.num_minimizers(), 64);
        hist.add(6, 4);
        hist.add(27, 1);
        hist.add(6, 2);
        assert_eq!(hist.get(6), 6);
        assert_eq!(hist.get(27), 1);
        assert_eq!(hist.total(), 7);
    }

    #[test]
    fn test_all_reduce_single_rank() {
        let mut hist = LoadHistogram::new(2);
        hist.add(0, 5);
        hist.all_reduce(&SelfComm).unwrap();
        assert_eq!(hist.get(0), 5);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn test_all_reduce_makes_totals_global() {
        let comms = ThreadComm::split(3);
        let results: Vec<Vec<u64>> = thread::scope(|scope| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    scope.spawn(move || {
                        let mut hist = LoadHistogram::new(2);
                        // Each rank contributes rank+1 k-mers to cell 3
                        hist.add(3, comm.rank() as u64 + 1);
                        hist.all_reduce(&comm).unwrap();
                        hist.counts().to_vec()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for counts in &results {
            assert_eq!(counts[3], 6); // 1 + 2 + 3
            assert_eq!(counts.iter().sum::<u64>(), 6);
        }
        // Identical on every rank
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }
}
