//! Minimizer-to-rank assignment.
//!
//! The shuffle needs a globally agreed owner for every minimizer value.
//! Two strategies are available: greedy LPT binning over the global load
//! histogram (default), and seeded hash modulo the rank count (fallback
//! when load is roughly uniform). Both are pure functions of data every
//! rank already holds identically, so no communication is needed and every
//! rank computes the same map.

use crate::constants::minimizer_space;
use crate::hasher::DeterministicHasher;
use crate::histogram::LoadHistogram;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// How minimizers are assigned to owning ranks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BinningMode {
    /// Seeded hash of the minimizer modulo the rank count
    HashMod,
    /// Greedy longest-processing-time binning over the global histogram
    #[default]
    GreedyBinning,
}

/// Dense minimizer-to-owning-rank map, identical on every rank
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankMap {
    ranks: Vec<u32>,
    num_ranks: usize,
}

impl RankMap {
    /// The owning rank of a minimizer value
    #[inline]
    pub fn owner(&self, minimizer: u64) -> usize {
        self.ranks[minimizer as usize] as usize
    }

    /// Number of minimizer cells
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Number of ranks assigned into
    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    /// Per-rank total load implied by a histogram under this map
    pub fn rank_loads(&self, hist: &LoadHistogram) -> Vec<u64> {
        let mut loads = vec![0u64; self.num_ranks];
        for (minimizer, &rank) in self.ranks.iter().enumerate() {
            loads[rank as usize] += hist.get(minimizer as u64);
        }
        loads
    }
}

/// Greedy LPT assignment: minimizers in decreasing load order, each to the
/// currently least-loaded rank.
///
/// Sorting ties break by ascending minimizer index and argmin ties by
/// lowest rank id, so the result is fully deterministic given the
/// histogram. Minimizers with zero mass are spread round-robin instead of
/// all landing on rank 0 through the tie-break.
pub fn greedy_assign(hist: &LoadHistogram, num_ranks: usize) -> RankMap {
    assert!(num_ranks >= 1, "need at least one rank");
    let n = hist.num_minimizers();
    let counts = hist.counts();

    // Permutation of minimizer indices by (count desc, index asc)
    let mut order: Vec<u32> = (0..n as u32).collect();
    order.sort_unstable_by(|&a, &b| {
        counts[b as usize]
            .cmp(&counts[a as usize])
            .then(a.cmp(&b))
    });

    // Min-heap of (load, rank): pop order is lowest load, then lowest rank
    let mut heap: BinaryHeap<Reverse<(u64, u32)>> = (0..num_ranks as u32)
        .map(|r| Reverse((0u64, r)))
        .collect();

    let mut ranks = vec![0u32; n];
    let mut round_robin = 0u32;
    for idx in order {
        let count = counts[idx as usize];
        if count == 0 {
            ranks[idx as usize] = round_robin;
            round_robin = (round_robin + 1) % num_ranks as u32;
            continue;
        }
        let mut top = heap.peek_mut().expect("heap holds one entry per rank");
        ranks[idx as usize] = top.0 .1;
        top.0 .0 += count;
    }

    RankMap { ranks, num_ranks }
}

/// Hash-mod assignment: `hash(minimizer) % num_ranks` with the seeded
/// deterministic hasher.
pub fn hash_mod_assign(m: usize, num_ranks: usize, hasher: &DeterministicHasher) -> RankMap {
    assert!(num_ranks >= 1, "need at least one rank");
    let n = minimizer_space(m);
    let ranks = (0..n as u64)
        .map(|minimizer| (hasher.hash_u64(minimizer) % num_ranks as u64) as u32)
        .collect();
    RankMap { ranks, num_ranks }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SEED;

    fn histogram_from(m: usize, cells: &[(u64, u64)]) -> LoadHistogram {
        let mut hist = LoadHistogram::new(m);
        for &(minimizer, count) in cells {
            hist.add(minimizer, count);
        }
        hist
    }

    #[test]
    fn test_equal_pair_splits_across_ranks() {
        // Two minimizers of mass 100 must land on different ranks
        let hist = histogram_from(1, &[(0, 100), (1, 100)]);
        let map = greedy_assign(&hist, 2);
        assert_ne!(map.owner(0), map.owner(1));
        let loads = map.rank_loads(&hist);
        assert_eq!(loads.iter().max(), Some(&100));
    }

    #[test]
    fn test_lpt_reaches_optimal_makespan() {
        // 300 vs 100+100+100: makespan 300 on both ranks
        let hist = histogram_from(1, &[(0, 300), (1, 100), (2, 100), (3, 100)]);
        let map = greedy_assign(&hist, 2);
        let heavy = map.owner(0);
        assert_eq!(map.owner(1), 1 - heavy);
        assert_eq!(map.owner(2), 1 - heavy);
        assert_eq!(map.owner(3), 1 - heavy);
        let loads = map.rank_loads(&hist);
        assert_eq!(loads, vec![300, 300]);
    }

    #[test]
    fn test_argmin_ties_prefer_lowest_rank() {
        // A single minimizer on empty ranks goes to rank 0
        let hist = histogram_from(1, &[(2, 50)]);
        let map = greedy_assign(&hist, 4);
        assert_eq!(map.owner(2), 0);
    }

    #[test]
    fn test_zero_mass_round_robin() {
        // All-zero histogram: cells spread over the ranks, not piled on 0
        let hist = LoadHistogram::new(2);
        let map = greedy_assign(&hist, 4);
        let mut per_rank = [0usize; 4];
        for minimizer in 0..map.len() as u64 {
            per_rank[map.owner(minimizer)] += 1;
        }
        assert_eq!(per_rank, [4, 4, 4, 4]);
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let hist = histogram_from(3, &[(5, 7), (9, 7), (40, 2), (63, 11)]);
        let a = greedy_assign(&hist, 3);
        let b = greedy_assign(&hist, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_greedy_is_total_function() {
        let hist = histogram_from(2, &[(1, 3), (2, 9)]);
        let map = greedy_assign(&hist, 2);
        assert_eq!(map.len(), 16);
        for minimizer in 0..16u64 {
            assert!(map.owner(minimizer) < 2);
        }
    }

    #[test]
    fn test_hash_mod_is_deterministic_and_total() {
        let hasher = DeterministicHasher::new(DEFAULT_SEED);
        let a = hash_mod_assign(3, 4, &hasher);
        let b = hash_mod_assign(3, 4, &hasher);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((0..64u64).all(|mv| a.owner(mv) < 4));
        // With 64 cells over 4 ranks a seeded hash should touch every rank
        let touched: std::collections::HashSet<usize> = (0..64u64).map(|mv| a.owner(mv)).collect();
        assert_eq!(touched.len(), 4);
    }
}
