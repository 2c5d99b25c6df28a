//! Rank-local k-mer count table.
//!
//! A hash map from packed k-mer to occurrence count with a seeded ahash
//! build hasher, so table layout is reproducible per run. The reduction is
//! add-one with default zero: associative and commutative, so receive
//! order never affects the final counts.

use crate::hasher::DeterministicHasher;
use crate::kmer::{Kmer, KmerBits};
use ahash::RandomState;
use std::collections::{BTreeMap, HashMap};

/// Local map from k-mer to count
#[derive(Clone, Debug)]
pub struct CountTable<const K: usize>
where
    Kmer<K>: KmerBits,
{
    map: HashMap<Kmer<K>, u64, RandomState>,
}

impl<const K: usize> CountTable<K>
where
    Kmer<K>: KmerBits,
{
    /// Create an empty table with the given hasher seed
    pub fn new(seed: u64) -> Self {
        Self {
            map: HashMap::with_hasher(DeterministicHasher::build_state(seed)),
        }
    }

    /// Reserve capacity for at least `additional` further insertions.
    ///
    /// Fallible so that an impossible reservation surfaces as an error
    /// instead of an allocator abort.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), std::collections::TryReserveError> {
        self.map.try_reserve(additional)
    }

    /// Count one occurrence of `kmer` (insert with 1 if absent)
    #[inline]
    pub fn add_one(&mut self, kmer: Kmer<K>) {
        *self.map.entry(kmer).or_insert(0) += 1;
    }

    /// The count recorded for `kmer` (0 if absent)
    pub fn count(&self, kmer: &Kmer<K>) -> u64 {
        self.map.get(kmer).copied().unwrap_or(0)
    }

    /// Number of distinct k-mers
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table holds no k-mers
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate (k-mer, count) pairs in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&Kmer<K>, &u64)> {
        self.map.iter()
    }

    /// All (k-mer, count) pairs sorted by k-mer value
    pub fn to_sorted_vec(&self) -> Vec<(Kmer<K>, u64)> {
        let mut pairs: Vec<(Kmer<K>, u64)> = self.map.iter().map(|(k, &c)| (*k, c)).collect();
        pairs.sort_unstable_by_key(|(k, _)| k.bits());
        pairs
    }

    /// Count-frequency histogram: how many distinct k-mers occur `c` times
    pub fn count_histogram(&self) -> BTreeMap<u64, u64> {
        let mut histo = BTreeMap::new();
        for &count in self.map.values() {
            *histo.entry(count).or_insert(0u64) += 1;
        }
        histo
    }
}

impl<const K: usize> PartialEq for CountTable<K>
where
    Kmer<K>: KmerBits,
{
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<const K: usize> Eq for CountTable<K> where Kmer<K>: KmerBits {}
