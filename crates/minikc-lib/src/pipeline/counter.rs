//! Per-rank counting pipeline driver.
//!
//! Every rank runs the same five phases over its local shard of reads:
//! extract super-mers, build and all-reduce the load histogram, compute the
//! minimizer-to-rank map, shuffle super-mers to their owners, and expand
//! the received super-mers into the local count table.
//!
//! The three collectives (histogram all-reduce, sizes all-to-all, payload
//! all-to-all) are entered in that order on every rank, including ranks
//! with zero local reads — the degenerate empty run still participates in
//! every exchange and returns an empty table.

use crate::binning::{greedy_assign, hash_mod_assign, BinningMode, RankMap};
use crate::comm::Collective;
use crate::count_table::CountTable;
use crate::encoding::is_valid_code;
use crate::error::CountError;
use crate::hasher::DeterministicHasher;
use crate::histogram::LoadHistogram;
use crate::kmer::{Kmer, KmerBits};
use crate::superkmer::{SuperKmer, SuperKmerExtractor};
use crate::wire::{self, FrameReader};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::config::CountConfiguration;

/// Summary counters for one rank's run, logged after aggregation
#[derive(Debug, Default, Clone)]
pub struct CountStatistics {
    /// Reads seen on this rank
    pub reads: u64,
    /// Reads shorter than K (contribute nothing)
    pub short_reads: u64,
    /// Super-mers extracted locally
    pub super_kmers: u64,
    /// K-mers covered by the extracted super-mers
    pub kmers_extracted: u64,
    /// Payload bytes shipped to other ranks (own bucket included)
    pub bytes_sent: u64,
    /// Payload bytes received
    pub bytes_received: u64,
    /// Super-mers received
    pub super_kmers_received: u64,
    /// K-mers inserted into the local table (after the predicate)
    pub kmers_inserted: u64,
}

impl CountStatistics {
    fn log_summary(&self, rank: usize, distinct: usize) {
        info!("Rank {} summary:", rank);
        info!("  reads: {} ({} shorter than k)", self.reads, self.short_reads);
        info!(
            "  super-mers out: {} covering {} k-mers, {} bytes",
            self.super_kmers, self.kmers_extracted, self.bytes_sent
        );
        info!(
            "  super-mers in: {} in {} bytes",
            self.super_kmers_received, self.bytes_received
        );
        info!(
            "  k-mers inserted: {} ({} distinct)",
            self.kmers_inserted, distinct
        );
    }
}

/// One rank's counting engine, bound to a collective transport
#[derive(Debug)]
pub struct KmerCounter<C: Collective> {
    config: CountConfiguration,
    comm: C,
}

impl<C: Collective> KmerCounter<C> {
    /// Create a counter; rejects an invalid configuration at the boundary.
    pub fn new(config: CountConfiguration, comm: C) -> Result<Self, CountError> {
        config.validate().map_err(|reason| CountError::InvalidInput {
            rank: comm.rank(),
            reason,
        })?;
        Ok(Self { config, comm })
    }

    /// The run configuration
    pub fn config(&self) -> &CountConfiguration {
        &self.config
    }

    /// The transport this counter communicates through
    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Count all k-mers of the local reads.
    ///
    /// `reads` are base-code sequences ({0,1,2,3} per element). On return,
    /// the table holds the global count for every k-mer whose minimizer
    /// this rank owns, and nothing else.
    pub fn count<const K: usize>(&self, reads: &[Vec<u8>]) -> Result<CountTable<K>, CountError>
    where
        Kmer<K>: KmerBits,
    {
        self.count_filtered(reads, |_| true)
    }

    /// Count with a predicate applied during local insertion; k-mers
    /// failing the predicate contribute nothing.
    pub fn count_filtered<const K: usize, F>(
        &self,
        reads: &[Vec<u8>],
        predicate: F,
    ) -> Result<CountTable<K>, CountError>
    where
        Kmer<K>: KmerBits,
        F: Fn(&Kmer<K>) -> bool,
    {
        assert_eq!(K, self.config.k, "k-mer length must match configuration");
        let rank = self.comm.rank();
        let mut stats = CountStatistics::default();

        info!(
            "Rank {}/{}: counting k-mers in {} reads",
            rank,
            self.comm.num_ranks(),
            reads.len()
        );

        // Phase 1: super-mer extraction (pure, parallel across reads)
        let super_kmers = self.extract_super_kmers(reads, &mut stats)?;
        debug!(
            "Rank {}: extracted {} super-mers",
            rank, stats.super_kmers
        );

        // Phase 2: load histogram, then the first collective
        let mut histogram = LoadHistogram::new(self.config.m);
        for sk in &super_kmers {
            histogram.add(sk.minimizer, sk.num_kmers(self.config.k));
        }
        histogram.all_reduce(&self.comm)?;
        debug!(
            "Rank {}: global histogram totals {} k-mers",
            rank,
            histogram.total()
        );

        // Phase 3: minimizer-to-rank map, identical on every rank
        let rank_map = match self.config.binning {
            BinningMode::GreedyBinning => greedy_assign(&histogram, self.comm.num_ranks()),
            BinningMode::HashMod => hash_mod_assign(
                self.config.m,
                self.comm.num_ranks(),
                &DeterministicHasher::new(self.config.seed),
            ),
        };

        // Phase 4: bucket by owner and run both exchanges
        let received = self.shuffle(&super_kmers, &rank_map, &mut stats)?;
        drop(super_kmers);
        drop(histogram);
        drop(rank_map);

        // Phase 5: expand and aggregate locally
        let table = self.aggregate(&received, predicate, &mut stats)?;
        stats.log_summary(rank, table.len());
        Ok(table)
    }

    /// Validate base codes and extract super-mers, preserving read order.
    fn extract_super_kmers(
        &self,
        reads: &[Vec<u8>],
        stats: &mut CountStatistics,
    ) -> Result<Vec<SuperKmer>, CountError> {
        let rank = self.comm.rank();
        let k = self.config.k;
        let extractor = SuperKmerExtractor::new(k, self.config.m);

        let per_read: Vec<Vec<SuperKmer>> = reads
            .par_iter()
            .enumerate()
            .map(|(read_index, bases)| {
                if let Some(position) = bases.iter().position(|&c| !is_valid_code(c)) {
                    return Err(CountError::InvalidInput {
                        rank,
                        reason: format!(
                            "read {} has base code {} at position {}",
                            read_index, bases[position], position
                        ),
                    });
                }
                Ok(extractor.extract(bases))
            })
            .collect::<Result<_, _>>()?;

        stats.reads = reads.len() as u64;
        stats.short_reads = reads.iter().filter(|r| r.len() < k).count() as u64;

        let super_kmers: Vec<SuperKmer> = per_read.into_iter().flatten().collect();
        stats.super_kmers = super_kmers.len() as u64;
        stats.kmers_extracted = super_kmers.iter().map(|sk| sk.num_kmers(k)).sum();
        Ok(super_kmers)
    }

    /// Stable-partition super-mers by owning rank and exchange them.
    ///
    /// Returns the received payload bytes, frames concatenated in source
    /// rank order.
    fn shuffle(
        &self,
        super_kmers: &[SuperKmer],
        rank_map: &RankMap,
        stats: &mut CountStatistics,
    ) -> Result<Vec<u8>, CountError> {
        let rank = self.comm.rank();
        let p = self.comm.num_ranks();

        let mut send_super_kmers = vec![0u64; p];
        let mut send_bytes = vec![0u64; p];
        for sk in super_kmers {
            let owner = rank_map.owner(sk.minimizer);
            send_super_kmers[owner] += 1;
            send_bytes[owner] += wire::frame_len(sk.bases.len()) as u64;
        }

        // Fill per-destination buckets in emission order (stable partition)
        let mut buckets: Vec<Vec<u8>> = send_bytes
            .iter()
            .map(|&b| Vec::with_capacity(b as usize))
            .collect();
        for sk in super_kmers {
            wire::encode_super_kmer(&mut buckets[rank_map.owner(sk.minimizer)], sk);
        }

        // Second collective: per-destination (super-mer count, byte count)
        let mut sizes = Vec::with_capacity(2 * p);
        for dest in 0..p {
            sizes.push(send_super_kmers[dest]);
            sizes.push(send_bytes[dest]);
        }
        let recv_sizes = self.comm.all_to_all(&sizes, 2)?;

        // Third collective: the framed payloads themselves
        let send_counts: Vec<usize> = send_bytes.iter().map(|&b| b as usize).collect();
        let send_buf = buckets.concat();
        let (received, recv_counts) = self.comm.all_to_allv(&send_buf, &send_counts)?;

        // The sizes exchange drives the displacements; the payload exchange
        // must agree with it.
        for (src, &got) in recv_counts.iter().enumerate() {
            if got as u64 != recv_sizes[2 * src + 1] {
                return Err(CountError::CollectiveFailure {
                    rank,
                    op: "all_to_allv",
                    reason: format!(
                        "rank {} announced {} bytes but delivered {}",
                        src,
                        recv_sizes[2 * src + 1],
                        got
                    ),
                });
            }
        }

        stats.bytes_sent = send_bytes.iter().sum();
        stats.bytes_received = received.len() as u64;
        stats.super_kmers_received = (0..p).map(|src| recv_sizes[2 * src]).sum();
        Ok(received)
    }

    /// Expand received super-mers and aggregate counts locally.
    fn aggregate<const K: usize, F>(
        &self,
        received: &[u8],
        predicate: F,
        stats: &mut CountStatistics,
    ) -> Result<CountTable<K>, CountError>
    where
        Kmer<K>: KmerBits,
        F: Fn(&Kmer<K>) -> bool,
    {
        let rank = self.comm.rank();
        let k = self.config.k;

        // First pass over the frames: reservation size
        let mut total_kmers = 0usize;
        for frame in FrameReader::new(received) {
            let frame = frame.map_err(|e| CountError::CollectiveFailure {
                rank,
                op: "all_to_allv",
                reason: e.to_string(),
            })?;
            if frame.base_count >= k {
                total_kmers += frame.base_count - k + 1;
            }
        }

        let mut table = CountTable::new(self.config.seed);
        table
            .try_reserve(total_kmers)
            .map_err(|_| CountError::CapacityExhausted {
                rank,
                kmers: total_kmers,
            })?;

        // Second pass: expand each frame with a rolling k-mer
        for frame in FrameReader::new(received) {
            let frame = frame.map_err(|e| CountError::CollectiveFailure {
                rank,
                op: "all_to_allv",
                reason: e.to_string(),
            })?;
            if frame.base_count < k {
                warn!(
                    "Rank {}: discarding short frame of {} bases",
                    rank, frame.base_count
                );
                continue;
            }
            let mut bases = frame.bases();
            let mut kmer = Kmer::<K>::from_codes(&mut bases)
                .expect("frame verified to hold at least k bases");
            if predicate(&kmer) {
                table.add_one(kmer);
                stats.kmers_inserted += 1;
            }
            for code in bases {
                kmer = kmer.shift_in(code);
                if predicate(&kmer) {
                    table.add_one(kmer);
                    stats.kmers_inserted += 1;
                }
            }
        }

        Ok(table)
    }
}
