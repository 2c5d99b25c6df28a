//! Integration tests for the counting pipeline.
//!
//! These run the full five-phase pipeline, single- and multi-rank, and
//! check the counting contract: every k-mer of the global input is counted
//! on exactly one rank, with its global count.

use minikc_lib::encoding::encode_bases;
use minikc_lib::{
    BinningMode, CountConfiguration, CountTable, Kmer, KmerCounter, SelfComm, ThreadComm,
};
use std::collections::HashMap;
use std::thread;

/// Brute-force global reference: k-mer string -> count over all reads.
fn brute_force_counts(reads: &[&str], k: usize) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for read in reads {
        if read.len() < k {
            continue;
        }
        for i in 0..=read.len() - k {
            *counts.entry(read[i..i + k].to_string()).or_insert(0u64) += 1;
        }
    }
    counts
}

/// Run the pipeline on `num_ranks` thread ranks, reads dealt round-robin.
fn run_ranks<const K: usize>(
    config: &CountConfiguration,
    reads: &[&str],
    num_ranks: usize,
) -> Vec<CountTable<K>>
where
    Kmer<K>: minikc_lib::KmerBits,
{
    let mut shards: Vec<Vec<Vec<u8>>> = (0..num_ranks).map(|_| Vec::new()).collect();
    for (i, read) in reads.iter().enumerate() {
        shards[i % num_ranks].push(encode_bases(read.as_bytes()).unwrap());
    }

    let comms = ThreadComm::split(num_ranks);
    thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .zip(shards)
            .map(|(comm, shard)| {
                let config = config.clone();
                scope.spawn(move || {
                    let counter = KmerCounter::new(config, comm).unwrap();
                    counter.count::<K>(&shard).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Assert that the per-rank tables hold each global k-mer on exactly one
/// rank with its global count, and nothing else.
fn assert_exact_partition<const K: usize>(tables: &[CountTable<K>], reads: &[&str])
where
    Kmer<K>: minikc_lib::KmerBits,
{
    let expect = brute_force_counts(reads, K);

    let mut merged: HashMap<String, u64> = HashMap::new();
    for table in tables {
        for (kmer, &count) in table.iter() {
            let key = kmer.to_string();
            assert!(
                merged.insert(key.clone(), count).is_none(),
                "k-mer {} counted on more than one rank",
                key
            );
        }
    }
    assert_eq!(merged, expect);
}

/// Deterministic pseudo-random DNA (the usual LCG walk).
fn random_reads(num: usize, min_len: usize, span: usize, seed: u64) -> Vec<String> {
    let mut state = seed;
    let mut reads = Vec::with_capacity(num);
    for _ in 0..num {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let len = min_len + (state >> 33) as usize % span;
        let mut read = String::with_capacity(len);
        for _ in 0..len {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            read.push(b"ACGT"[(state >> 33) as usize % 4] as char);
        }
        reads.push(read);
    }
    reads
}

#[test]
fn test_single_rank_matches_brute_force() {
    let reads = ["ACGTACGTTGCAGTACGA", "TTTTTTTTTT", "GATTACAGATTACA"];
    let config = CountConfiguration::new(7, 3).unwrap();
    let counter = KmerCounter::new(config, SelfComm).unwrap();

    let codes: Vec<Vec<u8>> = reads
        .iter()
        .map(|r| encode_bases(r.as_bytes()).unwrap())
        .collect();
    let table = counter.count::<7>(&codes).unwrap();

    assert_exact_partition(&[table], &reads);
}

#[test]
fn test_two_ranks_duplicate_read() {
    // Both ranks hold AAAAA; whichever rank owns minimizer AAA holds
    // count 2, the other holds nothing.
    let config = CountConfiguration::new(5, 3).unwrap();
    let tables = run_ranks::<5>(&config, &["AAAAA", "AAAAA"], 2);

    let poly_a = Kmer::<5>::from_str("AAAAA").unwrap();
    let counts: Vec<u64> = tables.iter().map(|t| t.count(&poly_a)).collect();
    assert!(counts.contains(&2), "owner must hold the global count");
    let empty = tables.iter().filter(|t| t.is_empty()).count();
    assert_eq!(empty, 1, "the non-owner table must be empty");
}

#[test]
fn test_multi_rank_partition_is_exact() {
    let owned = random_reads(40, 20, 50, 99);
    let reads: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    let config = CountConfiguration::new(9, 4).unwrap();

    for num_ranks in [2, 3, 5] {
        let tables = run_ranks::<9>(&config, &reads, num_ranks);
        assert_exact_partition(&tables, &reads);
    }
}

#[test]
fn test_hash_mod_partition_is_exact() {
    let owned = random_reads(30, 15, 40, 1234);
    let reads: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    let mut config = CountConfiguration::new(9, 4).unwrap();
    config.binning = BinningMode::HashMod;

    let tables = run_ranks::<9>(&config, &reads, 3);
    assert_exact_partition(&tables, &reads);
}

#[test]
fn test_empty_input_runs_all_collectives() {
    // Zero reads on every rank: the pipeline must still complete its
    // collective sequence and return empty tables everywhere.
    let config = CountConfiguration::new(5, 3).unwrap();
    let tables = run_ranks::<5>(&config, &[], 3);
    assert_eq!(tables.len(), 3);
    assert!(tables.iter().all(|t| t.is_empty()));
}

#[test]
fn test_short_reads_contribute_nothing() {
    // One rank gets only a too-short read, the other a real one; the
    // short read must not disturb the result.
    let config = CountConfiguration::new(5, 3).unwrap();
    let reads = ["ACG", "ACGTACGT"];
    let tables = run_ranks::<5>(&config, &reads, 2);
    assert_exact_partition(&tables, &reads);
}

#[test]
fn test_rerun_is_deterministic() {
    let owned = random_reads(20, 20, 30, 7);
    let reads: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    let config = CountConfiguration::new(11, 5).unwrap();

    let first = run_ranks::<11>(&config, &reads, 3);
    let second = run_ranks::<11>(&config, &reads, 3);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.to_sorted_vec(), b.to_sorted_vec());
    }
}

#[test]
fn test_greedy_load_is_balanced_for_uniform_pair() {
    // Two equally heavy minimizers must not land on the same rank: feed
    // two reads with distinct minimizers and check both ranks own k-mers.
    let config = CountConfiguration::new(5, 3).unwrap();
    // Poly-C k-mers all have minimizer CCC, poly-G k-mers GGG
    let reads = ["CCCCCCCCCC", "GGGGGGGGGG"];
    let tables = run_ranks::<5>(&config, &reads, 2);
    assert_exact_partition(&tables, &reads);
    assert!(
        tables.iter().all(|t| !t.is_empty()),
        "equal masses must split across the ranks"
    );
}

#[test]
fn test_predicate_is_applied_per_rank() {
    let config = CountConfiguration::new(5, 3).unwrap();
    let reads = vec![encode_bases(b"ACGTACGTAC").unwrap()];
    let counter = KmerCounter::new(config, SelfComm).unwrap();
    // Count only k-mers whose first base is A
    let table = counter
        .count_filtered::<5, _>(&reads, |kmer| kmer.base_at(0) == 0)
        .unwrap();
    for (kmer, _) in table.iter() {
        assert_eq!(kmer.base_at(0), 0);
    }
    assert_eq!(table.count(&Kmer::from_str("ACGTA").unwrap()), 2);
}

#[test]
fn test_larger_k_sizes() {
    // K above the u64 storage boundary exercises the u128 path end to end
    let owned = random_reads(10, 40, 30, 31415);
    let reads: Vec<&str> = owned.iter().map(|s| s.as_str()).collect();
    let config = CountConfiguration::new(33, 9).unwrap();
    let tables = run_ranks::<33>(&config, &reads, 2);
    assert_exact_partition(&tables, &reads);
}
