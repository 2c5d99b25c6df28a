use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use minikc_lib::encoding::encode_base;
use minikc_lib::{
    dispatch_on_k, BinningMode, CountConfiguration, CountTable, Kmer, KmerBits, KmerCounter,
    SelfComm, ThreadComm,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "minikc")]
#[command(version)]
#[command(about = "Load-balanced minimizer-based distributed k-mer counting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Greedy LPT binning over the global load histogram
    Greedy,
    /// Seeded hash of the minimizer modulo the rank count
    HashMod,
}

impl From<Mode> for BinningMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Greedy => BinningMode::GreedyBinning,
            Mode::HashMod => BinningMode::HashMod,
        }
    }
}

#[derive(clap::Args)]
struct RunArgs {
    /// Input FASTA/FASTQ file (may be gzipped)
    #[arg(short, long)]
    input: PathBuf,

    /// K-mer length
    #[arg(short, long)]
    k: usize,

    /// Minimizer length
    #[arg(short, long)]
    m: usize,

    /// Number of ranks to run (threads of this process)
    #[arg(short = 'r', long, default_value = "1")]
    ranks: usize,

    /// Minimizer-to-rank assignment strategy
    #[arg(long, value_enum, default_value = "greedy")]
    mode: Mode,

    /// Rayon threads for per-rank extraction (0 = all available cores)
    #[arg(short = 't', long, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Count k-mers and dump (k-mer, count) pairs
    Count {
        #[command(flatten)]
        run: RunArgs,

        /// Output TSV file (stdout if absent)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only dump k-mers with at least this count
        #[arg(long, default_value = "1")]
        min_count: u64,
    },

    /// Print the count-frequency histogram (count, distinct k-mers)
    Histo {
        #[command(flatten)]
        run: RunArgs,
    },
}

fn main() -> Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Count {
            run,
            output,
            min_count,
        } => count_command(run, output, min_count),
        Commands::Histo { run } => histo_command(run),
    }
}

fn count_command(run: RunArgs, output: Option<PathBuf>, min_count: u64) -> Result<()> {
    let k = run.k;
    dispatch_on_k!(k, K => {
        let tables = run_pipeline::<K>(&run)?;
        dump_counts::<K>(&tables, output.as_deref(), min_count)
    })
}

fn histo_command(run: RunArgs) -> Result<()> {
    let k = run.k;
    dispatch_on_k!(k, K => {
        let tables = run_pipeline::<K>(&run)?;
        dump_histogram::<K>(&tables)
    })
}

/// Run the counting pipeline over `run.ranks` simulated ranks and return
/// every rank's local table.
fn run_pipeline<const K: usize>(run: &RunArgs) -> Result<Vec<CountTable<K>>>
where
    Kmer<K>: KmerBits,
{
    if run.threads != 0 {
        // Ranks share the global rayon pool; size it once up front.
        rayon::ThreadPoolBuilder::new()
            .num_threads(run.threads)
            .build_global()
            .context("Failed to size the rayon thread pool")?;
    }

    let mut config = CountConfiguration::new(run.k, run.m)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    config.binning = run.mode.into();
    config.print();

    info!("Loading reads from {}...", run.input.display());
    let reads = load_reads(&run.input)?;
    let total_bases: usize = reads.iter().map(|r| r.len()).sum();
    info!("  {} reads, {} bases", reads.len(), total_bases);

    if run.ranks <= 1 {
        let counter = KmerCounter::new(config, SelfComm)?;
        return Ok(vec![counter.count::<K>(&reads)?]);
    }

    // Shard reads round-robin and run one rank per thread
    let mut shards: Vec<Vec<Vec<u8>>> = (0..run.ranks).map(|_| Vec::new()).collect();
    for (i, read) in reads.into_iter().enumerate() {
        shards[i % run.ranks].push(read);
    }

    let comms = ThreadComm::split(run.ranks);
    let tables: Vec<CountTable<K>> = std::thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .zip(shards)
            .map(|(comm, shard)| {
                let config = config.clone();
                scope.spawn(move || -> Result<CountTable<K>> {
                    let counter = KmerCounter::new(config, comm)?;
                    Ok(counter.count::<K>(&shard)?)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("rank thread panicked"))
            .collect::<Result<Vec<_>>>()
    })?;

    Ok(tables)
}

/// Parse FASTA/FASTQ into base-code reads, splitting at ambiguous bases.
///
/// The engine requires sanitized {0,1,2,3} codes; a record containing N (or
/// any other non-ACGT byte) is split into the ACGT stretches around it.
fn load_reads(path: &Path) -> Result<Vec<Vec<u8>>> {
    let mut reader = needletail::parse_fastx_file(path)
        .with_context(|| format!("Failed to open sequence file: {}", path.display()))?;

    let mut reads = Vec::new();
    while let Some(record) = reader.next() {
        let record = record
            .with_context(|| format!("Failed to parse record in {}", path.display()))?;
        split_into_code_chunks(&record.seq(), &mut reads);
    }
    Ok(reads)
}

/// Append the maximal ACGT stretches of `seq` to `reads`, as base codes.
fn split_into_code_chunks(seq: &[u8], reads: &mut Vec<Vec<u8>>) {
    let mut current: Vec<u8> = Vec::new();
    for &base in seq {
        match encode_base(base) {
            Some(code) => current.push(code),
            None => {
                if !current.is_empty() {
                    reads.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        reads.push(current);
    }
}

/// Write the merged (k-mer, count) pairs as TSV, sorted by k-mer value.
///
/// Minimizer ownership partitions the k-mer space exactly, so the per-rank
/// tables are disjoint and merging is concatenation.
fn dump_counts<const K: usize>(
    tables: &[CountTable<K>],
    output: Option<&Path>,
    min_count: u64,
) -> Result<()>
where
    Kmer<K>: KmerBits,
{
    let mut pairs: Vec<(Kmer<K>, u64)> = tables
        .iter()
        .flat_map(|t| t.to_sorted_vec())
        .collect();
    pairs.sort_unstable_by_key(|(kmer, _)| kmer.bits());

    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let mut dumped = 0u64;
    for (kmer, count) in pairs {
        if count >= min_count {
            writeln!(out, "{kmer}\t{count}")?;
            dumped += 1;
        }
    }
    out.flush()?;
    info!("Dumped {} k-mers", dumped);
    Ok(())
}

/// Print the count-frequency histogram of the merged tables.
fn dump_histogram<const K: usize>(tables: &[CountTable<K>]) -> Result<()>
where
    Kmer<K>: KmerBits,
{
    let mut histo: std::collections::BTreeMap<u64, u64> = std::collections::BTreeMap::new();
    for table in tables {
        for (count, distinct) in table.count_histogram() {
            *histo.entry(count).or_insert(0) += distinct;
        }
    }
    let mut out = BufWriter::new(std::io::stdout().lock());
    for (count, distinct) in histo {
        writeln!(out, "{count}\t{distinct}")?;
    }
    out.flush()?;
    Ok(())
}
