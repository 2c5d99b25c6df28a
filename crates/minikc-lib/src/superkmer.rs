//! Super-mer extraction.
//!
//! A super-mer is a maximal run of consecutive k-mers in a read that share
//! the same minimizer identity (value and start position). Shipping one
//! base payload per run instead of one k-mer per window is what keeps the
//! shuffle volume near the input size: a run of L k-mers travels as
//! K + L - 1 bases and expands back into exactly L k-mers on the receiver.

use crate::minimizer::{Mmer, MinimizerPos, MinimizerWindow};

/// A super-mer: the shared minimizer value plus the base codes covering
/// its run of k-mers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuperKmer {
    /// Packed minimizer value shared by every k-mer in the run
    pub minimizer: u64,
    /// Base codes of the run, length in [K, K + run - 1]
    pub bases: Vec<u8>,
}

impl SuperKmer {
    /// Number of k-mers this super-mer expands into
    #[inline]
    pub fn num_kmers(&self, k: usize) -> u64 {
        debug_assert!(self.bases.len() >= k);
        (self.bases.len() - k + 1) as u64
    }
}

/// Walks reads and emits (minimizer, super-mer) runs.
///
/// Reusable across reads: the window state is reset per read, the output
/// vector is fresh per call. Extraction is pure over its input.
pub struct SuperKmerExtractor {
    k: usize,
    m: usize,
}

impl SuperKmerExtractor {
    /// Create an extractor for k-mers of length `k` and minimizers of
    /// length `m` (requires m < k; validated by the pipeline config).
    pub fn new(k: usize, m: usize) -> Self {
        assert!(m >= 1 && m < k, "require 1 <= m < k, got m={} k={}", m, k);
        Self { k, m }
    }

    /// Extract the super-mers of one read, in read order.
    ///
    /// The emitted runs partition the read's k-mers exactly: every k-mer of
    /// a read of length N >= K is covered by exactly one run. Reads shorter
    /// than K emit nothing.
    pub fn extract(&self, bases: &[u8]) -> Vec<SuperKmer> {
        let (k, m) = (self.k, self.m);
        let n = bases.len();
        if n < k {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut mmer = Mmer::new(m);
        let mut win = MinimizerWindow::new();
        // Identity of the run currently open, and the start index of its
        // first k-mer.
        let mut open: Option<MinimizerPos> = None;
        let mut run_start = 0usize;

        for (i, &code) in bases.iter().enumerate() {
            debug_assert!(code <= 3, "unsanitized base code {}", code);
            mmer.next(code);
            if i + 1 >= m {
                win.insert(i + 1 - m, mmer.value());
            }
            if i + 1 < k {
                continue;
            }
            let kmer_start = i + 1 - k;
            win.retire(kmer_start);
            let cur = win
                .current()
                .expect("window holds at least one m-mer per k-mer");
            match open {
                Some(prev) if prev == cur => {}
                Some(prev) => {
                    // Minimizer identity changed: close the run ending at
                    // the previous k-mer.
                    out.push(SuperKmer {
                        minimizer: prev.value,
                        bases: bases[run_start..kmer_start + k - 1].to_vec(),
                    });
                    run_start = kmer_start;
                    open = Some(cur);
                }
                None => open = Some(cur),
            }
        }

        if let Some(last) = open {
            out.push(SuperKmer {
                minimizer: last.value,
                bases: bases[run_start..n].to_vec(),
            });
        }
        out
    }
}
