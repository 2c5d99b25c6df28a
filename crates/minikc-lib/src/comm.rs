//! Collective communication seam.
//!
//! The pipeline talks to its peers exclusively through three collectives:
//! a sum all-reduce, a fixed-block all-to-all for sizes, and a
//! variable-length all-to-all for payload bytes. [`Collective`] abstracts
//! the transport; [`SelfComm`] is the trivial single-rank instance and
//! [`ThreadComm`] runs P ranks as threads of one process, synchronized by
//! barriers, for multi-rank runs and tests.
//!
//! All three operations block until every rank has entered them; ranks must
//! call them in the same order. There is no cancellation: a transport that
//! needs teardown must be torn down out-of-band.

use crate::error::CountError;
use std::sync::{Arc, Barrier, Mutex};

/// Collective operations over a fixed group of ranks
pub trait Collective {
    /// This participant's rank id in [0, num_ranks)
    fn rank(&self) -> usize;

    /// Number of participants
    fn num_ranks(&self) -> usize;

    /// Elementwise sum across all ranks; on return every rank's `buf`
    /// holds the global sums. `buf` must have the same length on every rank.
    fn all_reduce_sum(&self, buf: &mut [u64]) -> Result<(), CountError>;

    /// Personalized fixed-block exchange. `send` holds one `block`-element
    /// slice per destination rank (`send.len() == num_ranks * block`); the
    /// result holds one block per source rank.
    fn all_to_all(&self, send: &[u64], block: usize) -> Result<Vec<u64>, CountError>;

    /// Personalized variable-length byte exchange. `send` is partitioned by
    /// `send_counts` (bytes per destination, `send_counts.len() ==
    /// num_ranks`). Returns the received bytes, concatenated in source-rank
    /// order, and the per-source byte counts.
    fn all_to_allv(
        &self,
        send: &[u8],
        send_counts: &[usize],
    ) -> Result<(Vec<u8>, Vec<usize>), CountError>;
}

/// Single-rank transport: every collective is a local copy.
#[derive(Debug, Default, Clone)]
pub struct SelfComm;

impl Collective for SelfComm {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _buf: &mut [u64]) -> Result<(), CountError> {
        Ok(())
    }

    fn all_to_all(&self, send: &[u64], block: usize) -> Result<Vec<u64>, CountError> {
        debug_assert_eq!(send.len(), block);
        Ok(send.to_vec())
    }

    fn all_to_allv(
        &self,
        send: &[u8],
        send_counts: &[usize],
    ) -> Result<(Vec<u8>, Vec<usize>), CountError> {
        Ok((send.to_vec(), send_counts.to_vec()))
    }
}

/// Per-rank publication slots guarded by the group barrier.
///
/// Every collective follows the same two-phase protocol: each rank writes
/// its own slot, the group barriers, every rank reads all slots, the group
/// barriers again before slots may be reused.
struct ThreadCommShared {
    barrier: Barrier,
    words: Vec<Mutex<Vec<u64>>>,
    bytes: Vec<Mutex<(Vec<u8>, Vec<usize>)>>,
}

/// In-process multi-rank transport: one participant per thread.
///
/// Created as a group with [`ThreadComm::split`]; each handle is moved onto
/// its rank's thread. A rank that panics mid-collective leaves its peers
/// blocked on the barrier — collective failure is fatal and unrecoverable
/// by design, matching the failure model of the pipeline.
pub struct ThreadComm {
    rank: usize,
    shared: Arc<ThreadCommShared>,
}

impl ThreadComm {
    /// Create a group of `num_ranks` connected transports, one per rank.
    pub fn split(num_ranks: usize) -> Vec<ThreadComm> {
        assert!(num_ranks >= 1, "need at least one rank");
        let shared = Arc::new(ThreadCommShared {
            barrier: Barrier::new(num_ranks),
            words: (0..num_ranks).map(|_| Mutex::new(Vec::new())).collect(),
            bytes: (0..num_ranks)
                .map(|_| Mutex::new((Vec::new(), Vec::new())))
                .collect(),
        });
        (0..num_ranks)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn publish_words(&self, op: &'static str, data: Vec<u64>) -> Result<(), CountError> {
        let mut slot = self.shared.words[self.rank]
            .lock()
            .map_err(|e| self.failure(op, &e.to_string()))?;
        *slot = data;
        Ok(())
    }

    fn read_words(&self, op: &'static str, src: usize) -> Result<Vec<u64>, CountError> {
        let slot = self.shared.words[src]
            .lock()
            .map_err(|e| self.failure(op, &e.to_string()))?;
        Ok(slot.clone())
    }

    fn failure(&self, op: &'static str, reason: &str) -> CountError {
        CountError::CollectiveFailure {
            rank: self.rank,
            op,
            reason: reason.to_string(),
        }
    }
}

impl Collective for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.shared.words.len()
    }

    fn all_reduce_sum(&self, buf: &mut [u64]) -> Result<(), CountError> {
        const OP: &str = "all_reduce_sum";
        self.publish_words(OP, buf.to_vec())?;
        self.shared.barrier.wait();
        buf.fill(0);
        for src in 0..self.num_ranks() {
            let contribution = self.read_words(OP, src)?;
            if contribution.len() != buf.len() {
                return Err(self.failure(OP, "mismatched buffer length across ranks"));
            }
            for (acc, v) in buf.iter_mut().zip(contribution) {
                *acc += v;
            }
        }
        self.shared.barrier.wait();
        Ok(())
    }

    fn all_to_all(&self, send: &[u64], block: usize) -> Result<Vec<u64>, CountError> {
        const OP: &str = "all_to_all";
        let p = self.num_ranks();
        if send.len() != p * block {
            return Err(self.failure(OP, "send buffer does not hold one block per rank"));
        }
        self.publish_words(OP, send.to_vec())?;
        self.shared.barrier.wait();
        let mut recv = Vec::with_capacity(p * block);
        for src in 0..p {
            let published = self.read_words(OP, src)?;
            if published.len() != p * block {
                return Err(self.failure(OP, "mismatched block count across ranks"));
            }
            recv.extend_from_slice(&published[self.rank * block..(self.rank + 1) * block]);
        }
        self.shared.barrier.wait();
        Ok(recv)
    }

    fn all_to_allv(
        &self,
        send: &[u8],
        send_counts: &[usize],
    ) -> Result<(Vec<u8>, Vec<usize>), CountError> {
        const OP: &str = "all_to_allv";
        let p = self.num_ranks();
        if send_counts.len() != p || send_counts.iter().sum::<usize>() != send.len() {
            return Err(self.failure(OP, "send counts do not partition the send buffer"));
        }
        {
            let mut slot = self.shared.bytes[self.rank]
                .lock()
                .map_err(|e| self.failure(OP, &e.to_string()))?;
            *slot = (send.to_vec(), send_counts.to_vec());
        }
        self.shared.barrier.wait();
        let mut recv = Vec::new();
        let mut recv_counts = Vec::with_capacity(p);
        for src in 0..p {
            let slot = self.shared.bytes[src]
                .lock()
                .map_err(|e| self.failure(OP, &e.to_string()))?;
            let (ref data, ref counts) = *slot;
            if counts.len() != p {
                return Err(self.failure(OP, "mismatched rank count across ranks"));
            }
            let offset: usize = counts[..self.rank].iter().sum();
            let len = counts[self.rank];
            recv.extend_from_slice(&data[offset..offset + len]);
            recv_counts.push(len);
        }
        self.shared.barrier.wait();
        Ok((recv, recv_counts))
    }
}
