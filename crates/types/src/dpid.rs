//! Datapath-id allocation.
//!
//! Every worker builds its switches independently, so each one is handed a
//! private block of datapath ids. Blocks are `DPID_STRIDE` wide and start at
//! `stride * index + 1`, which keeps dpid 0 unused and guarantees that no two
//! workers can produce the same switch id as long as a worker never builds
//! more than `DPID_STRIDE` switches.
//!
//! Dpids are capped at [`MAX_DPID`], so only the first [`max_workers`]
//! blocks are usable: 65 workers of 1000 switches, a few more for smaller
//! topologies.

use crate::topology::MAX_DPID;

/// Width of the dpid block reserved for each worker.
pub const DPID_STRIDE: u64 = 1000;

/// A disjoint block of datapath ids assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentifierRange {
    /// Position of the worker in the dispatch order.
    pub worker_index: usize,
    /// First dpid in the block.
    pub base: u64,
    /// Size of the block.
    pub stride: u64,
}

impl IdentifierRange {
    /// Dpid of the `local_index`-th switch built by this worker.
    pub fn dpid(&self, local_index: u64) -> u64 {
        self.base + local_index
    }

    /// Whether `dpid` falls inside this block.
    #[cfg(test)]
    pub fn contains(&self, dpid: u64) -> bool {
        dpid >= self.base && dpid < self.base + self.stride
    }
}

/// Base offsets for `worker_count` workers, in dispatch order.
///
/// `offsets[i] == DPID_STRIDE * i + 1`. Zero workers yields an empty vector.
pub fn allocate(worker_count: usize) -> Vec<u64> {
    (0..worker_count as u64)
        .map(|i| DPID_STRIDE * i + 1)
        .collect()
}

/// Number of workers whose first `switches_per_worker` dpids stay within
/// [`MAX_DPID`]. Workers past this count have every `init` rejected.
pub fn max_workers(switches_per_worker: usize) -> usize {
    if switches_per_worker == 0 {
        return usize::MAX;
    }
    let size = switches_per_worker as u64;
    if size > MAX_DPID {
        return 0;
    }
    ((MAX_DPID - size) / DPID_STRIDE + 1) as usize
}

/// Full identifier ranges for `worker_count` workers, in dispatch order.
pub fn allocate_ranges(worker_count: usize) -> Vec<IdentifierRange> {
    allocate(worker_count)
        .into_iter()
        .enumerate()
        .map(|(worker_index, base)| IdentifierRange {
            worker_index,
            base,
            stride: DPID_STRIDE,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_three_workers() {
        assert_eq!(allocate(3), vec![1, 1001, 2001]);
    }

    #[test]
    fn test_allocate_zero_workers() {
        assert!(allocate(0).is_empty());
        assert!(allocate_ranges(0).is_empty());
    }

    #[test]
    fn test_offsets_strictly_increasing_with_uniform_stride() {
        for n in 0..64 {
            let offsets = allocate(n);
            assert_eq!(offsets.len(), n);
            for pair in offsets.windows(2) {
                assert!(pair[1] > pair[0]);
                assert_eq!(pair[1] - pair[0], DPID_STRIDE);
            }
        }
    }

    #[test]
    fn test_max_workers() {
        assert_eq!(max_workers(1000), 65);
        assert_eq!(max_workers(2), 66);
        assert_eq!(max_workers(0), usize::MAX);

        // The last worker that fits still ends at or below MAX_DPID.
        let last = allocate_ranges(max_workers(535)).pop().unwrap();
        assert!(last.dpid(534) <= MAX_DPID);
        let next = allocate_ranges(max_workers(535) + 1).pop().unwrap();
        assert!(next.dpid(534) > MAX_DPID);
    }

    #[test]
    fn test_ranges_are_disjoint() {
        let ranges = allocate_ranges(5);
        for (i, a) in ranges.iter().enumerate() {
            assert_eq!(a.worker_index, i);
            let last = a.dpid(DPID_STRIDE - 1);
            assert!(a.contains(a.base));
            assert!(a.contains(last));
            for b in ranges.iter().filter(|b| b.worker_index != i) {
                assert!(!b.contains(a.base));
                assert!(!b.contains(last));
            }
        }
    }
}
