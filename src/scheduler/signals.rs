use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::Serialize;

/// Single-producer/single-consumer wake-up signal between priority tiers.
/// Posting a signal that is still pending means the consumer fell behind.
#[derive(Debug, Default)]
pub struct Signal {
    pending: AtomicU32,
}

impl Signal {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
        }
    }

    /// Returns how many earlier posts were still unconsumed.
    pub fn post(&self) -> u32 {
        self.pending.fetch_add(1, Ordering::AcqRel)
    }

    /// Consumes every pending post, returning their count.
    pub fn take(&self) -> u32 {
        self.pending.swap(0, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0
    }
}

/// Timing-fault counters. Written from the audio context, readable from any
/// thread through an `Arc`.
#[derive(Debug, Default)]
pub struct TimingCounters {
    samples: AtomicU64,
    blocks_processed: AtomicU64,
    emission_overruns: AtomicU64,
    block_overruns: AtomicU64,
    dropped_blocks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    // Overruns count every late block; dropped blocks are the subset
    // abandoned before their spectrum was stored.
    pub samples: u64,
    pub blocks_processed: u64,
    pub emission_overruns: u64,
    pub block_overruns: u64,
    pub dropped_blocks: u64,
}

impl TimingCounters {
    pub(crate) fn record_sample(&self) {
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_block(&self) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_emission_overrun(&self) {
        self.emission_overruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a late block; `spectrum_lost` also counts it as dropped.
    pub(crate) fn record_block_overrun(&self, spectrum_lost: bool) {
        self.block_overruns.fetch_add(1, Ordering::Relaxed);
        if spectrum_lost {
            self.dropped_blocks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> TimingReport {
        TimingReport {
            samples: self.samples.load(Ordering::Relaxed),
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            emission_overruns: self.emission_overruns.load(Ordering::Relaxed),
            block_overruns: self.block_overruns.load(Ordering::Relaxed),
            dropped_blocks: self.dropped_blocks.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.samples,
            &self.blocks_processed,
            &self.emission_overruns,
            &self.block_overruns,
            &self.dropped_blocks,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl TimingReport {
    pub fn has_faults(&self) -> bool {
        self.emission_overruns > 0 || self.block_overruns > 0
    }
}
