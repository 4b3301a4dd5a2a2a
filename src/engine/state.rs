use crate::config::Geometry;
use crate::impulse::PartitionedImpulseResponse;

use super::history::SpectrumHistory;

/// Positions inside the ping-pong and overlap-add regions, in `f32` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    /// Next real slot written by acquisition.
    pub input_write: usize,
    /// Offset of the half last handed to the block processor.
    pub input_read: usize,
    /// Next real slot read by emission.
    pub output_read: usize,
    pub overlap_write: usize,
    pub overlap_read: usize,
}

impl Cursors {
    /// Start-up phase: writer at 0, readers one interleaved sample ahead.
    pub const INITIAL: Cursors = Cursors {
        input_write: 0,
        input_read: 0,
        output_read: 2,
        overlap_write: 0,
        overlap_read: 2,
    };
}

/// Every buffer and cursor shared by the three stages. Allocated once;
/// nothing here grows or shrinks after construction.
pub struct EngineState {
    pub(crate) geometry: Geometry,
    /// `4N` slots: two halves of `[N head | N zero-pad]`.
    pub(crate) input: Box<[f32]>,
    /// `2N` slots: forward result, accumulator and inverse input.
    pub(crate) spectrum: Box<[f32]>,
    pub(crate) history: SpectrumHistory,
    pub(crate) impulse: PartitionedImpulseResponse,
    /// `3N` slots of block tails awaiting emission.
    pub(crate) overlap: Box<[f32]>,
    pub(crate) cursors: Cursors,
    pub(crate) dac_bias: f32,
}

impl EngineState {
    /// Allocates and initializes all buffers. `impulse` must already have been
    /// checked against `geometry`.
    pub(crate) fn new(geometry: Geometry, impulse: PartitionedImpulseResponse, dac_bias: f32) -> Self {
        let mut state = Self {
            geometry,
            input: vec![0.0; geometry.ping_pong_len()].into_boxed_slice(),
            spectrum: vec![0.0; geometry.spectrum_len()].into_boxed_slice(),
            history: SpectrumHistory::new(geometry.partitions, geometry.spectrum_len()),
            impulse,
            overlap: vec![0.0; geometry.overlap_len()].into_boxed_slice(),
            cursors: Cursors::INITIAL,
            dac_bias,
        };
        state.initialize();
        log::info!(
            "convolution engine: N={} ({} samples/block), {} partitions, latency {} samples",
            geometry.transform_size,
            geometry.block_samples(),
            geometry.partitions,
            geometry.latency_samples()
        );
        state
    }

    /// Zeroes every working buffer and puts the cursors back to their start-up phase.
    pub fn initialize(&mut self) {
        self.input.fill(0.0);
        self.spectrum.fill(0.0);
        self.history.clear();
        self.overlap.fill(0.0);
        self.cursors = Cursors::INITIAL;
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    pub fn history(&self) -> &SpectrumHistory {
        &self.history
    }

    pub fn dac_bias(&self) -> f32 {
        self.dac_bias
    }

    /// True when `index` falls inside the `2N` working region starting at `offset`.
    pub(crate) fn in_half(&self, index: usize, offset: usize) -> bool {
        self.geometry.half_of(index) == offset
    }

    /// Overlap slot (block-sized) holding `index`.
    pub(crate) fn overlap_slot(&self, index: usize) -> usize {
        index / self.geometry.transform_size
    }
}
