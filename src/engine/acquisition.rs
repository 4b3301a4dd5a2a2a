use super::state::EngineState;

/// What a single acquisition produced for the lower tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acquired {
    /// Offset of the ping-pong half that just filled, if this sample closed a block.
    pub block_ready: Option<usize>,
}

impl EngineState {
    /// Sample-interrupt work: store one real sample, zero its imaginary slot,
    /// and hop over the working region of a half when a block fills.
    pub fn acquire(&mut self, sample: f32) -> Acquired {
        let geometry = self.geometry;
        let mut write = self.cursors.input_write;

        self.input[write] = sample;
        self.input[write + 1] = 0.0;
        write += 2;

        let mut block_ready = None;
        if write & geometry.block_mask() == 0 {
            // Head of this half is full; its second N slots belong to the processor
            let filled = geometry.half_of(write - 2);
            self.cursors.input_read = filled;
            block_ready = Some(filled);
            write += geometry.transform_size;
        }

        self.cursors.input_write = write & geometry.ping_pong_mask();
        Acquired { block_ready }
    }
}
