use super::state::EngineState;

impl EngineState {
    /// Emission work for one sample period: block head plus the previous
    /// block's tail plus the DAC bias.
    pub fn emit(&mut self) -> f32 {
        let value = self.input[self.cursors.output_read]
            + self.overlap[self.cursors.overlap_read]
            + self.dac_bias;
        self.advance_output();
        value
    }

    /// Advances the read cursors for a sample period whose emission was missed.
    pub fn skip_emission(&mut self) {
        self.advance_output();
    }

    fn advance_output(&mut self) {
        let geometry = self.geometry;

        let mut read = self.cursors.output_read + 2;
        if read & geometry.block_mask() == 0 {
            read += geometry.transform_size;
        }
        self.cursors.output_read = read & geometry.ping_pong_mask();

        let mut overlap = self.cursors.overlap_read + 2;
        if overlap == geometry.overlap_len() {
            overlap = 0;
        }
        self.cursors.overlap_read = overlap;
    }
}
