/// Rolling history of the last `P` block spectra.
///
/// `push` overwrites the oldest slot. `delayed(k)` returns the spectrum
/// pushed `k` blocks ago, so `delayed(0)` is the newest.
pub struct SpectrumHistory {
    slots: Box<[f32]>,
    count: usize,
    spectrum_len: usize,
    next: usize,
    newest: usize,
}

impl SpectrumHistory {
    pub fn new(count: usize, spectrum_len: usize) -> Self {
        Self {
            slots: vec![0.0; count * spectrum_len].into_boxed_slice(),
            count,
            spectrum_len,
            next: 0,
            newest: count - 1,
        }
    }

    pub fn clear(&mut self) {
        self.slots.fill(0.0);
        self.next = 0;
        self.newest = self.count - 1;
    }

    pub fn slots(&self) -> usize {
        self.count
    }

    /// Slot the next `push` will overwrite.
    pub fn next_slot(&self) -> usize {
        self.next
    }

    pub fn newest_slot(&self) -> usize {
        self.newest
    }

    pub fn push(&mut self, spectrum: &[f32]) {
        self.slot_mut(self.next).copy_from_slice(spectrum);
        self.advance();
    }

    /// Records a silent block, keeping later spectra aligned with their partitions.
    pub fn push_silence(&mut self) {
        self.slot_mut(self.next).fill(0.0);
        self.advance();
    }

    pub fn delayed(&self, delay: usize) -> &[f32] {
        let start = self.slot_for_delay(delay) * self.spectrum_len;
        &self.slots[start..start + self.spectrum_len]
    }

    // Steps back from the newest slot, wrapping past slot 0 without a division
    fn slot_for_delay(&self, delay: usize) -> usize {
        debug_assert!(delay < self.count);
        if delay <= self.newest {
            self.newest - delay
        } else {
            self.newest + self.count - delay
        }
    }

    fn slot_mut(&mut self, slot: usize) -> &mut [f32] {
        let start = slot * self.spectrum_len;
        &mut self.slots[start..start + self.spectrum_len]
    }

    fn advance(&mut self) {
        self.newest = self.next;
        self.next += 1;
        if self.next == self.count {
            self.next = 0;
        }
    }
}
