//! The transform primitive used by the block processor.
//!
//! Buffers are interleaved `[re, im, re, im, ...]` slices of `2N` reals. Both
//! directions are unnormalized: `inverse(forward(x)) == N * x`. Scale
//! compensation belongs to the convolution engine.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

pub trait Transform: Send {
    /// Number of complex points `N`.
    fn size(&self) -> usize;

    fn forward(&mut self, buffer: &mut [f32]);

    fn inverse(&mut self, buffer: &mut [f32]);
}

/// `rustfft`-backed transform. All working memory is allocated at construction
/// so neither direction allocates.
pub struct RustFftTransform {
    size: usize,
    forward_fft: Arc<dyn Fft<f32>>,
    inverse_fft: Arc<dyn Fft<f32>>,
    work: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward_fft = planner.plan_fft_forward(size);
        let inverse_fft = planner.plan_fft_inverse(size);
        let scratch_len = forward_fft
            .get_inplace_scratch_len()
            .max(inverse_fft.get_inplace_scratch_len());

        Self {
            size,
            forward_fft,
            inverse_fft,
            work: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    fn run(&mut self, buffer: &mut [f32], inverse: bool) {
        debug_assert_eq!(buffer.len(), self.size * 2);

        for (bin, pair) in self.work.iter_mut().zip(buffer.chunks_exact(2)) {
            *bin = Complex::new(pair[0], pair[1]);
        }

        let fft = if inverse {
            &self.inverse_fft
        } else {
            &self.forward_fft
        };
        fft.process_with_scratch(&mut self.work, &mut self.scratch);

        for (pair, bin) in buffer.chunks_exact_mut(2).zip(self.work.iter()) {
            pair[0] = bin.re;
            pair[1] = bin.im;
        }
    }
}

impl Transform for RustFftTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn forward(&mut self, buffer: &mut [f32]) {
        self.run(buffer, false);
    }

    fn inverse(&mut self, buffer: &mut [f32]) {
        self.run(buffer, true);
    }
}
