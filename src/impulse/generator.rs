use std::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::Geometry;

/// Envelope level at the last sample of a generated plate (-60 dB).
const TAIL_FLOOR: f32 = 1e-3;
const BRIGHT_CUTOFF_HZ: f32 = 6_000.0;
const DARK_CUTOFF_HZ: f32 = 800.0;
/// Diffusion the hosts use for their generated plate.
pub const DEFAULT_DIFFUSION: f32 = 0.7;

/// Synthesizes impulse responses for hosts that run without a recorded one.
pub struct ImpulseResponseGenerator {
    sample_rate: f32,
}

impl ImpulseResponseGenerator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate.max(1.0),
        }
    }

    /// Plate-like tail: lowpassed noise under an exponential envelope that
    /// fills every partition of `geometry` and reaches -60 dB on its last
    /// sample. `diffusion` in `[0, 1]` darkens the tail. The result has unit
    /// energy and is reproducible for a given seed.
    pub fn plate(&self, geometry: &Geometry, diffusion: f32, seed: u64) -> Vec<f32> {
        let len = geometry.partitions * geometry.block_samples();
        let diffusion = diffusion.clamp(0.0, 1.0);

        let cutoff = (BRIGHT_CUTOFF_HZ + (DARK_CUTOFF_HZ - BRIGHT_CUTOFF_HZ) * diffusion)
            .min(0.45 * self.sample_rate);
        let pole = (-2.0 * PI * cutoff / self.sample_rate).exp();
        let decay = TAIL_FLOOR.powf(1.0 / len as f32);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut envelope = 1.0;
        let mut smoothed = 0.0;
        let mut ir: Vec<f32> = (0..len)
            .map(|_| {
                let noise: f32 = rng.random_range(-1.0..1.0);
                smoothed = noise + pole * (smoothed - noise);
                let sample = smoothed * envelope;
                envelope *= decay;
                sample
            })
            .collect();

        normalize_energy(&mut ir);
        ir
    }
}

/// Scales a response to unit energy so the wet path has roughly unity RMS
/// gain whatever its length or source. Silence is left untouched.
pub fn normalize_energy(ir: &mut [f32]) {
    let energy: f32 = ir.iter().map(|x| x * x).sum();
    if energy > 0.0 {
        let gain = energy.sqrt().recip();
        for sample in ir.iter_mut() {
            *sample *= gain;
        }
    }
}
