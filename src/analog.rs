//! Converter-side glue: ADC codes in, biased DAC codes out.

use crate::error::ConfigError;

/// Depth of the raw-code staging buffer kept by the front end.
pub const STAGING_DEPTH: usize = 2;

#[derive(Debug, Clone)]
pub struct AnalogFrontEnd {
    adc_bits: u8,
    dac_bits: u8,
    staging: [u16; STAGING_DEPTH],
    staged: usize,
}

impl AnalogFrontEnd {
    pub fn new(adc_bits: u8, dac_bits: u8) -> Result<Self, ConfigError> {
        for bits in [adc_bits, dac_bits] {
            if !(1..=16).contains(&bits) {
                return Err(ConfigError::Resolution(bits));
            }
        }

        Ok(Self {
            adc_bits,
            dac_bits,
            staging: [0; STAGING_DEPTH],
            staged: 0,
        })
    }

    pub fn reset(&mut self) {
        self.staging = [0; STAGING_DEPTH];
        self.staged = 0;
    }

    fn adc_midscale(&self) -> f32 {
        (1u32 << (self.adc_bits - 1)) as f32
    }

    fn dac_max(&self) -> f32 {
        ((1u32 << self.dac_bits) - 1) as f32
    }

    /// DC offset that centers a zero signal in the DAC's unsigned range.
    pub fn dac_bias(&self) -> f32 {
        (1u32 << (self.dac_bits - 1)) as f32
    }

    /// Latches a conversion result and returns it as a zero-centered sample.
    pub fn latch(&mut self, code: u16) -> f32 {
        let mask = ((1u32 << self.adc_bits) - 1) as u16;
        let code = code & mask;
        self.staging[self.staged] = code;
        self.staged = (self.staged + 1) & (STAGING_DEPTH - 1);
        code as f32 - self.adc_midscale()
    }

    /// Most recent raw codes, oldest first.
    pub fn staged_codes(&self) -> [u16; STAGING_DEPTH] {
        let mut codes = [0; STAGING_DEPTH];
        for (i, code) in codes.iter_mut().enumerate() {
            *code = self.staging[(self.staged + i) & (STAGING_DEPTH - 1)];
        }
        codes
    }

    /// Rounds and clamps an emitted (already biased) value to a DAC code.
    pub fn dac_code(&self, biased: f32) -> u16 {
        biased.round().clamp(0.0, self.dac_max()) as u16
    }

    /// Maps a host sample in `[-1.0, 1.0]` onto the ADC sample scale.
    pub fn sample_from_unit(&self, value: f32) -> f32 {
        value.clamp(-1.0, 1.0) * self.adc_midscale()
    }

    /// Maps an emitted (biased) value back to a host sample, limited to
    /// `[-1.0, 1.0]` like the DAC range it stands in for.
    pub fn unit_from_output(&self, biased: f32) -> f32 {
        ((biased - self.dac_bias()) / self.dac_bias()).clamp(-1.0, 1.0)
    }
}
