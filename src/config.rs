use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Transform size of the reference build: 1024 complex points, 512 samples per block.
pub const REFERENCE_TRANSFORM_SIZE: usize = 1024;
/// Impulse-response partitions of the reference build.
pub const REFERENCE_PARTITIONS: usize = 12;
/// Output scale tuned by ear for the reference impulse response.
pub const REFERENCE_SCALE: f32 = 1.0 / 50.0;
/// Converter resolution of the reference board (ADC and DAC).
pub const REFERENCE_CONVERTER_BITS: u8 = 12;
/// Makeup gain hosts apply on top of the normalized scale when they run
/// without a config file and with a unit-energy impulse response.
pub const HOST_MAKEUP_GAIN: f32 = 2.0;

/// How the inverse-transformed block is brought back to signal level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputScale {
    /// A constant multiplier, used as-is.
    Fixed(f32),
    /// `makeup_gain / (N * (P + 1))`: undoes the unnormalized transform pair and
    /// leaves headroom for the dry path plus `P` unit-magnitude partitions.
    Normalized { makeup_gain: f32 },
}

impl OutputScale {
    pub fn factor(&self, geometry: &Geometry) -> f32 {
        match *self {
            OutputScale::Fixed(scale) => scale,
            OutputScale::Normalized { makeup_gain } => {
                makeup_gain
                    / (geometry.transform_size as f32 * (geometry.partitions as f32 + 1.0))
            }
        }
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        let value = match *self {
            OutputScale::Fixed(scale) => scale,
            OutputScale::Normalized { makeup_gain } => makeup_gain,
        };
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::Scale(value))
        }
    }
}

/// Processor steps the block task may run per sample period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkBudget {
    /// Run a signaled block to completion inside the tick that signaled it.
    Unbounded,
    StepsPerSample(usize),
}

impl WorkBudget {
    pub fn steps(&self) -> usize {
        match *self {
            WorkBudget::Unbounded => usize::MAX,
            WorkBudget::StepsPerSample(steps) => steps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transform_size: usize,
    pub partitions: usize,
    pub scale: OutputScale,
    pub adc_bits: u8,
    pub dac_bits: u8,
    pub sample_rate: u32,
    pub work_budget: WorkBudget,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transform_size: REFERENCE_TRANSFORM_SIZE,
            partitions: REFERENCE_PARTITIONS,
            scale: OutputScale::Fixed(REFERENCE_SCALE),
            adc_bits: REFERENCE_CONVERTER_BITS,
            dac_bits: REFERENCE_CONVERTER_BITS,
            sample_rate: 48_000,
            work_budget: WorkBudget::Unbounded,
        }
    }
}

impl EngineConfig {
    /// Defaults for hosts feeding `[-1.0, 1.0]` audio: reference geometry with
    /// a normalized scale instead of the board-tuned fixed factor.
    pub fn for_host() -> Self {
        Self {
            scale: OutputScale::Normalized {
                makeup_gain: HOST_MAKEUP_GAIN,
            },
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.transform_size < 4 || !self.transform_size.is_power_of_two() {
            return Err(ConfigError::TransformSize(self.transform_size));
        }
        if self.partitions == 0 {
            return Err(ConfigError::NoPartitions);
        }
        for bits in [self.adc_bits, self.dac_bits] {
            if !(1..=16).contains(&bits) {
                return Err(ConfigError::Resolution(bits));
            }
        }
        if self.work_budget == WorkBudget::StepsPerSample(0) {
            return Err(ConfigError::WorkBudget);
        }
        self.scale.validate()
    }

    pub fn geometry(&self) -> std::result::Result<Geometry, ConfigError> {
        self.validate()?;
        Ok(Geometry::new_unchecked(self.transform_size, self.partitions))
    }
}

/// Buffer lengths and masks derived from the transform size `N` and the
/// partition count `P`. All lengths are in `f32` slots (interleaved re/im).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// `N`: complex points per transform, also the slot length of a block head.
    pub transform_size: usize,
    pub partitions: usize,
}

impl Geometry {
    pub fn new(transform_size: usize, partitions: usize) -> std::result::Result<Self, ConfigError> {
        if transform_size < 4 || !transform_size.is_power_of_two() {
            return Err(ConfigError::TransformSize(transform_size));
        }
        if partitions == 0 {
            return Err(ConfigError::NoPartitions);
        }
        Ok(Self::new_unchecked(transform_size, partitions))
    }

    fn new_unchecked(transform_size: usize, partitions: usize) -> Self {
        Self {
            transform_size,
            partitions,
        }
    }

    /// Audio samples carried by one block.
    pub fn block_samples(&self) -> usize {
        self.transform_size / 2
    }

    /// Slots of one transform (`2N`), also the length of a ping-pong half.
    pub fn spectrum_len(&self) -> usize {
        self.transform_size * 2
    }

    pub fn ping_pong_len(&self) -> usize {
        self.transform_size * 4
    }

    pub fn ping_pong_mask(&self) -> usize {
        self.ping_pong_len() - 1
    }

    /// Low-bit mask that is zero exactly on block boundaries.
    pub fn block_mask(&self) -> usize {
        self.transform_size - 1
    }

    pub fn overlap_len(&self) -> usize {
        self.transform_size * 3
    }

    /// Offset of the ping-pong half containing `index`.
    pub fn half_of(&self, index: usize) -> usize {
        index & self.spectrum_len()
    }

    /// Output latency in samples between acquisition and emission.
    pub fn latency_samples(&self) -> usize {
        self.transform_size - 1
    }
}
