//! Cooperative model of the three-tier interrupt/task schedule.
//!
//! Tier 1 (sample interrupt) runs acquisition and posts the lower tiers.
//! Tier 2 (emission) runs once per posted sample period. Tier 3 (block
//! convolution) runs in steps, so a host can hand it a bounded amount of work
//! per sample period and still have tiers 1 and 2 preempt it.

mod signals;

use std::sync::Arc;

pub use signals::{Signal, TimingCounters, TimingReport};

use crate::analog::AnalogFrontEnd;
use crate::config::{EngineConfig, Geometry, WorkBudget};
use crate::engine::{BlockProcessor, EngineState};
use crate::error::ConfigError;
use crate::impulse::PartitionedImpulseResponse;
use crate::transform::{RustFftTransform, Transform};

pub struct Scheduler {
    state: EngineState,
    processor: BlockProcessor,
    front_end: AnalogFrontEnd,
    emission: Signal,
    block: Signal,
    budget: WorkBudget,
    counters: Arc<TimingCounters>,
}

impl Scheduler {
    pub fn new(
        config: &EngineConfig,
        impulse: PartitionedImpulseResponse,
    ) -> Result<Self, ConfigError> {
        let transform = RustFftTransform::new(config.transform_size);
        Self::with_transform(config, impulse, Box::new(transform))
    }

    /// Partitions a time-domain impulse response with the engine's own
    /// transform and builds the scheduler around it.
    pub fn from_impulse_response(
        config: &EngineConfig,
        impulse_response: &[f32],
    ) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        let mut transform = RustFftTransform::new(geometry.transform_size);
        let impulse =
            PartitionedImpulseResponse::from_time_domain(&geometry, impulse_response, &mut transform)?;
        Self::with_transform(config, impulse, Box::new(transform))
    }

    pub fn with_transform(
        config: &EngineConfig,
        impulse: PartitionedImpulseResponse,
        transform: Box<dyn Transform>,
    ) -> Result<Self, ConfigError> {
        let geometry = config.geometry()?;
        impulse.check(&geometry)?;
        if transform.size() != geometry.transform_size {
            return Err(ConfigError::TransformMismatch {
                expected: geometry.spectrum_len(),
                found: transform.size() * 2,
            });
        }

        let front_end = AnalogFrontEnd::new(config.adc_bits, config.dac_bits)?;
        let scale = config.scale.factor(&geometry);
        log::debug!("output scale {:e} ({:?})", scale, config.scale);

        Ok(Self {
            state: EngineState::new(geometry, impulse, front_end.dac_bias()),
            processor: BlockProcessor::new(transform, scale),
            front_end,
            emission: Signal::new(),
            block: Signal::new(),
            budget: config.work_budget,
            counters: Arc::new(TimingCounters::default()),
        })
    }

    /// Buffer initializer: zero every buffer, rewind every cursor and drop
    /// any queued work.
    pub fn initialize(&mut self) {
        self.processor.clear();
        self.emission.take();
        self.block.take();
        self.state.initialize();
        self.front_end.reset();
    }

    pub fn geometry(&self) -> &Geometry {
        self.state.geometry()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn front_end(&self) -> &AnalogFrontEnd {
        &self.front_end
    }

    pub fn counters(&self) -> Arc<TimingCounters> {
        Arc::clone(&self.counters)
    }

    pub fn latency_samples(&self) -> usize {
        self.state.geometry().latency_samples()
    }

    pub fn block_pending(&self) -> bool {
        self.block.is_pending() || self.processor.is_busy()
    }

    /// Tier 1: acquire one sample and post the lower tiers.
    pub fn sample_interrupt(&mut self, sample: f32) {
        self.counters.record_sample();
        let acquired = self.state.acquire(sample);

        if self.emission.post() > 0 {
            self.counters.record_emission_overrun();
        }

        if let Some(offset) = acquired.block_ready {
            // Previous block missed its deadline
            if let Some(dropped) = self.processor.abandon(&mut self.state) {
                self.counters.record_block_overrun(dropped.spectrum_lost());
            }
            self.processor.start(offset);
            self.block.post();
        }
    }

    /// Tier 2: emit the sample for the current period, skipping any periods
    /// whose emission never ran.
    pub fn service_emission(&mut self) -> Option<f32> {
        let pending = self.emission.take();
        if pending == 0 {
            return None;
        }
        for _ in 1..pending {
            self.state.skip_emission();
        }

        if let Some(job) = self.processor.job() {
            debug_assert!(
                !self.state.in_half(self.state.cursors().output_read, job.offset),
                "emission reading the half under convolution"
            );
        }
        Some(self.state.emit())
    }

    /// Tier 3: run up to `max_steps` of the block job. Returns whether work remains.
    pub fn service_block(&mut self, max_steps: usize) -> bool {
        self.block.take();
        if self.processor.run(&mut self.state, max_steps) {
            self.counters.record_block();
        }
        self.processor.is_busy()
    }

    /// One sample period: all three tiers in priority order, tier 3 limited
    /// by the configured work budget. Returns the biased output value.
    pub fn tick(&mut self, sample: f32) -> f32 {
        self.sample_interrupt(sample);
        let output = self
            .service_emission()
            .unwrap_or_else(|| self.state.dac_bias());
        self.service_block(self.budget.steps());
        output
    }

    /// Converter-level tick: raw ADC code in, DAC code out.
    pub fn convert(&mut self, adc_code: u16) -> u16 {
        let sample = self.front_end.latch(adc_code);
        let output = self.tick(sample);
        self.front_end.dac_code(output)
    }

    /// Host-level processing of `[-1.0, 1.0]` samples, one tick per sample.
    /// Output is limited to the same range, as the DAC would limit it.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len());
        for (x, y) in input.iter().zip(output.iter_mut()) {
            let sample = self.front_end.sample_from_unit(*x);
            let value = self.tick(sample);
            *y = self.front_end.unit_from_output(value);
        }
    }
}
