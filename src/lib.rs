//! Real-time uniform-partitioned convolution reverb.
//!
//! Samples arrive one at a time from a sample clock, are gathered into
//! half-overlapped blocks, convolved in the frequency domain against a
//! partitioned impulse response and emitted with a fixed latency of
//! `transform_size - 1` samples.

pub mod analog;
pub mod config;
pub mod engine;
pub mod error;
pub mod impulse;
pub mod scheduler;
pub mod transform;
pub mod utils;

pub use analog::AnalogFrontEnd;
pub use config::{EngineConfig, Geometry, OutputScale, WorkBudget};
pub use engine::{Cursors, EngineState};
pub use error::{ConfigError, Error, Result};
pub use impulse::{ImpulseResponseGenerator, PartitionedImpulseResponse};
pub use scheduler::{Scheduler, TimingCounters, TimingReport};
pub use transform::{RustFftTransform, Transform};
