use thiserror::Error;

/// Startup-time configuration faults. An engine is never built from a
/// configuration that produces one of these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("transform size {0} must be a power of two and at least 4")]
    TransformSize(usize),

    #[error("partition count must be at least 1")]
    NoPartitions,

    #[error("impulse response has {found} partitions, engine expects {expected}")]
    PartitionCount { expected: usize, found: usize },

    #[error("impulse response partition {index} holds {found} values, expected {expected}")]
    PartitionLength {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("transform primitive is sized for {found} reals, engine needs {expected}")]
    TransformMismatch { expected: usize, found: usize },

    #[error("converter resolution of {0} bits is outside 1..=16")]
    Resolution(u8),

    #[error("output scale {0} must be finite and positive")]
    Scale(f32),

    #[error("work budget must allow at least one step per sample")]
    WorkBudget,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported impulse response: {0}")]
    ImpulseResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
