mod generator;
pub mod loader;
mod partitions;

pub use generator::{normalize_energy, ImpulseResponseGenerator, DEFAULT_DIFFUSION};
pub use loader::{read_wav_mono, read_wav_mono_bytes, read_wav_mono_file, MonoAudio};
pub use partitions::PartitionedImpulseResponse;
