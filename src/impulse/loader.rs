use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Decoded mono audio and the rate it was recorded at.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Reads a WAV stream and mixes it down to mono in `[-1.0, 1.0]`.
pub fn read_wav_mono<R: Read>(reader: R) -> Result<MonoAudio> {
    let mut wav_reader = hound::WavReader::new(reader)?;
    let spec = wav_reader.spec();
    let channels = spec.channels as usize;

    if channels == 0 || channels > 2 {
        return Err(Error::ImpulseResponse(format!(
            "WAV files with {} channels are not supported",
            channels
        )));
    }

    // Read samples from the WAV (handling various bit depths/formats)
    let raw_samples: Vec<f32> = match (spec.bits_per_sample, spec.sample_format) {
        (32, hound::SampleFormat::Float) => wav_reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        (16, hound::SampleFormat::Int) => wav_reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>()?,
        (24, hound::SampleFormat::Int) => {
            let shift = 32 - 24;
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|s| (s << shift >> shift) as f32 / 8_388_607.0))
                .collect::<std::result::Result<_, _>>()?
        }
        (32, hound::SampleFormat::Int) => wav_reader
            .samples::<i32>()
            .map(|s| s.map(|s| s as f32 / i32::MAX as f32))
            .collect::<std::result::Result<_, _>>()?,
        (bits, format) => {
            return Err(Error::ImpulseResponse(format!(
                "unsupported WAV format: bits_per_sample={} sample_format={:?}",
                bits, format
            )))
        }
    };

    let samples = match channels {
        1 => raw_samples,
        _ => raw_samples
            .chunks_exact(2)
            .map(|frame| 0.5 * (frame[0] + frame[1]))
            .collect(),
    };

    Ok(MonoAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

pub fn read_wav_mono_bytes(data: &[u8]) -> Result<MonoAudio> {
    read_wav_mono(Cursor::new(data))
}

pub fn read_wav_mono_file(path: impl AsRef<Path>) -> Result<MonoAudio> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let audio = read_wav_mono(std::io::BufReader::new(file))?;
    log::info!(
        "loaded {} ({} samples at {} Hz)",
        path.display(),
        audio.samples.len(),
        audio.sample_rate
    );
    Ok(audio)
}
