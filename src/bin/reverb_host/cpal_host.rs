//! CPAL duplex host: the input callback plays the sample clock's ADC, the
//! output callback drives the engine one sample period per frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use convolution_reverb::{Scheduler, TimingCounters};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, StreamConfig};
use dasp_sample::FromSample;
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

/// Input queue depth, in seconds of audio.
const INPUT_QUEUE_SECONDS: f32 = 0.5;
// Frames the output callback is sized for up front; larger callbacks grow it once
const CALLBACK_FRAMES_HINT: usize = 4096;

/// Devices and stream parameters the host actually opened
#[derive(Debug, Clone)]
pub struct AudioHostConfig {
    /// Rate shared by both streams; one engine tick per output frame
    pub sample_rate: u32,
    /// Input channels, mixed down to the engine's single channel
    pub input_channels: u16,
    /// Output channels, each receiving the same engine output
    pub output_channels: u16,
    pub input_device: String,
    pub output_device: String,
    pub host_name: String,
}

/// Running duplex streams; dropping the host stops audio
pub struct AudioHost {
    _input: cpal::Stream,
    _output: cpal::Stream,
    config: AudioHostConfig,
    counters: Arc<TimingCounters>,
    input_drops: Arc<AtomicU64>,
}

impl AudioHost {
    /// Opens the default duplex pair at `sample_rate` and starts the engine.
    pub fn start(scheduler: Scheduler, sample_rate: u32) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let host_name = host.id().name().to_string();

        let input_device = host
            .default_input_device()
            .with_context(|| format!("host {} has no default input device", host_name))?;
        let output_device = host
            .default_output_device()
            .with_context(|| format!("host {} has no default output device", host_name))?;

        let (input_config, input_format) = input_stream_config(&input_device, sample_rate)?;
        let (output_config, output_format) = output_stream_config(&output_device, sample_rate)?;

        let config = AudioHostConfig {
            sample_rate: output_config.sample_rate.0,
            input_channels: input_config.channels,
            output_channels: output_config.channels,
            input_device: input_device
                .name()
                .unwrap_or_else(|_| "Unknown device".to_string()),
            output_device: output_device
                .name()
                .unwrap_or_else(|_| "Unknown device".to_string()),
            host_name,
        };

        println!("=== AUDIO CONFIGURATION ===");
        println!("Host: '{}'", config.host_name);
        println!(
            "Input: '{}' ({} ch, {:?})",
            config.input_device, config.input_channels, input_format
        );
        println!(
            "Output: '{}' ({} ch, {:?})",
            config.output_device, config.output_channels, output_format
        );
        println!("Sample rate: {} Hz", config.sample_rate);

        let capacity = (config.sample_rate as f32 * INPUT_QUEUE_SECONDS) as usize;
        let (producer, consumer) = HeapRb::<f32>::new(capacity.max(1)).split();
        let counters = scheduler.counters();
        let input_drops = Arc::new(AtomicU64::new(0));

        let drops = Arc::clone(&input_drops);
        let input = match input_format {
            SampleFormat::F32 => build_input_stream::<f32>(&input_device, &input_config, producer, drops)?,
            SampleFormat::I16 => build_input_stream::<i16>(&input_device, &input_config, producer, drops)?,
            SampleFormat::U16 => build_input_stream::<u16>(&input_device, &input_config, producer, drops)?,
            other => anyhow::bail!("unsupported input sample format: {:?}", other),
        };
        let output = match output_format {
            SampleFormat::F32 => {
                build_output_stream::<f32>(&output_device, &output_config, scheduler, consumer)?
            }
            SampleFormat::I16 => {
                build_output_stream::<i16>(&output_device, &output_config, scheduler, consumer)?
            }
            SampleFormat::U16 => {
                build_output_stream::<u16>(&output_device, &output_config, scheduler, consumer)?
            }
            other => anyhow::bail!("unsupported output sample format: {:?}", other),
        };

        input.play().context("failed to start input stream")?;
        output.play().context("failed to start output stream")?;

        Ok(Self {
            _input: input,
            _output: output,
            config,
            counters,
            input_drops,
        })
    }

    /// Get the stream configuration that was actually opened
    pub fn config(&self) -> &AudioHostConfig {
        &self.config
    }

    /// Engine timing counters, updated from the output callback
    pub fn counters(&self) -> &TimingCounters {
        &self.counters
    }

    /// Input samples lost because the output side fell behind and the
    /// input queue was full
    pub fn dropped_input_samples(&self) -> u64 {
        self.input_drops.load(Ordering::Relaxed)
    }
}

fn input_stream_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> anyhow::Result<(StreamConfig, SampleFormat)> {
    let configs = device
        .supported_input_configs()
        .context("failed to enumerate input configs")?;
    for supported in configs {
        if supported.min_sample_rate().0 <= sample_rate
            && supported.max_sample_rate().0 >= sample_rate
            && is_supported_format(supported.sample_format())
        {
            let format = supported.sample_format();
            let config = supported.with_sample_rate(cpal::SampleRate(sample_rate));
            return Ok((config.config(), format));
        }
    }
    anyhow::bail!("input device does not support {} Hz", sample_rate)
}

fn output_stream_config(
    device: &cpal::Device,
    sample_rate: u32,
) -> anyhow::Result<(StreamConfig, SampleFormat)> {
    let configs = device
        .supported_output_configs()
        .context("failed to enumerate output configs")?;
    for supported in configs {
        if supported.min_sample_rate().0 <= sample_rate
            && supported.max_sample_rate().0 >= sample_rate
            && is_supported_format(supported.sample_format())
        {
            let format = supported.sample_format();
            let config = supported.with_sample_rate(cpal::SampleRate(sample_rate));
            return Ok((config.config(), format));
        }
    }
    anyhow::bail!("output device does not support {} Hz", sample_rate)
}

fn is_supported_format(format: SampleFormat) -> bool {
    matches!(
        format,
        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
    )
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProducer<f32>,
    drops: Arc<AtomicU64>,
) -> anyhow::Result<cpal::Stream>
where
    T: Sample + SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                queue_mono(data, channels, &mut producer, &drops);
            },
            |err| eprintln!("Input stream error: {}", err),
            None,
        )
        .context("failed to build input stream")?;

    Ok(stream)
}

/// Mixes interleaved frames down to mono and queues them for the output
/// callback, counting every sample a full queue rejects.
fn queue_mono<T>(data: &[T], channels: usize, producer: &mut HeapProducer<f32>, drops: &AtomicU64)
where
    T: Sample,
    f32: FromSample<T>,
{
    for frame in data.chunks(channels) {
        let mono = frame.iter().map(|s| f32::from_sample(*s)).sum::<f32>() / channels as f32;
        if producer.push(mono).is_err() {
            drops.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut scheduler: Scheduler,
    mut consumer: HeapConsumer<f32>,
) -> anyhow::Result<cpal::Stream>
where
    T: Sample + SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut input = vec![0.0_f32; CALLBACK_FRAMES_HINT];
    let mut output = vec![0.0_f32; CALLBACK_FRAMES_HINT];
    let mut first_call = true;

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if first_call {
                    println!("\n=== FIRST AUDIO CALLBACK ===");
                    println!("CPAL buffer: {} frames", frames);
                    first_call = false;
                }
                if frames > input.len() {
                    input.resize(frames, 0.0);
                    output.resize(frames, 0.0);
                }

                let read = consumer.pop_slice(&mut input[..frames]);
                input[read..frames].fill(0.0);

                scheduler.process(&input[..frames], &mut output[..frames]);

                for (frame, &value) in data.chunks_mut(channels).zip(output.iter()) {
                    for sample in frame.iter_mut() {
                        *sample = T::from_sample(value);
                    }
                }
            },
            |err| eprintln!("Output stream error: {}", err),
            None,
        )
        .context("failed to build output stream")?;

    Ok(stream)
}
