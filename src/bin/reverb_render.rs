//! Offline renderer: runs a WAV file through the engine one sample period at a
//! time, exactly as the sample clock would, and writes the result.
//!
//! Usage: reverb_render <input.wav> <output.wav> [--ir <ir.wav>] [--config <engine.json>] [--seed <n>]

use std::path::PathBuf;

use anyhow::{bail, Context};
use convolution_reverb::impulse::{normalize_energy, read_wav_mono_file, DEFAULT_DIFFUSION};
use convolution_reverb::{EngineConfig, ImpulseResponseGenerator, Scheduler};

const DEFAULT_SEED: u64 = 0x5eed;

struct Options {
    input: PathBuf,
    output: PathBuf,
    impulse_response: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: u64,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut positional = Vec::new();
    let mut impulse_response = None;
    let mut config = None;
    let mut seed = DEFAULT_SEED;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ir" => impulse_response = Some(PathBuf::from(value_of(&mut args, "--ir")?)),
            "--config" => config = Some(PathBuf::from(value_of(&mut args, "--config")?)),
            "--seed" => {
                seed = value_of(&mut args, "--seed")?
                    .parse()
                    .context("--seed expects an unsigned integer")?
            }
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let [input, output]: [PathBuf; 2] = positional.try_into().map_err(|_| {
        anyhow::anyhow!(
            "usage: reverb_render <input.wav> <output.wav> [--ir <ir.wav>] [--config <engine.json>] [--seed <n>]"
        )
    })?;

    Ok(Options {
        input,
        output,
        impulse_response,
        config,
        seed,
    })
}

fn value_of(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{} expects a value", flag))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = parse_args()?;

    let mut config = match &options.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::for_host(),
    };

    let input = read_wav_mono_file(&options.input)
        .with_context(|| format!("failed to read {}", options.input.display()))?;
    if input.sample_rate != config.sample_rate {
        log::info!(
            "using the input's sample rate {} Hz instead of {} Hz",
            input.sample_rate,
            config.sample_rate
        );
        config.sample_rate = input.sample_rate;
    }

    let geometry = config.geometry()?;
    let capacity = geometry.partitions * geometry.block_samples();

    let impulse_response = match &options.impulse_response {
        Some(path) => {
            let ir = read_wav_mono_file(path)
                .with_context(|| format!("failed to read impulse response {}", path.display()))?;
            if ir.sample_rate != config.sample_rate {
                log::warn!(
                    "impulse response is {} Hz, rendering at {} Hz without resampling",
                    ir.sample_rate,
                    config.sample_rate
                );
            }
            let mut samples = ir.samples;
            normalize_energy(&mut samples);
            samples
        }
        None => ImpulseResponseGenerator::new(config.sample_rate as f32).plate(
            &geometry,
            DEFAULT_DIFFUSION,
            options.seed,
        ),
    };

    let mut scheduler = Scheduler::from_impulse_response(&config, &impulse_response)?;

    println!("=== RENDER CONFIGURATION ===");
    println!(
        "Transform size: {}, partitions: {}, block: {} samples",
        geometry.transform_size,
        geometry.partitions,
        geometry.block_samples()
    );
    println!(
        "Impulse response: {} samples (capacity {})",
        impulse_response.len(),
        capacity
    );
    println!(
        "Latency: {} samples, sample rate: {} Hz",
        scheduler.latency_samples(),
        config.sample_rate
    );

    // Let the last block and the full reverb tail drain out
    let mut samples = input.samples;
    samples.resize(
        samples.len() + capacity + geometry.transform_size,
        0.0,
    );
    let mut rendered = vec![0.0; samples.len()];
    scheduler.process(&samples, &mut rendered);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&options.output, spec)
        .with_context(|| format!("failed to create {}", options.output.display()))?;
    for sample in &rendered {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    let report = scheduler.counters().snapshot();
    log::info!("timing report: {}", serde_json::to_string(&report)?);
    if report.has_faults() {
        log::warn!("render reported timing faults");
    }

    println!("\nWrote {} samples to {}", rendered.len(), options.output.display());
    Ok(())
}
