//! Live host: default input through the reverb to the default output.
//!
//! Usage: reverb_host [--config <engine.json>] [--ir <ir.wav>]

mod cpal_host;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use convolution_reverb::impulse::{normalize_energy, read_wav_mono_file, DEFAULT_DIFFUSION};
use convolution_reverb::{EngineConfig, ImpulseResponseGenerator, Scheduler};
use cpal_host::AudioHost;

const REPORT_INTERVAL: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config_path = None;
    let mut ir_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--ir" => ir_path = args.next().map(PathBuf::from),
            other => bail!("usage: reverb_host [--config <engine.json>] [--ir <ir.wav>] (got {})", other),
        }
    }

    let config = match &config_path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::for_host(),
    };
    let geometry = config.geometry()?;

    let impulse_response = match &ir_path {
        Some(path) => {
            let mut samples = read_wav_mono_file(path)
                .with_context(|| format!("failed to read impulse response {}", path.display()))?
                .samples;
            normalize_energy(&mut samples);
            samples
        }
        None => ImpulseResponseGenerator::new(config.sample_rate as f32).plate(
            &geometry,
            DEFAULT_DIFFUSION,
            rand::random(),
        ),
    };

    println!("=== CREATING ENGINE ===");
    let scheduler = Scheduler::from_impulse_response(&config, &impulse_response)?;
    println!(
        "Transform size {}, {} partitions, latency {} samples",
        geometry.transform_size,
        geometry.partitions,
        scheduler.latency_samples()
    );

    let host = AudioHost::start(scheduler, config.sample_rate)?;
    println!(
        "\nRunning on '{}' at {} Hz. Press Ctrl+C to stop\n",
        host.config().host_name,
        host.config().sample_rate
    );

    let mut last = host.counters().snapshot();
    let mut last_drops = host.dropped_input_samples();
    loop {
        std::thread::sleep(REPORT_INTERVAL);
        let report = host.counters().snapshot();
        let drops = host.dropped_input_samples();
        if report.block_overruns > last.block_overruns
            || report.emission_overruns > last.emission_overruns
            || drops > last_drops
        {
            log::warn!(
                "timing faults: {} block overruns ({} dropped), {} emission overruns, {} input samples lost",
                report.block_overruns - last.block_overruns,
                report.dropped_blocks - last.dropped_blocks,
                report.emission_overruns - last.emission_overruns,
                drops - last_drops
            );
        }
        log::debug!(
            "{} dropped_input_samples={}",
            serde_json::to_string(&report)?,
            drops
        );
        last = report;
        last_drops = drops;
    }
}
