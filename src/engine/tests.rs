use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{EngineConfig, Geometry, OutputScale, WorkBudget};
use crate::error::ConfigError;
use crate::impulse::{ImpulseResponseGenerator, PartitionedImpulseResponse, DEFAULT_DIFFUSION};
use crate::scheduler::Scheduler;
use crate::transform::RustFftTransform;

const BIAS: f32 = 2048.0;
const TOLERANCE: f32 = 1e-2;

fn config(transform_size: usize, partitions: usize, scale: OutputScale) -> EngineConfig {
    EngineConfig {
        transform_size,
        partitions,
        scale,
        ..EngineConfig::default()
    }
}

fn unit_scheduler(transform_size: usize, partitions: usize, scale: OutputScale) -> Scheduler {
    let config = config(transform_size, partitions, scale);
    let geometry = config.geometry().unwrap();
    Scheduler::new(&config, PartitionedImpulseResponse::unit_impulse(&geometry)).unwrap()
}

fn random_signal(seed: u64, len: usize, amplitude: f32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.random_range(-amplitude..amplitude))
        .collect()
}

fn direct_convolution(x: &[f32], h: &[f32]) -> Vec<f32> {
    let mut y = vec![0.0; x.len() + h.len() - 1];
    for (i, &xi) in x.iter().enumerate() {
        for (j, &hj) in h.iter().enumerate() {
            y[i + j] += xi * hj;
        }
    }
    y
}

/// Dry path plus the impulse response: the kernel the engine actually applies.
fn effective_kernel(ir: &[f32]) -> Vec<f32> {
    let mut kernel = ir.to_vec();
    if kernel.is_empty() {
        kernel.push(0.0);
    }
    kernel[0] += 1.0;
    kernel
}

fn run(scheduler: &mut Scheduler, input: &[f32], total: usize) -> Vec<f32> {
    (0..total)
        .map(|t| scheduler.tick(input.get(t).copied().unwrap_or(0.0)))
        .collect()
}

fn assert_delayed(output: &[f32], expected: &[f32], latency: usize, gain: f32) {
    for (t, &value) in output.iter().enumerate() {
        let reference = t
            .checked_sub(latency)
            .and_then(|i| expected.get(i))
            .copied()
            .unwrap_or(0.0);
        let want = BIAS + gain * reference;
        assert!(
            (value - want).abs() < TOLERANCE,
            "sample {}: got {}, expected {}",
            t,
            value,
            want
        );
    }
}

#[test]
fn test_latency_is_one_block_pair_minus_one_sample() {
    let scheduler = unit_scheduler(8, 1, OutputScale::Fixed(1.0));
    assert_eq!(scheduler.latency_samples(), 7);
}

#[test]
fn test_silent_input_emits_exact_bias() {
    let config = config(16, 3, OutputScale::Fixed(1.0));
    let ir = random_signal(1, 20, 1.0);
    let mut scheduler = Scheduler::from_impulse_response(&config, &ir).unwrap();

    let output = run(&mut scheduler, &[], 400);

    assert!(output.iter().all(|&v| v == BIAS));
}

#[test]
fn test_identity_convolution_reproduces_input() {
    // Normalized scale with one partition: 1 / (2N) cancels dry + unit impulse
    let mut scheduler = unit_scheduler(8, 1, OutputScale::Normalized { makeup_gain: 1.0 });
    let input = random_signal(2, 64, 100.0);

    let output = run(&mut scheduler, &input, 96);

    assert_delayed(&output, &input, scheduler.latency_samples(), 1.0);
}

#[test]
fn test_identity_convolution_with_silent_trailing_partitions() {
    let mut scheduler = unit_scheduler(16, 12, OutputScale::Normalized { makeup_gain: 1.0 });
    let input = random_signal(3, 200, 100.0);

    let output = run(&mut scheduler, &input, 300);

    // Two unit taps at lag 0 over N * (P + 1)
    assert_delayed(&output, &input, scheduler.latency_samples(), 2.0 / 13.0);
}

#[test]
fn test_ramp_through_flat_unit_spectrum() {
    // N = 8, one partition whose spectrum is [1, 0, 1, 0, ...]
    let config = config(8, 1, OutputScale::Fixed(1.0 / 8.0));
    let geometry = config.geometry().unwrap();
    let mut spectrum = vec![0.0; geometry.spectrum_len()];
    for bin in spectrum.chunks_exact_mut(2) {
        bin[0] = 1.0;
    }
    let impulse = PartitionedImpulseResponse::from_spectra(&geometry, &[spectrum]).unwrap();
    let mut scheduler = Scheduler::new(&config, impulse).unwrap();

    let ramp: Vec<f32> = (1..=8).map(|v| v as f32).collect();
    let output = run(&mut scheduler, &ramp, 32);

    // Dry tap and the unit IR tap coincide at lag 0
    let expected = direct_convolution(&ramp, &effective_kernel(&[1.0]));
    assert_eq!(expected, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0]);
    assert_delayed(&output, &expected, 7, 1.0);
}

#[test]
fn test_two_tap_filter_across_block_boundary() {
    let config = config(8, 1, OutputScale::Fixed(1.0 / 8.0));
    let ir = [0.0, 0.5];
    let mut scheduler = Scheduler::from_impulse_response(&config, &ir).unwrap();

    let ramp: Vec<f32> = (1..=8).map(|v| v as f32).collect();
    let output = run(&mut scheduler, &ramp, 40);

    let expected = direct_convolution(&ramp, &effective_kernel(&ir));
    assert_delayed(&output, &expected, scheduler.latency_samples(), 1.0);
}

#[test]
fn test_short_impulse_response_matches_direct_convolution() {
    // IR shorter than a block: the tail of every block spills into the next
    let config = config(16, 1, OutputScale::Fixed(1.0 / 16.0));
    let ir = random_signal(4, 5, 1.0);
    let mut scheduler = Scheduler::from_impulse_response(&config, &ir).unwrap();
    let input = random_signal(5, 80, 10.0);

    let output = run(&mut scheduler, &input, 120);

    let expected = direct_convolution(&input, &effective_kernel(&ir));
    assert_delayed(&output, &expected, scheduler.latency_samples(), 1.0);
}

#[test]
fn test_partitioned_response_matches_direct_convolution() {
    // 20 taps over three 8-sample partitions
    let config = config(16, 3, OutputScale::Fixed(1.0 / 16.0));
    let ir = random_signal(6, 20, 1.0);
    let mut scheduler = Scheduler::from_impulse_response(&config, &ir).unwrap();
    let input = random_signal(7, 100, 10.0);

    let output = run(&mut scheduler, &input, 160);

    let expected = direct_convolution(&input, &effective_kernel(&ir));
    assert_delayed(&output, &expected, scheduler.latency_samples(), 1.0);
    assert!(!scheduler.counters().snapshot().has_faults());
}

#[test]
fn test_history_and_overlap_cursors_wrap() {
    let mut scheduler = unit_scheduler(8, 12, OutputScale::Fixed(1.0));
    let block = scheduler.geometry().block_samples();

    run(&mut scheduler, &[], 3 * block);
    assert_eq!(scheduler.state().cursors().overlap_write, 0);
    assert_eq!(scheduler.state().history().next_slot(), 3);

    run(&mut scheduler, &[], 9 * block);
    assert_eq!(scheduler.state().history().next_slot(), 0);
    assert_eq!(scheduler.state().cursors().overlap_write, 0);
    assert_eq!(scheduler.counters().snapshot().blocks_processed, 12);
}

#[test]
fn test_stepped_processing_matches_unbounded() {
    let ir = random_signal(8, 300, 1.0);
    let input = random_signal(9, 500, 10.0);

    let mut unbounded = config(64, 12, OutputScale::Fixed(1.0 / 64.0));
    unbounded.work_budget = WorkBudget::Unbounded;
    let mut stepped = unbounded.clone();
    stepped.work_budget = WorkBudget::StepsPerSample(1);

    let mut a = Scheduler::from_impulse_response(&unbounded, &ir).unwrap();
    let mut b = Scheduler::from_impulse_response(&stepped, &ir).unwrap();

    assert_eq!(run(&mut a, &input, 700), run(&mut b, &input, 700));
    let report = b.counters().snapshot();
    assert!(!report.has_faults());
    assert_eq!(report.blocks_processed, 700 / 32);
}

#[test]
fn test_starved_block_task_degrades_to_silence() {
    let mut scheduler = unit_scheduler(8, 2, OutputScale::Fixed(1.0 / 8.0));
    let input = random_signal(10, 40, 100.0);

    // Tiers 1 and 2 only: the block task never gets the CPU
    let mut output = Vec::new();
    for &sample in &input {
        scheduler.sample_interrupt(sample);
        output.push(scheduler.service_emission().unwrap());
    }

    assert!(output.iter().all(|&v| v == BIAS));
    let report = scheduler.counters().snapshot();
    assert_eq!(report.blocks_processed, 0);
    assert_eq!(report.block_overruns, 9);
    assert_eq!(report.dropped_blocks, 9);
    assert!(scheduler.block_pending());
}

#[test]
fn test_tight_budget_reports_overruns() {
    // 17 steps per block but only 4 sample periods to run them in
    let mut config = config(8, 12, OutputScale::Fixed(1.0 / 8.0));
    config.work_budget = WorkBudget::StepsPerSample(1);
    let mut scheduler = Scheduler::new(
        &config,
        PartitionedImpulseResponse::unit_impulse(&config.geometry().unwrap()),
    )
    .unwrap();

    let output = run(&mut scheduler, &random_signal(11, 64, 100.0), 64);

    assert!(output.iter().all(|v| v.is_finite()));
    let report = scheduler.counters().snapshot();
    assert_eq!(report.blocks_processed, 0);
    assert_eq!(report.block_overruns, 15);
    // Each late job got past Store, so its spectrum still feeds later tails
    assert_eq!(report.dropped_blocks, 0);
}

#[test]
fn test_missed_emission_keeps_cursor_phase() {
    let mut late = unit_scheduler(8, 1, OutputScale::Fixed(1.0));
    let mut on_time = unit_scheduler(8, 1, OutputScale::Fixed(1.0));

    late.sample_interrupt(1.0);
    late.sample_interrupt(2.0);
    assert!(late.service_emission().is_some());
    assert!(late.service_emission().is_none());

    on_time.tick(1.0);
    on_time.tick(2.0);

    assert_eq!(late.state().cursors(), on_time.state().cursors());
    assert_eq!(late.counters().snapshot().emission_overruns, 1);
    assert_eq!(on_time.counters().snapshot().emission_overruns, 0);
}

#[test]
fn test_initialize_restarts_from_silence() {
    let mut scheduler = unit_scheduler(8, 2, OutputScale::Fixed(1.0 / 8.0));
    run(&mut scheduler, &random_signal(12, 50, 100.0), 50);

    scheduler.initialize();

    assert_eq!(scheduler.state().cursors(), crate::engine::Cursors::INITIAL);
    assert!(!scheduler.block_pending());
    let output = run(&mut scheduler, &[], 40);
    assert!(output.iter().all(|&v| v == BIAS));
}

#[test]
fn test_converter_codes_round_trip_through_identity() {
    let mut scheduler = unit_scheduler(8, 1, OutputScale::Normalized { makeup_gain: 1.0 });
    let codes: Vec<u16> = (0..64).map(|i| 1000 + (i * 37 % 2000) as u16).collect();

    let output: Vec<u16> = codes.iter().map(|&code| scheduler.convert(code)).collect();

    let latency = scheduler.latency_samples();
    for (t, &code) in output.iter().enumerate() {
        let expected = if t < latency { 2048 } else { codes[t - latency] };
        assert_eq!(code, expected, "sample {}", t);
    }
    assert_eq!(scheduler.front_end().staged_codes(), [codes[62], codes[63]]);
}

#[test]
fn test_process_unit_samples() {
    let mut scheduler = unit_scheduler(16, 1, OutputScale::Normalized { makeup_gain: 1.0 });
    let input = random_signal(13, 128, 0.9);
    let mut output = vec![0.0; 128];

    scheduler.process(&input, &mut output);

    let latency = scheduler.latency_samples();
    for t in latency..128 {
        assert!((output[t] - input[t - latency]).abs() < 1e-4);
    }
}

#[test]
fn test_mismatched_configuration_is_rejected() {
    let config = config(8, 12, OutputScale::Fixed(1.0));
    let wrong = PartitionedImpulseResponse::unit_impulse(&Geometry::new(8, 1).unwrap());

    assert_eq!(
        Scheduler::new(&config, wrong).err(),
        Some(ConfigError::PartitionCount {
            expected: 12,
            found: 1
        })
    );

    let impulse = PartitionedImpulseResponse::unit_impulse(&config.geometry().unwrap());
    let result = Scheduler::with_transform(&config, impulse, Box::new(RustFftTransform::new(16)));
    assert!(matches!(
        result.err(),
        Some(ConfigError::TransformMismatch { .. })
    ));

    let mut bad_dac = config.clone();
    bad_dac.dac_bits = 0;
    assert!(Scheduler::from_impulse_response(&bad_dac, &[1.0]).is_err());
}

#[test]
fn test_host_defaults_keep_quiet_input_in_range() {
    let config = EngineConfig::for_host();
    let geometry = config.geometry().unwrap();
    let ir = ImpulseResponseGenerator::new(config.sample_rate as f32).plate(
        &geometry,
        DEFAULT_DIFFUSION,
        0x5eed,
    );
    let mut scheduler = Scheduler::from_impulse_response(&config, &ir).unwrap();

    let rate = config.sample_rate as f32;
    let input: Vec<f32> = (0..24_000)
        .map(|t| 0.1 * (2.0 * std::f32::consts::PI * 440.0 * t as f32 / rate).sin())
        .collect();
    let mut output = vec![0.0; input.len()];
    scheduler.process(&input, &mut output);

    let peak = output.iter().fold(0.0_f32, |m, &v| m.max(v.abs()));
    assert!(output.iter().all(|v| (-1.0..=1.0).contains(v)));
    assert!(peak > 0.001, "output peak {}", peak);
}
