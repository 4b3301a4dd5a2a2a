use crate::transform::Transform;
use crate::utils::{complex_multiply_accumulate, scale_buffer};

use super::state::EngineState;

/// Position of a block job inside the convolution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Zero-pad the filled half and forward-transform it.
    Transform,
    /// Store the spectrum in the history.
    Store,
    /// Multiply-accumulate partition `k`.
    Accumulate(usize),
    Inverse,
    Scale,
    /// Head back to the ping-pong half, tail into the overlap ring.
    WriteBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockJob {
    /// Offset of the ping-pong half being convolved.
    pub offset: usize,
    pub stage: Stage,
}

/// Outcome of abandoning a job that missed its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropped {
    pub offset: usize,
    pub stage: Stage,
}

impl Dropped {
    /// True when the block was abandoned before its spectrum reached the
    /// history: its input is missing from every later block's tail too.
    pub fn spectrum_lost(&self) -> bool {
        matches!(self.stage, Stage::Transform | Stage::Store)
    }
}

/// Tier-3 work: uniform-partitioned convolution of one block, split into
/// steps so a cooperative scheduler can interleave it with the sample tiers.
pub struct BlockProcessor {
    transform: Box<dyn Transform>,
    scale: f32,
    job: Option<BlockJob>,
}

impl BlockProcessor {
    pub fn new(transform: Box<dyn Transform>, scale: f32) -> Self {
        Self {
            transform,
            scale,
            job: None,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn job(&self) -> Option<BlockJob> {
        self.job
    }

    pub fn is_busy(&self) -> bool {
        self.job.is_some()
    }

    /// Steps one job takes from start to finish.
    pub fn steps_per_block(partitions: usize) -> usize {
        partitions + 5
    }

    /// Forgets any job without touching the buffers (used on re-initialization).
    pub fn clear(&mut self) {
        self.job = None;
    }

    pub fn start(&mut self, offset: usize) {
        debug_assert!(self.job.is_none());
        self.job = Some(BlockJob {
            offset,
            stage: Stage::Transform,
        });
    }

    /// Runs up to `max_steps` steps. Returns `true` when a job finished.
    pub fn run(&mut self, state: &mut EngineState, max_steps: usize) -> bool {
        let mut steps = 0;
        while steps < max_steps {
            let Some(job) = self.job else {
                return false;
            };
            self.job = self.step(state, job);
            steps += 1;
            if self.job.is_none() {
                return true;
            }
        }
        false
    }

    /// Drives a signaled block to completion.
    pub fn run_to_completion(&mut self, state: &mut EngineState) {
        self.run(state, usize::MAX);
    }

    fn step(&mut self, state: &mut EngineState, job: BlockJob) -> Option<BlockJob> {
        let geometry = state.geometry;
        let n = geometry.transform_size;
        let offset = job.offset;

        debug_assert!(
            !state.in_half(state.cursors.input_write, offset),
            "acquisition is writing into the half under convolution"
        );

        let next = match job.stage {
            Stage::Transform => {
                let region = &mut state.input[offset..offset + 2 * n];
                region[n..].fill(0.0);
                state.spectrum.copy_from_slice(region);
                self.transform.forward(&mut state.spectrum);
                Stage::Store
            }
            Stage::Store => {
                state.history.push(&state.spectrum);
                Stage::Accumulate(0)
            }
            Stage::Accumulate(k) => {
                // The accumulator already holds the newest spectrum: dry path
                complex_multiply_accumulate(
                    &mut state.spectrum,
                    state.history.delayed(k),
                    state.impulse.partition(k),
                );
                if k + 1 < geometry.partitions {
                    Stage::Accumulate(k + 1)
                } else {
                    Stage::Inverse
                }
            }
            Stage::Inverse => {
                self.transform.inverse(&mut state.spectrum);
                Stage::Scale
            }
            Stage::Scale => {
                scale_buffer(&mut state.spectrum, self.scale);
                Stage::WriteBack
            }
            Stage::WriteBack => {
                let write = state.cursors.overlap_write;
                debug_assert_ne!(
                    state.overlap_slot(write),
                    state.overlap_slot(state.cursors.overlap_read),
                    "overlap slot still being emitted"
                );

                state.input[offset..offset + n].copy_from_slice(&state.spectrum[..n]);
                state.overlap[write..write + n].copy_from_slice(&state.spectrum[n..]);
                state.cursors.overlap_write = next_overlap_write(write, n, geometry.overlap_len());
                return None;
            }
        };

        Some(BlockJob { stage: next, ..job })
    }

    /// Abandons the current job after a missed deadline, leaving the buffers
    /// as if the block had been silent.
    pub fn abandon(&mut self, state: &mut EngineState) -> Option<Dropped> {
        let job = self.job.take()?;
        let dropped = Dropped {
            offset: job.offset,
            stage: job.stage,
        };
        let geometry = state.geometry;
        let n = geometry.transform_size;

        if dropped.spectrum_lost() {
            state.history.push_silence();
        }

        state.input[job.offset..job.offset + n].fill(0.0);

        let write = state.cursors.overlap_write;
        state.overlap[write..write + n].fill(0.0);
        state.cursors.overlap_write = next_overlap_write(write, n, geometry.overlap_len());

        Some(dropped)
    }
}

fn next_overlap_write(write: usize, step: usize, len: usize) -> usize {
    let next = write + step;
    if next == len {
        0
    } else {
        next
    }
}
