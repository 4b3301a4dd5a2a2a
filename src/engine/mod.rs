mod acquisition;
mod emission;
mod history;
mod processor;
mod state;
#[cfg(test)]
mod tests;

pub use acquisition::Acquired;
pub use history::SpectrumHistory;
pub use processor::{BlockJob, BlockProcessor, Dropped, Stage};
pub use state::{Cursors, EngineState};
