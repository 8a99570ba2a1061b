mod orchestrator;
mod types;

pub use orchestrator::{run_stitching, Orchestrator};
pub use types::{NoOpReporter, ProgressReporter, RunStage};
