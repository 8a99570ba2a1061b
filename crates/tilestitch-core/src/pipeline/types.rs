/// Run stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStage {
    NormalizingCoordinates,
    Discovering,
    LoadingTiles,
    Flatfield,
    Registration,
    Composing,
    Writing,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NormalizingCoordinates => write!(f, "Normalizing coordinates"),
            Self::Discovering => write!(f, "Discovering tiles"),
            Self::LoadingTiles => write!(f, "Loading tiles"),
            Self::Flatfield => write!(f, "Flatfield correction"),
            Self::Registration => write!(f, "Registering tiles"),
            Self::Composing => write!(f, "Composing mosaics"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Thread-safe progress reporting for a stitching run.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g., tile count), if known.
    fn begin_stage(&self, _stage: RunStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// Progress reporter that discards everything.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
