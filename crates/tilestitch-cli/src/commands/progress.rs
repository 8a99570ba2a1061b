use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tilestitch_core::pipeline::{ProgressReporter, RunStage};

/// Drives a terminal spinner from stitching progress.
pub struct SpinnerReporter {
    bar: ProgressBar,
    counted: ProgressStyle,
    open_ended: ProgressStyle,
}

impl SpinnerReporter {
    pub fn new() -> Result<Self> {
        let counted = ProgressStyle::with_template("{spinner:.cyan} {msg:24} [{bar:30}] {pos}/{len}")?
            .progress_chars("=> ");
        let open_ended = ProgressStyle::with_template("{spinner:.cyan} {msg:24}")?;
        let bar = ProgressBar::new_spinner();
        bar.set_style(open_ended.clone());
        bar.enable_steady_tick(Duration::from_millis(100));
        Ok(Self {
            bar,
            counted,
            open_ended,
        })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for SpinnerReporter {
    fn begin_stage(&self, stage: RunStage, total_items: Option<usize>) {
        match total_items {
            Some(total) => {
                self.bar.set_style(self.counted.clone());
                self.bar.set_length(total as u64);
            }
            None => self.bar.set_style(self.open_ended.clone()),
        }
        self.bar.set_position(0);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.bar.tick();
    }
}
