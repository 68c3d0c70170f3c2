use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use packinstall_core::ProgressHandler;

/// Renders installer progress as a single terminal bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.enable_steady_tick(Duration::from_millis(120));
        BarProgress { bar }
    }

    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    fn counting_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }

    fn waiting_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl ProgressHandler for BarProgress {
    fn new_task_set(&self, count: usize) {
        self.bar.set_style(Self::counting_style());
        self.bar.set_length(count as u64);
        self.bar.set_position(0);
    }

    fn prepare_new_task_set(&self, label: &str) {
        self.bar.set_style(Self::waiting_style());
        self.bar.set_message(label.to_string());
    }

    fn new_task(&self, label: &str) {
        self.bar.set_message(label.to_string());
        self.bar.inc(1);
    }

    fn done(&self) {
        self.bar.finish_with_message("Done");
    }
}
