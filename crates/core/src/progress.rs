//! Progress reporting for long-running decompilation.
//!
//! Backends call [`ProgressSink::report`] once per completed unit, synchronously and in
//! order. The sink latches the total from the first event and counts completions.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receiver of per-unit progress events.
pub trait ProgressSink {
    /// One unit finished. `total` is the unit count for the whole run.
    fn report(&mut self, total: usize, label: &str);

    /// Called once after the run; release any terminal state.
    fn finish(&mut self) {}
}

/// Shared counting logic: latched total plus monotonic completion count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounter {
    total: Option<usize>,
    completed: usize,
}

impl ProgressCounter {
    /// Record one event. Returns `true` when this was the first event of the run.
    pub fn advance(&mut self, total: usize) -> bool {
        let first = self.total.is_none();
        if first {
            self.total = Some(total);
        }
        self.completed += 1;
        first
    }

    pub fn total(&self) -> usize {
        self.total.unwrap_or(0)
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Completed fraction in `0.0..=1.0`; zero until a non-zero total is known.
    pub fn fraction(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.completed as f64 / total as f64).min(1.0),
            _ => 0.0,
        }
    }
}

/// Terminal progress bar.
pub struct ConsoleProgress {
    counter: ProgressCounter,
    bar: ProgressBar,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::with_template("{bar:40.green/white} {pos}/{len} ({percent}%)\n{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { counter: ProgressCounter::default(), bar }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, total: usize, label: &str) {
        if self.counter.advance(total) {
            self.bar.println(format!("Total files: {total}"));
            self.bar.set_length(total as u64);
        }
        self.bar.set_position(self.counter.completed() as u64);
        self.bar.set_message(format!("Decompiled {label}"));
    }

    fn finish(&mut self) {
        self.bar.finish();
    }
}

/// In-memory sink that keeps every event; useful for headless runs and tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub counter: ProgressCounter,
    pub labels: Vec<String>,
    pub finished: bool,
}

impl ProgressSink for RecordingProgress {
    fn report(&mut self, total: usize, label: &str) {
        self.counter.advance(total);
        self.labels.push(label.to_string());
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
