//! Progress reporting.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Receives the progress of a search.
pub trait ProgressSink {
    /// Called once before any candidate is tested.
    fn start(&mut self, _total: u128) {}

    /// `attempts` never decreases between calls, `rate` is in candidates/second.
    fn update(&mut self, attempts: u64, rate: f64);

    /// Called once when the search is over.
    fn finish(&mut self) {}
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _attempts: u64, _rate: f64) {}
}

/// Displays progress in an indicatif bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    pub fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
            )
            .expect("valid progress template")
            .progress_chars("#>-"),
        );

        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn start(&mut self, total: u128) {
        self.bar.set_length(u64::try_from(total).unwrap_or(u64::MAX));
    }

    fn update(&mut self, attempts: u64, rate: f64) {
        self.bar.set_position(attempts);
        self.bar.set_message(format!("{rate:.0} p/s"));
    }

    fn finish(&mut self) {
        self.bar.finish_with_message("Done");
    }
}

/// Estimates the number of candidates tested per second.
///
/// A sample taken at least one second after the previous one gives the rate
/// over that window. Samples taken sooner get the average since the start.
pub struct Throughput {
    start: Instant,
    last_time: Instant,
    last_attempts: u64,
}

impl Throughput {
    const WINDOW: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last_time: start,
            last_attempts: 0,
        }
    }

    pub fn sample(&mut self, attempts: u64) -> f64 {
        self.sample_at(attempts, Instant::now())
    }

    fn sample_at(&mut self, attempts: u64, now: Instant) -> f64 {
        let since_last = now.saturating_duration_since(self.last_time);

        if since_last >= Self::WINDOW {
            let rate = attempts.saturating_sub(self.last_attempts) as f64 / since_last.as_secs_f64();
            self.last_time = now;
            self.last_attempts = attempts;
            rate
        } else {
            rate(attempts, now.saturating_duration_since(self.start))
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Throughput {
    fn default() -> Self {
        Self::new()
    }
}

/// The average rate of `attempts` over `elapsed`, 0 when no time elapsed.
pub fn rate(attempts: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        attempts as f64 / secs
    } else {
        0.
    }
}
