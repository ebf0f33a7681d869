//! Rolling frame statistics for the fly-through.

use std::collections::VecDeque;
use std::time::Duration;

use isoview_render::{FrameStats, TickReport};

/// Rolling window of per-tick measurements.
#[derive(Debug)]
pub struct PerfMetrics {
    /// Tick wall times in seconds
    tick_times: VecDeque<f32>,
    /// Items emitted by the primary camera
    emitted: VecDeque<usize>,
    /// History size for averaging
    history_size: usize,
    /// Totals over the whole run
    overflow: usize,
    revisits: usize,
    rebuilds: usize,
    stale: usize,
    load_requests: usize,
}

impl Default for PerfMetrics {
    fn default() -> Self {
        Self::new(120)
    }
}

impl PerfMetrics {
    /// Create a new collector keeping `history_size` samples.
    #[must_use]
    pub fn new(history_size: usize) -> Self {
        Self {
            tick_times: VecDeque::with_capacity(history_size),
            emitted: VecDeque::with_capacity(history_size),
            history_size: history_size.max(1),
            overflow: 0,
            revisits: 0,
            rebuilds: 0,
            stale: 0,
            load_requests: 0,
        }
    }

    /// Record one tick.
    pub fn record(&mut self, elapsed: Duration, report: &TickReport) {
        self.tick_times.push_back(elapsed.as_secs_f32());
        if self.tick_times.len() > self.history_size {
            self.tick_times.pop_front();
        }

        let primary = report.frames.first().map(|(_, s)| *s).unwrap_or_default();
        self.emitted.push_back(primary.emitted);
        if self.emitted.len() > self.history_size {
            self.emitted.pop_front();
        }

        for (_, stats) in &report.frames {
            self.add(stats);
        }
        self.rebuilds += usize::from(report.rebuild.is_some());
        self.stale += usize::from(report.stale_window.is_some());
        self.load_requests += report.load_requests;
    }

    fn add(&mut self, stats: &FrameStats) {
        self.overflow += stats.overflow;
        self.revisits += stats.revisits;
    }

    /// Average tick time in milliseconds.
    #[must_use]
    pub fn avg_tick_ms(&self) -> f32 {
        if self.tick_times.is_empty() {
            return 0.0;
        }
        self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32 * 1000.0
    }

    /// Worst tick time in the window, in milliseconds.
    #[must_use]
    pub fn max_tick_ms(&self) -> f32 {
        self.tick_times.iter().copied().fold(0.0, f32::max) * 1000.0
    }

    /// Average primary depth list length.
    #[must_use]
    pub fn avg_emitted(&self) -> f32 {
        if self.emitted.is_empty() {
            return 0.0;
        }
        self.emitted.iter().sum::<usize>() as f32 / self.emitted.len() as f32
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "tick {:.2}ms avg / {:.2}ms max | {:.0} items | {} overflow | {} revisits | {} rebuilds ({} stale) | {} loads",
            self.avg_tick_ms(),
            self.max_tick_ms(),
            self.avg_emitted(),
            self.overflow,
            self.revisits,
            self.rebuilds,
            self.stale,
            self.load_requests
        )
    }
}
