//! Latency and throughput accounting shared by both coordinators.
//!
//! Workers accumulate into a private [`Sample`] and fold it into the shared
//! [`StatsWindow`] while holding the coordinator's lock. The window keeps two
//! samples: the current emission window, which is reset on every
//! [`Snapshot`], and the run totals, which are never reset.

use core::time::Duration;
use std::time::Instant;

/// Accumulated counters for a set of operations or jobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Completed operations (fill) or resolved jobs (select).
    pub count: u64,
    /// Operations or jobs that failed. These are not part of `count` and
    /// contribute no latency.
    pub failures: u64,
    pub min: Duration,
    pub max: Duration,
    pub total: Duration,
    /// Subgroup references expanded (select only).
    pub subgroups: u64,
    /// Distinct user members resolved (select only).
    pub members: u64,
    /// Batch rounds issued (select only).
    pub depth: u64,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            count: 0,
            failures: 0,
            min: Duration::MAX,
            max: Duration::ZERO,
            total: Duration::ZERO,
            subgroups: 0,
            members: 0,
            depth: 0,
        }
    }
}

impl Sample {
    /// Records one completed operation.
    pub fn record(&mut self, latency: Duration) {
        self.count += 1;
        self.min = self.min.min(latency);
        self.max = self.max.max(latency);
        self.total = self.total.saturating_add(latency);
    }

    /// Records one completed select job together with its fan-out.
    pub fn record_job(&mut self, latency: Duration, subgroups: u64, members: u64, depth: u64) {
        self.record(latency);
        self.subgroups += subgroups;
        self.members += members;
        self.depth += depth;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
        self.failures += other.failures;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.total = self.total.saturating_add(other.total);
        self.subgroups += other.subgroups;
        self.members += other.members;
        self.depth += other.depth;
    }

    /// Number of operations seen, successful or not.
    #[must_use]
    pub const fn attempts(&self) -> u64 {
        self.count + self.failures
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.attempts() == 0
    }

    /// Smallest recorded latency, or zero when nothing completed.
    #[must_use]
    pub fn min_latency(&self) -> Duration {
        if self.count == 0 { Duration::ZERO } else { self.min }
    }

    #[must_use]
    pub fn avg_latency(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        // Sub-nanosecond precision is irrelevant for reporting.
        Duration::from_nanos((self.total.as_nanos() / u128::from(self.count)) as u64)
    }

    /// `(min, max, avg)` latency in fractional milliseconds.
    #[must_use]
    pub fn latency_ms(&self) -> (f64, f64, f64) {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        (ms(self.min_latency()), ms(self.max), ms(self.avg_latency()))
    }

    #[must_use]
    pub fn avg_subgroups(&self) -> f64 {
        per_count(self.subgroups, self.count)
    }

    #[must_use]
    pub fn avg_members(&self) -> f64 {
        per_count(self.members, self.count)
    }

    #[must_use]
    pub fn avg_depth(&self) -> f64 {
        per_count(self.depth, self.count)
    }
}

fn per_count(value: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        value as f64 / count as f64
    }
}

/// A closed emission window.
#[derive(Copy, Clone, Debug)]
pub struct Snapshot {
    pub sample: Sample,
    pub elapsed: Duration,
}

impl Snapshot {
    /// Completed operations per second over the window.
    #[must_use]
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.sample.count as f64 / secs
        } else {
            0.0
        }
    }
}

/// Shared statistics for one run, guarded by the owning coordinator's lock.
#[derive(Debug)]
pub struct StatsWindow {
    window: Sample,
    totals: Sample,
    period: Duration,
    run_started: Instant,
    window_started: Instant,
}

impl StatsWindow {
    /// Creates a window that becomes due every `period`.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let now = Instant::now();
        Self {
            window: Sample::default(),
            totals: Sample::default(),
            period,
            run_started: now,
            window_started: now,
        }
    }

    pub fn fold(&mut self, sample: &Sample) {
        self.window.merge(sample);
        self.totals.merge(sample);
    }

    /// Returns `true` once the current window is at least one period old.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.window_started) >= self.period
    }

    /// Closes the current window and starts a new one at `now`.
    pub fn take(&mut self, now: Instant) -> Snapshot {
        let snapshot = Snapshot {
            sample: self.window,
            elapsed: now.saturating_duration_since(self.window_started),
        };
        self.window = Sample::default();
        self.window_started = now;
        snapshot
    }

    /// Closes the window only if it is due.
    pub fn take_if_due(&mut self, now: Instant) -> Option<Snapshot> {
        self.is_due(now).then(|| self.take(now))
    }

    #[must_use]
    pub const fn totals(&self) -> &Sample {
        &self.totals
    }

    #[must_use]
    pub fn run_elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.run_started)
    }
}

/// Whole-run summary shared by both coordinators' reports.
#[derive(Copy, Clone, Debug)]
pub struct RunSummary {
    pub totals: Sample,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Completed operations per second over the whole run.
    #[must_use]
    pub fn rate(&self) -> f64 {
        Snapshot {
            sample: self.totals,
            elapsed: self.elapsed,
        }
        .rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn empty_sample_reports_zero_latency() {
        let sample = Sample::default();
        assert!(sample.is_empty());
        assert_eq!(sample.min_latency(), Duration::ZERO);
        assert_eq!(sample.avg_latency(), Duration::ZERO);
        assert_eq!(sample.avg_members(), 0.0);
    }

    #[test]
    fn record_tracks_min_max_avg() {
        let mut sample = Sample::default();
        sample.record(ms(4));
        sample.record(ms(2));
        sample.record(ms(6));
        sample.record_failure();

        assert_eq!(sample.count, 3);
        assert_eq!(sample.failures, 1);
        assert_eq!(sample.attempts(), 4);
        assert_eq!(sample.min_latency(), ms(2));
        assert_eq!(sample.max, ms(6));
        assert_eq!(sample.avg_latency(), ms(4));
    }

    #[test]
    fn merge_combines_job_counters() {
        let mut a = Sample::default();
        a.record_job(ms(1), 2, 10, 3);
        let mut b = Sample::default();
        b.record_job(ms(3), 4, 20, 3);
        b.record_failure();

        a.merge(&b);
        assert_eq!(a.count, 2);
        assert_eq!(a.failures, 1);
        assert_eq!(a.subgroups, 6);
        assert_eq!(a.members, 30);
        assert_eq!(a.avg_depth(), 3.0);
        assert_eq!(a.avg_members(), 15.0);
        assert_eq!(a.min_latency(), ms(1));
        assert_eq!(a.max, ms(3));
    }

    #[test]
    fn take_resets_window_but_not_totals() {
        let mut stats = StatsWindow::new(Duration::from_secs(3600));
        let mut sample = Sample::default();
        sample.record(ms(5));
        stats.fold(&sample);

        let start = Instant::now();
        assert!(stats.take_if_due(start).is_none());

        let snapshot = stats.take(start);
        assert_eq!(snapshot.sample.count, 1);
        stats.fold(&sample);
        let snapshot = stats.take(start);
        assert_eq!(snapshot.sample.count, 1);
        assert_eq!(stats.totals().count, 2);
    }

    #[test]
    fn zero_period_is_always_due() {
        let mut stats = StatsWindow::new(Duration::ZERO);
        assert!(stats.take_if_due(Instant::now()).is_some());
    }
}
