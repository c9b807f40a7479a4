use crate::{
    Hierarchy, Result, RunConfig, RunSummary, Sample, SelectJob, Snapshot, StatsWindow,
    StorageBackend,
};
use core::time::Duration;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::{thread, time::Instant};
#[cfg(feature = "tracing")]
use tracing::{debug, info, instrument, trace, warn};

/// Resolves the downward closure of every top-level group with a fixed pool
/// of worker threads.
///
/// Jobs are handed off through a channel of capacity one. A worker first
/// tries to receive a job. If none is waiting it claims the next unclaimed
/// top-level group from an atomic counter and offers the new job on the
/// channel. When the channel is already full the producer resolves the job
/// itself. A worker leaves the pool once nothing is left to claim and the
/// channel is empty.
///
/// Each job is resolved synchronously by one worker. A lookup failure
/// discards the job and is counted as a failure.
pub struct SelectCoordinator<'a, B>
where
    B: StorageBackend,
{
    backend: &'a B,
    hierarchy: Hierarchy,
    config: RunConfig,
    next: CachePadded<AtomicU64>,
    stats: Mutex<StatsWindow>,
}

/// Outcome of a select run.
#[derive(Copy, Clone, Debug)]
pub struct SelectReport {
    /// Top-level groups, one job each.
    pub groups: u64,
    pub summary: RunSummary,
}

impl SelectReport {
    /// Jobs that resolved completely.
    #[must_use]
    pub const fn jobs(&self) -> u64 {
        self.summary.totals.count
    }

    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.summary.totals.failures
    }

    /// Distinct users summed over resolved jobs.
    #[must_use]
    pub const fn members(&self) -> u64 {
        self.summary.totals.members
    }

    #[must_use]
    pub const fn subgroups(&self) -> u64 {
        self.summary.totals.subgroups
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.summary.elapsed
    }

    /// Resolved jobs per second over the whole run.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.summary.rate()
    }
}

impl<'a, B> SelectCoordinator<'a, B>
where
    B: StorageBackend,
{
    /// Select runs always cover every top-level group, so any instance
    /// partition in `config` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// run configuration is invalid.
    pub fn new(backend: &'a B, hierarchy: &Hierarchy, config: RunConfig) -> Result<Self> {
        let config = config.single_instance();
        config.validate()?;
        Ok(Self {
            backend,
            hierarchy: *hierarchy,
            config,
            next: CachePadded::new(AtomicU64::new(0)),
            stats: Mutex::new(StatsWindow::new(config.stats_period)),
        })
    }

    /// Number of jobs a run dispatches.
    #[must_use]
    pub fn total_jobs(&self) -> u64 {
        u64::from(self.hierarchy.top_level_group_count())
    }

    /// Runs the pool until every top-level group has been resolved or has
    /// failed.
    pub fn run(&self) -> SelectReport {
        #[cfg(feature = "tracing")]
        info!(
            "select-members starting: {} workers, {} top-level groups",
            self.config.workers,
            self.total_jobs()
        );

        self.next.store(0, Ordering::Relaxed);
        *self.stats.lock() = StatsWindow::new(self.config.stats_period);
        let (tx, rx) = crossbeam_channel::bounded::<SelectJob>(1);
        thread::scope(|s| {
            for worker in 0..self.config.workers {
                let (tx, rx) = (&tx, &rx);
                s.spawn(move || self.worker(worker, tx, rx));
            }
        });

        let now = Instant::now();
        let (snapshot, summary) = {
            let mut stats = self.stats.lock();
            let summary = RunSummary {
                totals: *stats.totals(),
                elapsed: stats.run_elapsed(now),
            };
            (stats.take(now), summary)
        };
        self.log_progress(&snapshot, summary.totals.attempts());

        SelectReport {
            groups: self.total_jobs(),
            summary,
        }
    }

    /// Expands `job` until its frontier is empty.
    ///
    /// # Errors
    ///
    /// Returns the first lookup error. The partially resolved job is dropped.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(root = %job.root())))]
    pub fn resolve(&self, mut job: SelectJob) -> Result<SelectJob> {
        let started = Instant::now();
        let limit = self.backend.batch_limit().max(1);
        while !job.is_resolved() {
            let batch = job.take_batch(limit);
            self.backend.resolve_subtree(&batch, &mut job)?;
        }
        job.set_elapsed(started.elapsed());
        Ok(job)
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn worker(&self, worker: usize, tx: &Sender<SelectJob>, rx: &Receiver<SelectJob>) {
        #[cfg(feature = "tracing")]
        trace!("select worker {worker} started");

        let mut local = Sample::default();
        let mut last_fold = Instant::now();
        while let Some(job) = self.next_job(tx, rx) {
            self.finish(job, &mut local);
            if last_fold.elapsed() >= self.config.stats_period {
                self.fold(&mut local);
                last_fold = Instant::now();
            }
        }

        self.stats.lock().fold(&local);

        #[cfg(feature = "tracing")]
        debug!("select worker {worker} finished");
    }

    /// Returns the next job this worker must resolve, or `None` once every
    /// top-level group has been claimed and the channel is empty.
    fn next_job(&self, tx: &Sender<SelectJob>, rx: &Receiver<SelectJob>) -> Option<SelectJob> {
        loop {
            // TryConsume
            if let Ok(job) = rx.try_recv() {
                return Some(job);
            }

            // ProduceIfIdle
            let Some(job) = self.claim() else {
                return rx.try_recv().ok();
            };
            match tx.try_send(job) {
                Ok(()) => {}
                Err(TrySendError::Full(job) | TrySendError::Disconnected(job)) => {
                    return Some(job);
                }
            }
        }
    }

    fn claim(&self) -> Option<SelectJob> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        if index >= self.total_jobs() {
            return None;
        }
        let level = self.hierarchy.level_count();
        let index = u32::try_from(index).ok()?;
        Some(SelectJob::new(self.hierarchy.group_id(level, index)))
    }

    fn finish(&self, job: SelectJob, local: &mut Sample) {
        #[cfg(feature = "tracing")]
        let root = job.root();
        match self.resolve(job) {
            Ok(job) => local.record_job(
                job.elapsed(),
                job.subgroup_count(),
                job.member_count() as u64,
                job.depth(),
            ),
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!("select-members job for {root} failed: {err}");
                #[cfg(not(feature = "tracing"))]
                let _ = err;
                local.record_failure();
            }
        }
    }

    fn fold(&self, local: &mut Sample) {
        let snapshot = {
            let mut stats = self.stats.lock();
            stats.fold(local);
            let done = stats.totals().attempts();
            stats
                .take_if_due(Instant::now())
                .map(|snapshot| (snapshot, done))
        };
        *local = Sample::default();

        if let Some((snapshot, done)) = snapshot {
            self.log_progress(&snapshot, done);
        }
    }

    /// `done` counts jobs that finished, successfully or not.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn log_progress(&self, snapshot: &Snapshot, done: u64) {
        #[cfg(feature = "tracing")]
        {
            let total = self.total_jobs();
            let (done, percent) = progress(done, total);
            let sample = &snapshot.sample;
            let (min, max, avg) = sample.latency_ms();
            info!(
                "[select-members {percent:>3}%] group: {done}/{total}, jobs: {}, jobs/s: {:.1}, latency min/max/avg (ms): {min:.3}/{max:.3}/{avg:.3}, avg depth: {:.2}, avg subgroups: {:.2}, avg members: {:.2}, failures: {}",
                sample.count,
                snapshot.rate(),
                sample.avg_depth(),
                sample.avg_subgroups(),
                sample.avg_members(),
                sample.failures,
            );
        }
    }
}

/// Finished jobs clamped to `total`, and the matching whole percentage.
#[cfg_attr(not(any(feature = "tracing", test)), allow(dead_code))]
pub(super) const fn progress(done: u64, total: u64) -> (u64, u64) {
    if total == 0 {
        return (0, 100);
    }
    let done = if done < total { done } else { total };
    (done, done * 100 / total)
}
