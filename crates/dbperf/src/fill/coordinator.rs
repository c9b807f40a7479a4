use crate::{
    Address, FillPlan, Hierarchy, Result, RunConfig, RunSummary, Sample, Snapshot, StatsWindow,
    StorageBackend,
};
use core::time::Duration;
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use portable_atomic::{AtomicU64, Ordering};
use std::{thread, time::Instant};
#[cfg(feature = "tracing")]
use tracing::{debug, error, info, trace};

/// Writes every address of a [`FillPlan`] exactly once using a fixed pool of
/// worker threads.
///
/// Workers claim work from a single atomic counter over the plan's flattened
/// index, so no lock is held while deciding what to write next. Each worker
/// accumulates latency into a private [`Sample`] and folds it into the shared
/// [`StatsWindow`] at most once per statistics period, at level boundaries,
/// and on exit. The lock is never held across a backend call.
///
/// Failed writes are logged and counted. They are not retried and never stop
/// the pool.
pub struct FillCoordinator<'a, B>
where
    B: StorageBackend,
{
    backend: &'a B,
    plan: FillPlan,
    config: RunConfig,
    next: CachePadded<AtomicU64>,
    stats: Mutex<StatsWindow>,
}

/// Outcome of a fill run.
#[derive(Copy, Clone, Debug)]
pub struct FillReport {
    /// Addresses assigned to this instance.
    pub units: u64,
    pub summary: RunSummary,
}

impl FillReport {
    /// Writes that succeeded.
    #[must_use]
    pub const fn operations(&self) -> u64 {
        self.summary.totals.count
    }

    #[must_use]
    pub const fn failures(&self) -> u64 {
        self.summary.totals.failures
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.summary.elapsed
    }

    /// Successful writes per second over the whole run.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.summary.rate()
    }
}

impl<'a, B> FillCoordinator<'a, B>
where
    B: StorageBackend,
{
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// run configuration is invalid.
    pub fn new(backend: &'a B, hierarchy: &Hierarchy, config: RunConfig) -> Result<Self> {
        config.validate()?;
        let plan = FillPlan::new(hierarchy, config.instance_id, config.instance_count)?;
        Ok(Self {
            backend,
            plan,
            config,
            next: CachePadded::new(AtomicU64::new(0)),
            stats: Mutex::new(StatsWindow::new(config.stats_period)),
        })
    }

    #[must_use]
    pub const fn plan(&self) -> &FillPlan {
        &self.plan
    }

    /// Runs the pool until every address has been claimed and written.
    pub fn run(&self) -> FillReport {
        #[cfg(feature = "tracing")]
        info!(
            "fill-data starting: instance {}/{}, {} workers, {} writes",
            self.config.instance_id,
            self.config.instance_count,
            self.config.workers,
            self.plan.total_units()
        );

        self.next.store(0, Ordering::Relaxed);
        *self.stats.lock() = StatsWindow::new(self.config.stats_period);
        thread::scope(|s| {
            for worker in 0..self.config.workers {
                s.spawn(move || self.worker(worker));
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
        self.log_progress(&snapshot, self.plan.total_units(), None);

        FillReport {
            units: self.plan.total_units(),
            summary,
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn worker(&self, worker: usize) {
        #[cfg(feature = "tracing")]
        trace!("fill worker {worker} started");

        let mut local = Sample::default();
        let mut last_fold = Instant::now();
        loop {
            let index = self.next.fetch_add(1, Ordering::Relaxed);
            let Some(address) = self.plan.address(index) else {
                break;
            };

            if self.plan.is_level_start(index) {
                #[cfg(feature = "tracing")]
                info!(
                    "fill-data entering level {}/{}",
                    address.level,
                    self.plan.hierarchy().level_count()
                );
                self.fold(&mut local, index, &address, true);
                last_fold = Instant::now();
            }

            let started = Instant::now();
            match self.write(&address) {
                Ok(()) => local.record(started.elapsed()),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    error!(
                        "fill-data write failed at level {} group {} slot {}: {err}",
                        address.level, address.group, address.slot
                    );
                    local.record_failure();
                }
            }

            if last_fold.elapsed() >= self.config.stats_period {
                self.fold(&mut local, index + 1, &address, false);
                last_fold = Instant::now();
            }
        }

        self.stats.lock().fold(&local);

        #[cfg(feature = "tracing")]
        debug!("fill worker {worker} finished");
    }

    fn write(&self, address: &Address) -> Result<()> {
        if address.is_group_row() {
            self.backend.insert_group(address.level, address.group)
        } else {
            self.backend.insert_group_member(
                address.level,
                address.group,
                address.slot,
                self.plan.is_subgroup(address),
            )
        }
    }

    /// Folds `local` into the shared window and emits a snapshot if one is due
    /// or `force` is set.
    fn fold(&self, local: &mut Sample, claimed: u64, address: &Address, force: bool) {
        let snapshot = {
            let mut stats = self.stats.lock();
            stats.fold(local);
            let now = Instant::now();
            if force {
                Some(stats.take(now))
            } else {
                stats.take_if_due(now)
            }
        };
        *local = Sample::default();

        if let Some(snapshot) = snapshot {
            self.log_progress(&snapshot, claimed, Some(address));
        }
    }

    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn log_progress(&self, snapshot: &Snapshot, claimed: u64, address: Option<&Address>) {
        #[cfg(feature = "tracing")]
        {
            let hierarchy = self.plan.hierarchy();
            let total = self.plan.total_units();
            let percent = if total == 0 {
                100
            } else {
                claimed.min(total) * 100 / total
            };
            let (level, group, slot) = address.map_or(
                (hierarchy.level_count(), hierarchy.top_level_group_count(), 0),
                |a| (a.level, a.group + 1, a.slot),
            );
            let sample = &snapshot.sample;
            let (min, max, avg) = sample.latency_ms();
            info!(
                "[fill-data {percent:>3}%] level: {level}/{}, group: {group}/{}, slot: {slot}/{}, ops: {}, ops/s: {:.1}, latency min/max/avg (ms): {min:.3}/{max:.3}/{avg:.3}, failures: {}",
                hierarchy.level_count(),
                hierarchy.group_count(level),
                hierarchy.total_member_slots(level),
                sample.count,
                snapshot.rate(),
                sample.failures,
            );
        }
    }
}
