//! Runtime knobs shared by the fill and select coordinators.
//!
//! ## Key Concepts
//! - **Workers**: size of the fixed OS-thread pool spawned once per run.
//! - **Instances**: cooperating processes that each fill a disjoint slice of
//!   every level. Instance ids are one-based.
//! - **Statistics period**: how often a progress snapshot is emitted.

use crate::{Error, Result};
use core::time::Duration;

/// Default number of concurrent workers per run.
pub const DEFAULT_WORKERS: usize = 32;

/// Default interval between progress snapshots.
pub const DEFAULT_STATS_PERIOD: Duration = Duration::from_millis(1000);

/// Default number of group ids sent in one lookup batch.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Default number of rows returned per lookup page.
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub workers: usize,
    pub instance_id: u32,
    pub instance_count: u32,
    pub stats_period: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            instance_id: 1,
            instance_count: 1,
            stats_period: DEFAULT_STATS_PERIOD,
        }
    }
}

impl RunConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if there are no workers or the
    /// instance id is outside `1..=instance_count`.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::invalid_config("workers must be greater than 0"));
        }
        if self.instance_count == 0 {
            return Err(Error::invalid_config("instance_count must be greater than 0"));
        }
        if self.instance_id == 0 || self.instance_id > self.instance_count {
            return Err(Error::invalid_config(format!(
                "instance_id ({}) must be within 1..={}",
                self.instance_id, self.instance_count
            )));
        }
        Ok(())
    }

    /// Same settings, but owning the whole address space. Select runs ignore
    /// instance partitioning.
    #[must_use]
    pub const fn single_instance(self) -> Self {
        Self {
            instance_id: 1,
            instance_count: 1,
            ..self
        }
    }
}
