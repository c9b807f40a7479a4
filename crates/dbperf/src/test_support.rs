//! Backends used by the coordinator test suites.

use crate::{Address, Error, GroupId, Result, SelectJob, StorageBackend};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Records every write as an [`Address`] plus its subgroup flag.
#[derive(Default)]
pub struct RecordingBackend {
    writes: Mutex<Vec<(Address, bool)>>,
    fail_level: Option<u16>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails (and does not record) every write at `level`.
    pub fn failing_at(level: u16) -> Self {
        Self {
            fail_level: Some(level),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(Address, bool)> {
        self.writes.lock().clone()
    }

    fn push(&self, address: Address, is_subgroup: bool) -> Result<()> {
        if self.fail_level == Some(address.level) {
            return Err(Error::backend(format!("write refused at level {}", address.level)));
        }
        self.writes.lock().push((address, is_subgroup));
        Ok(())
    }
}

impl StorageBackend for RecordingBackend {
    fn insert_group(&self, level: u16, group: u32) -> Result<()> {
        self.push(Address { level, group, slot: 0 }, false)
    }

    fn insert_group_member(
        &self,
        level: u16,
        group: u32,
        slot: u32,
        is_subgroup: bool,
    ) -> Result<()> {
        self.push(Address { level, group, slot }, is_subgroup)
    }

    fn resolve_subtree(&self, _batch: &[GroupId], _job: &mut SelectJob) -> Result<()> {
        Ok(())
    }
}

/// Wraps another backend and fails any lookup whose batch touches one of
/// the poisoned groups.
pub struct FailingBackend<B> {
    inner: B,
    poisoned: HashSet<GroupId>,
    lookups: Mutex<u64>,
}

impl<B> FailingBackend<B> {
    pub fn new(inner: B, poisoned: impl IntoIterator<Item = GroupId>) -> Self {
        Self {
            inner,
            poisoned: poisoned.into_iter().collect(),
            lookups: Mutex::new(0),
        }
    }

    pub fn lookups(&self) -> u64 {
        *self.lookups.lock()
    }
}

impl<B> StorageBackend for FailingBackend<B>
where
    B: StorageBackend,
{
    fn insert_group(&self, level: u16, group: u32) -> Result<()> {
        self.inner.insert_group(level, group)
    }

    fn insert_group_member(
        &self,
        level: u16,
        group: u32,
        slot: u32,
        is_subgroup: bool,
    ) -> Result<()> {
        self.inner
            .insert_group_member(level, group, slot, is_subgroup)
    }

    fn resolve_subtree(&self, batch: &[GroupId], job: &mut SelectJob) -> Result<()> {
        *self.lookups.lock() += 1;
        if let Some(id) = batch.iter().find(|id| self.poisoned.contains(id)) {
            return Err(Error::backend(format!("lookup of {id} refused")));
        }
        self.inner.resolve_subtree(batch, job)
    }

    fn batch_limit(&self) -> usize {
        self.inner.batch_limit()
    }
}

/// Wraps another backend and records the root of every job it is asked to
/// resolve. A job's first lookup is the only one made at depth one.
pub struct RootRecorder<B> {
    inner: B,
    roots: Mutex<Vec<GroupId>>,
}

impl<B> RootRecorder<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            roots: Mutex::new(Vec::new()),
        }
    }

    /// Recorded roots in ascending order, duplicates kept.
    pub fn roots(&self) -> Vec<GroupId> {
        let mut roots = self.roots.lock().clone();
        roots.sort_unstable();
        roots
    }
}

impl<B> StorageBackend for RootRecorder<B>
where
    B: StorageBackend,
{
    fn insert_group(&self, level: u16, group: u32) -> Result<()> {
        self.inner.insert_group(level, group)
    }

    fn insert_group_member(
        &self,
        level: u16,
        group: u32,
        slot: u32,
        is_subgroup: bool,
    ) -> Result<()> {
        self.inner
            .insert_group_member(level, group, slot, is_subgroup)
    }

    fn resolve_subtree(&self, batch: &[GroupId], job: &mut SelectJob) -> Result<()> {
        if job.depth() == 1 {
            self.roots.lock().extend(batch.first().copied());
        }
        self.inner.resolve_subtree(batch, job)
    }

    fn batch_limit(&self) -> usize {
        self.inner.batch_limit()
    }
}
