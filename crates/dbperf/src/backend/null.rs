use crate::{GroupId, Result, SelectJob, StorageBackend};

/// A backend that accepts every write and resolves every group to nothing.
///
/// Useful to measure the overhead of the coordinators themselves.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullBackend;

impl StorageBackend for NullBackend {
    fn insert_group(&self, _level: u16, _group: u32) -> Result<()> {
        Ok(())
    }

    fn insert_group_member(
        &self,
        _level: u16,
        _group: u32,
        _slot: u32,
        _is_subgroup: bool,
    ) -> Result<()> {
        Ok(())
    }

    fn resolve_subtree(&self, _batch: &[GroupId], _job: &mut SelectJob) -> Result<()> {
        Ok(())
    }
}
