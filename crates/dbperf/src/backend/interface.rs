use crate::{DEFAULT_BATCH_LIMIT, GroupId, Result, SelectJob};

/// Capability interface of a data store under benchmark.
///
/// Both coordinators drive a backend through exactly these operations.
/// Implementations must be shareable across the worker pool. Any per-operation
/// timeout is the implementation's concern. Errors are reported to the
/// caller, which logs them and moves on without retrying.
pub trait StorageBackend: Send + Sync {
    /// Upserts the row of group `group` (zero-based) at `level`.
    ///
    /// The row is keyed by [`GroupId::from_position`] and stores at least the
    /// level and the [`GroupKind`](crate::GroupKind) of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects or fails the write.
    fn insert_group(&self, level: u16, group: u32) -> Result<()>;

    /// Upserts one membership edge of group `group` at `level`.
    ///
    /// `slot` is the one-based member slot being written. The referenced member
    /// is chosen at random from the range implied by `is_subgroup`, typically
    /// with [`Hierarchy::pick_member`](crate::Hierarchy::pick_member). The edge
    /// is keyed by `(group id, member id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects or fails the write.
    fn insert_group_member(&self, level: u16, group: u32, slot: u32, is_subgroup: bool)
    -> Result<()>;

    /// Fetches every membership edge of the groups in `batch` and folds them
    /// into `job`.
    ///
    /// Each returned member goes through [`SelectJob::absorb`], which queues
    /// subgroups and records users. Results larger than one page must be
    /// drained page by page before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if any page of the lookup fails. The job may hold
    /// partial results in that case and is expected to be discarded.
    fn resolve_subtree(&self, batch: &[GroupId], job: &mut SelectJob) -> Result<()>;

    /// Largest number of group ids sent in a single lookup.
    fn batch_limit(&self) -> usize {
        DEFAULT_BATCH_LIMIT
    }
}

/// Opaque token that resumes a paginated lookup where the previous page
/// ended. Its contents are backend-specific.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PageState(Vec<u8>);

impl PageState {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// An empty token means "start from the first page".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
