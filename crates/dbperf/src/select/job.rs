use crate::{GroupId, MemberKind};
use core::time::Duration;
use std::collections::{HashSet, VecDeque};

/// Resolution state for one top-level group.
///
/// A job is created by a select worker, resolved synchronously by exactly one
/// worker, folded into the run statistics and then dropped.
///
/// The frontier is expanded breadth-first in batches. Subgroup references are
/// appended to its tail and users are collected into a set. Every subgroup
/// points one level down and first-level groups own no subgroups, so the
/// frontier always drains.
#[derive(Debug, Clone)]
pub struct SelectJob {
    root: GroupId,
    frontier: VecDeque<GroupId>,
    members: HashSet<GroupId>,
    subgroups: u64,
    depth: u64,
    elapsed: Duration,
}

impl SelectJob {
    /// Seeds a job with a single group to expand.
    #[must_use]
    pub fn new(root: GroupId) -> Self {
        Self {
            root,
            frontier: VecDeque::from([root]),
            members: HashSet::new(),
            subgroups: 0,
            depth: 0,
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn root(&self) -> GroupId {
        self.root
    }

    /// Returns `true` once the frontier is empty.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.frontier.is_empty()
    }

    #[must_use]
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Removes up to `limit` group ids from the head of the frontier and
    /// counts one batch round.
    pub fn take_batch(&mut self, limit: usize) -> Vec<GroupId> {
        let n = self.frontier.len().min(limit.max(1));
        self.depth += 1;
        self.frontier.drain(..n).collect()
    }

    /// Classifies one member returned by a lookup.
    pub fn absorb(&mut self, member: GroupId, kind: MemberKind) {
        match kind {
            MemberKind::Subgroup => {
                self.frontier.push_back(member);
                self.subgroups += 1;
            }
            MemberKind::User => {
                self.members.insert(member);
            }
        }
    }

    /// Distinct users resolved so far.
    #[must_use]
    pub const fn members(&self) -> &HashSet<GroupId> {
        &self.members
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Subgroup references expanded, counting repeats.
    #[must_use]
    pub const fn subgroup_count(&self) -> u64 {
        self.subgroups
    }

    /// Batch rounds issued.
    #[must_use]
    pub const fn depth(&self) -> u64 {
        self.depth
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_holds_only_its_root() {
        let root = GroupId::encode(3, 1);
        let job = SelectJob::new(root);
        assert_eq!(job.root(), root);
        assert_eq!(job.frontier_len(), 1);
        assert!(!job.is_resolved());
        assert_eq!(job.depth(), 0);
    }

    #[test]
    fn take_batch_respects_limit_and_order() {
        let mut job = SelectJob::new(GroupId::encode(3, 1));
        let _ = job.take_batch(1);
        for n in 1..=5 {
            job.absorb(GroupId::encode(2, n), MemberKind::Subgroup);
        }

        let first = job.take_batch(2);
        assert_eq!(first, vec![GroupId::encode(2, 1), GroupId::encode(2, 2)]);
        let rest = job.take_batch(100);
        assert_eq!(rest.len(), 3);
        assert!(job.is_resolved());
        assert_eq!(job.depth(), 3);
        assert_eq!(job.subgroup_count(), 5);
    }

    #[test]
    fn users_are_deduplicated() {
        let mut job = SelectJob::new(GroupId::encode(2, 1));
        let user = GroupId::encode(0, 4);
        job.absorb(user, MemberKind::User);
        job.absorb(user, MemberKind::User);
        assert_eq!(job.member_count(), 1);
        assert!(job.members().contains(&user));
    }
}
