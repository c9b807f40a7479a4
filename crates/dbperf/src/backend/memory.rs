use crate::{
    DEFAULT_BATCH_LIMIT, DEFAULT_PAGE_SIZE, Error, GroupId, GroupKind, Hierarchy, MemberKind,
    PageState, Result, SelectJob, StorageBackend,
};
use core::ops::Bound;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A stored group row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GroupRow {
    pub level: u16,
    pub kind: GroupKind,
}

/// One page of a membership lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberPage {
    pub rows: Vec<(GroupId, MemberKind)>,
    /// `None` once the lookup is exhausted.
    pub next: Option<PageState>,
}

/// An in-process store with the same two-table shape as a real deployment:
/// `groups` keyed by group id, and `group_members` keyed by
/// `(group id, member id)`.
///
/// Lookups are paginated exactly like a remote store would paginate them, so
/// the select path exercises its page-state loop even without a network.
///
/// ## Features
///
/// - ✅ Thread-safe (`parking_lot::RwLock` per table)
/// - ✅ Idempotent upserts
/// - ❌ Durable
pub struct MemoryBackend {
    hierarchy: Hierarchy,
    page_size: usize,
    batch_limit: usize,
    groups: RwLock<HashMap<GroupId, GroupRow>>,
    members: RwLock<HashMap<GroupId, BTreeMap<GroupId, MemberKind>>>,
}

impl MemoryBackend {
    /// Creates an empty store with the default page size and batch limit.
    #[must_use]
    pub fn new(hierarchy: Hierarchy) -> Self {
        Self {
            hierarchy,
            page_size: DEFAULT_PAGE_SIZE,
            batch_limit: DEFAULT_BATCH_LIMIT,
            groups: RwLock::new(HashMap::new()),
            members: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the maximum rows per lookup page (at least one).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the maximum group ids per lookup batch (at least one).
    #[must_use]
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit.max(1);
        self
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Upserts a membership edge directly, bypassing random member selection.
    pub fn link(&self, group: GroupId, member: GroupId, kind: MemberKind) {
        self.members
            .write()
            .entry(group)
            .or_default()
            .insert(member, kind);
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<GroupRow> {
        self.groups.read().get(&id).copied()
    }

    /// Number of stored group rows.
    #[must_use]
    pub fn group_rows(&self) -> usize {
        self.groups.read().len()
    }

    /// Number of stored membership edges.
    #[must_use]
    pub fn edge_rows(&self) -> usize {
        self.members.read().values().map(BTreeMap::len).sum()
    }

    /// Members of a single group, ordered by member id.
    #[must_use]
    pub fn members_of(&self, group: GroupId) -> Vec<(GroupId, MemberKind)> {
        self.members
            .read()
            .get(&group)
            .map(|edges| edges.iter().map(|(&id, &kind)| (id, kind)).collect())
            .unwrap_or_default()
    }

    /// Returns up to `page_size` edges of the groups in `batch`, resuming
    /// after `state`.
    ///
    /// Rows come out in batch order, then member id order. The page state
    /// records the batch position and the last member returned for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPageState`] if `state` was not produced by a
    /// lookup over the same batch.
    pub fn fetch_page(&self, batch: &[GroupId], state: &PageState) -> Result<MemberPage> {
        let (mut position, mut after) = decode_page_state(state)?;
        if position > batch.len() {
            return Err(Error::InvalidPageState {
                context: format!("position {position} beyond batch of {}", batch.len()),
            });
        }

        let members = self.members.read();
        let mut rows = Vec::with_capacity(self.page_size.min(1024));

        while position < batch.len() {
            if let Some(edges) = members.get(&batch[position]) {
                let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
                for (&member, &kind) in edges.range((lower, Bound::Unbounded)) {
                    if rows.len() == self.page_size {
                        return Ok(MemberPage {
                            rows,
                            next: Some(encode_page_state(position, after)),
                        });
                    }
                    rows.push((member, kind));
                    after = Some(member);
                }
            }
            position += 1;
            after = None;
        }

        Ok(MemberPage { rows, next: None })
    }
}

impl StorageBackend for MemoryBackend {
    fn insert_group(&self, level: u16, group: u32) -> Result<()> {
        let id = self.hierarchy.group_id(level, group);
        let row = GroupRow {
            level,
            kind: GroupKind::for_level(level),
        };
        self.groups.write().insert(id, row);
        Ok(())
    }

    fn insert_group_member(
        &self,
        level: u16,
        group: u32,
        _slot: u32,
        is_subgroup: bool,
    ) -> Result<()> {
        let id = self.hierarchy.group_id(level, group);
        let (member, kind) = self
            .hierarchy
            .pick_member(level, is_subgroup, &mut rand::rng());
        self.link(id, member, kind);
        Ok(())
    }

    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all, fields(batch = batch.len())))]
    fn resolve_subtree(&self, batch: &[GroupId], job: &mut SelectJob) -> Result<()> {
        let mut state = PageState::default();
        loop {
            let page = self.fetch_page(batch, &state)?;
            for (member, kind) in page.rows {
                job.absorb(member, kind);
            }
            match page.next {
                Some(next) => state = next,
                None => return Ok(()),
            }
        }
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

const POSITION_LEN: usize = 8;
const MEMBER_LEN: usize = 16;

fn encode_page_state(position: usize, after: Option<GroupId>) -> PageState {
    let mut bytes = Vec::with_capacity(POSITION_LEN + MEMBER_LEN);
    bytes.extend_from_slice(&(position as u64).to_be_bytes());
    if let Some(member) = after {
        bytes.extend_from_slice(&member.to_bytes());
    }
    PageState::new(bytes)
}

fn decode_page_state(state: &PageState) -> Result<(usize, Option<GroupId>)> {
    let bytes = state.as_bytes();
    if bytes.is_empty() {
        return Ok((0, None));
    }

    let invalid = || Error::InvalidPageState {
        context: format!("unexpected token length {}", bytes.len()),
    };
    let (position, rest) = bytes.split_first_chunk::<POSITION_LEN>().ok_or_else(invalid)?;
    let position = usize::try_from(u64::from_be_bytes(*position)).map_err(|_| invalid())?;

    let after = match rest.len() {
        0 => None,
        MEMBER_LEN => {
            let mut member = [0_u8; MEMBER_LEN];
            member.copy_from_slice(rest);
            Some(GroupId::from_bytes(member))
        }
        _ => return Err(invalid()),
    };
    Ok((position, after))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HierarchyConfig;

    fn backend(page_size: usize) -> MemoryBackend {
        MemoryBackend::new(Hierarchy::new(HierarchyConfig {
            first_level_group_count: 4,
            growth_factor: 1.0,
            level_count: 3,
            user_member_count: 3,
            subgroup_member_count: 2,
        }))
        .with_page_size(page_size)
    }

    fn user(n: u32) -> GroupId {
        GroupId::from_position(0, n)
    }

    #[test]
    fn insert_group_stores_level_and_kind() {
        let store = backend(10);
        store.insert_group(1, 0).unwrap();
        store.insert_group(3, 2).unwrap();
        store.insert_group(3, 2).unwrap();

        assert_eq!(store.group_rows(), 2);
        let root = store.group(GroupId::encode(1, 1)).unwrap();
        assert_eq!(root.kind, GroupKind::Root);
        let top = store.group(GroupId::encode(3, 3)).unwrap();
        assert_eq!(top, GroupRow { level: 3, kind: GroupKind::Interior });
    }

    #[test]
    fn insert_group_member_links_expected_kind() {
        let store = backend(10);
        store.insert_group_member(2, 1, 4, true).unwrap();
        store.insert_group_member(2, 1, 1, false).unwrap();

        let edges = store.members_of(GroupId::encode(2, 2));
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().any(|(id, kind)| *kind == MemberKind::Subgroup && id.level() == 1));
        assert!(edges.iter().any(|(id, kind)| *kind == MemberKind::User && id.level() == 0));
    }

    #[test]
    fn fetch_page_walks_batch_in_pages() {
        let store = backend(2);
        let a = GroupId::encode(2, 1);
        let b = GroupId::encode(2, 2);
        for n in 0..3 {
            store.link(a, user(n), MemberKind::User);
        }
        store.link(b, user(10), MemberKind::User);
        store.link(b, GroupId::encode(1, 1), MemberKind::Subgroup);

        let batch = [a, GroupId::encode(2, 99), b];
        let mut state = PageState::default();
        let mut pages = Vec::new();
        loop {
            let page = store.fetch_page(&batch, &state).unwrap();
            assert!(page.rows.len() <= 2);
            pages.push(page.rows);
            match page.next {
                Some(next) => state = next,
                None => break,
            }
        }

        let rows: Vec<_> = pages.concat();
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows[..3], &[
            (user(0), MemberKind::User),
            (user(1), MemberKind::User),
            (user(2), MemberKind::User),
        ]);
        assert!(pages.len() >= 3);
    }

    #[test]
    fn resolve_subtree_drains_all_pages() {
        let store = backend(1);
        let group = GroupId::encode(2, 1);
        let sub = GroupId::encode(1, 1);
        store.link(group, user(0), MemberKind::User);
        store.link(group, user(1), MemberKind::User);
        store.link(group, sub, MemberKind::Subgroup);

        let mut job = SelectJob::new(group);
        let batch = job.take_batch(10);
        store.resolve_subtree(&batch, &mut job).unwrap();

        assert_eq!(job.member_count(), 2);
        assert_eq!(job.subgroup_count(), 1);
        assert_eq!(job.take_batch(10), vec![sub]);
    }

    #[test]
    fn rejects_foreign_page_state() {
        let store = backend(1);
        let batch = [GroupId::encode(1, 1)];
        let bad = PageState::new(vec![1, 2, 3]);
        assert!(matches!(
            store.fetch_page(&batch, &bad),
            Err(Error::InvalidPageState { .. })
        ));

        let beyond = encode_page_state(5, None);
        assert!(matches!(
            store.fetch_page(&batch, &beyond),
            Err(Error::InvalidPageState { .. })
        ));
    }

    #[test]
    fn page_state_round_trips() {
        let member = GroupId::encode(1, 7);
        let state = encode_page_state(3, Some(member));
        assert_eq!(decode_page_state(&state).unwrap(), (3, Some(member)));
        assert_eq!(decode_page_state(&PageState::default()).unwrap(), (0, None));
    }
}
