use crate::{Error, Hierarchy, Result};

/// One unit of fill work.
///
/// `slot == 0` addresses the group row itself. Slots `1..=total_member_slots`
/// address the group's membership edges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub level: u16,
    /// Zero-based group position within the level.
    pub group: u32,
    pub slot: u32,
}

impl Address {
    #[must_use]
    pub const fn is_group_row(&self) -> bool {
        self.slot == 0
    }
}

/// Assigned slice of one level.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct LevelSpan {
    level: u16,
    start: u32,
    end: u32,
    /// Group row plus member slots.
    units_per_group: u64,
    /// Flattened index of the first unit of this level.
    offset: u64,
}

impl LevelSpan {
    const fn units(&self) -> u64 {
        (self.end - self.start) as u64 * self.units_per_group
    }
}

/// The address space one instance is responsible for, flattened into a
/// dense index `0..total_units()`.
///
/// Indices are ordered level-major, then group-major, then slot-minor. At
/// every level the instance owns groups
/// `[(id - 1) * G / C, id * G / C)`, where `G` is the level's group count and
/// `C` the instance count. These slices tile `[0, G)` exactly across all
/// instances.
#[derive(Clone, Debug)]
pub struct FillPlan {
    hierarchy: Hierarchy,
    spans: Vec<LevelSpan>,
    total_units: u64,
}

impl FillPlan {
    /// Builds the plan of instance `instance_id` (one-based) out of
    /// `instance_count`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `instance_id` is outside
    /// `1..=instance_count`.
    pub fn new(hierarchy: &Hierarchy, instance_id: u32, instance_count: u32) -> Result<Self> {
        if instance_count == 0 || instance_id == 0 || instance_id > instance_count {
            return Err(Error::invalid_config(format!(
                "instance_id ({instance_id}) must be within 1..={instance_count}"
            )));
        }

        let mut spans = Vec::with_capacity(usize::from(hierarchy.level_count()));
        let mut offset = 0_u64;
        for level in 1..=hierarchy.level_count() {
            let (start, end) = partition(hierarchy.group_count(level), instance_id, instance_count);
            let span = LevelSpan {
                level,
                start,
                end,
                units_per_group: u64::from(hierarchy.total_member_slots(level)) + 1,
                offset,
            };
            offset += span.units();
            spans.push(span);
        }

        Ok(Self {
            hierarchy: *hierarchy,
            spans,
            total_units: offset,
        })
    }

    #[must_use]
    pub const fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Number of writes this instance performs.
    #[must_use]
    pub const fn total_units(&self) -> u64 {
        self.total_units
    }

    /// Group range `[start, end)` assigned to this instance at `level`.
    #[must_use]
    pub fn partition(&self, level: u16) -> Option<(u32, u32)> {
        self.span(level).map(|span| (span.start, span.end))
    }

    /// Decodes a flattened index, or `None` once the plan is exhausted.
    #[must_use]
    pub fn address(&self, index: u64) -> Option<Address> {
        if index >= self.total_units {
            return None;
        }
        // Levels are few; the last span starting at or before `index` with
        // work in it owns the index.
        let span = self
            .spans
            .iter()
            .rev()
            .find(|span| span.units() > 0 && span.offset <= index)?;
        let local = index - span.offset;
        let group = span.start + (local / span.units_per_group) as u32;
        let slot = (local % span.units_per_group) as u32;
        Some(Address {
            level: span.level,
            group,
            slot,
        })
    }

    /// Returns `true` if `index` is the first unit of a level that follows
    /// earlier work of this instance.
    #[must_use]
    pub fn is_level_start(&self, index: u64) -> bool {
        index > 0
            && index < self.total_units
            && self
                .spans
                .iter()
                .any(|span| span.units() > 0 && span.offset == index)
    }

    /// Returns `true` if the membership edge at `address` references a
    /// subgroup.
    #[must_use]
    pub fn is_subgroup(&self, address: &Address) -> bool {
        self.hierarchy.is_subgroup_slot(address.level, address.slot)
    }

    fn span(&self, level: u16) -> Option<&LevelSpan> {
        let index = usize::from(level).checked_sub(1)?;
        self.spans.get(index)
    }
}

/// Slice `[(id - 1) * count / of, id * count / of)` of `[0, count)`.
///
/// An `id` outside `1..=of` owns the empty slice `(0, 0)`.
fn partition(count: u32, id: u32, of: u32) -> (u32, u32) {
    if id == 0 || id > of {
        return (0, 0);
    }
    let bound = |k: u32| (u64::from(count) * u64::from(k) / u64::from(of)) as u32;
    (bound(id - 1), bound(id))
}
