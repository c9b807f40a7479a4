//! Geometric model of the synthetic group hierarchy.
//!
//! Level 1 holds `first_level_group_count` root groups. Every following level
//! grows by `growth_factor`, so level `l` holds
//! `floor(first_level_group_count * growth_factor^(l-1))` groups. Per-group
//! member counts scale the same way. Groups above level 1 reference subgroups
//! from the level directly below.
//!
//! Every function here is pure arithmetic over [`HierarchyConfig`].

use crate::{
    Error, GroupId, MemberKind, Result,
    id::USER_LEVEL,
};
use rand::Rng;

/// Shape of the generated hierarchy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HierarchyConfig {
    /// Number of groups on the first level.
    pub first_level_group_count: u32,
    /// Ratio of the number of groups (and members per group) between
    /// consecutive levels.
    pub growth_factor: f64,
    /// Number of levels, the deepest being the top-level tier.
    pub level_count: u16,
    /// Base number of user members per group. A group at level `l` owns
    /// `floor(user_member_count * growth_factor^(l - 1))` users.
    pub user_member_count: u32,
    /// Base number of subgroup members per group, scaled by
    /// `growth_factor^(l - 1)` like the user count. Level 1 groups own none.
    pub subgroup_member_count: u32,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            first_level_group_count: 1000,
            growth_factor: 1.0,
            level_count: 5,
            user_member_count: 90,
            subgroup_member_count: 10,
        }
    }
}

impl HierarchyConfig {
    /// Checks the model preconditions and that every level fits the id codec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if:
    /// - `level_count` or `first_level_group_count` is zero.
    /// - `growth_factor` is not a positive, finite number.
    /// - Any level ends up with zero groups or more than `u32::MAX - 1`
    ///   groups.
    /// - Any group ends up with more member slots than a `u32` can address.
    pub fn validate(&self) -> Result<()> {
        if self.level_count == 0 {
            return Err(Error::invalid_config("level_count must be greater than 0"));
        }
        if self.first_level_group_count == 0 {
            return Err(Error::invalid_config(
                "first_level_group_count must be greater than 0",
            ));
        }
        if !self.growth_factor.is_finite() || self.growth_factor <= 0.0 {
            return Err(Error::invalid_config(format!(
                "growth_factor ({}) must be a positive finite number",
                self.growth_factor
            )));
        }

        // One less than u32::MAX so that one-based group numbers still fit.
        let limit = f64::from(u32::MAX - 1);
        for level in 1..=self.level_count {
            let groups = scale(self.first_level_group_count, self.growth_factor, level);
            if groups < 1.0 {
                return Err(Error::invalid_config(format!(
                    "level {level} would contain no groups"
                )));
            }
            if groups > limit {
                return Err(Error::invalid_config(format!(
                    "level {level} would contain {groups} groups (max = {limit})"
                )));
            }

            let users = scale(self.user_member_count, self.growth_factor, level).floor();
            let subgroups = if level > 1 {
                scale(self.subgroup_member_count, self.growth_factor, level).floor()
            } else {
                0.0
            };
            if users + subgroups > limit {
                return Err(Error::invalid_config(format!(
                    "level {level} groups would own {} members (max = {limit})",
                    users + subgroups
                )));
            }
        }
        Ok(())
    }
}

fn scale(base: u32, factor: f64, level: u16) -> f64 {
    f64::from(base) * factor.powf(f64::from(level.saturating_sub(1)))
}

/// Float to int `as` casts truncate toward zero and saturate, which is the
/// floor for the non-negative values produced here.
fn scale_floor(base: u32, factor: f64, level: u16) -> u32 {
    scale(base, factor, level) as u32
}

/// Pure arithmetic over a [`HierarchyConfig`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hierarchy {
    config: HierarchyConfig,
}

impl Hierarchy {
    /// Wraps a configuration. Callers are expected to have run
    /// [`HierarchyConfig::validate`]. Unchecked configurations saturate
    /// instead of overflowing.
    #[must_use]
    pub const fn new(config: HierarchyConfig) -> Self {
        Self { config }
    }

    /// Validates `config` and wraps it.
    ///
    /// # Errors
    ///
    /// See [`HierarchyConfig::validate`].
    pub fn try_new(config: HierarchyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    #[must_use]
    pub const fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    #[must_use]
    pub const fn level_count(&self) -> u16 {
        self.config.level_count
    }

    /// Number of groups at `level`.
    #[must_use]
    pub fn group_count(&self, level: u16) -> u32 {
        scale_floor(
            self.config.first_level_group_count,
            self.config.growth_factor,
            level,
        )
    }

    /// Number of user members owned by each group at `level`.
    #[must_use]
    pub fn leaf_member_count(&self, level: u16) -> u32 {
        scale_floor(self.config.user_member_count, self.config.growth_factor, level)
    }

    /// Number of subgroups owned by each group at `level`. Always zero at
    /// level 1.
    #[must_use]
    pub fn subgroup_count(&self, level: u16) -> u32 {
        if level <= 1 {
            return 0;
        }
        scale_floor(
            self.config.subgroup_member_count,
            self.config.growth_factor,
            level,
        )
    }

    /// Member slots of each group at `level`, excluding the group row itself.
    #[must_use]
    pub fn total_member_slots(&self, level: u16) -> u32 {
        self.leaf_member_count(level)
            .saturating_add(self.subgroup_count(level))
    }

    /// Number of groups across all levels.
    #[must_use]
    pub fn total_groups(&self) -> u64 {
        (1..=self.level_count())
            .map(|level| u64::from(self.group_count(level)))
            .sum()
    }

    /// Size of the user pool that leaf members are drawn from.
    #[must_use]
    pub const fn user_pool_size(&self) -> u32 {
        self.config.first_level_group_count
    }

    /// Returns `true` if member `slot` (one-based) of a group at `level`
    /// references a subgroup rather than a user.
    ///
    /// Slots `1..=leaf_member_count(level)` are user slots and the remaining
    /// `subgroup_count(level)` slots are subgroup slots.
    #[must_use]
    pub fn is_subgroup_slot(&self, level: u16, slot: u32) -> bool {
        level > 1 && slot > self.leaf_member_count(level) && slot <= self.total_member_slots(level)
    }

    /// Id of the group at zero-based position `index` within `level`.
    #[must_use]
    pub const fn group_id(&self, level: u16, index: u32) -> GroupId {
        GroupId::from_position(level, index)
    }

    /// Number of top-level (deepest) groups. Each one seeds a select job.
    #[must_use]
    pub fn top_level_group_count(&self) -> u32 {
        self.group_count(self.level_count())
    }

    /// Ids of every top-level group, in position order.
    pub fn top_level_groups(&self) -> impl Iterator<Item = GroupId> + use<> {
        let level = self.level_count();
        (0..self.top_level_group_count()).map(move |index| GroupId::from_position(level, index))
    }

    /// Picks the member referenced by a membership edge of a group at
    /// `level`.
    ///
    /// A subgroup is drawn uniformly from the groups at `level - 1`. A user
    /// is drawn uniformly from the user pool and encoded at [`USER_LEVEL`].
    pub fn pick_member<R>(&self, level: u16, is_subgroup: bool, rng: &mut R) -> (GroupId, MemberKind)
    where
        R: Rng,
    {
        if is_subgroup && level > 1 {
            let child_level = level - 1;
            let count = self.group_count(child_level).max(1);
            let index = rng.random_range(0..count);
            (GroupId::from_position(child_level, index), MemberKind::Subgroup)
        } else {
            let count = self.user_pool_size().max(1);
            let index = rng.random_range(0..count);
            (GroupId::from_position(USER_LEVEL, index), MemberKind::User)
        }
    }
}
