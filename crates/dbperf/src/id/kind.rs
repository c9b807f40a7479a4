/// Stored type of a group row.
///
/// The discriminants are the values written to the `type` column of the
/// groups table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GroupKind {
    /// A first-level group. Owns only user members.
    Root = 1,
    /// A group above the first level. Owns user members and subgroups.
    Interior = 2,
}

impl GroupKind {
    #[must_use]
    pub const fn for_level(level: u16) -> Self {
        if level <= 1 { Self::Root } else { Self::Interior }
    }
}

/// Stored type of a membership edge.
///
/// The discriminants are the values written to the `member_type` column of
/// the group members table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MemberKind {
    /// A terminal member. Never expanded.
    User = 1,
    /// A reference to a group one level down. Expanded during resolution.
    Subgroup = 2,
}

impl MemberKind {
    #[must_use]
    pub const fn from_subgroup_flag(is_subgroup: bool) -> Self {
        if is_subgroup { Self::Subgroup } else { Self::User }
    }

    #[must_use]
    pub const fn is_subgroup(self) -> bool {
        matches!(self, Self::Subgroup)
    }
}

impl TryFrom<u8> for MemberKind {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::User),
            2 => Ok(Self::Subgroup),
            other => Err(other),
        }
    }
}
