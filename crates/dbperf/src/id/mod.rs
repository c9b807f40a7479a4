mod group_id;
mod kind;

pub use group_id::*;
pub use kind::*;

/// Reserved level for user (leaf) members. Groups start at level 1, so user
/// ids never collide with group ids.
pub const USER_LEVEL: u16 = 0;
