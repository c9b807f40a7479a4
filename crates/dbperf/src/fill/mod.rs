//! Parallel generation of the hierarchy into a [`StorageBackend`].
//!
//! [`StorageBackend`]: crate::StorageBackend

mod coordinator;
mod plan;

pub use coordinator::*;
pub use plan::*;

#[cfg(test)]
mod tests;
