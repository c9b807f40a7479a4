//! Parallel resolution of every top-level group's downward closure.

mod coordinator;
mod job;

pub use coordinator::*;
pub use job::*;
