#![doc = include_str!("../README.md")]

mod backend;
mod config;
mod error;
mod fill;
mod hierarchy;
mod id;
mod select;
mod stats;
#[cfg(test)]
mod test_support;

pub use crate::backend::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::fill::*;
pub use crate::hierarchy::*;
pub use crate::id::*;
pub use crate::select::*;
pub use crate::stats::*;
