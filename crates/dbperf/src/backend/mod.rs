mod interface;
mod memory;
mod null;

pub use interface::*;
pub use memory::*;
pub use null::*;
