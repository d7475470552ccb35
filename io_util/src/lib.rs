mod read_util;
mod write_util;

pub use read_util::*;
pub use write_util::*;
