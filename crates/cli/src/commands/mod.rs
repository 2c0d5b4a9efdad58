pub mod acquire;
pub mod decompile;
pub mod util;

pub use acquire::*;
pub use decompile::*;
pub use util::*;
