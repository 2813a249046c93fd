mod growth;
mod kdtree;
mod mirror;

pub use growth::*;
pub use kdtree::*;
pub use mirror::*;
