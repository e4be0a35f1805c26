mod spgist;
pub use spgist::{QuadTree, QuadTreeKey, Strategy};
