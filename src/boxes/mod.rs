pub mod r#box;
pub use r#box::BoundingBox;

mod tbox;
pub use tbox::TBox;

mod stbox;
pub use stbox::STBox;
