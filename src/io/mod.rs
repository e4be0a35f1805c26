#[cfg(feature = "geo")]
pub mod mfjson;
pub mod wkb;
