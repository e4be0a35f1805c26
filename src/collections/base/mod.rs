mod collection;
pub use collection::Collection;

mod span;
pub use span::{Span, SpanType};

mod span_set;
pub use span_set::SpanSet;
