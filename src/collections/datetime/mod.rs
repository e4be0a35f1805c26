mod tstz_span;
pub use tstz_span::TsTzSpan;

mod tstz_span_set;
pub use tstz_span_set::TsTzSpanSet;
