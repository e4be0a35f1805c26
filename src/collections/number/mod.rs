mod float_span;
pub use float_span::FloatSpan;

mod float_span_set;
pub use float_span_set::FloatSpanSet;

mod int_span;
pub use int_span::IntSpan;

mod int_span_set;
pub use int_span_set::IntSpanSet;
