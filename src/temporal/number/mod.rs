pub mod tfloat;
pub mod tint;
pub mod tnumber;

pub use tfloat::{TFloat, TFloatInst, TFloatSeq, TFloatSeqSet};
pub use tint::{TInt, TIntInst, TIntSeq, TIntSeqSet};
pub use tnumber::TNumberType;
