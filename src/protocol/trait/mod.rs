mod param;

pub use param::{LongData, Param};
