pub mod batch;
pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
pub mod results;
pub mod writer;

pub use batch::{execute, execute_batch, execute_bulk};
pub use opts::{Opts, supports_bulk};
pub use results::BatchResult;
pub use writer::PacketWriter;
