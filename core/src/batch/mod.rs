//! Record assembly and order-preserving batch output

mod assembler;
pub mod table;
mod writer;

pub use assembler::{ImageOutcome, RecordAssembler};
pub use writer::{Batch, BatchWriter};
