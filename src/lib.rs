pub mod analysis;
pub mod dumper;
pub mod environment;
pub mod error;
pub mod runner;
pub mod statistics;

pub use error::{BenchError, Result};
pub use statistics::TimingRecord;
