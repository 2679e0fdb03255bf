//! Benchmark executor module

pub mod archive;
pub mod fio;
pub mod raw;

pub use archive::ArchivingExecutor;
pub use fio::{Executor, FioExecutor};
pub use raw::{FioOutput, RawResult, SideSummary};
