//! autofio library
//!
//! Finds the fio IO depth that maximizes throughput without
//! disproportionate latency growth: an adaptive bracketing search drives
//! fio runs across a shrinking queue-depth bracket, and an optional
//! knee-detection pass locates the point of diminishing returns on the
//! fitted latency curve.

pub mod config;
pub mod executor;
pub mod optimizer;
pub mod report;
pub mod sample;
pub mod utils;
