//! Error types for autofio

use std::io;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AutofioError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Benchmark run failed: {0}")]
    Run(#[from] RunError),

    #[error("Failed to parse fio output: {0}")]
    Parse(#[from] ParseError),

    #[error("Curve fit error: {0}")]
    Fit(#[from] FitError),

    #[error("Search failed to converge after {rounds} rounds (bracket [{low}, {high}])")]
    SearchDivergence { rounds: u32, low: u32, high: u32 },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from a single benchmark invocation
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to spawn '{command}' for iodepth {queue_depth}: {source}")]
    Spawn {
        command: String,
        queue_depth: u32,
        source: io::Error,
    },

    #[error("fio exited with status {status} at iodepth {queue_depth}: {stderr}")]
    Failed {
        queue_depth: u32,
        status: i32,
        stderr: String,
    },

    #[error("fio run at iodepth {queue_depth} exceeded timeout of {timeout_secs}s")]
    Timeout { queue_depth: u32, timeout_secs: u64 },
}

/// Errors decoding fio's structured output
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid JSON from fio at iodepth {queue_depth}: {source}")]
    Json {
        queue_depth: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("fio output at iodepth {queue_depth} contains no jobs")]
    MissingJobs { queue_depth: u32 },
}

/// Errors from latency curve fitting and knee detection
#[derive(Error, Debug)]
pub enum FitError {
    #[error("Curve fit requires at least 3 distinct throughput values, got {distinct}")]
    InsufficientData { distinct: usize },

    #[error("Normal equations are singular, throughput values are too degenerate to fit")]
    Singular,

    #[error("Throughput {x} outside fitted range [{min}, {max}]")]
    OutOfDomain { x: f64, min: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, AutofioError>;
