//! Configuration module

pub mod cli;
pub mod job_config;
pub mod optimizer_config;

pub use cli::CliArgs;
pub use job_config::{JobConfig, JobParams};
pub use optimizer_config::OptimizerConfig;
