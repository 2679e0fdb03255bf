//! Command-line argument parsing
//!
//! Arguments are grouped by category for clarity. The search-range flags
//! mirror the knobs of the underlying fio job; everything the job itself
//! needs comes from the INI job file.

use clap::Parser;
use std::path::PathBuf;

/// Adaptive IO depth optimizer for fio
#[derive(Parser, Debug, Clone)]
#[command(name = "autofio")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Job Options =====
    /// Path to the fio job file (INI, exactly one section)
    #[arg(short = 'c', long = "config", default_value = "fio.ini")]
    pub config: PathBuf,

    /// Block size(s) to optimize; one full search per value
    #[arg(short = 'b', long = "blocksize", default_value = "8k", action = clap::ArgAction::Append)]
    pub blocksizes: Vec<String>,

    /// fio binary to invoke
    #[arg(long = "fio-bin", default_value = "fio")]
    pub fio_bin: String,

    // ===== Search Options =====
    /// Minimum IO depth to consider
    #[arg(long = "min", default_value_t = 1)]
    pub min: u32,

    /// Maximum IO depth to consider
    #[arg(long = "max", default_value_t = 65536)]
    pub max: u32,

    /// Number of interior sample points per round
    #[arg(short = 's', long = "slices", default_value_t = 3)]
    pub slices: u32,

    /// Per-run timeout in seconds (0 = no timeout)
    #[arg(long = "run-timeout", default_value_t = 0)]
    pub run_timeout_secs: u64,

    // ===== Knee Detection =====
    /// Refine the result with latency knee detection
    #[arg(long = "knee")]
    pub knee: bool,

    /// ATP exponent for knee ranking
    #[arg(long = "alpha", default_value_t = 1.0)]
    pub alpha: f64,

    // ===== Output Options =====
    /// Directory for exported artifacts
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Export per-depth results as CSV
    #[arg(long = "csv")]
    pub csv: bool,

    /// Export the full result document as JSON
    #[arg(long = "json")]
    pub json: bool,

    /// Archive raw fio output per queue depth
    #[arg(long = "archive")]
    pub archive: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.min < 1 {
            return Err("--min must be at least 1".to_string());
        }

        if self.min >= self.max {
            return Err(format!(
                "--min ({}) must be strictly below --max ({})",
                self.min, self.max
            ));
        }

        if self.slices < 1 {
            return Err("--slices must be at least 1".to_string());
        }

        if self.alpha <= 0.0 || !self.alpha.is_finite() {
            return Err("--alpha must be a positive finite number".to_string());
        }

        if self.blocksizes.is_empty() {
            return Err("at least one --blocksize is required".to_string());
        }

        // Exports need somewhere to go
        if (self.csv || self.json || self.archive) && self.output_dir.is_none() {
            return Err("--csv/--json/--archive require --output-dir".to_string());
        }

        Ok(())
    }
}
