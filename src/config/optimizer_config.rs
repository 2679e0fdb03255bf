//! Validated optimizer configuration
//!
//! Built once from CLI arguments and passed immutably into the search
//! optimizer; no component reads global state.

use std::time::Duration;

use super::cli::CliArgs;

#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Lower search bound, inclusive. Always >= 1.
    pub min: u32,
    /// Upper search bound, inclusive. Always > `min`.
    pub max: u32,
    /// Interior sample points per round. Always >= 1.
    pub slices: u32,
    /// ATP exponent for knee detection.
    pub alpha: f64,
    /// Per-run timeout for the external benchmark, `None` = unbounded.
    pub run_timeout: Option<Duration>,
}

impl OptimizerConfig {
    /// Create configuration from CLI arguments, validating ranges.
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        args.validate()?;

        let run_timeout = match args.run_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            min: args.min,
            max: args.max,
            slices: args.slices,
            alpha: args.alpha,
            run_timeout,
        })
    }

    /// Hard cap on search rounds. The bracket provably narrows every
    /// round, so hitting this indicates a logic or configuration defect.
    pub fn round_cap(&self) -> u32 {
        (self.max - self.min).saturating_mul(2).max(1)
    }
}
