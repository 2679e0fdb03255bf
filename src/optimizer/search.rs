//! Adaptive IO depth search
//!
//! Narrows a `[low, high]` queue-depth bracket round by round: sample a
//! slice of depths across the bracket, rank everything tested so far by
//! IOPS/latency ratio, then pull both endpoints toward the best depth by a
//! proportional step. The proportional step (rather than strict bisection)
//! tolerates local measurement noise, since the objective is not guaranteed
//! unimodal. The bracket width never grows, so the search converges; a hard
//! round cap guards the remaining edge cases.

use tracing::{debug, info};

use crate::config::{JobConfig, OptimizerConfig};
use crate::executor::Executor;
use crate::sample::{compare_rank, Sample, SampleSet};
use crate::utils::error::{AutofioError, Result};

/// Search state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Deciding whether the bracket is narrow enough to stop.
    Bracketing,
    /// Benchmarking candidate depths across the bracket.
    Sampling,
    /// Terminal: `best_run` is available.
    Converged,
}

/// Adaptive bracketing search over queue depths.
///
/// Owns the sample set and bracket exclusively for the duration of one run;
/// benchmark invocations are strictly serialized through the executor.
pub struct SearchOptimizer<E: Executor> {
    config: OptimizerConfig,
    job: JobConfig,
    blocksize: String,
    executor: E,
    samples: SampleSet,
    low: u32,
    high: u32,
    rounds: u32,
    state: SearchState,
}

impl<E: Executor> SearchOptimizer<E> {
    pub fn new(
        config: OptimizerConfig,
        job: JobConfig,
        blocksize: impl Into<String>,
        executor: E,
    ) -> Self {
        let (low, high) = (config.min, config.max);
        Self {
            config,
            job,
            blocksize: blocksize.into(),
            executor,
            samples: SampleSet::new(),
            low,
            high,
            rounds: 0,
            state: SearchState::Bracketing,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Current `(low, high)` bracket.
    pub fn bracket(&self) -> (u32, u32) {
        (self.low, self.high)
    }

    /// Sampling rounds completed so far.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// All samples accumulated so far.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Run the search to convergence and return the best run.
    pub fn run(&mut self) -> Result<&Sample> {
        while self.step()? {}
        self.best_endpoint()
    }

    /// Advance one round. Returns `false` once converged; callers wanting
    /// to abort a search early can do so between calls.
    pub fn step(&mut self) -> Result<bool> {
        if self.state == SearchState::Converged {
            return Ok(false);
        }

        if self.high - self.low <= 1 {
            // The endpoints may have been moved here by narrowing without
            // ever being benchmarked themselves.
            self.ensure_endpoint_samples()?;
            self.state = SearchState::Converged;
            info!(
                "search converged at bracket [{}, {}] after {} rounds",
                self.low, self.high, self.rounds
            );
            return Ok(false);
        }

        self.state = SearchState::Sampling;
        self.sample_round()?;
        self.narrow();
        self.state = SearchState::Bracketing;

        self.rounds += 1;
        if self.rounds > self.config.round_cap() {
            return Err(AutofioError::SearchDivergence {
                rounds: self.rounds,
                low: self.low,
                high: self.high,
            });
        }
        Ok(true)
    }

    /// The winner after convergence: the better-ranked of the samples at
    /// `low` and `high`, ties to the lower depth.
    pub fn best_endpoint(&self) -> Result<&Sample> {
        let winner = match (self.samples.get(self.low), self.samples.get(self.high)) {
            (Some(a), Some(b)) => {
                if compare_rank(a, b).is_le() {
                    a
                } else {
                    b
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => {
                return Err(AutofioError::Config(format!(
                    "no samples at bracket endpoints [{}, {}]",
                    self.low, self.high
                )))
            }
        };
        Ok(winner)
    }

    /// Benchmark one slice of candidate depths across the bracket. Depths
    /// already tested in this run are skipped, never re-benchmarked.
    fn sample_round(&mut self) -> Result<()> {
        let step = ((self.high - self.low) / self.config.slices).max(1);
        let mut candidates: Vec<u32> =
            (self.low..self.high).step_by(step as usize).collect();
        candidates.push(self.high);

        info!(
            "sampling round {} over [{}, {}], step {}",
            self.rounds + 1,
            self.low,
            self.high,
            step
        );

        for depth in candidates {
            if depth == 0 {
                continue;
            }
            if self.samples.is_tested(depth) {
                debug!("iodepth {} already tested, skipping", depth);
                continue;
            }
            self.sample_depth(depth)?;
        }
        Ok(())
    }

    /// One benchmark invocation. Any run or parse failure is fatal for the
    /// whole optimization; there is no retry.
    fn sample_depth(&mut self, depth: u32) -> Result<()> {
        let params = self.job.params_for(depth, &self.blocksize);
        let raw = self.executor.run(&params)?;
        let sample = Sample::from_raw(depth, &raw);
        info!(
            "iodepth {}: {:.0} iops, {:.0} KiB/s, {:.3} lat, ratio {:.2}",
            depth,
            sample.total_iops(),
            sample.total_throughput(),
            sample.avg_latency(),
            sample.iops_latency_ratio()
        );
        self.samples.insert(sample);
        Ok(())
    }

    /// Pull both endpoints toward the best-ranked tested depth by a
    /// proportional step. Endpoints never cross, never pass the best depth,
    /// and never move away from it, so the width is non-increasing.
    fn narrow(&mut self) {
        let best = match self.samples.best() {
            Some(s) => s.queue_depth(),
            None => return,
        };
        let (old_low, old_high) = (self.low, self.high);
        let slices = self.config.slices;

        if best > self.low {
            let delta = ((self.low + best) / slices).max(1);
            self.low = (self.low + delta).min(best);
        }
        if best < self.high {
            let delta = ((self.high + best) / slices).max(1);
            self.high = self.high.saturating_sub(delta).max(best).max(self.low);
        }

        info!(
            "bracket [{}, {}] -> [{}, {}] (best iodepth {})",
            old_low, old_high, self.low, self.high, best
        );
    }

    /// Benchmark the bracket endpoints if narrowing left them untested.
    fn ensure_endpoint_samples(&mut self) -> Result<()> {
        for depth in [self.low, self.high] {
            if depth > 0 && !self.samples.is_tested(depth) {
                self.sample_depth(depth)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CliArgs, JobParams};
    use crate::executor::{RawResult, SideSummary};
    use crate::utils::RunError;
    use clap::Parser;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Scripted executor: latency/IOPS as a pure function of queue depth,
    /// recording every invocation.
    struct FakeExecutor {
        calls: Rc<RefCell<Vec<u32>>>,
        profile: fn(u32) -> (f64, f64), // depth -> (iops, latency)
    }

    impl FakeExecutor {
        fn new(profile: fn(u32) -> (f64, f64)) -> (Self, Rc<RefCell<Vec<u32>>>) {
            let calls = Rc::new(RefCell::new(Vec::new()));
            (
                Self {
                    calls: Rc::clone(&calls),
                    profile,
                },
                calls,
            )
        }
    }

    impl Executor for FakeExecutor {
        fn run(&mut self, params: &JobParams) -> Result<RawResult> {
            let depth = params.queue_depth();
            self.calls.borrow_mut().push(depth);
            let (iops, latency) = (self.profile)(depth);
            Ok(RawResult {
                read: SideSummary {
                    iops,
                    bw: iops * 4.0,
                    lat_mean: latency,
                },
                write: SideSummary::default(),
                elapsed: 1.0,
                time: String::new(),
                raw_json: None,
            })
        }
    }

    fn config(min: u32, max: u32, slices: u32) -> OptimizerConfig {
        let args = CliArgs::parse_from([
            "test",
            "--min",
            &min.to_string(),
            "--max",
            &max.to_string(),
            "--slices",
            &slices.to_string(),
        ]);
        OptimizerConfig::from_cli(&args).unwrap()
    }

    fn job() -> JobConfig {
        JobConfig::parse("[randrw]\nrw=randrw\nruntime=30\n").unwrap()
    }

    fn optimizer(
        min: u32,
        max: u32,
        slices: u32,
        profile: fn(u32) -> (f64, f64),
    ) -> (SearchOptimizer<FakeExecutor>, Rc<RefCell<Vec<u32>>>) {
        let (exec, calls) = FakeExecutor::new(profile);
        (
            SearchOptimizer::new(config(min, max, slices), job(), "8k", exec),
            calls,
        )
    }

    /// Unimodal efficiency profile peaking near depth 64.
    fn peaked(depth: u32) -> (f64, f64) {
        let d = depth as f64;
        let iops = (2000.0 - (d - 64.0) * (d - 64.0)).max(10.0);
        (iops, 1.0)
    }

    #[test]
    fn test_converges_to_globally_best_sampled_depth() {
        let (mut opt, _) = optimizer(1, 256, 5, peaked);
        let best_depth = opt.run().unwrap().queue_depth();
        assert_eq!(opt.state(), SearchState::Converged);

        // The winner has the maximal ratio among depths actually sampled.
        let best_sampled = opt.samples().best().unwrap().queue_depth();
        assert_eq!(best_depth, best_sampled);
    }

    #[test]
    fn test_bracket_width_non_increasing_and_capped() {
        let (mut opt, _) = optimizer(1, 256, 5, peaked);
        let mut width = {
            let (low, high) = opt.bracket();
            high - low
        };
        while opt.step().unwrap() {
            let (low, high) = opt.bracket();
            assert!(high >= low);
            assert!(high - low <= width, "bracket grew: {} -> {}", width, high - low);
            width = high - low;
        }
        assert!(opt.rounds() <= opt.config().round_cap());
    }

    #[test]
    fn test_memoization_never_rebenchmarks_a_depth() {
        let (mut opt, calls) = optimizer(1, 256, 5, peaked);
        opt.run().unwrap();

        let mut seen = calls.borrow().clone();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), total, "some depth was benchmarked twice");
    }

    #[test]
    fn test_endpoint_gap_triggers_sampling_round() {
        // Endpoints alone: depth 1 -> (100 iops, 1.0 lat), 256 -> (500, 50.0).
        // A 255-wide gap must not converge on just those two samples.
        fn endpoints(depth: u32) -> (f64, f64) {
            match depth {
                1 => (100.0, 1.0),
                256 => (500.0, 50.0),
                d => {
                    let frac = (d - 1) as f64 / 255.0;
                    (100.0 + 400.0 * frac, 1.0 + 49.0 * frac)
                }
            }
        }

        let (mut opt, calls) = optimizer(1, 256, 5, endpoints);
        opt.run().unwrap();
        assert!(
            calls.borrow().len() > 2,
            "converged after only the endpoint samples"
        );
        assert!(opt.samples().len() > 2);
    }

    #[test]
    fn test_ratio_tie_picks_lower_depth() {
        // Bracket is already [10, 11]; both depths tie at ratio 5.0.
        let (mut opt, _) = optimizer(10, 11, 3, |_| (5.0, 1.0));
        let best = opt.run().unwrap();
        assert_eq!(best.queue_depth(), 10);
    }

    #[test]
    fn test_executor_failure_aborts_run() {
        struct Failing;
        impl Executor for Failing {
            fn run(&mut self, params: &JobParams) -> Result<RawResult> {
                Err(RunError::Failed {
                    queue_depth: params.queue_depth(),
                    status: 1,
                    stderr: "device busy".to_string(),
                }
                .into())
            }
        }

        let mut opt = SearchOptimizer::new(config(1, 64, 3), job(), "8k", Failing);
        assert!(matches!(
            opt.run(),
            Err(AutofioError::Run(RunError::Failed { .. }))
        ));
    }

    #[test]
    fn test_boxed_executor() {
        let (exec, _) = FakeExecutor::new(peaked);
        let boxed: Box<dyn Executor> = Box::new(exec);
        let mut opt = SearchOptimizer::new(config(1, 32, 3), job(), "8k", boxed);
        assert!(opt.run().is_ok());
    }
}
