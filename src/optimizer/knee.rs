//! Latency knee detection
//!
//! Locates the point of diminishing returns on the latency/throughput curve
//! with the half-latency rule: the knee is the first throughput at which
//! measured latency exceeds twice its own running-average response time.
//!
//! Reference: Naresh M. Patel, "Half-Latency Rule for Finding the Knee of
//! the Latency Curve", SIGMETRICS Perform. Eval. Rev. 43(2), 2015.

use serde::Serialize;
use tracing::{debug, warn};

use super::curve::LatencyCurve;
use crate::sample::SampleSet;
use crate::utils::error::FitError;

/// Default ATP exponent.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Fallback cutoff: only samples below this multiple of the minimum
/// observed latency are considered when no sample crosses the half-latency
/// threshold. A placeholder policy, not a validated algorithm.
const FALLBACK_LATENCY_FACTOR: f64 = 10.0;

/// Subintervals for the ORT quadrature.
const QUADRATURE_INTERVALS: usize = 256;

/// The detected knee of the latency curve.
#[derive(Debug, Clone, Serialize)]
pub struct KneePoint {
    /// Throughput at the knee.
    pub throughput: f64,
    /// Observed latency of the sample at the knee.
    pub latency: f64,
    /// Tested queue depth whose throughput is the greatest value not
    /// exceeding the knee throughput.
    pub queue_depth: u32,
    /// Spacing to the nearest neighboring tested throughput; the knee
    /// position is only meaningful at this resolution.
    pub tolerance: f64,
    /// True when the half-latency rule matched nothing and the
    /// 10x-minimum-latency fallback picked the point instead.
    pub fallback: bool,
}

/// One tested point with its derived knee-ranking scores.
#[derive(Debug, Clone)]
struct Candidate {
    queue_depth: u32,
    throughput: f64,
    latency: f64,
    fitted: f64,
    ort: f64,
    atp: f64,
}

/// Knee detector over a completed sample set.
#[derive(Debug, Clone, Copy)]
pub struct KneeDetector {
    alpha: f64,
}

impl KneeDetector {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Fit the latency curve and locate the knee.
    pub fn detect(&self, samples: &SampleSet) -> Result<KneePoint, FitError> {
        let (xs, ys) = samples.throughput_latency_series();
        let curve = LatencyCurve::fit(&xs, &ys)?;
        let candidates = self.score(samples, &curve)?;

        // Half-latency rule: measured latency first exceeds twice the
        // overall response time. ATP peaks at the crossing, so the largest
        // ATP among crossing samples is the knee.
        let crossing: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| 2.0 * c.ort - c.fitted < 0.0)
            .collect();

        let (chosen, fallback) = if let Some(best) = crossing.iter().max_by(|a, b| {
            a.atp
                .partial_cmp(&b.atp)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.queue_depth.cmp(&a.queue_depth))
        }) {
            (*best, false)
        } else {
            (self.fallback_candidate(&candidates)?, true)
        };

        if fallback {
            warn!(
                "no sample crossed the half-latency threshold; \
                 falling back to lowest-ATP point under {}x minimum latency",
                FALLBACK_LATENCY_FACTOR
            );
        }

        Ok(KneePoint {
            throughput: chosen.throughput,
            latency: chosen.latency,
            queue_depth: knee_depth(&candidates, chosen.throughput),
            tolerance: neighbor_spacing(&xs, chosen.throughput),
            fallback,
        })
    }

    /// Compute ORT and ATP for every tested point with positive throughput.
    fn score(&self, samples: &SampleSet, curve: &LatencyCurve) -> Result<Vec<Candidate>, FitError> {
        let mut candidates = Vec::new();
        for sample in samples.iter() {
            let x = sample.total_throughput();
            if x <= 0.0 {
                continue;
            }
            let fitted = curve.latency_at(x)?;
            let ort = integrate(curve, x, QUADRATURE_INTERVALS) / x;
            let atp = if ort > 0.0 {
                x.powf(self.alpha) / ort
            } else {
                0.0
            };
            debug!(
                "knee candidate depth={} x={:.2} w={:.4} ort={:.4} atp={:.4}",
                sample.queue_depth(),
                x,
                fitted,
                ort,
                atp
            );
            candidates.push(Candidate {
                queue_depth: sample.queue_depth(),
                throughput: x,
                latency: sample.avg_latency(),
                fitted,
                ort,
                atp,
            });
        }
        Ok(candidates)
    }

    /// Approximation used when the latency curve never doubles over the
    /// tested range: smallest ATP among the low-latency samples.
    fn fallback_candidate<'a>(&self, candidates: &'a [Candidate]) -> Result<&'a Candidate, FitError> {
        let min_latency = candidates
            .iter()
            .map(|c| c.latency)
            .fold(f64::INFINITY, f64::min);
        let cutoff = FALLBACK_LATENCY_FACTOR * min_latency;

        let eligible: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.latency <= cutoff)
            .collect();
        let pool = if eligible.is_empty() {
            candidates.iter().collect()
        } else {
            eligible
        };

        pool.into_iter()
            .min_by(|a, b| {
                a.atp
                    .partial_cmp(&b.atp)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.queue_depth.cmp(&b.queue_depth))
            })
            .ok_or(FitError::InsufficientData { distinct: 0 })
    }
}

impl Default for KneeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

/// `integral of w(u) du` over `[0, upper]` by composite Simpson quadrature.
fn integrate(curve: &LatencyCurve, upper: f64, intervals: usize) -> f64 {
    let n = intervals.max(2) & !1; // even
    let h = upper / n as f64;
    let mut acc = curve.eval_raw(0.0) + curve.eval_raw(upper);
    for i in 1..n {
        let weight = if i % 2 == 0 { 2.0 } else { 4.0 };
        acc += weight * curve.eval_raw(i as f64 * h);
    }
    acc * h / 3.0
}

/// Greatest tested throughput not exceeding `knee_throughput`, mapped back
/// to its queue depth. Throughput is continuous, queue depth is the
/// discrete control variable, so the mapping is nearest-from-below.
fn knee_depth(candidates: &[Candidate], knee_throughput: f64) -> u32 {
    candidates
        .iter()
        .filter(|c| c.throughput <= knee_throughput)
        .max_by(|a, b| {
            a.throughput
                .partial_cmp(&b.throughput)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|c| c.queue_depth)
        .unwrap_or(0)
}

/// Distance to the nearest neighboring tested throughput in `xs`.
fn neighbor_spacing(xs: &[f64], x: f64) -> f64 {
    xs.iter()
        .filter(|&&other| other != x)
        .map(|other| (other - x).abs())
        .fold(f64::INFINITY, f64::min)
}
