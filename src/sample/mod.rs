//! Benchmark sample entities
//!
//! A [`Sample`] is one fio measurement at a given queue depth. Derived
//! metrics (totals, average latency, IOPS/latency ratio) are computed once
//! at construction and cannot drift from the raw fields. A [`SampleSet`]
//! accumulates samples over one optimization run, keyed by queue depth, and
//! remembers every depth it has seen so no depth is benchmarked twice.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::executor::RawResult;

/// One benchmark measurement at a given queue depth.
///
/// Immutable once constructed. All unit conventions follow what fio reports
/// for the job: bandwidth in KiB/s, latency in the job's latency unit.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    queue_depth: u32,
    read_iops: f64,
    write_iops: f64,
    total_iops: f64,
    read_throughput: f64,
    write_throughput: f64,
    total_throughput: f64,
    read_latency: f64,
    write_latency: f64,
    avg_latency: f64,
    iops_latency_ratio: f64,
    duration: f64,
    timestamp: String,
}

impl Sample {
    /// Build a sample from one raw fio result, computing all derived fields.
    pub fn from_raw(queue_depth: u32, raw: &RawResult) -> Self {
        let read_iops = raw.read.iops.max(0.0);
        let write_iops = raw.write.iops.max(0.0);
        let read_latency = raw.read.lat_mean.max(0.0);
        let write_latency = raw.write.lat_mean.max(0.0);

        let total_iops = read_iops + write_iops;

        // Weighted mean only makes sense when both sides actually did work;
        // with one idle side the other side's latency is the answer.
        let avg_latency = if read_latency > 0.0 && write_latency > 0.0 {
            if total_iops > 0.0 {
                (read_latency * read_iops + write_latency * write_iops) / total_iops
            } else {
                (read_latency + write_latency) / 2.0
            }
        } else if read_latency > 0.0 {
            read_latency
        } else {
            write_latency
        };

        let iops_latency_ratio = if avg_latency > 0.0 {
            total_iops / avg_latency
        } else {
            0.0
        };

        Self {
            queue_depth,
            read_iops,
            write_iops,
            total_iops,
            read_throughput: raw.read.bw.max(0.0),
            write_throughput: raw.write.bw.max(0.0),
            total_throughput: raw.read.bw.max(0.0) + raw.write.bw.max(0.0),
            read_latency,
            write_latency,
            avg_latency,
            iops_latency_ratio,
            duration: raw.elapsed,
            timestamp: raw.time.clone(),
        }
    }

    pub fn queue_depth(&self) -> u32 {
        self.queue_depth
    }

    pub fn read_iops(&self) -> f64 {
        self.read_iops
    }

    pub fn write_iops(&self) -> f64 {
        self.write_iops
    }

    pub fn total_iops(&self) -> f64 {
        self.total_iops
    }

    pub fn read_throughput(&self) -> f64 {
        self.read_throughput
    }

    pub fn write_throughput(&self) -> f64 {
        self.write_throughput
    }

    pub fn total_throughput(&self) -> f64 {
        self.total_throughput
    }

    pub fn read_latency(&self) -> f64 {
        self.read_latency
    }

    pub fn write_latency(&self) -> f64 {
        self.write_latency
    }

    pub fn avg_latency(&self) -> f64 {
        self.avg_latency
    }

    /// The ranking metric used throughout the search.
    pub fn iops_latency_ratio(&self) -> f64 {
        self.iops_latency_ratio
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// CSV column names, matching [`Sample::to_csv_row`].
    pub fn csv_header() -> &'static str {
        "queue_depth,read_iops,write_iops,total_iops,\
         read_throughput,write_throughput,total_throughput,\
         read_latency,write_latency,avg_latency,iops_latency_ratio,\
         duration,timestamp"
    }

    /// Format as one CSV row.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.4},{:.4},{:.4},{:.4},{:.2},{}",
            self.queue_depth,
            self.read_iops,
            self.write_iops,
            self.total_iops,
            self.read_throughput,
            self.write_throughput,
            self.total_throughput,
            self.read_latency,
            self.write_latency,
            self.avg_latency,
            self.iops_latency_ratio,
            self.duration,
            self.timestamp
        )
    }
}

/// Ranking comparator: higher `iops_latency_ratio` first, ties broken in
/// favor of the lower queue depth (less resource usage for equal
/// performance).
pub fn compare_rank(a: &Sample, b: &Sample) -> Ordering {
    b.iops_latency_ratio
        .partial_cmp(&a.iops_latency_ratio)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.queue_depth.cmp(&b.queue_depth))
}

/// Samples accumulated over one optimization run, keyed by queue depth.
#[derive(Debug, Default)]
pub struct SampleSet {
    samples: BTreeMap<u32, Sample>,
    tested: BTreeSet<u32>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a sample and mark its depth as tested.
    pub fn insert(&mut self, sample: Sample) {
        self.tested.insert(sample.queue_depth);
        self.samples.insert(sample.queue_depth, sample);
    }

    /// Whether this depth was already benchmarked in this run.
    pub fn is_tested(&self, queue_depth: u32) -> bool {
        self.tested.contains(&queue_depth)
    }

    pub fn get(&self, queue_depth: u32) -> Option<&Sample> {
        self.samples.get(&queue_depth)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples in queue depth order.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.values()
    }

    /// All samples ranked best-first by [`compare_rank`].
    pub fn ranked(&self) -> Vec<&Sample> {
        let mut all: Vec<&Sample> = self.samples.values().collect();
        all.sort_by(|a, b| compare_rank(a, b));
        all
    }

    /// The top-ranked sample, if any.
    pub fn best(&self) -> Option<&Sample> {
        self.samples.values().min_by(|a, b| compare_rank(a, b))
    }

    /// `(throughput, latency)` pairs of all samples with positive
    /// throughput, sorted by throughput. Input shape for curve fitting.
    pub fn throughput_latency_series(&self) -> (Vec<f64>, Vec<f64>) {
        let mut points: Vec<(f64, f64)> = self
            .samples
            .values()
            .filter(|s| s.total_throughput > 0.0)
            .map(|s| (s.total_throughput, s.avg_latency))
            .collect();
        points.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        points.into_iter().unzip()
    }
}
