//! fio JSON output schema
//!
//! Deserialization targets for `fio --output-format=json`. Only the fields
//! the optimizer consumes are modeled; everything else in the document is
//! ignored. Values are taken exactly as fio reports them (bandwidth in
//! KiB/s, latency in the job's configured latency unit).

use serde::Deserialize;

/// Top-level fio JSON document.
#[derive(Debug, Deserialize)]
pub struct FioOutput {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub elapsed: f64,
    #[serde(default)]
    pub jobs: Vec<FioJob>,
}

/// One job entry in the fio document.
#[derive(Debug, Deserialize)]
pub struct FioJob {
    #[serde(default)]
    pub jobname: String,
    #[serde(default)]
    pub read: FioSideStats,
    #[serde(default)]
    pub write: FioSideStats,
}

/// Per-direction statistics (`read` / `write`).
#[derive(Debug, Deserialize, Default)]
pub struct FioSideStats {
    #[serde(default)]
    pub iops: f64,
    #[serde(default)]
    pub bw: f64,
    #[serde(default)]
    pub lat: FioLatStats,
}

/// Latency block, only the mean is consumed.
#[derive(Debug, Deserialize, Default)]
pub struct FioLatStats {
    #[serde(default)]
    pub mean: f64,
}

/// Summary of one direction, lifted out of the raw document.
#[derive(Debug, Clone, Default)]
pub struct SideSummary {
    pub iops: f64,
    pub bw: f64,
    pub lat_mean: f64,
}

impl From<&FioSideStats> for SideSummary {
    fn from(stats: &FioSideStats) -> Self {
        Self {
            iops: stats.iops,
            bw: stats.bw,
            lat_mean: stats.lat.mean,
        }
    }
}

/// What an [`Executor`](super::Executor) hands back for one run: the first
/// job of the document plus provenance, with the verbatim stdout retained
/// for the raw-output archive.
#[derive(Debug, Clone)]
pub struct RawResult {
    pub read: SideSummary,
    pub write: SideSummary,
    pub elapsed: f64,
    pub time: String,
    pub raw_json: Option<String>,
}

impl RawResult {
    /// Summarize a parsed fio document. Returns `None` when the document
    /// carries no jobs.
    pub fn from_output(output: &FioOutput, raw_json: Option<String>) -> Option<Self> {
        let job = output.jobs.first()?;
        Some(Self {
            read: SideSummary::from(&job.read),
            write: SideSummary::from(&job.write),
            elapsed: output.elapsed,
            time: output.time.clone(),
            raw_json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "time": "Thu Aug 27 10:00:00 2026",
        "elapsed": 31.0,
        "jobs": [
            {
                "jobname": "randrw",
                "read": {"iops": 1200.5, "bw": 4802.0, "lat": {"mean": 1.25}},
                "write": {"iops": 400.0, "bw": 1600.0, "lat": {"mean": 2.5}}
            }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let output: FioOutput = serde_json::from_str(DOC).unwrap();
        let raw = RawResult::from_output(&output, None).unwrap();
        assert_eq!(raw.read.iops, 1200.5);
        assert_eq!(raw.read.bw, 4802.0);
        assert_eq!(raw.read.lat_mean, 1.25);
        assert_eq!(raw.write.lat_mean, 2.5);
        assert_eq!(raw.elapsed, 31.0);
    }

    #[test]
    fn test_no_jobs() {
        let output: FioOutput = serde_json::from_str(r#"{"jobs": []}"#).unwrap();
        assert!(RawResult::from_output(&output, None).is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let output: FioOutput =
            serde_json::from_str(r#"{"jobs": [{"jobname": "seq"}]}"#).unwrap();
        let raw = RawResult::from_output(&output, None).unwrap();
        assert_eq!(raw.read.iops, 0.0);
        assert_eq!(raw.write.lat_mean, 0.0);
    }
}
