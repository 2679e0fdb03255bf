//! Result reporting and export
//!
//! Consumes the completed sample set and renders it as a console table,
//! CSV keyed by queue depth, or a JSON document carrying the samples, the
//! best run, and the knee point if one was computed.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde_json::json;

use crate::optimizer::KneePoint;
use crate::sample::{Sample, SampleSet};

/// One completed optimization run, ready for export.
pub struct RunReport<'a> {
    pub blocksize: &'a str,
    pub samples: &'a SampleSet,
    pub best: &'a Sample,
    pub knee: Option<&'a KneePoint>,
}

impl RunReport<'_> {
    /// Print a human-readable summary table.
    pub fn print_console(&self) {
        println!("\n=== blocksize {} ===", self.blocksize);
        println!(
            "{:>10} {:>12} {:>14} {:>12} {:>12}",
            "iodepth", "IOPS", "KiB/s", "avg lat", "ratio"
        );
        println!("{}", "-".repeat(64));

        for sample in self.samples.iter() {
            println!(
                "{:>10} {:>12.0} {:>14.0} {:>12.3} {:>12.2}",
                sample.queue_depth(),
                sample.total_iops(),
                sample.total_throughput(),
                sample.avg_latency(),
                sample.iops_latency_ratio()
            );
        }

        println!(
            "\nBest run: iodepth {} ({:.0} IOPS, {:.3} avg lat, ratio {:.2})",
            self.best.queue_depth(),
            self.best.total_iops(),
            self.best.avg_latency(),
            self.best.iops_latency_ratio()
        );

        if let Some(knee) = self.knee {
            println!(
                "Latency knee: iodepth {} at {:.0} KiB/s, {:.3} lat (±{:.0}){}",
                knee.queue_depth,
                knee.throughput,
                knee.latency,
                knee.tolerance,
                if knee.fallback {
                    " [fallback heuristic]"
                } else {
                    ""
                }
            );
        }
    }

    /// Export the full result document as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "blocksize": self.blocksize,
            "samples": self.samples.iter().collect::<Vec<_>>(),
            "best_run": self.best,
            "knee": self.knee,
        })
    }

    /// Write the JSON document to a file.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        writeln!(
            file,
            "{}",
            serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
        )?;
        Ok(())
    }

    /// Write all samples as CSV, one row per queue depth.
    pub fn write_csv(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        writeln!(file, "{}", Sample::csv_header())?;
        for sample in self.samples.iter() {
            writeln!(file, "{}", sample.to_csv_row())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RawResult, SideSummary};

    fn sample(depth: u32, iops: f64, latency: f64) -> Sample {
        Sample::from_raw(
            depth,
            &RawResult {
                read: SideSummary {
                    iops,
                    bw: iops * 4.0,
                    lat_mean: latency,
                },
                write: SideSummary::default(),
                elapsed: 30.0,
                time: String::new(),
                raw_json: None,
            },
        )
    }

    fn report_fixture() -> (SampleSet, Sample) {
        let mut set = SampleSet::new();
        set.insert(sample(1, 100.0, 1.0));
        set.insert(sample(8, 600.0, 1.5));
        set.insert(sample(64, 900.0, 9.0));
        let best = set.best().unwrap().clone();
        (set, best)
    }

    #[test]
    fn test_json_document_shape() {
        let (set, best) = report_fixture();
        let report = RunReport {
            blocksize: "8k",
            samples: &set,
            best: &best,
            knee: None,
        };

        let doc = report.to_json();
        assert_eq!(doc["blocksize"], "8k");
        assert_eq!(doc["samples"].as_array().unwrap().len(), 3);
        assert_eq!(doc["best_run"]["queue_depth"], 8);
        assert!(doc["knee"].is_null());
    }

    #[test]
    fn test_csv_export() {
        let (set, best) = report_fixture();
        let report = RunReport {
            blocksize: "8k",
            samples: &set,
            best: &best,
            knee: None,
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fio_8k.csv");
        report.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4); // header + 3 samples
        assert_eq!(lines[0], Sample::csv_header());
        assert!(lines[1].starts_with("1,"));
    }
}
