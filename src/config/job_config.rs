//! fio job file loading
//!
//! The job file is INI-style with exactly one section: the section name is
//! the fio job name, the `key = value` pairs become long-form flags. The
//! optimizer overwrites `iodepth` (and `blocksize`) per test; everything
//! else passes through untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::utils::{AutofioError, Result};

/// Base benchmark parameters loaded from the job file.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub job_name: String,
    pub options: BTreeMap<String, String>,
}

impl JobConfig {
    /// Load and parse a job file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            AutofioError::Config(format!("cannot read job file {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Parse job file text. `;` and `#` start comments; a bare key becomes
    /// a value-less flag.
    pub fn parse(text: &str) -> Result<Self> {
        let mut job_name: Option<String> = None;
        let mut options = BTreeMap::new();

        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(section) = line.strip_prefix('[') {
                let section = section.strip_suffix(']').ok_or_else(|| {
                    AutofioError::Config(format!(
                        "malformed section header on line {}: {}",
                        lineno + 1,
                        line
                    ))
                })?;
                if job_name.is_some() {
                    return Err(AutofioError::Config(format!(
                        "job file must contain exactly one section, found a second on line {}",
                        lineno + 1
                    )));
                }
                job_name = Some(section.trim().to_string());
                continue;
            }

            if job_name.is_none() {
                return Err(AutofioError::Config(format!(
                    "option before any section on line {}: {}",
                    lineno + 1,
                    line
                )));
            }

            match line.split_once('=') {
                Some((key, value)) => {
                    options.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => {
                    options.insert(line.to_string(), String::new());
                }
            }
        }

        let job_name = job_name
            .ok_or_else(|| AutofioError::Config("job file contains no section".to_string()))?;

        Ok(Self { job_name, options })
    }

    /// Parameter set for one test: the base options with the job name,
    /// block size, and queue depth merged in.
    pub fn params_for(&self, queue_depth: u32, blocksize: &str) -> JobParams {
        let mut flags = self.options.clone();
        flags.insert("name".to_string(), self.job_name.clone());
        flags.insert("blocksize".to_string(), blocksize.to_string());
        flags.insert("iodepth".to_string(), queue_depth.to_string());
        JobParams { queue_depth, flags }
    }
}

/// Fully merged key/value flags for one benchmark invocation.
#[derive(Debug, Clone)]
pub struct JobParams {
    queue_depth: u32,
    flags: BTreeMap<String, String>,
}

impl JobParams {
    /// The queue depth under test.
    pub fn queue_depth(&self) -> u32 {
        self.queue_depth
    }

    /// Flags in deterministic (sorted) order.
    pub fn flags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JOB: &str = "\
; baseline random mixed workload
[randrw]
rw=randrw
rwmixread=70
runtime=30
time_based
# direct IO against the device
direct=1
";

    #[test]
    fn test_parse_job_file() {
        let job = JobConfig::parse(JOB).unwrap();
        assert_eq!(job.job_name, "randrw");
        assert_eq!(job.options.get("rw").map(String::as_str), Some("randrw"));
        assert_eq!(job.options.get("direct").map(String::as_str), Some("1"));
        // Bare key becomes a value-less flag
        assert_eq!(job.options.get("time_based").map(String::as_str), Some(""));
    }

    #[test]
    fn test_parse_rejects_no_section() {
        assert!(JobConfig::parse("rw=randrw\n").is_err());
        assert!(JobConfig::parse("; only comments\n").is_err());
    }

    #[test]
    fn test_parse_rejects_two_sections() {
        assert!(JobConfig::parse("[a]\nrw=read\n[b]\nrw=write\n").is_err());
    }

    #[test]
    fn test_params_for_overrides_depth_and_blocksize() {
        let job = JobConfig::parse("[seq]\nblocksize=4k\niodepth=1\nrw=read\n").unwrap();
        let params = job.params_for(64, "128k");
        assert_eq!(params.queue_depth(), 64);
        assert_eq!(params.get("iodepth"), Some("64"));
        assert_eq!(params.get("blocksize"), Some("128k"));
        assert_eq!(params.get("rw"), Some("read"));
        assert_eq!(params.get("name"), Some("seq"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JOB.as_bytes()).unwrap();
        let job = JobConfig::load(file.path()).unwrap();
        assert_eq!(job.job_name, "randrw");
    }

    #[test]
    fn test_load_missing_file() {
        let err = JobConfig::load(Path::new("/nonexistent/fio.ini")).unwrap_err();
        assert!(matches!(err, AutofioError::Config(_)));
    }
}
