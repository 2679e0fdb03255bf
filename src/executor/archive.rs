//! Raw-output archive
//!
//! Wraps any executor and writes the verbatim fio JSON of every successful
//! run to `<dir>/iodepth-<N>.json`, keyed by queue depth.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::fio::Executor;
use super::raw::RawResult;
use crate::config::JobParams;
use crate::utils::Result;

pub struct ArchivingExecutor<E> {
    inner: E,
    dir: PathBuf,
}

impl<E: Executor> ArchivingExecutor<E> {
    /// Archive into `dir`, creating it if needed.
    pub fn new(inner: E, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { inner, dir })
    }
}

impl<E: Executor> Executor for ArchivingExecutor<E> {
    fn run(&mut self, params: &JobParams) -> Result<RawResult> {
        let result = self.inner.run(params)?;
        if let Some(ref raw_json) = result.raw_json {
            let path = self.dir.join(format!("iodepth-{}.json", params.queue_depth()));
            fs::write(&path, raw_json)?;
            debug!("archived raw output to {}", path.display());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::SideSummary;

    struct Canned;

    impl Executor for Canned {
        fn run(&mut self, _params: &JobParams) -> Result<RawResult> {
            Ok(RawResult {
                read: SideSummary::default(),
                write: SideSummary::default(),
                elapsed: 1.0,
                time: String::new(),
                raw_json: Some(r#"{"jobs": []}"#.to_string()),
            })
        }
    }

    #[test]
    fn test_archives_raw_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut exec = ArchivingExecutor::new(Canned, dir.path()).unwrap();

        let job = crate::config::JobConfig::parse("[seq]\nrw=read\n").unwrap();
        exec.run(&job.params_for(32, "4k")).unwrap();

        let archived = dir.path().join("iodepth-32.json");
        assert_eq!(
            std::fs::read_to_string(archived).unwrap(),
            r#"{"jobs": []}"#
        );
    }
}
