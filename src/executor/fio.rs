//! Benchmark executor
//!
//! Runs fio as a child process with long-form flags built from a
//! [`JobParams`] set and parses its JSON output. Invocations are strictly
//! synchronous: only one benchmark may be in flight against the target
//! device, so the caller blocks for the full duration of the run.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::raw::{FioOutput, RawResult};
use crate::config::JobParams;
use crate::utils::error::{ParseError, Result, RunError};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Contract between the search optimizer and the external benchmark tool.
///
/// Implementations must be safely callable once per distinct queue depth and
/// must not be invoked concurrently. A scripted implementation stands in for
/// fio in tests.
pub trait Executor {
    /// Run one benchmark with the given parameter set. Blocking.
    fn run(&mut self, params: &JobParams) -> Result<RawResult>;
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn run(&mut self, params: &JobParams) -> Result<RawResult> {
        (**self).run(params)
    }
}

/// Executor backed by the real fio binary.
#[derive(Debug, Clone)]
pub struct FioExecutor {
    binary: String,
    timeout: Option<Duration>,
}

impl FioExecutor {
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Build the fio command line: structured output first, then every
    /// job parameter as a long-form flag.
    fn build_args(params: &JobParams) -> Vec<String> {
        let mut args = vec!["--output-format=json".to_string()];
        for (key, value) in params.flags() {
            if value.is_empty() {
                args.push(format!("--{}", key));
            } else {
                args.push(format!("--{}={}", key, value));
            }
        }
        args
    }

    /// Wait for the child to exit, enforcing the per-run timeout. On
    /// timeout the child is killed and a recoverable-by-policy
    /// `RunError::Timeout` is surfaced instead of hanging indefinitely.
    fn wait_with_timeout(&self, child: &mut Child, queue_depth: u32) -> Result<i32> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        loop {
            let polled = child.try_wait().map_err(|source| RunError::Spawn {
                command: self.binary.clone(),
                queue_depth,
                source,
            })?;
            if let Some(status) = polled {
                return Ok(status.code().unwrap_or(-1));
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunError::Timeout {
                        queue_depth,
                        timeout_secs: self.timeout.map(|t| t.as_secs()).unwrap_or(0),
                    }
                    .into());
                }
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Parse captured stdout into a raw result.
    fn parse_output(queue_depth: u32, stdout: String) -> Result<RawResult> {
        let output: FioOutput = serde_json::from_str(&stdout).map_err(|source| {
            ParseError::Json {
                queue_depth,
                source,
            }
        })?;
        RawResult::from_output(&output, Some(stdout))
            .ok_or_else(|| ParseError::MissingJobs { queue_depth }.into())
    }
}

impl Executor for FioExecutor {
    fn run(&mut self, params: &JobParams) -> Result<RawResult> {
        let queue_depth = params.queue_depth();
        let args = Self::build_args(params);
        debug!("invoking {} {}", self.binary, args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                command: self.binary.clone(),
                queue_depth,
                source,
            })?;

        // Drain both pipes off-thread so a large JSON document can never
        // deadlock the child against a full pipe buffer.
        let stdout_reader = child.stdout.take().map(spawn_pipe_reader);
        let stderr_reader = child.stderr.take().map(spawn_pipe_reader);

        let status = self.wait_with_timeout(&mut child, queue_depth)?;
        let stdout = join_pipe_reader(stdout_reader);
        let stderr = join_pipe_reader(stderr_reader);

        if status != 0 {
            return Err(RunError::Failed {
                queue_depth,
                status,
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        info!(
            "fio run at iodepth {} finished in {:.1}s",
            queue_depth,
            started.elapsed().as_secs_f64()
        );
        Self::parse_output(queue_depth, stdout)
    }
}

fn spawn_pipe_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn join_pipe_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
