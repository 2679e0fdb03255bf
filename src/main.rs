//! autofio - adaptive IO depth optimizer for fio
//!
//! Repeatedly invokes fio across a shrinking queue-depth bracket, ranks
//! the results by IOPS/latency ratio, and reports the optimal depth per
//! block size, optionally refined by latency knee detection.

use anyhow::Result;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use autofio::config::{CliArgs, JobConfig, OptimizerConfig};
use autofio::executor::{ArchivingExecutor, Executor, FioExecutor};
use autofio::optimizer::{KneeDetector, SearchOptimizer};
use autofio::report::RunReport;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn print_banner(args: &CliArgs, config: &OptimizerConfig, job: &JobConfig) {
    if args.quiet {
        return;
    }

    println!("autofio v{}", env!("CARGO_PKG_VERSION"));
    println!("====================================");
    println!("Job: {} ({})", job.job_name, args.config.display());
    println!("Block sizes: {:?}", args.blocksizes);
    println!(
        "IO depth range: [{}, {}], slices: {}",
        config.min, config.max, config.slices
    );
    if let Some(timeout) = config.run_timeout {
        println!("Per-run timeout: {}s", timeout.as_secs());
    }
    if args.knee {
        println!("Knee detection: enabled (alpha {})", config.alpha);
    }
    println!("====================================\n");
}

fn build_executor(args: &CliArgs, config: &OptimizerConfig, blocksize: &str) -> Result<Box<dyn Executor>> {
    let fio = FioExecutor::new(&args.fio_bin, config.run_timeout);
    if args.archive {
        if let Some(ref dir) = args.output_dir {
            let archive_dir = dir.join(format!("raw_{}", blocksize));
            return Ok(Box::new(ArchivingExecutor::new(fio, archive_dir)?));
        }
    }
    Ok(Box::new(fio))
}

fn run() -> Result<()> {
    let args = CliArgs::parse_args();

    setup_logging(args.verbose, args.quiet);

    let config = OptimizerConfig::from_cli(&args)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let job = JobConfig::load(&args.config)?;

    print_banner(&args, &config, &job);

    if let Some(ref dir) = args.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    for blocksize in &args.blocksizes {
        info!("optimizing IO depth for blocksize {}", blocksize);

        let executor = build_executor(&args, &config, blocksize)?;
        let mut optimizer = SearchOptimizer::new(config.clone(), job.clone(), blocksize, executor);
        let best = optimizer.run()?.clone();

        // Knee failures leave the search result intact: a sparse sample set
        // still has a well-defined best run.
        let knee = if args.knee {
            match KneeDetector::new(config.alpha).detect(optimizer.samples()) {
                Ok(knee) => Some(knee),
                Err(e) => {
                    error!("knee detection failed for blocksize {}: {}", blocksize, e);
                    None
                }
            }
        } else {
            None
        };

        let report = RunReport {
            blocksize,
            samples: optimizer.samples(),
            best: &best,
            knee: knee.as_ref(),
        };

        if !args.quiet {
            report.print_console();
        }

        if let Some(ref dir) = args.output_dir {
            if args.csv {
                let path = dir.join(format!("fio_{}.csv", blocksize));
                info!("writing CSV to {}", path.display());
                report.write_csv(&path)?;
            }
            if args.json {
                let path = dir.join(format!("fio_{}.json", blocksize));
                info!("writing JSON to {}", path.display());
                report.write_json(&path)?;
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
