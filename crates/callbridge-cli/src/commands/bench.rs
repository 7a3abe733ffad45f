//! `callbridge bench`: repeated calls through the hosting bridge
//!
//! The callable is resolved once before timing starts, so only the native
//! calls are measured. A failed handshake counts every iteration as failed.

use super::BridgeArgs;
use crate::GlobalOpts;
use callbridge_host::{Bridge, HostingError};
use callbridge_logger as logger;
use clap::Parser;
use colored::Colorize;
use std::time::{Duration, Instant};

#[derive(Parser, Debug, Clone)]
pub struct BenchCommand {
    /// Number of calls to make
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub iterations: u32,

    #[command(flatten)]
    pub bridge: BridgeArgs,
}

/// Totals of a benchmark run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BenchReport {
    pub iterations: u32,
    pub failures: u32,
    pub elapsed: Duration,
    /// Distinct failure messages, in first-seen order
    pub errors: Vec<String>,
}

impl BenchReport {
    pub fn successes(&self) -> u32 {
        self.iterations - self.failures
    }

    /// Mean time of a successful call, `None` when nothing succeeded
    pub fn mean(&self) -> Option<Duration> {
        match self.successes() {
            0 => None,
            n => Some(self.elapsed / n),
        }
    }

    /// Report for a run that never started because the bridge failed
    pub fn failed(iterations: u32, err: &HostingError) -> Self {
        let mut report = Self {
            iterations,
            ..Self::default()
        };
        for _ in 0..iterations {
            report.record_failure(err);
        }
        report
    }

    fn record_failure(&mut self, err: &HostingError) {
        self.failures += 1;
        let message = err.to_string();
        logger::debug(&format!("Iteration failed: {}", message));
        if !self.errors.contains(&message) {
            self.errors.push(message);
        }
    }
}

/// Run `iterations` calls of `call`, skipping the failing ones
pub fn run<F>(iterations: u32, mut call: F) -> BenchReport
where
    F: FnMut(i32, i32) -> Result<i32, HostingError>,
{
    let mut report = BenchReport {
        iterations,
        ..BenchReport::default()
    };

    for i in 0..iterations {
        let a = i as i32;
        let start = Instant::now();
        match call(a, 1) {
            Ok(_) => report.elapsed += start.elapsed(),
            Err(e) => report.record_failure(&e),
        }
    }
    report
}

pub fn handle_bench(cmd: BenchCommand, _opts: &GlobalOpts) -> anyhow::Result<()> {
    let settings = cmd.bridge.resolve()?;
    logger::spinner_start(&format!(
        "Running {} calls via the {} protocol",
        cmd.iterations, settings.protocol
    ));

    let report = match Bridge::get(&settings) {
        Ok(callable) => run(cmd.iterations, |a, b| callable.invoke(a, b)),
        Err(e) => BenchReport::failed(cmd.iterations, &e),
    };

    if report.failures == 0 {
        logger::spinner_success("Benchmark complete");
    } else {
        logger::spinner_error(&format!(
            "{} of {} iterations failed",
            report.failures, report.iterations
        ));
        for message in &report.errors {
            logger::warn(message);
        }
    }

    println!("{} {}", "Iterations:".bold(), report.iterations);
    println!("{} {}", "Failures:".bold(), report.failures);
    match report.mean() {
        Some(mean) => println!("{} {:?}", "Mean time per call:".bold(), mean),
        None => println!("{} n/a", "Mean time per call:".bold()),
    }

    if report.successes() == 0 && report.iterations > 0 {
        anyhow::bail!("Every iteration failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_iterations_succeed() {
        let report = run(10, |a, b| Ok(a + b));
        assert_eq!(report.iterations, 10);
        assert_eq!(report.failures, 0);
        assert!(report.errors.is_empty());
        assert!(report.mean().is_some());
    }

    #[test]
    fn test_failing_iterations_are_skipped() {
        let report = run(6, |a, b| {
            if a % 3 == 0 {
                Err(HostingError::UnexpectedNativeFailure("boom".to_string()))
            } else {
                Ok(a + b)
            }
        });
        assert_eq!(report.failures, 2);
        assert_eq!(report.successes(), 4);
        assert_eq!(
            report.errors,
            vec!["Unexpected failure inside native call: boom".to_string()]
        );
    }

    #[test]
    fn test_mean_without_successes() {
        let report = run(3, |_, _| Err(HostingError::NotInitialized));
        assert_eq!(report.failures, 3);
        assert_eq!(report.mean(), None);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_failed_handshake_counts_every_iteration() {
        let err = HostingError::LibraryLoadFailed {
            library: "/opt/missing/libcoreclr.so".to_string(),
            reason: "not found".to_string(),
        };
        let report = BenchReport::failed(4, &err);
        assert_eq!(report.failures, 4);
        assert_eq!(report.successes(), 0);
        assert_eq!(report.elapsed, Duration::ZERO);
        assert_eq!(report.errors, vec![err.to_string()]);

        assert_eq!(BenchReport::failed(0, &err).errors, Vec::<String>::new());
    }
}
