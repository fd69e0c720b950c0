// SPDX-License-Identifier: Apache-2.0 OR MIT
use anyhow::{Context, Result};
use clap::Parser;
use ringsync::config::{CommandLineArgument, SyncConfig};
use ringsync::logging::{Facility, Logger, LoggingSystem};
use ringsync::supervisor;
use std::process::ExitCode;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;

const USAGE_EXAMPLE: &str = "Example: ringsync 4 3";

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about = "Bounded-buffer producer/consumer demo", long_about = None)]
struct Args {
    /// Number of producer threads
    #[arg(value_name = "producerNumber", allow_negative_numbers = true)]
    producer_number: i64,

    /// Number of consumer threads
    #[arg(value_name = "consumerNumber", allow_negative_numbers = true)]
    consumer_number: i64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            eprintln!("{}", USAGE_EXAMPLE);
            return Ok(ExitCode::FAILURE);
        }
        // --help and --version
        Err(e) => e.exit(),
    };

    let config = SyncConfig::default();
    let counts = match CommandLineArgument::new(
        args.producer_number,
        args.consumer_number,
        config.capacity,
    ) {
        Ok(counts) => counts,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let logging = LoggingSystem::stdout(config.log_level).context("Failed to start logging")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        let _ = shutdown_tx.send(());
    });

    let report = supervisor::run(config, counts, logging.logger(), shutdown_rx).await;
    // Every report line reaches stdout before the dump
    logging.shutdown();
    let report = report?;

    print!("{}", report.render_dump());
    // The log consumer is gone; failures go straight to stderr
    let errors = Logger::stderr_json();
    for failure in &report.failures {
        errors.error(Facility::Supervisor, &failure.to_string());
    }

    Ok(if report.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
