use std::sync::Arc;

use clap::Parser;
use config::{MirrorJob, mirror_config};
use error::AppError;
use hls_mirror_engine::HttpFetcher;
use hls_mirror_engine::hls::{FixedDelay, ManifestMirror};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;

mod cli;
mod config;
mod error;
mod utils;

use cli::CliArgs;
use utils::prepare_save_dir;

fn main() {
    // Parse command-line arguments
    let args = CliArgs::parse();

    let guard = match init_logging(&args) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let result = bootstrap(args);
    if let Err(e) = &result {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Mirror failed");
    }

    // process::exit skips destructors, flush the log file first
    drop(guard);
    if let Err(e) = result {
        std::process::exit(e.exit_code());
    }
}

fn init_logging(args: &CliArgs) -> Result<WorkerGuard, AppError> {
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&args.log_file)?;
    let (file_writer, guard) = tracing_appender::non_blocking(log_file);

    let multi_writer = MakeWriterExt::and(std::io::stdout, file_writer);

    // No ANSI colors, the same output lands in the log file
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    Ok(guard)
}

#[tokio::main]
async fn bootstrap(args: CliArgs) -> Result<(), AppError> {
    info!("HLS Mirror - live playlist mirroring tool");
    info!("==================================================================");

    let job = MirrorJob::resolve(&args.source, args.save_dir.as_deref()).await?;
    let config = mirror_config(&args)?;

    info!(
        source = %job.source,
        save_dir = %job.save_dir.display(),
        manifest = %config.manifest_file_name,
        "Resolved mirror job"
    );
    info!(
        "HTTP timeout configuration: playlist={}s, asset={}s, connect={}s, poll interval={}s",
        args.timeout, args.asset_timeout, args.connect_timeout, args.interval
    );

    if prepare_save_dir(&job.save_dir).await? {
        info!("Created save directory {}", job.save_dir.display());
    }

    let fetcher = Arc::new(HttpFetcher::from_config(&config.base)?);

    // Ctrl-C lets the running cycle finish, then stops the poll loop
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current cycle");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Unable to listen for shutdown signal"),
        }
    });

    let mut schedule = FixedDelay::new(config.poll_interval).with_cancellation(cancel);
    if let Some(max_cycles) = args.max_cycles {
        schedule = schedule.with_max_cycles(max_cycles);
    }

    let mut mirror = ManifestMirror::new(job.source, job.save_dir, config, fetcher);
    mirror.run(&mut schedule).await?;

    info!(
        segments = mirror.timeline().segment_counter(),
        program_time = %mirror.timeline().current_timestamp(),
        "Mirror finished"
    );
    Ok(())
}
