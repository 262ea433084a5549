use std::sync::Arc;
use std::time::Duration;

use aspnet_hash_tool::{Args, Error, LineSink, Pipeline, RunStatistics};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Args::parse().into_config()?;

    init_logging(config.quiet);

    let unit = config.operation.unit();
    let pipeline = Pipeline::new(config.operation, config.pipeline);

    info!("Processing {unit} from stdin...");

    let stats = Arc::new(RunStatistics::new());
    let sink = Arc::new(LineSink::stdout());

    // Set up progress spinner
    let progress_bar = if config.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} {msg}")
                .expect("Invalid progress bar template"),
        );
        pb.set_message(unit);
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    // Spawn progress updater task
    let progress_task = progress_bar.clone().map(|pb| {
        let stats = Arc::clone(&stats);
        tokio::spawn(async move {
            while !pb.is_finished() {
                tokio::time::sleep(Duration::from_millis(100)).await;
                pb.set_position(stats.completed());
            }
        })
    });

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let result = pipeline.run(input, sink, Arc::clone(&stats)).await;

    // Clean up progress
    if let Some(task) = progress_task {
        task.abort();
    }
    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "run aborted");
            return Err(e);
        }
    };

    info!("Done! Total Run Time: {:.6} seconds", summary.elapsed.as_secs_f64());
    info!("Processed {} {unit}", summary.processed);
    info!("Errored {unit}: {}", summary.errored);
    if let Some(rate) = summary.per_second() {
        info!("{} per second: {rate:.6}", capitalize(unit));
    }

    Ok(())
}

fn init_logging(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
