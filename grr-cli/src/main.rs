mod annotate;
mod cache;
mod hist;
mod repo;
mod stats;

use anyhow::Result;
use clap::Command;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "grr";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .about("Genomic resource repositories, score annotation and statistics tooling.")
        .subcommand_required(true)
        .subcommand(annotate::cli::create_annotate_cli())
        .subcommand(repo::cli::create_repo_cli())
        .subcommand(stats::cli::create_stats_cli())
        .subcommand(stats::cli::create_task_worker_cli())
        .subcommand(cache::cli::create_cache_cli())
        .subcommand(hist::cli::create_hist_cli())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // ANNOTATE
        //
        Some((annotate::cli::ANNOTATE_CMD, matches)) => {
            annotate::handlers::run_annotate(matches)?;
        }

        //
        // REPOSITORY MANAGEMENT
        //
        Some((repo::cli::REPO_CMD, matches)) => {
            repo::handlers::run_repo(matches)?;
        }

        //
        // SCORE STATISTICS
        //
        Some((stats::cli::STATS_CMD, matches)) => {
            stats::handlers::run_stats(matches)?;
        }
        Some((stats::cli::TASK_WORKER_CMD, matches)) => {
            stats::handlers::run_task_worker(matches)?;
        }

        //
        // CACHE
        //
        Some((cache::cli::CACHE_CMD, matches)) => {
            cache::handlers::run_cache(matches)?;
        }

        //
        // HISTOGRAM RENDERING
        //
        Some((hist::cli::HIST_CMD, matches)) => {
            hist::handlers::run_hist(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
