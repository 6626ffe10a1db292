use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod ai;
mod app;
mod classify;
mod config;
mod dates;
mod db;
mod error;
mod feed;
mod models;
mod report;
mod services;

use app::{App, FetchSummary};
use config::Config;
use error::Result;

#[derive(Debug, Parser)]
#[command(name = "newswatch", version)]
#[command(about = "Track news coverage of public figures: fetch, classify, score sentiment, chart")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "NEWSWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database and its table if missing
    InitDb,
    /// Fetch every configured RSS feed
    FetchRss,
    /// Search NewsAPI for each tracked person
    FetchApi,
    /// Collect Mediastack history month by month
    FetchMediastack {
        /// First day to collect (defaults to where the last collection stopped)
        #[arg(long)]
        from: Option<NaiveDate>,
    },
    /// Delete rows sharing title and url, keeping the oldest
    Dedupe,
    /// Label articles that have no sentiment yet
    TagSentiment,
    /// Write charts and the CSV dump
    GenerateReports,
    /// Run one full cycle
    Run,
    /// Run a full cycle every `daily_interval_hours`
    Daemon,
}

fn print_fetch(stage: &str, summary: &FetchSummary) {
    println!(
        "{stage}: fetched {}, stored {}, already known {}, rejected {}, unmatched {}, too old {}",
        summary.fetched,
        summary.saved.inserted,
        summary.saved.ignored,
        summary.saved.rejected,
        summary.unmatched,
        summary.stale
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    let app = App::new(config).await?;

    match cli.command {
        Command::InitDb => {
            let (rows, newest) = app.init_db().await?;
            let newest = newest.map_or_else(|| "none".to_string(), |d| d.to_string());
            println!(
                "Database ready at {} ({rows} rows, newest article {newest})",
                app.config().database_path().display()
            );
        }
        Command::FetchRss => print_fetch("RSS", &app.fetch_rss().await?),
        Command::FetchApi => print_fetch("NewsAPI", &app.fetch_newsapi().await?),
        Command::FetchMediastack { from } => {
            let from = match from {
                Some(from) => from,
                None => app.mediastack_resume_date().await?,
            };
            print_fetch("Mediastack", &app.fetch_mediastack(from).await?);
        }
        Command::Dedupe => {
            let removed = app.remove_duplicates().await?;
            println!("Removed {removed} duplicate rows");
        }
        Command::TagSentiment => {
            let report = app.tag_sentiment().await?;
            println!(
                "Tagged {} articles in {} batches",
                report.tagged, report.batches
            );
        }
        Command::GenerateReports => {
            let summary = app.generate_reports().await?;
            if summary.rows == 0 {
                println!("No articles in the report window");
            } else {
                println!(
                    "Wrote {} charts to {} from {} articles",
                    summary.charts.len(),
                    app.config().graphs_dir().display(),
                    summary.rows
                );
            }
        }
        Command::Run => {
            let cycle = app.run_cycle().await?;
            for (stage, summary) in &cycle.fetched {
                print_fetch(stage, summary);
            }
            println!(
                "Removed {} duplicates, tagged {} articles, wrote {} charts",
                cycle.duplicates_removed,
                cycle.tagged.tagged,
                cycle.report.charts.len()
            );
        }
        Command::Daemon => app.run_daily().await?,
    }

    Ok(())
}
