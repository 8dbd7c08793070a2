use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use banmap::config::Config;
use banmap::pipeline;
use banmap::storage::write_report;

#[derive(Parser)]
#[command(name = "banmap-report")]
#[command(about = "Generate the fail2ban ban map report once", long_about = None)]
struct Cli {
    /// Configuration file (defaults to $BANMAP_CONFIG or ./config.ini)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Day to report on, YYYY-MM-DD (defaults to today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Report destination (defaults to paths.output_json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the report to stdout instead of writing it
    #[arg(long, conflicts_with = "output")]
    stdout: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());

    let Some(report) = pipeline::run_for_date(&config.pipeline(), date)? else {
        eprintln!("⚠ No ban data to report for {}", date);
        return Ok(());
    };

    if cli.stdout {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{}", json);
        return Ok(());
    }

    let output = cli.output.unwrap_or_else(|| config.paths.output_json.clone());
    write_report(&output, &report)?;
    eprintln!(
        "✓ Wrote report for {} ({} countries) to {}",
        date,
        report.map_data.len(),
        output.display()
    );

    Ok(())
}
