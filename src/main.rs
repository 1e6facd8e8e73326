use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use khoj::{
    configuration::get_configuration,
    domain::{company::CompanyEntry, report::BatchSummary},
    services::orchestrator::scrape_companies,
    startup,
};

#[derive(Parser)]
#[command(name = "khoj")]
#[command(about = "Resolve company names to official websites and pull their contact details")]
struct Args {
    /// JSON array of {id, fname} entries to process
    #[arg(short, long)]
    input: PathBuf,

    /// Where the batch report is written
    #[arg(short, long)]
    output: PathBuf,

    /// 1-based input position to start from (inclusive)
    #[arg(short, long)]
    start: Option<usize>,

    /// 1-based input position to stop at (inclusive)
    #[arg(short, long)]
    end: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let configuration = get_configuration().expect("Failed to read configuration.");

    let raw = match fs::read_to_string(&args.input) {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("Could not read input file {}: {}", args.input.display(), e);
            std::process::exit(1);
        }
    };
    let entries: Vec<CompanyEntry> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!(
                "Input file {} is not a JSON array of {{id, fname}} entries: {}",
                args.input.display(),
                e
            );
            std::process::exit(1);
        }
    };
    log::info!("Read {} entries from {}", entries.len(), args.input.display());

    let (ctx, droid) = startup::build(&configuration).await;

    let outcome = scrape_companies(ctx, &entries, args.start, args.end).await;

    // quit browser sessions before reporting, whatever the outcome
    if let Some(droid) = &droid {
        droid.shutdown().await;
    }

    let output = match outcome {
        Ok(output) => output,
        Err(e) => {
            log::error!("Scrape run failed: {:#}", e);
            std::process::exit(1);
        }
    };

    let serialized =
        serde_json::to_string_pretty(&output).context("failed to serialize batch output")?;
    fs::write(&args.output, serialized)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    print_summary(&output.summary, &args.output);
    Ok(())
}

fn print_summary(summary: &BatchSummary, output_path: &Path) {
    let line = "=".repeat(50);
    println!("{}", line);
    println!("SCRAPING SUMMARY");
    println!("{}", line);
    println!("Total entries in input:  {}", summary.total_input);
    println!(
        "Processed range:         {} ({} entries)",
        summary.processed_range, summary.range_count
    );
    println!("Skipped (junk names):    {}", summary.skipped);
    println!("Success (with contacts): {}", summary.success);
    println!("Partial (site found):    {}", summary.partial);
    println!("Failed (nothing found):  {}", summary.failed);
    println!("Output: {}", output_path.display());
    println!("{}", line);
}
