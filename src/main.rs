use anyhow::Context;
use clap::Parser;
use colored::*;
use repo_harvester::cli::Cli;
use repo_harvester::config::HarvestConfig;
use repo_harvester::github::GitHubClient;
use repo_harvester::harvester::{HarvestReport, Harvester, RunOutcome};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();
    let config = HarvestConfig::from_cli(&cli).context("Invalid configuration")?;

    println!("{}", "GitHub Repository Harvester".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());
    println!("📁 Archives: {}", config.output_dir.display());
    println!("📝 Repository log: {}", config.output_log.display());
    println!(
        "⭐ Stars: {}..{} ({} per page, {}s between queries)",
        config.star_floor,
        config.star_ceiling,
        config.page_size,
        config.delay.as_secs()
    );
    if config.token.is_none() {
        println!("{}", "No GITHUB_TOKEN set, search requests are unauthenticated".yellow());
    }
    println!();

    let client = GitHubClient::new(&config).context("Failed to create GitHub client")?;
    let mut harvester = Harvester::new(client, config)
        .await
        .context("Failed to prepare output locations")?;
    let report = harvester.run_supervised().await;

    print_report(&report);

    if !report.outcome.is_completed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &HarvestReport) {
    let summary = &report.summary;

    println!("\n📊 Final Statistics:");
    println!("Windows: {} over {} attempt(s)", summary.windows, summary.attempts);
    if summary.attempts > 1 {
        println!("Processed across all attempts: {}", summary.processed_across_attempts);
    }
    println!("Downloaded: {}", summary.downloaded.to_string().green());
    println!("Already present: {}", summary.skipped);
    println!("Failed: {}", summary.failures.len().to_string().red());
    for failure in &summary.failures {
        println!("  {} {}: {}", "✗".red(), failure.item.full_name, failure.reason);
    }
    println!(
        "Elapsed: {}s (started {})",
        summary.elapsed().num_seconds(),
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    match &report.outcome {
        RunOutcome::Completed => {
            println!(
                "\n{}",
                format!(
                    "DONE! {} repositories have been processed.",
                    summary.repositories_processed
                )
                .bold()
                .green()
            );
        }
        RunOutcome::RetryableFailure(e) | RunOutcome::FatalFailure(e) => {
            eprintln!(
                "\n{} {} ({} repositories processed)",
                "🛑 Harvest aborted:".bold().red(),
                e,
                summary.repositories_processed
            );
        }
    }
}
