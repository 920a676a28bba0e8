use clap::{Parser, Subcommand};
use serde_json::Value;

use api_coverage_proxy::CoverageSnapshot;

#[derive(Parser)]
#[command(name = "coverage-cli")]
#[command(about = "Inspect live API coverage collected by api-coverage-proxy", long_about = None)]
struct Cli {
    /// Base URL of the report endpoint.
    #[arg(short, long, env = "REPORT_URL", default_value = "http://localhost:7778")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the raw JSON report
    Report,
    /// Per-endpoint covered / declared status codes
    Summary,
    /// Declared status codes never observed
    Uncovered,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/report", cli.url)).send().await?;
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: report endpoint returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    match cli.command {
        Commands::Report => {
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Summary => {
            let snapshot: CoverageSnapshot = res.json().await?;
            print_summary(&snapshot);
        }
        Commands::Uncovered => {
            let snapshot: CoverageSnapshot = res.json().await?;
            print_uncovered(&snapshot);
        }
    }

    Ok(())
}

fn print_summary(snapshot: &CoverageSnapshot) {
    let mut covered = 0;
    let mut declared = 0;
    for endpoint in &snapshot.endpoints {
        covered += endpoint.status_codes.len();
        declared += endpoint.declared_status_codes.len();

        let undocumented = if endpoint.undocumented_status_codes.is_empty() {
            String::new()
        } else {
            format!("  undocumented: {}", join_codes(&endpoint.undocumented_status_codes))
        };
        println!(
            "{:<7} {:<40} {}/{}{}",
            endpoint.method,
            endpoint.path,
            endpoint.status_codes.len(),
            endpoint.declared_status_codes.len(),
            undocumented
        );
    }
    println!(
        "{} endpoints, {}/{} declared status codes observed",
        snapshot.endpoints.len(),
        covered,
        declared
    );
}

fn print_uncovered(snapshot: &CoverageSnapshot) {
    let mut any = false;
    for endpoint in &snapshot.endpoints {
        let missing = endpoint.uncovered_status_codes();
        if !missing.is_empty() {
            any = true;
            println!("{:<7} {:<40} {}", endpoint.method, endpoint.path, join_codes(&missing));
        }
    }
    if !any {
        println!("Every declared status code has been observed");
    }
}

fn join_codes(codes: &[u16]) -> String {
    codes
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
