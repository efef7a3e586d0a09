use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{report::ReportArgs, scan::ScanArgs};

#[derive(Parser)]
#[command(name = "seiri")]
#[command(about = "Scan a project for security findings and produce a triaged report")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory, triage the findings, write a markdown report
    Scan(ScanArgs),

    /// Render a report from a previously saved triage result
    Report(ReportArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::scan::execute(args))
        }
        Commands::Report(args) => commands::report::execute(args),
    }
}
