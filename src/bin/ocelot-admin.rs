use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ocelot::config::Config;
use ocelot::connect_storage;
use ocelot::reaper::Reaper;

#[derive(Parser)]
#[command(name = "ocelot-admin")]
#[command(about = "Ocelot link maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reaper cycle now (expired and inactive passes)
    Purge,
    /// Print a stored link, whatever its state
    Show {
        /// Short code to look up
        short_code: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let storage = connect_storage(&config).await?;

    match cli.command {
        Commands::Purge => {
            let reaper = Reaper::new(storage, &config.reaper)?;
            let report = reaper.run_cycle(chrono::Utc::now().timestamp()).await;

            let expired = report.expired.context("expired pass failed")?;
            let inactive = report.inactive.context("inactive pass failed")?;
            println!("✓ Purged {expired} expired and {inactive} inactive links");
        }
        Commands::Show { short_code } => match storage.get(&short_code).await? {
            Some(link) => println!("{}", serde_json::to_string_pretty(&link)?),
            None => println!("No link with code '{short_code}'"),
        },
    }

    Ok(())
}
