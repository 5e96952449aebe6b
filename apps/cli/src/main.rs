//! LeadScout CLI: newsletter lead research from the terminal.
//!
//! Extracts funded companies from newsletters, enriches and scores them
//! against an ideal customer profile, and drafts outreach for the best fits.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
