//! sitelinks CLI — attach a sitelinks feed to an ads campaign.
//!
//! Creates the feed, its items and placeholder mapping, then associates the
//! feed with the campaign given on the command line.

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
