//! deliverybot CLI: collects weekly challenge deliveries from the class chat.
//!
//! Clones every submitted repository into the bootcamp folder layout, checks
//! prod URLs, and reports who has not delivered yet.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
