//! biograph CLI — disambiguation-page builder for a titled text corpus.
//!
//! Extracts biographical candidates from an offline corpus, enriches them
//! against an external knowledge base, and renders or publishes groups of
//! confirmed distinct people sharing a name.

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
