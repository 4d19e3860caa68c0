//! docpress CLI: builds the Clean Architecture guide PDF from its Markdown
//! sources.
//!
//! Assembles the manifest into one combined document, renders it with
//! pandoc, and verifies the result.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
