//! bindery CLI — publish a directory of Markdown chapters as a single PDF.
//!
//! Runs each chapter through the staged pipeline (parse, decorate,
//! assemble, convert) and drives the external conversion engine.

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
