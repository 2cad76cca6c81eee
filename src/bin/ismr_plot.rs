//! Circumpolar map of ice shelf melt rates.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ocean_diag::analysis::melt::{self, MeltParams};
use ocean_diag::cli::CommonArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Map of ice shelf melt rates (m/y)")]
struct Cli {
    /// Ocean averages file with at least one year of 5-day averages
    ocean: PathBuf,

    /// Output figure
    #[arg(short, long, default_value = "ismr.png")]
    output: PathBuf,

    /// Average the last N records instead of showing the first
    #[arg(long, value_name = "N")]
    average_last: Option<usize>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let mut params: MeltParams = cli.common.params().context("Failed to load parameters")?;
    if cli.average_last.is_some() {
        params.average_last = cli.average_last;
    }
    melt::run(&cli.ocean, &cli.output, &params)
        .with_context(|| format!("Melt rate map from {} failed", cli.ocean.display()))?;
    Ok(())
}
