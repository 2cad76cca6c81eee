//! Drake Passage transport as a function of latitude and time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ocean_diag::analysis::drake::{self, DrakeParams};
use ocean_diag::cli::CommonArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Latitude-time section of Drake Passage transport")]
struct Cli {
    /// ROMS grid file
    grid: PathBuf,

    /// Ocean history or averages file
    ocean: PathBuf,

    /// Output figure
    #[arg(short, long, default_value = "dp_trans_2d.png")]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let params: DrakeParams = cli.common.params().context("Failed to load parameters")?;
    drake::run(&cli.grid, &cli.ocean, &cli.output, &params)
        .with_context(|| format!("Drake Passage transport from {} failed", cli.ocean.display()))?;
    Ok(())
}
