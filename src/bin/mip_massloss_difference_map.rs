//! Percentage change in ice shelf mass loss from increased FESOM
//! resolution, mapped onto the ROMS grid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ocean_diag::analysis::massloss::{self, MassLossParams};
use ocean_diag::cli::CommonArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Map of % change in ice shelf mass loss between FESOM resolutions")]
struct Cli {
    /// ROMS grid file
    roms_grid: PathBuf,

    /// FESOM low-res mass loss log
    low_res_log: PathBuf,

    /// FESOM high-res mass loss log
    high_res_log: PathBuf,

    /// Output figure
    #[arg(short, long, default_value = "massloss_difference.png")]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let params: MassLossParams = cli.common.params().context("Failed to load parameters")?;
    massloss::run(
        &cli.roms_grid,
        &cli.low_res_log,
        &cli.high_res_log,
        &cli.output,
        &params,
    )
    .context("Mass loss difference map failed")?;
    Ok(())
}
