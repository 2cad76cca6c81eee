//! T/S distributions south of 65°S in MetROMS, FESOM and SOSE.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ocean_diag::analysis::ts_distribution::{self, TsFiles, TsParams};
use ocean_diag::cli::CommonArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Water mass depth in temperature/salinity space")]
struct Cli {
    /// ROMS grid file
    roms_grid: PathBuf,

    /// Time-averaged ROMS file with temperature and salinity
    roms: PathBuf,

    /// FESOM mesh directory
    fesom_mesh: PathBuf,

    /// Time-averaged FESOM file with temperature and salinity
    fesom: PathBuf,

    /// SOSE annual climatology
    #[arg(long)]
    sose: Option<PathBuf>,

    /// Output figure
    #[arg(short, long, default_value = "ts_distribution.png")]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let mut params: TsParams = cli.common.params().context("Failed to load parameters")?;
    if let Some(sose) = cli.sose {
        params.sose_file = sose;
    }
    let files = TsFiles {
        roms_grid: &cli.roms_grid,
        roms: &cli.roms,
        fesom_mesh: &cli.fesom_mesh,
        fesom: &cli.fesom,
        output: &cli.output,
    };
    ts_distribution::run(&files, &params).context("T/S distribution failed")?;
    Ok(())
}
