//! Spinup diagnostics: integrate each record of a ROMS ocean file (and
//! optionally a CICE history file), append the values to a log and plot
//! every time series.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ocean_diag::analysis::spinup::{self, SpinupFiles, SpinupParams};
use ocean_diag::cli::CommonArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Spinup time series of a MetROMS run")]
struct Cli {
    /// Ocean history or averages file
    ocean: PathBuf,

    /// Log file to read previous values from and append to
    log: PathBuf,

    /// CICE history file; sea ice series are skipped without it
    #[arg(long)]
    cice: Option<PathBuf>,

    /// Directory for the plots
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also compute heat and salt content, kinetic energy and maximum speed
    #[arg(long, visible_alias = "all")]
    all_series: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let params: SpinupParams = cli.common.params().context("Failed to load parameters")?;
    let params = if cli.all_series {
        params.with_all_series(true)
    } else {
        params
    };

    let files = SpinupFiles {
        ocean: &cli.ocean,
        cice: cli.cice.as_deref(),
        log: &cli.log,
        output_dir: &cli.output_dir,
    };
    let log = spinup::run(files, &params)
        .with_context(|| format!("Spinup analysis of {} failed", cli.ocean.display()))?;
    info!("Log now holds {} records", log.n_records());
    Ok(())
}
