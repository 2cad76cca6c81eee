//! Convert one block of a year of ERA-Interim sub-daily data to ROMS-CICE
//! forcing. Designed to be called repeatedly by a batch job with an
//! increasing start record.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use ocean_diag::cli::CommonArgs;
use ocean_diag::forcing::{self, EraParams};

#[derive(Parser, Debug)]
#[command(version, about = "ERA-Interim to ROMS-CICE atmospheric forcing")]
struct Cli {
    /// Year to process
    year: i32,

    /// 6-hourly record to start at; output files are created when 0
    #[arg(default_value_t = 0)]
    count: usize,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let params: EraParams = cli.common.params().context("Failed to load parameters")?;
    let summary = forcing::run(cli.year, cli.count, &params)
        .with_context(|| format!("Conversion of {} from record {} failed", cli.year, cli.count))?;
    info!(
        "Wrote 6-hourly records {:?} and 12-hourly records {:?}",
        summary.atm_records, summary.ppt_records
    );
    Ok(())
}
