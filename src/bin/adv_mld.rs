//! Mixed layer depth of the reference experiment and the anomaly of a
//! second experiment on one day.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use ocean_diag::analysis::mixed_layer::{self, MixedLayerParams};
use ocean_diag::cli::CommonArgs;

#[derive(Parser, Debug)]
#[command(version, about = "Mixed layer depth and its change between two experiments")]
struct Cli {
    /// Directory holding one subdirectory per experiment
    #[arg(long)]
    root: Option<PathBuf>,

    /// Output figure
    #[arg(short, long, default_value = "adv_mld_2.png")]
    output: PathBuf,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.common.init_logging()?;

    let mut params: MixedLayerParams = cli.common.params().context("Failed to load parameters")?;
    if let Some(root) = cli.root {
        params.root = root;
    }
    mixed_layer::run(&cli.output, &params).with_context(|| {
        format!("Mixed layer depth figure from {} failed", params.root.display())
    })?;
    Ok(())
}
