//! Command line plumbing shared by the binaries.

use std::path::{Path, PathBuf};

use clap::Args;
use log::SetLoggerError;
use serde::de::DeserializeOwned;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use crate::config::{load_params, ConfigError};

/// Options every program accepts.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// TOML file overriding the default parameters
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Start terminal logging at info level, or debug with `--verbose`.
    pub fn init_logging(&self) -> Result<(), SetLoggerError> {
        init_logging(self.verbose)
    }

    /// Parameters from `--config`, or the defaults.
    pub fn params<T>(&self) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        load_params(self.config.as_deref())
    }
}

pub fn init_logging(verbose: bool) -> Result<(), SetLoggerError> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
}

/// `dir/name`, or `name` when no directory is given.
pub fn output_path(dir: Option<&Path>, name: &str) -> PathBuf {
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        common: CommonArgs,
        input: PathBuf,
    }

    #[test]
    fn test_common_args_flatten() {
        let cli = Cli::parse_from(["prog", "--config", "p.toml", "-v", "in.nc"]);
        assert!(cli.common.verbose);
        assert_eq!(cli.common.config, Some(PathBuf::from("p.toml")));
        assert_eq!(cli.input, PathBuf::from("in.nc"));

        let cli = Cli::parse_from(["prog", "in.nc"]);
        assert!(!cli.common.verbose);
        let params: crate::analysis::melt::MeltParams = cli.common.params().unwrap();
        assert_eq!(params.width, 1600);
    }

    #[test]
    fn test_logger_installs_once() {
        let _ = init_logging(false);
        let second: Result<(), SetLoggerError> = CommonArgs::default().init_logging();
        assert!(second.is_err());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path(None, "ohc.png"), PathBuf::from("ohc.png"));
        assert_eq!(output_path(Some(Path::new("figs")), "ohc.png"), PathBuf::from("figs/ohc.png"));
    }
}
