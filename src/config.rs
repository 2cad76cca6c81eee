//! Parameter files.
//!
//! Every program keeps its hard-wired constants (grid indices, bin bounds,
//! colour ranges, experiment paths) in a parameter struct whose `Default`
//! reproduces the values used for the published figures. A TOML file can
//! override any subset of them:
//!
//! ```toml
//! # dpt_2d.toml
//! nbdry = -30.0
//!
//! [section]
//! i = 1180
//! ```

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Error type for parameter file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML or mismatched field types
    #[error("Invalid parameter file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parse parameters from a TOML string; missing fields keep their defaults.
pub fn parse_params<T>(content: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    Ok(toml::from_str(content)?)
}

/// Load parameters from `path`, or the defaults when no file is given.
pub fn load_params<T>(path: Option<&Path>) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let params = parse_params(&content)?;
            log::info!("Loaded parameters from {}", path.display());
            Ok(params)
        }
        None => Ok(T::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Params {
        i_dp: usize,
        nbdry: f64,
    }

    impl Default for Params {
        fn default() -> Self {
            Self {
                i_dp: 1179,
                nbdry: -30.0,
            }
        }
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let p: Params = parse_params("i_dp = 12").unwrap();
        assert_eq!(p.i_dp, 12);
        assert_eq!(p.nbdry, -30.0);
    }

    #[test]
    fn test_no_file_gives_defaults() {
        let p: Params = load_params(None).unwrap();
        assert_eq!(p, Params::default());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let r: Result<Params, _> = parse_params("i_dp = \"west\"");
        assert!(matches!(r, Err(ConfigError::Parse(_))));
    }
}
