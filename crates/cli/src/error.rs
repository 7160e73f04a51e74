use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// A pipeline stage could not be built; nothing was processed
    #[error("failed to set up {stage}: {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    /// Non frame-local odometer error, the run was aborted
    #[error("odometer stopped at frame {sequence}: {source}")]
    Odometer {
        sequence: u64,
        #[source]
        source: ContractError,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn setup(stage: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Setup {
            stage,
            source: source.into(),
        }
    }
}
