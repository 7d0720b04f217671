use std::path::PathBuf;

use bootwire_core::errors::{ConfigError, CreationError, LifeCycleError, ProvisionError};
use thiserror::Error;

use crate::logging::LoggingError;

/// Bootstrap-specific errors
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Already initialized")]
    AlreadyInitialized,

    #[error("No modules supplied to bootstrap")]
    NoModules,

    #[error("Unable to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file error: {0}")]
    ConfigFile(ConfigError),

    #[error(transparent)]
    Creation(#[from] CreationError),

    #[error("Unable to provision bootstrap component: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Unable to start services: {0}")]
    LifeCycle(#[from] LifeCycleError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),
}

impl From<ConfigError> for BootstrapError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Io { path, source } => BootstrapError::Io { path, source },
            other => BootstrapError::ConfigFile(other),
        }
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
