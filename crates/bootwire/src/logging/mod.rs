pub mod config;
pub mod init;

pub use config::{LogFormat, LoggingConfiguration};
pub use init::{install_panic_hook, Logging, LoggingError};
