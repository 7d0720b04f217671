//! Application bootstrap: configuration resolution, the configuration
//! report and injector creation in one call.

pub mod engine;
pub mod error;
pub mod modules;
pub mod report;

pub use engine::{
    Bootstrap, BootstrapState, CONFIG_FILE_SETTING, QUIET_SETTING, REQUIRE_EXPLICIT_BINDINGS_SETTING,
    STRICT_CONFIG_SETTING,
};
pub use error::{BootstrapError, BootstrapResult};
pub use modules::{BootstrapModule, StrictConfigModule};
pub use report::{configuration_report, log_configuration, ColumnPrinter};
