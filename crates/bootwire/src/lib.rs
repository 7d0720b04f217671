//! # bootwire
//!
//! Bootstraps an application from a list of modules: layered configuration
//! with `${ENV:NAME}` substitution, typed configuration binding, a
//! dependency-injection container built eagerly with batched errors, and
//! lifecycle-managed services.

pub mod bootstrap;
pub mod logging;

pub use bootwire_core::{
    boxed, Binder, BoxError, Config, ConfigError, ConfigurationFactory, CreationError, Environment, Injector, Key,
    LifeCycleError, LifeCycleManager, LifeCycleState, Managed, Message, Module, NamedModule, ProcessSettings, Properties,
    ProvisionError, Stage, Violation, WarningsMonitor,
};

pub use bootstrap::{Bootstrap, BootstrapError, BootstrapResult, BootstrapState, ColumnPrinter};
pub use logging::{LogFormat, Logging, LoggingConfiguration, LoggingError};
