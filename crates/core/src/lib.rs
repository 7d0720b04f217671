//! Core building blocks for bootwire: a small dependency-injection
//! container, typed configuration binding with layered property resolution,
//! and a lifecycle manager for services started after wiring.

pub mod config;
pub mod container;
pub mod errors;
pub mod lifecycle;

pub use config::{
    Config, ConfigurationFactory, ConfigurationModule, Environment, ProcessSettings, Properties,
    ResolvedProperties, ValidationErrorModule, Violation, WarningsMonitor,
};
pub use container::{boxed, Binder, Injector, Key, Module, NamedModule, Stage};
pub use errors::{BoxError, ConfigError, CreationError, LifeCycleError, Message, ProvisionError};
pub use lifecycle::{LifeCycleManager, LifeCycleModule, LifeCycleState, Managed};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
