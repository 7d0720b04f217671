pub mod factory;
pub mod inspector;
pub mod loader;
pub mod module;
pub mod resolver;
pub mod value;

pub use factory::{Config, ConfigRegistration, ConfigurationFactory, Properties, Violation, WarningsMonitor};
pub use inspector::{ConfigAttribute, ConfigRecord, ConfigurationInspector};
pub use loader::{load_properties_from, parse_properties, Environment, ProcessSettings};
pub use module::{ConfigurationModule, ValidationErrorModule};
pub use resolver::{
    merge_layers, replace_with_environment_variables, resolve, ResolvedProperties,
    UndefinedVariablesError,
};
pub use value::ConfigValue;
