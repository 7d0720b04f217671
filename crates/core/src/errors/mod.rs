pub mod core;

pub use self::core::{BoxError, ConfigError, CreationError, LifeCycleError, Message, ProvisionError};
