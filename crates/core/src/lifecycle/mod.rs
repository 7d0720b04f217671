pub mod manager;
pub mod module;

pub use manager::{LifeCycleManager, LifeCycleState, Managed};
pub use module::LifeCycleModule;
