pub mod binder;
pub mod injector;
pub mod key;
pub mod module;

pub use binder::Binder;
pub use injector::{Injector, Stage};
pub use key::Key;
pub use module::{boxed, Module, NamedModule};
