use crate::container::binder::Binder;

/// A unit of wiring: contributes bindings, configuration registrations and
/// lifecycle registrations to a [`Binder`].
pub trait Module: Send + Sync {
    /// Get module name (defaults to type name); used as the source of every
    /// element the module records
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }

    /// Record this module's bindings
    fn configure(&self, binder: &mut Binder);
}

impl<F> Module for F
where
    F: Fn(&mut Binder) + Send + Sync,
{
    fn configure(&self, binder: &mut Binder) {
        self(binder)
    }
}

/// A closure module with an explicit name
pub struct NamedModule<F> {
    name: String,
    configure: F,
}

impl<F> NamedModule<F>
where
    F: Fn(&mut Binder) + Send + Sync,
{
    pub fn new(name: impl Into<String>, configure: F) -> Self {
        Self {
            name: name.into(),
            configure,
        }
    }
}

impl<F> Module for NamedModule<F>
where
    F: Fn(&mut Binder) + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn configure(&self, binder: &mut Binder) {
        (self.configure)(binder)
    }
}

impl<F> std::fmt::Debug for NamedModule<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedModule").field("name", &self.name).finish()
    }
}

/// Box a module for use in a heterogeneous module list
pub fn boxed<M: Module + 'static>(module: M) -> Box<dyn Module> {
    Box::new(module)
}
