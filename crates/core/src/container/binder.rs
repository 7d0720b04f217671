use std::any::Any;
use std::sync::Arc;

use crate::config::{Config, ConfigRegistration, ConfigurationFactory};
use crate::container::injector::Injector;
use crate::container::key::Key;
use crate::container::module::Module;
use crate::errors::{Message, ProvisionError};
use crate::lifecycle::Managed;

/// Type-erased instance; always holds an `Arc<T>` for the bound `T`
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type Provider = Arc<dyn Fn(&Injector) -> Result<Instance, ProvisionError> + Send + Sync>;

pub(crate) type Hook = Box<dyn Fn(&Injector) -> Result<(), ProvisionError> + Send + Sync>;

pub(crate) type ManagedAdapter =
    Box<dyn Fn(&Injector) -> Result<Arc<dyn Managed>, ProvisionError> + Send + Sync>;

/// One recorded binder instruction
pub(crate) enum Element {
    Binding {
        key: Key,
        source: String,
        provider: Provider,
    },
    Configuration {
        registration: ConfigRegistration,
    },
    Managed {
        key: Key,
        source: String,
        adapter: ManagedAdapter,
    },
    Hook {
        source: String,
        hook: Hook,
    },
    Error(Message),
    DisableCircularProxies,
    RequireExplicitBindings,
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Binding { key, source, .. } => f
                .debug_struct("Binding")
                .field("key", key)
                .field("source", source)
                .finish(),
            Element::Configuration { registration } => {
                f.debug_tuple("Configuration").field(registration).finish()
            }
            Element::Managed { key, source, .. } => f
                .debug_struct("Managed")
                .field("key", key)
                .field("source", source)
                .finish(),
            Element::Hook { source, .. } => f.debug_struct("Hook").field("source", source).finish(),
            Element::Error(message) => f.debug_tuple("Error").field(message).finish(),
            Element::DisableCircularProxies => f.write_str("DisableCircularProxies"),
            Element::RequireExplicitBindings => f.write_str("RequireExplicitBindings"),
        }
    }
}

/// Collects the elements contributed by modules
#[derive(Debug)]
pub struct Binder {
    elements: Vec<Element>,
    source: String,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self {
            elements: Vec::new(),
            source: String::new(),
        }
    }

    /// Record every element of `modules`, in module order
    pub(crate) fn record(modules: &[Box<dyn Module>]) -> Vec<Element> {
        let mut binder = Binder::new();
        for module in modules {
            binder.install(module.as_ref());
        }
        binder.elements
    }

    /// Name of the module currently being configured
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Bind `T` to a fixed instance
    pub fn bind_instance<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.bind_arc(Arc::new(value))
    }

    /// Bind `T` (possibly a trait object) to a shared instance
    pub fn bind_arc<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance: Instance = Arc::new(value);
        self.push_binding(Key::of::<T>(), Arc::new(move |_: &Injector| Ok(instance.clone())))
    }

    /// Bind `T` to a provider that can look up its own dependencies
    pub fn bind_provider<T, F>(&mut self, provider: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Injector) -> Result<Arc<T>, ProvisionError> + Send + Sync + 'static,
    {
        self.push_binding(Key::of::<T>(), erase(provider))
    }

    /// Bind `T` under `qualifier` to a provider
    pub fn bind_qualified_provider<T, F>(&mut self, qualifier: &str, provider: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Injector) -> Result<Arc<T>, ProvisionError> + Send + Sync + 'static,
    {
        self.push_binding(Key::qualified::<T>(qualifier), erase(provider))
    }

    /// Bind the configuration type `T`, built from unprefixed properties
    pub fn bind_config<T: Config>(&mut self) -> &mut Self {
        self.bind_configuration::<T>(None)
    }

    /// Bind the configuration type `T` with every property read under
    /// `prefix.`; the binding is qualified by the prefix
    pub fn bind_config_prefixed<T: Config>(&mut self, prefix: &str) -> &mut Self {
        self.bind_configuration::<T>(Some(prefix.to_string()))
    }

    fn bind_configuration<T: Config>(&mut self, prefix: Option<String>) -> &mut Self {
        let key = match &prefix {
            Some(prefix) => Key::qualified::<T>(prefix.clone()),
            None => Key::of::<T>(),
        };
        self.elements.push(Element::Configuration {
            registration: ConfigRegistration::of::<T>(prefix.clone()),
        });
        let provider = move |injector: &Injector| {
            let factory = injector.get::<ConfigurationFactory>()?;
            factory.build::<T>(prefix.as_deref())
        };
        self.push_binding(key, erase(provider))
    }

    /// Register the instance bound to `T` with the lifecycle manager
    pub fn manage<T>(&mut self) -> &mut Self
    where
        T: Managed + 'static,
    {
        let key = Key::of::<T>();
        let source = self.source.clone();
        self.elements.push(Element::Managed {
            key,
            source,
            adapter: Box::new(|injector: &Injector| {
                let instance: Arc<dyn Managed> = injector.get::<T>()?;
                Ok(instance)
            }),
        });
        self
    }

    /// Run `hook` once the injector has been created
    pub fn on_created<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&Injector) -> Result<(), ProvisionError> + Send + Sync + 'static,
    {
        let source = self.source.clone();
        self.elements.push(Element::Hook {
            source,
            hook: Box::new(hook),
        });
        self
    }

    /// Configure `module` into this binder
    pub fn install<M: Module + ?Sized>(&mut self, module: &M) -> &mut Self {
        let previous = std::mem::replace(&mut self.source, module.name());
        module.configure(self);
        self.source = previous;
        self
    }

    /// Record an error; injector creation will fail and report it
    pub fn add_error(&mut self, message: impl Into<String>) -> &mut Self {
        let message = Message::new(message).with_source(self.source.clone());
        self.elements.push(Element::Error(message));
        self
    }

    /// Record an already-formed message; it keeps its own source when it has one
    pub fn add_message(&mut self, message: Message) -> &mut Self {
        let message = match message.source() {
            Some(_) => message,
            None => message.with_source(self.source.clone()),
        };
        self.elements.push(Element::Error(message));
        self
    }

    pub fn disable_circular_proxies(&mut self) -> &mut Self {
        self.elements.push(Element::DisableCircularProxies);
        self
    }

    /// Forbid just-in-time bindings
    pub fn require_explicit_bindings(&mut self) -> &mut Self {
        self.elements.push(Element::RequireExplicitBindings);
        self
    }

    fn push_binding(&mut self, key: Key, provider: Provider) -> &mut Self {
        let source = self.source.clone();
        self.elements.push(Element::Binding {
            key,
            source,
            provider,
        });
        self
    }
}

fn erase<T, F>(provider: F) -> Provider
where
    T: ?Sized + Send + Sync + 'static,
    F: Fn(&Injector) -> Result<Arc<T>, ProvisionError> + Send + Sync + 'static,
{
    Arc::new(move |injector: &Injector| {
        let instance: Instance = Arc::new(provider(injector)?);
        Ok(instance)
    })
}
