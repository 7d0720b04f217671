use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;

use crate::container::binder::{Binder, Element, Hook, Instance, ManagedAdapter, Provider};
use crate::container::key::Key;
use crate::container::module::Module;
use crate::errors::{CreationError, Message, ProvisionError};
use crate::lifecycle::Managed;

/// How eagerly the object graph is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Bindings are constructed on first request
    #[default]
    Development,
    /// Every binding is constructed while the injector is created, and all
    /// failures are reported together
    Production,
}

struct Binding {
    source: String,
    provider: Provider,
}

struct ManagedEntry {
    key: Key,
    source: String,
    adapter: ManagedAdapter,
}

/// The constructed object graph
pub struct Injector {
    stage: Stage,
    bindings: HashMap<Key, Binding>,
    order: Vec<Key>,
    managed: Vec<ManagedEntry>,
    require_explicit_bindings: bool,
    disable_circular_proxies: bool,
    singletons: Mutex<HashMap<Key, Instance>>,
    just_in_time: Mutex<HashMap<Key, Instance>>,
    constructing: Mutex<HashMap<ThreadId, Vec<Key>>>,
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("stage", &self.stage)
            .field("bindings", &self.order)
            .field("managed_count", &self.managed.len())
            .field("require_explicit_bindings", &self.require_explicit_bindings)
            .field("disable_circular_proxies", &self.disable_circular_proxies)
            .finish()
    }
}

impl Injector {
    fn empty(stage: Stage) -> Self {
        Self {
            stage,
            bindings: HashMap::new(),
            order: Vec::new(),
            managed: Vec::new(),
            require_explicit_bindings: false,
            disable_circular_proxies: false,
            singletons: Mutex::new(HashMap::new()),
            just_in_time: Mutex::new(HashMap::new()),
            constructing: Mutex::new(HashMap::new()),
        }
    }

    /// Record `modules` and build the object graph
    pub fn create(stage: Stage, modules: &[Box<dyn Module>]) -> Result<Self, CreationError> {
        let mut injector = Injector::empty(stage);
        let mut messages = Vec::new();
        let mut hooks: Vec<(String, Hook)> = Vec::new();

        for element in Binder::record(modules) {
            match element {
                Element::Binding {
                    key,
                    source,
                    provider,
                } => {
                    if let Some(existing) = injector.bindings.get(&key) {
                        messages.push(
                            Message::new(format!(
                                "A binding to {} was already configured at {}",
                                key, existing.source
                            ))
                            .with_source(source),
                        );
                    } else {
                        injector.order.push(key.clone());
                        injector.bindings.insert(key, Binding { source, provider });
                    }
                }
                // Configuration registrations are consumed by the configuration factory
                Element::Configuration { .. } => {}
                Element::Managed {
                    key,
                    source,
                    adapter,
                } => {
                    injector.managed.push(ManagedEntry {
                        key,
                        source,
                        adapter,
                    });
                }
                Element::Hook { source, hook } => hooks.push((source, hook)),
                Element::Error(message) => messages.push(message),
                Element::DisableCircularProxies => injector.disable_circular_proxies = true,
                Element::RequireExplicitBindings => injector.require_explicit_bindings = true,
            }
        }

        for entry in &injector.managed {
            if !injector.bindings.contains_key(&entry.key) {
                messages.push(
                    Message::new(format!(
                        "{} is registered for lifecycle management but is not bound",
                        entry.key
                    ))
                    .with_source(entry.source.clone()),
                );
            }
        }

        if !messages.is_empty() {
            return Err(CreationError::new(messages));
        }

        if stage == Stage::Production {
            for key in &injector.order {
                if let Err(error) = injector.instance(key) {
                    let source = injector
                        .bindings
                        .get(key)
                        .map(|binding| binding.source.clone())
                        .unwrap_or_default();
                    push_unique(&mut messages, Message::new(error.to_string()).with_source(source));
                }
            }
            if !messages.is_empty() {
                return Err(CreationError::new(messages));
            }
        }

        for (source, hook) in &hooks {
            if let Err(error) = hook(&injector) {
                messages.push(Message::new(error.to_string()).with_source(source.clone()));
            }
        }
        if !messages.is_empty() {
            return Err(CreationError::new(messages));
        }

        tracing::debug!(
            "Injector created in {:?} stage with {} binding(s)",
            stage,
            injector.order.len()
        );
        Ok(injector)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Keys of every explicit binding, in declaration order
    pub fn keys(&self) -> &[Key] {
        &self.order
    }

    pub fn has_binding<T: ?Sized + 'static>(&self) -> bool {
        self.bindings.contains_key(&Key::of::<T>())
    }

    /// Get the instance bound to `T`
    pub fn get<T>(&self) -> Result<Arc<T>, ProvisionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_key(&Key::of::<T>())
    }

    /// Get the instance bound to `T` under `qualifier`
    pub fn get_qualified<T>(&self, qualifier: &str) -> Result<Arc<T>, ProvisionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_key(&Key::qualified::<T>(qualifier))
    }

    /// Get the instance bound to `T`, or create a just-in-time instance from
    /// `T::default()` when explicit bindings are not required
    pub fn get_or_default<T>(&self) -> Result<Arc<T>, ProvisionError>
    where
        T: Default + Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        if self.bindings.contains_key(&key) {
            return self.get_key(&key);
        }
        if self.require_explicit_bindings {
            return Err(ProvisionError::ExplicitBindingRequired {
                key: key.to_string(),
            });
        }

        let instance = lock(&self.just_in_time)
            .entry(key.clone())
            .or_insert_with(|| -> Instance { Arc::new(Arc::new(T::default())) })
            .clone();
        downcast(&key, &instance)
    }

    /// Every instance registered for lifecycle management, in declaration order
    pub fn managed_instances(&self) -> Result<Vec<(String, Arc<dyn Managed>)>, ProvisionError> {
        self.managed
            .iter()
            .map(|entry| Ok((entry.key.to_string(), (entry.adapter)(self)?)))
            .collect()
    }

    fn get_key<T>(&self, key: &Key) -> Result<Arc<T>, ProvisionError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let instance = self.instance(key)?;
        downcast(key, &instance)
    }

    fn instance(&self, key: &Key) -> Result<Instance, ProvisionError> {
        if let Some(instance) = lock(&self.singletons).get(key) {
            return Ok(instance.clone());
        }

        let binding = self.bindings.get(key).ok_or_else(|| ProvisionError::NotBound {
            key: key.to_string(),
        })?;

        let _guard = self.enter(key)?;
        let instance = (binding.provider)(self)?;

        let mut singletons = lock(&self.singletons);
        Ok(singletons.entry(key.clone()).or_insert(instance).clone())
    }

    fn enter(&self, key: &Key) -> Result<ConstructionGuard<'_>, ProvisionError> {
        let thread = std::thread::current().id();
        let mut constructing = lock(&self.constructing);
        let stack = constructing.entry(thread).or_default();

        if let Some(position) = stack.iter().position(|pending| pending == key) {
            let path = stack[position..]
                .iter()
                .chain(std::iter::once(key))
                .map(|pending| pending.to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ProvisionError::CircularDependency {
                key: key.to_string(),
                path,
                proxies_disabled: self.disable_circular_proxies,
            });
        }

        stack.push(key.clone());
        Ok(ConstructionGuard {
            injector: self,
            thread,
        })
    }
}

/// Pops the construction stack of the current thread when dropped
struct ConstructionGuard<'a> {
    injector: &'a Injector,
    thread: ThreadId,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        let mut constructing = lock(&self.injector.constructing);
        if let Some(stack) = constructing.get_mut(&self.thread) {
            stack.pop();
            if stack.is_empty() {
                constructing.remove(&self.thread);
            }
        }
    }
}

fn downcast<T>(key: &Key, instance: &Instance) -> Result<Arc<T>, ProvisionError>
where
    T: ?Sized + Send + Sync + 'static,
{
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| ProvisionError::TypeMismatch {
            key: key.to_string(),
        })
}

fn push_unique(messages: &mut Vec<Message>, message: Message) {
    if !messages.iter().any(|existing| existing.message() == message.message()) {
        messages.push(message);
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::module::{boxed, NamedModule};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[derive(Default)]
    struct Counter {
        value: usize,
    }

    struct A;
    struct B;

    #[test]
    fn test_resolves_instances_and_trait_objects() {
        let modules = vec![boxed(|binder: &mut Binder| {
            binder.bind_instance(42u32);
            binder.bind_arc::<dyn Greeter>(Arc::new(English));
            binder.bind_provider(|injector: &Injector| {
                let number = injector.get::<u32>()?;
                Ok(Arc::new(format!("number {}", number)))
            });
        })];

        let injector = Injector::create(Stage::Production, &modules).unwrap();
        assert_eq!(*injector.get::<u32>().unwrap(), 42);
        assert_eq!(injector.get::<dyn Greeter>().unwrap().greet(), "hello");
        assert_eq!(injector.get::<String>().unwrap().as_str(), "number 42");
        assert_eq!(injector.keys().len(), 3);
    }

    #[test]
    fn test_production_stage_constructs_every_binding_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let modules = vec![boxed(move |binder: &mut Binder| {
            let counted = counted.clone();
            binder.bind_provider(move |_: &Injector| {
                counted.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(7u64))
            });
        })];

        let injector = Injector::create(Stage::Production, &modules).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        injector.get::<u64>().unwrap();
        injector.get::<u64>().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_development_stage_is_lazy() {
        let modules = vec![boxed(|binder: &mut Binder| {
            binder.bind_provider::<u8, _>(|_: &Injector| Err(ProvisionError::other("boom")));
        })];

        let injector = Injector::create(Stage::Development, &modules).unwrap();
        assert!(injector.get::<u8>().is_err());
        assert!(Injector::create(Stage::Production, &modules).is_err());
    }

    #[test]
    fn test_errors_are_batched() {
        let modules = vec![
            boxed(NamedModule::new("first", |binder: &mut Binder| {
                binder.add_error("first problem");
                binder.bind_instance(1u32);
            })),
            boxed(NamedModule::new("second", |binder: &mut Binder| {
                binder.add_error("second problem");
                binder.bind_instance(2u32);
            })),
        ];

        let error = Injector::create(Stage::Production, &modules).unwrap_err();
        assert_eq!(error.messages().len(), 3);
        assert!(error.contains("first problem"));
        assert!(error.contains("second problem"));
        assert!(error.contains("A binding to u32 was already configured at first"));
    }

    #[test]
    fn test_construction_failures_are_collected() {
        let modules = vec![boxed(|binder: &mut Binder| {
            binder.bind_provider::<u8, _>(|_: &Injector| Err(ProvisionError::other("u8 failed")));
            binder.bind_provider::<u16, _>(|_: &Injector| Err(ProvisionError::other("u16 failed")));
        })];

        let error = Injector::create(Stage::Production, &modules).unwrap_err();
        assert_eq!(error.messages().len(), 2);
        assert!(error.contains("u8 failed"));
        assert!(error.contains("u16 failed"));
    }

    #[test]
    fn test_circular_dependency_is_detected() {
        let modules = vec![boxed(|binder: &mut Binder| {
            binder.disable_circular_proxies();
            binder.bind_provider(|injector: &Injector| {
                injector.get::<B>()?;
                Ok(Arc::new(A))
            });
            binder.bind_provider(|injector: &Injector| {
                injector.get::<A>()?;
                Ok(Arc::new(B))
            });
        })];

        let error = Injector::create(Stage::Production, &modules).unwrap_err();
        assert!(error.contains("circular dependency"));
        assert!(error.contains("circular proxies are disabled"));
    }

    #[test]
    fn test_just_in_time_bindings() {
        let lenient = vec![boxed(|_: &mut Binder| {})];
        let injector = Injector::create(Stage::Production, &lenient).unwrap();
        let first = injector.get_or_default::<Counter>().unwrap();
        let second = injector.get_or_default::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.value, 0);

        let strict = vec![boxed(|binder: &mut Binder| {
            binder.require_explicit_bindings();
        })];
        let injector = Injector::create(Stage::Production, &strict).unwrap();
        match injector.get_or_default::<Counter>() {
            Err(ProvisionError::ExplicitBindingRequired { key }) => assert!(key.contains("Counter")),
            other => panic!("Expected ExplicitBindingRequired, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unbound_lookup_fails() {
        let injector = Injector::create(Stage::Development, &[]).unwrap();
        assert!(matches!(
            injector.get::<String>(),
            Err(ProvisionError::NotBound { .. })
        ));
        assert!(!injector.has_binding::<String>());
    }

    #[test]
    fn test_hooks_run_after_creation() {
        let seen = Arc::new(AtomicUsize::new(0));
        let observed = seen.clone();
        let modules = vec![boxed(move |binder: &mut Binder| {
            binder.bind_instance(5usize);
            let observed = observed.clone();
            binder.on_created(move |injector: &Injector| {
                observed.store(*injector.get::<usize>()?, Ordering::SeqCst);
                Ok(())
            });
        })];

        Injector::create(Stage::Production, &modules).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }
}
