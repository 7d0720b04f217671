use crate::container::{Binder, Injector, Module};
use crate::errors::ProvisionError;
use crate::lifecycle::manager::LifeCycleManager;

/// Binds the [`LifeCycleManager`] and hands it every instance registered
/// with [`Binder::manage`] once the injector exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct LifeCycleModule;

impl LifeCycleModule {
    pub fn new() -> Self {
        Self
    }
}

impl Module for LifeCycleModule {
    fn name(&self) -> String {
        "LifeCycleModule".to_string()
    }

    fn configure(&self, binder: &mut Binder) {
        binder.bind_instance(LifeCycleManager::new());
        binder.on_created(|injector: &Injector| {
            let manager = injector.get::<LifeCycleManager>()?;
            for (name, instance) in injector.managed_instances()? {
                manager
                    .add_instance(name, instance)
                    .map_err(|error| ProvisionError::other(error.to_string()))?;
            }
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{boxed, Stage};
    use crate::errors::BoxError;
    use crate::lifecycle::Managed;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Server {
        running: AtomicBool,
    }

    impl Managed for Server {
        fn start(&self) -> Result<(), BoxError> {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<(), BoxError> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_managed_instances_are_registered() {
        let modules = vec![
            boxed(LifeCycleModule),
            boxed(|binder: &mut Binder| {
                binder.bind_instance(Server::default()).manage::<Server>();
            }),
        ];

        let injector = Injector::create(Stage::Production, &modules).unwrap();
        let manager = injector.get::<LifeCycleManager>().unwrap();
        assert_eq!(manager.size(), 1);

        manager.start().unwrap();
        assert!(injector.get::<Server>().unwrap().running.load(Ordering::SeqCst));
        manager.stop().unwrap();
        assert!(!injector.get::<Server>().unwrap().running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_managed_type_must_be_bound() {
        let modules = vec![
            boxed(LifeCycleModule),
            boxed(|binder: &mut Binder| {
                binder.manage::<Server>();
            }),
        ];

        let error = Injector::create(Stage::Production, &modules).unwrap_err();
        assert!(error.contains("is registered for lifecycle management but is not bound"));
    }

    #[test]
    fn test_manager_without_services() {
        let injector = Injector::create(Stage::Production, &[boxed(LifeCycleModule)]).unwrap();
        let manager: Arc<LifeCycleManager> = injector.get().unwrap();
        assert_eq!(manager.size(), 0);
    }
}
