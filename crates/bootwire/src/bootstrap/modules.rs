use std::collections::BTreeSet;

use bootwire_core::config::{UndefinedVariablesError, WarningsMonitor};
use bootwire_core::container::{Binder, Module};

/// Injector-wide settings applied to every bootstrapped application
#[derive(Debug, Clone, Copy)]
pub struct BootstrapModule {
    require_explicit_bindings: bool,
}

impl BootstrapModule {
    pub fn new(require_explicit_bindings: bool) -> Self {
        Self {
            require_explicit_bindings,
        }
    }
}

impl Module for BootstrapModule {
    fn name(&self) -> String {
        "BootstrapModule".to_string()
    }

    fn configure(&self, binder: &mut Binder) {
        binder.bind_instance(WarningsMonitor::logging());
        binder.disable_circular_proxies();
        if self.require_explicit_bindings {
            binder.require_explicit_bindings();
        }
    }
}

/// Turns unused properties and unresolved environment references into
/// injector creation errors
#[derive(Debug, Clone, Default)]
pub struct StrictConfigModule {
    unused: BTreeSet<String>,
    environment_errors: Vec<UndefinedVariablesError>,
}

impl StrictConfigModule {
    pub fn new(unused: BTreeSet<String>, environment_errors: Vec<UndefinedVariablesError>) -> Self {
        Self {
            unused,
            environment_errors,
        }
    }
}

impl Module for StrictConfigModule {
    fn name(&self) -> String {
        "StrictConfigModule".to_string()
    }

    fn configure(&self, binder: &mut Binder) {
        for property in &self.unused {
            binder.add_error(format!("Configuration property '{}' was not used", property));
        }
        for error in &self.environment_errors {
            binder.add_error(error.to_string());
        }
    }
}
