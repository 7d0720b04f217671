use std::sync::Arc;

use crate::config::factory::ConfigurationFactory;
use crate::container::{Binder, Module};
use crate::errors::Message;

/// Binds the [`ConfigurationFactory`] so configuration bindings can build
/// their instances
#[derive(Debug, Clone)]
pub struct ConfigurationModule {
    factory: Arc<ConfigurationFactory>,
}

impl ConfigurationModule {
    pub fn new(factory: Arc<ConfigurationFactory>) -> Self {
        Self { factory }
    }
}

impl Module for ConfigurationModule {
    fn name(&self) -> String {
        "ConfigurationModule".to_string()
    }

    fn configure(&self, binder: &mut Binder) {
        binder.bind_arc(self.factory.clone());
    }
}

/// Reports configuration validation messages as injector creation errors
#[derive(Debug, Clone)]
pub struct ValidationErrorModule {
    messages: Vec<Message>,
}

impl ValidationErrorModule {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl Module for ValidationErrorModule {
    fn name(&self) -> String {
        "ValidationErrorModule".to_string()
    }

    fn configure(&self, binder: &mut Binder) {
        for message in &self.messages {
            binder.add_message(message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Properties, WarningsMonitor};
    use crate::container::{boxed, Injector, Stage};
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct PoolConfig {
        size: u32,
    }

    impl Config for PoolConfig {
        fn describe(&mut self, properties: &mut Properties<'_>) {
            properties.property("size", "Pool size", &mut self.size);
        }
    }

    fn factory(entries: &[(&str, &str)]) -> Arc<ConfigurationFactory> {
        let properties: BTreeMap<String, String> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Arc::new(ConfigurationFactory::new(properties, WarningsMonitor::default()))
    }

    #[test]
    fn test_config_bindings_resolve_through_factory() {
        let factory = factory(&[("size", "4"), ("db.size", "16")]);
        let modules = vec![
            boxed(ConfigurationModule::new(factory.clone())),
            boxed(|binder: &mut Binder| {
                binder.bind_config::<PoolConfig>();
                binder.bind_config_prefixed::<PoolConfig>("db");
            }),
        ];

        let injector = Injector::create(Stage::Production, &modules).unwrap();
        assert_eq!(injector.get::<PoolConfig>().unwrap().size, 4);
        assert_eq!(injector.get_qualified::<PoolConfig>("db").unwrap().size, 16);
        assert!(factory.used_properties().contains("db.size"));
    }

    #[test]
    fn test_validation_messages_fail_creation() {
        let modules = vec![boxed(ValidationErrorModule::new(vec![
            Message::new("Invalid value 'x' for property 'size' (expected u32)").with_source("PoolConfig"),
        ]))];

        let error = Injector::create(Stage::Production, &modules).unwrap_err();
        assert_eq!(error.messages().len(), 1);
        assert_eq!(error.messages()[0].source(), Some("PoolConfig"));
    }
}
