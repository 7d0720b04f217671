use std::any::TypeId;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::config::inspector::{ConfigAttribute, ConfigRecord};
use crate::config::value::ConfigValue;
use crate::container::binder::{Binder, Element, Instance};
use crate::container::injector::lock;
use crate::container::Module;
use crate::errors::{Message, ProvisionError};

const REDACTED: &str = "[REDACTED]";
const UNSET: &str = "----";
const UNAVAILABLE: &str = "-- n/a --";

/// A typed configuration object.
///
/// `describe` lists every property the type reads, once per field. The same
/// method drives binding (the [`Properties`] visitor assigns parsed values)
/// and introspection (the visitor records names, descriptions and values).
///
/// ```
/// use bootwire_core::config::{Config, Properties, Violation};
///
/// #[derive(Default)]
/// struct ServerConfig {
///     port: u16,
///     host: String,
/// }
///
/// impl Config for ServerConfig {
///     fn describe(&mut self, properties: &mut Properties<'_>) {
///         properties
///             .property("server.port", "Port to listen on", &mut self.port)
///             .property("server.host", "Interface to bind", &mut self.host);
///     }
///
///     fn validate(&self) -> Vec<Violation> {
///         if self.port == 0 {
///             vec![Violation::new("server.port", "must be greater than 0")]
///         } else {
///             Vec::new()
///         }
///     }
/// }
/// ```
pub trait Config: Default + Send + Sync + 'static {
    fn describe(&mut self, properties: &mut Properties<'_>);

    /// Constraint violations of a successfully bound instance
    fn validate(&self) -> Vec<Violation> {
        Vec::new()
    }
}

/// A failed constraint on a bound configuration property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub property: String,
    pub message: String,
}

impl Violation {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// Receives configuration warnings (legacy property names and the like)
#[derive(Clone)]
pub struct WarningsMonitor {
    sink: Arc<dyn Fn(&str) + Send + Sync>,
}

impl WarningsMonitor {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Forward every warning to `tracing::warn!`
    pub fn logging() -> Self {
        Self::new(|warning| tracing::warn!("{}", warning))
    }

    pub fn on_warning(&self, warning: &str) {
        (self.sink)(warning)
    }
}

impl Default for WarningsMonitor {
    fn default() -> Self {
        Self::logging()
    }
}

impl std::fmt::Debug for WarningsMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarningsMonitor").finish_non_exhaustive()
    }
}

pub(crate) struct InspectedProperty {
    name: String,
    value: Option<String>,
    description: String,
    sensitive: bool,
}

impl InspectedProperty {
    fn rendered(&self) -> String {
        if self.sensitive {
            REDACTED.to_string()
        } else {
            self.value.clone().unwrap_or_else(|| UNSET.to_string())
        }
    }
}

/// Visitor handed to [`Config::describe`]
pub struct Properties<'a> {
    prefix: Option<&'a str>,
    source: Option<&'a BTreeMap<String, String>>,
    used: Vec<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
    inspected: Vec<InspectedProperty>,
}

impl<'a> Properties<'a> {
    fn binding(source: &'a BTreeMap<String, String>, prefix: Option<&'a str>) -> Self {
        Self {
            source: Some(source),
            ..Self::inspecting(prefix)
        }
    }

    fn inspecting(prefix: Option<&'a str>) -> Self {
        Self {
            prefix,
            source: None,
            used: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            inspected: Vec::new(),
        }
    }

    /// Prefix prepended (with a `.`) to every property name
    pub fn prefix(&self) -> Option<&str> {
        self.prefix
    }

    /// Read `name` into `field`; an absent property keeps the field's default
    pub fn property<T: ConfigValue>(&mut self, name: &str, description: &str, field: &mut T) -> &mut Self {
        self.visit(name, &[], description, false, field)
    }

    /// Like [`Properties::property`], but the value never appears in reports or errors
    pub fn sensitive<T: ConfigValue>(&mut self, name: &str, description: &str, field: &mut T) -> &mut Self {
        self.visit(name, &[], description, true, field)
    }

    /// Read `name`, also accepting the replaced `legacy_names` with a warning.
    /// Setting both a name and one of its legacy names is an error.
    pub fn legacy<T: ConfigValue>(
        &mut self,
        name: &str,
        legacy_names: &[&str],
        description: &str,
        field: &mut T,
    ) -> &mut Self {
        self.visit(name, legacy_names, description, false, field)
    }

    fn visit<T: ConfigValue>(
        &mut self,
        name: &str,
        legacy_names: &[&str],
        description: &str,
        sensitive: bool,
        field: &mut T,
    ) -> &mut Self {
        let key = full_name(self.prefix, name);

        let Some(source) = self.source else {
            self.inspected.push(InspectedProperty {
                name: key,
                value: field.render_value(),
                description: description.to_string(),
                sensitive,
            });
            return self;
        };

        let shown = |value: &str| if sensitive { REDACTED.to_string() } else { value.to_string() };

        self.used.push(key.clone());
        let mut chosen = source.get(&key).map(|value| (key.clone(), value.as_str()));

        for legacy in legacy_names {
            let legacy_key = full_name(self.prefix, legacy);
            self.used.push(legacy_key.clone());
            let Some(value) = source.get(&legacy_key) else {
                continue;
            };
            if let Some((existing, existing_value)) = chosen.clone() {
                self.errors.push(format!(
                    "Value for property '{}' (={}) conflicts with property '{}' (={})",
                    existing,
                    shown(existing_value),
                    legacy_key,
                    shown(value.as_str())
                ));
            } else {
                self.warnings.push(format!(
                    "Configuration property '{}' has been replaced. Use '{}' instead.",
                    legacy_key, key
                ));
                chosen = Some((legacy_key, value.as_str()));
            }
        }

        if let Some((property, raw)) = chosen {
            match T::parse_value(raw) {
                Ok(value) => *field = value,
                Err(expected) => self.errors.push(format!(
                    "Invalid value '{}' for property '{}' (expected {})",
                    shown(raw),
                    property,
                    expected
                )),
            }
        }
        self
    }
}

fn full_name(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}.{}", prefix, name),
        None => name.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct RegistrationKey {
    type_name: &'static str,
    prefix: Option<String>,
    type_id: TypeId,
}

impl RegistrationKey {
    fn of<T: Config>(prefix: Option<&str>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            prefix: prefix.map(str::to_string),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// A configuration type (and prefix) known to a [`ConfigurationFactory`]
#[derive(Clone)]
pub struct ConfigRegistration {
    key: RegistrationKey,
    build: fn(&ConfigurationFactory, Option<&str>) -> Result<(), ProvisionError>,
    inspect: fn(&ConfigurationFactory, Option<&str>) -> ConfigRecord,
}

impl ConfigRegistration {
    pub(crate) fn of<T: Config>(prefix: Option<String>) -> Self {
        Self {
            key: RegistrationKey::of::<T>(prefix.as_deref()),
            build: |factory, prefix| factory.build::<T>(prefix).map(|_| ()),
            inspect: |factory, prefix| factory.inspect::<T>(prefix),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.key.type_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.key.prefix.as_deref()
    }
}

impl std::fmt::Debug for ConfigRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRegistration")
            .field("type_name", &self.key.type_name)
            .field("prefix", &self.key.prefix)
            .finish()
    }
}

struct Bound<T> {
    instance: T,
    used: Vec<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Builds typed configuration objects from a resolved property mapping and
/// records which properties were read
pub struct ConfigurationFactory {
    properties: BTreeMap<String, String>,
    warnings: WarningsMonitor,
    used: Mutex<BTreeSet<String>>,
    registrations: Mutex<BTreeMap<RegistrationKey, ConfigRegistration>>,
    instances: Mutex<HashMap<RegistrationKey, Instance>>,
}

impl std::fmt::Debug for ConfigurationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationFactory")
            .field("properties_count", &self.properties.len())
            .field("registrations", &self.registrations())
            .finish()
    }
}

impl ConfigurationFactory {
    pub fn new(properties: BTreeMap<String, String>, warnings: WarningsMonitor) -> Self {
        Self {
            properties,
            warnings,
            used: Mutex::new(BTreeSet::new()),
            registrations: Mutex::new(BTreeMap::new()),
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn warnings_monitor(&self) -> &WarningsMonitor {
        &self.warnings
    }

    /// Register every configuration type bound by `modules`
    pub fn register_configuration_classes(&self, modules: &[Box<dyn Module>]) {
        for element in Binder::record(modules) {
            if let Element::Configuration { registration } = element {
                self.add_registration(registration);
            }
        }
    }

    pub fn register<T: Config>(&self, prefix: Option<&str>) {
        self.add_registration(ConfigRegistration::of::<T>(prefix.map(str::to_string)));
    }

    /// Registered configuration types, ordered by type name then prefix
    pub fn registrations(&self) -> Vec<ConfigRegistration> {
        lock(&self.registrations).values().cloned().collect()
    }

    /// Build every registered configuration and collect all problems
    pub fn validate_registered_configuration_provider(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        for registration in self.registrations() {
            match (registration.build)(self, registration.prefix()) {
                Ok(()) => {}
                Err(ProvisionError::Configuration {
                    type_name,
                    messages: problems,
                }) => messages.extend(
                    problems
                        .into_iter()
                        .map(|problem| Message::new(problem).with_source(type_name.clone())),
                ),
                Err(other) => messages
                    .push(Message::new(other.to_string()).with_source(registration.type_name())),
            }
        }
        messages
    }

    /// Build (or return the cached) instance of `T`. Every problem with the
    /// type's properties is reported in one error.
    pub fn build<T: Config>(&self, prefix: Option<&str>) -> Result<Arc<T>, ProvisionError> {
        let key = RegistrationKey::of::<T>(prefix);
        self.register::<T>(prefix);

        if let Some(instance) = lock(&self.instances).get(&key).cloned() {
            return instance
                .downcast_ref::<Arc<T>>()
                .cloned()
                .ok_or_else(|| ProvisionError::TypeMismatch {
                    key: key.type_name.to_string(),
                });
        }

        let bound = self.bind::<T>(prefix);
        lock(&self.used).extend(bound.used);
        for warning in &bound.warnings {
            self.warnings.on_warning(warning);
        }
        if !bound.errors.is_empty() {
            return Err(ProvisionError::Configuration {
                type_name: key.type_name.to_string(),
                messages: bound.errors,
            });
        }

        let instance = Arc::new(bound.instance);
        let erased: Instance = Arc::new(instance.clone());
        lock(&self.instances).entry(key).or_insert(erased);
        Ok(instance)
    }

    /// Every property name looked up while building configuration
    pub fn used_properties(&self) -> BTreeSet<String> {
        lock(&self.used).clone()
    }

    /// Introspection records for every registered configuration
    pub fn records(&self) -> Vec<ConfigRecord> {
        self.registrations()
            .iter()
            .map(|registration| (registration.inspect)(self, registration.prefix()))
            .collect()
    }

    fn add_registration(&self, registration: ConfigRegistration) {
        lock(&self.registrations)
            .entry(registration.key.clone())
            .or_insert(registration);
    }

    fn bind<T: Config>(&self, prefix: Option<&str>) -> Bound<T> {
        let mut instance = T::default();
        let mut properties = Properties::binding(&self.properties, prefix);
        instance.describe(&mut properties);
        let Properties {
            used,
            mut errors,
            warnings,
            ..
        } = properties;

        if errors.is_empty() {
            errors.extend(instance.validate().into_iter().map(|violation| {
                format!(
                    "Invalid configuration property {}: {} (for {})",
                    full_name(prefix, &violation.property),
                    violation.message,
                    std::any::type_name::<T>()
                )
            }));
        }

        Bound {
            instance,
            used,
            errors,
            warnings,
        }
    }

    fn inspect<T: Config>(&self, prefix: Option<&str>) -> ConfigRecord {
        let defaults = inspect_instance(&mut T::default(), prefix);
        let bound = self.bind::<T>(prefix);
        let current = if bound.errors.is_empty() {
            let mut instance = bound.instance;
            Some(inspect_instance(&mut instance, prefix))
        } else {
            None
        };

        let mut attributes: Vec<ConfigAttribute> = defaults
            .iter()
            .enumerate()
            .map(|(index, default)| {
                let current_value = current
                    .as_ref()
                    .and_then(|current| current.get(index))
                    .map(InspectedProperty::rendered)
                    .unwrap_or_else(|| UNAVAILABLE.to_string());
                ConfigAttribute::new(
                    default.name.clone(),
                    default.rendered(),
                    current_value,
                    default.description.clone(),
                )
            })
            .collect();
        attributes.sort_by(|left, right| left.property_name().cmp(right.property_name()));

        ConfigRecord::new(std::any::type_name::<T>(), prefix.map(str::to_string), attributes)
    }
}

fn inspect_instance<T: Config>(instance: &mut T, prefix: Option<&str>) -> Vec<InspectedProperty> {
    let mut properties = Properties::inspecting(prefix);
    instance.describe(&mut properties);
    properties.inspected
}
