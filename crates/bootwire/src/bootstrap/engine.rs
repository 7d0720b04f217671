//! One-shot application bootstrap: resolves configuration, wires the object
//! graph and starts managed services.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bootwire_core::config::{
    load_properties_from, resolve, ConfigurationFactory, ConfigurationModule, Environment, ProcessSettings,
    ValidationErrorModule, WarningsMonitor,
};
use bootwire_core::container::{boxed, Injector, Module, Stage};
use bootwire_core::errors::{Message, ProvisionError};
use bootwire_core::lifecycle::{LifeCycleManager, LifeCycleModule};

use crate::bootstrap::error::{BootstrapError, BootstrapResult};
use crate::bootstrap::modules::{BootstrapModule, StrictConfigModule};
use crate::bootstrap::report;
use crate::logging::{install_panic_hook, Logging, LoggingConfiguration, LoggingError};

pub const QUIET_SETTING: &str = "bootstrap.quiet";
pub const STRICT_CONFIG_SETTING: &str = "bootstrap.strict-config";
pub const REQUIRE_EXPLICIT_BINDINGS_SETTING: &str = "bootstrap.require-explicit-bindings";
pub const CONFIG_FILE_SETTING: &str = "config";

/// Where a [`Bootstrap`] is in its single use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapState {
    #[default]
    Unstarted,
    Initialized,
    Failed,
}

/// Builds an [`Injector`] for a set of modules, exactly once
///
/// ```no_run
/// use bootwire::{Binder, Bootstrap, NamedModule, boxed};
///
/// let mut bootstrap = Bootstrap::new(vec![boxed(NamedModule::new("app", |binder: &mut Binder| {
///     binder.bind_instance("hello".to_string());
/// }))]);
/// let injector = bootstrap.initialize()?;
/// # Ok::<(), bootwire::BootstrapError>(())
/// ```
pub struct Bootstrap {
    /// Caller modules, installed after the system modules
    modules: Vec<Box<dyn Module>>,
    /// Process settings: `bootstrap.*` flags, `config` file path and the override layer
    settings: ProcessSettings,
    /// Environment variables used for `${ENV:NAME}` substitution
    environment: Environment,
    /// Explicit required properties; when unset, the `config` file is read instead
    required_properties: Option<BTreeMap<String, String>>,
    /// Lowest-precedence defaults, never reported as unused
    optional_properties: BTreeMap<String, String>,
    /// Install the global logging subscriber and panic hook
    initialize_logging: bool,
    /// Skip the configuration report
    quiet: bool,
    /// Fail on unused properties and undefined environment variables
    strict_config: bool,
    /// Forbid just-in-time bindings in the created injector
    require_explicit_bindings: bool,
    /// Single-use guard
    state: BootstrapState,
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("modules", &self.modules.iter().map(|module| module.name()).collect::<Vec<_>>())
            .field("required_properties", &self.required_properties)
            .field("optional_properties", &self.optional_properties)
            .field("initialize_logging", &self.initialize_logging)
            .field("quiet", &self.quiet)
            .field("strict_config", &self.strict_config)
            .field("require_explicit_bindings", &self.require_explicit_bindings)
            .field("state", &self.state)
            .finish()
    }
}

impl Bootstrap {
    /// Bootstrap `modules` using the settings and environment of the running process
    pub fn new(modules: Vec<Box<dyn Module>>) -> Self {
        Self::with_process(modules, ProcessSettings::from_process(), Environment::from_process())
    }

    /// Bootstrap `modules` with explicit process settings and environment
    pub fn with_process(modules: Vec<Box<dyn Module>>, settings: ProcessSettings, environment: Environment) -> Self {
        let quiet = settings.get_bool(QUIET_SETTING, false);
        let strict_config = settings.get_bool(STRICT_CONFIG_SETTING, true);
        let require_explicit_bindings = settings.get_bool(REQUIRE_EXPLICIT_BINDINGS_SETTING, true);

        Self {
            modules,
            settings,
            environment,
            required_properties: None,
            optional_properties: BTreeMap::new(),
            initialize_logging: true,
            quiet,
            strict_config,
            require_explicit_bindings,
            state: BootstrapState::Unstarted,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    /// Use `key=value` as a required property. Setting any required
    /// property replaces the `config` file.
    pub fn set_required_configuration_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.required_properties
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn set_required_configuration_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.required_properties
            .get_or_insert_with(BTreeMap::new)
            .extend(properties);
        self
    }

    /// Optional properties are defaults: never reported as unused
    pub fn set_optional_configuration_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.optional_properties.insert(key.into(), value.into());
        self
    }

    pub fn set_optional_configuration_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.optional_properties.extend(properties);
        self
    }

    pub fn do_not_initialize_logging(mut self) -> Self {
        self.initialize_logging = false;
        self
    }

    /// Skip the configuration report
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Report unused properties and unresolved environment variables as
    /// warnings instead of failing
    pub fn no_strict_config(mut self) -> Self {
        self.strict_config = false;
        self
    }

    pub fn require_explicit_bindings(mut self, require_explicit_bindings: bool) -> Self {
        self.require_explicit_bindings = require_explicit_bindings;
        self
    }

    /// Resolve configuration, create the injector and start managed services.
    ///
    /// May be called once; any later call fails with
    /// [`BootstrapError::AlreadyInitialized`], whatever the first outcome.
    pub fn initialize(&mut self) -> BootstrapResult<Injector> {
        if self.state != BootstrapState::Unstarted {
            return Err(BootstrapError::AlreadyInitialized);
        }
        self.state = BootstrapState::Failed;

        let injector = self.run()?;
        self.state = BootstrapState::Initialized;
        Ok(injector)
    }

    fn run(&mut self) -> BootstrapResult<Injector> {
        if self.modules.is_empty() {
            return Err(BootstrapError::NoModules);
        }
        let user_modules = std::mem::take(&mut self.modules);

        let logging = if self.initialize_logging {
            install_panic_hook();
            match Logging::initialize() {
                Ok(logging) => Some(logging),
                // Another subscriber owns the process; log through it unconfigured
                Err(LoggingError::AlreadyInstalled { message }) => {
                    tracing::warn!("Bootstrap: Keeping the installed logging subscriber ({})", message);
                    None
                }
                Err(error) => return Err(error.into()),
            }
        } else {
            None
        };

        let required = self.required_configuration()?;
        let resolved = resolve(
            &self.optional_properties,
            &required,
            self.settings.properties(),
            &self.environment,
        );
        let (properties, environment_errors) = resolved.into_parts();

        let factory = Arc::new(ConfigurationFactory::new(properties, WarningsMonitor::logging()));
        factory.register_configuration_classes(&user_modules);
        let mut messages = factory.validate_registered_configuration_provider();

        if let Some(logging) = logging {
            tracing::info!("Bootstrap: Initializing logging");
            match factory.build::<LoggingConfiguration>(None) {
                Ok(configuration) => logging.configure(&configuration)?,
                Err(ProvisionError::Configuration { type_name, messages: problems }) => {
                    for problem in problems {
                        push_unique(&mut messages, Message::new(problem).with_source(type_name.clone()));
                    }
                }
                Err(other) => push_unique(
                    &mut messages,
                    Message::new(other.to_string()).with_source("LoggingConfiguration"),
                ),
            }
        }

        let used = factory.used_properties();
        let unused: BTreeSet<String> = required
            .keys()
            .filter(|key| !used.contains(*key))
            .cloned()
            .collect();

        if !self.quiet {
            report::log_configuration(&factory, &unused);
        }
        if !self.strict_config {
            for error in &environment_errors {
                tracing::warn!("{}", error);
            }
        }

        let mut modules: Vec<Box<dyn Module>> = vec![
            boxed(LifeCycleModule::new()),
            boxed(ConfigurationModule::new(factory.clone())),
        ];
        if !messages.is_empty() {
            modules.push(boxed(ValidationErrorModule::new(messages)));
        }
        modules.push(boxed(BootstrapModule::new(self.require_explicit_bindings)));
        if self.strict_config {
            modules.push(boxed(StrictConfigModule::new(unused, environment_errors)));
        }
        modules.extend(user_modules);

        tracing::info!("Bootstrap: Creating injector with {} module(s)", modules.len());
        let injector = Injector::create(Stage::Production, &modules)?;

        let manager = injector.get::<LifeCycleManager>()?;
        if manager.size() > 0 {
            tracing::info!("Bootstrap: Starting {} managed service(s)", manager.size());
            manager.start()?;
        }

        Ok(injector)
    }

    /// Explicit required properties, else the `config` file, else nothing
    fn required_configuration(&self) -> BootstrapResult<BTreeMap<String, String>> {
        if let Some(required) = &self.required_properties {
            return Ok(required.clone());
        }

        match self.settings.get(CONFIG_FILE_SETTING) {
            Some(path) => {
                tracing::info!("Bootstrap: Loading configuration from {}", path);
                Ok(load_properties_from(path)?)
            }
            None => Ok(BTreeMap::new()),
        }
    }
}

fn push_unique(messages: &mut Vec<Message>, message: Message) {
    if !messages.contains(&message) {
        messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootwire_core::container::{Binder, NamedModule};

    fn app_module() -> Box<dyn Module> {
        boxed(NamedModule::new("app", |binder: &mut Binder| {
            binder.bind_instance(42u32);
        }))
    }

    fn bootstrap(modules: Vec<Box<dyn Module>>, settings: ProcessSettings) -> Bootstrap {
        Bootstrap::with_process(modules, settings, Environment::default()).do_not_initialize_logging()
    }

    #[test]
    fn test_settings_read_at_construction() {
        let bootstrap = bootstrap(
            vec![app_module()],
            ProcessSettings::new()
                .with(QUIET_SETTING, "TRUE")
                .with(STRICT_CONFIG_SETTING, "false")
                .with(REQUIRE_EXPLICIT_BINDINGS_SETTING, "no"),
        );

        assert!(bootstrap.quiet);
        assert!(!bootstrap.strict_config);
        assert!(!bootstrap.require_explicit_bindings);
        assert_eq!(bootstrap.state(), BootstrapState::Unstarted);
    }

    #[test]
    fn test_setting_defaults() {
        let bootstrap = bootstrap(vec![app_module()], ProcessSettings::new());
        assert!(!bootstrap.quiet);
        assert!(bootstrap.strict_config);
        assert!(bootstrap.require_explicit_bindings);
    }

    #[test]
    fn test_state_transitions() {
        let mut bootstrap = bootstrap(vec![app_module()], ProcessSettings::new());
        let injector = bootstrap.initialize().unwrap();
        assert_eq!(*injector.get::<u32>().unwrap(), 42);
        assert_eq!(bootstrap.state(), BootstrapState::Initialized);

        let error = bootstrap.initialize().unwrap_err();
        assert!(matches!(error, BootstrapError::AlreadyInitialized));
        assert_eq!(error.to_string(), "Already initialized");
        assert_eq!(bootstrap.state(), BootstrapState::Initialized);
    }

    #[test]
    fn test_failure_leaves_failed_state() {
        let mut bootstrap =
            bootstrap(vec![app_module()], ProcessSettings::new()).set_required_configuration_property("unknown", "1");
        assert!(matches!(bootstrap.initialize(), Err(BootstrapError::Creation(_))));
        assert_eq!(bootstrap.state(), BootstrapState::Failed);
        assert!(matches!(bootstrap.initialize(), Err(BootstrapError::AlreadyInitialized)));
    }

    #[test]
    fn test_no_modules() {
        let mut bootstrap = bootstrap(Vec::new(), ProcessSettings::new());
        assert!(matches!(bootstrap.initialize(), Err(BootstrapError::NoModules)));
        assert_eq!(bootstrap.state(), BootstrapState::Failed);
    }

    #[test]
    fn test_explicit_required_properties_replace_config_file() {
        let bootstrap = bootstrap(
            vec![app_module()],
            ProcessSettings::new().with(CONFIG_FILE_SETTING, "/does/not/exist.properties"),
        )
        .set_required_configuration_property("a", "1");

        let required = bootstrap.required_configuration().unwrap();
        assert_eq!(required.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_push_unique() {
        let mut messages = vec![Message::new("a").with_source("A")];
        push_unique(&mut messages, Message::new("a").with_source("A"));
        push_unique(&mut messages, Message::new("a").with_source("B"));
        assert_eq!(messages.len(), 2);
    }
}
