use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by user code (providers, managed services)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single problem recorded while wiring the object graph, tagged with the
/// module (or binding) it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    source: Option<String>,
    message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            source: None,
            message: message.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every error found while creating an injector, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationError {
    messages: Vec<Message>,
}

impl CreationError {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True when any message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.message.contains(needle))
    }
}

impl fmt::Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unable to create injector, see the following errors:")?;
        for (index, message) in self.messages.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}) {}", index + 1, message.message)?;
            if let Some(source) = &message.source {
                writeln!(f, "  at {}", source)?;
            }
        }
        writeln!(f)?;
        match self.messages.len() {
            1 => write!(f, "1 error"),
            n => write!(f, "{} errors", n),
        }
    }
}

impl std::error::Error for CreationError {}

/// Failure to produce an instance from the container
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("No implementation for {key} was bound")]
    NotBound { key: String },

    #[error("Explicit bindings are required and {key} is not explicitly bound")]
    ExplicitBindingRequired { key: String },

    #[error("Found a circular dependency involving {key}{}, path: {path}", proxies_note(.proxies_disabled))]
    CircularDependency {
        key: String,
        path: String,
        proxies_disabled: bool,
    },

    #[error("Binding for {key} produced an instance of an unexpected type")]
    TypeMismatch { key: String },

    #[error("Invalid configuration for {type_name}: {}", join_messages(.messages))]
    Configuration {
        type_name: String,
        messages: Vec<String>,
    },

    #[error("Error in custom provider for {key}: {source}")]
    Provider { key: String, source: BoxError },

    #[error("{message}")]
    Other { message: String },
}

impl ProvisionError {
    pub fn provider(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Provider {
            key: key.into(),
            source: source.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

fn proxies_note(disabled: &bool) -> &'static str {
    if *disabled {
        ", and circular proxies are disabled"
    } else {
        ""
    }
}

fn join_messages(messages: &[String]) -> String {
    messages.join("; ")
}

fn join_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(service, error)| format!("{}: {}", service, error))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while loading configuration sources
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in configuration file {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported value at '{key}' in configuration file {}", .path.display())]
    UnsupportedValue { path: PathBuf, key: String },
}

impl ConfigError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            ConfigError::Io { path, .. }
            | ConfigError::Yaml { path, .. }
            | ConfigError::UnsupportedValue { path, .. } => path,
        }
    }
}

/// Errors raised by the lifecycle manager
#[derive(Debug, Error)]
pub enum LifeCycleError {
    #[error("Lifecycle manager is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Service '{service}' failed to start: {source}")]
    StartFailed { service: String, source: BoxError },

    #[error("{} service(s) failed to stop: {}", .failures.len(), join_failures(.failures))]
    StopFailed { failures: Vec<(String, String)> },
}
