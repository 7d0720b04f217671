use bootwire_core::config::{Config, ConfigValue, Properties, Violation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Output format of the console sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ConfigValue for LogFormat {
    fn parse_value(value: &str) -> Result<Self, String> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err("text or json".to_string()),
        }
    }

    fn render_value(&self) -> Option<String> {
        Some(
            match self {
                LogFormat::Text => "text",
                LogFormat::Json => "json",
            }
            .to_string(),
        )
    }
}

/// Logging settings read from the `log.*` properties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfiguration {
    /// Default level for every target (e.g. "info", "debug", "warn")
    pub level: String,
    /// Additional per-target directives (supports filters like "bootwire=debug,hyper=warn")
    pub filter: Option<String>,
    pub format: LogFormat,
    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfiguration {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filter: None,
            format: LogFormat::Text,
            include_location: false,
        }
    }
}

impl LoggingConfiguration {
    /// The `EnvFilter` directive string for this configuration
    pub fn directives(&self) -> String {
        match self.filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => format!("{},{}", self.level, filter),
            _ => self.level.clone(),
        }
    }
}

impl Config for LoggingConfiguration {
    fn describe(&mut self, properties: &mut Properties<'_>) {
        properties
            .property("log.level", "Default log level", &mut self.level)
            .property("log.filter", "Per-target log directives", &mut self.filter)
            .property("log.format", "Console output format (text or json)", &mut self.format)
            .property(
                "log.include-location",
                "Include source file and line in log lines",
                &mut self.include_location,
            );
    }

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.level.parse::<LevelFilter>().is_err() {
            violations.push(Violation::new(
                "log.level",
                format!("'{}' is not a log level", self.level),
            ));
        }
        if let Some(filter) = &self.filter {
            if let Err(error) = EnvFilter::try_new(filter) {
                violations.push(Violation::new("log.filter", error.to_string()));
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootwire_core::config::{ConfigurationFactory, WarningsMonitor};
    use std::collections::BTreeMap;

    fn factory(entries: &[(&str, &str)]) -> ConfigurationFactory {
        let properties: BTreeMap<String, String> = entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ConfigurationFactory::new(properties, WarningsMonitor::default())
    }

    #[test]
    fn test_defaults() {
        let config = factory(&[]).build::<LoggingConfiguration>(None).unwrap();
        assert_eq!(*config, LoggingConfiguration::default());
        assert_eq!(config.directives(), "info");
    }

    #[test]
    fn test_binds_log_properties() {
        let config = factory(&[
            ("log.level", "debug"),
            ("log.filter", "hyper=warn"),
            ("log.format", "JSON"),
            ("log.include-location", "true"),
        ])
        .build::<LoggingConfiguration>(None)
        .unwrap();

        assert_eq!(config.format, LogFormat::Json);
        assert!(config.include_location);
        assert_eq!(config.directives(), "debug,hyper=warn");
    }

    #[test]
    fn test_rejects_unknown_level() {
        let result = factory(&[("log.level", "chatty")]).build::<LoggingConfiguration>(None);
        let error = result.unwrap_err().to_string();
        assert!(error.contains("Invalid configuration property log.level: 'chatty' is not a log level"));
    }
}
