use crate::config::factory::ConfigurationFactory;

/// One property of a registered configuration, as shown in reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAttribute {
    property_name: String,
    default_value: String,
    current_value: String,
    description: String,
}

impl ConfigAttribute {
    pub fn new(
        property_name: impl Into<String>,
        default_value: impl Into<String>,
        current_value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            default_value: default_value.into(),
            current_value: current_value.into(),
            description: description.into(),
        }
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn current_value(&self) -> &str {
        &self.current_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A registered configuration type and its attributes, sorted by property name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    type_name: String,
    prefix: Option<String>,
    attributes: Vec<ConfigAttribute>,
}

impl ConfigRecord {
    pub fn new(type_name: impl Into<String>, prefix: Option<String>, attributes: Vec<ConfigAttribute>) -> Self {
        Self {
            type_name: type_name.into(),
            prefix,
            attributes,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn attributes(&self) -> &[ConfigAttribute] {
        &self.attributes
    }
}

/// Read-only view over the configurations known to a factory
#[derive(Debug)]
pub struct ConfigurationInspector<'a> {
    factory: &'a ConfigurationFactory,
}

impl<'a> ConfigurationInspector<'a> {
    pub fn new(factory: &'a ConfigurationFactory) -> Self {
        Self { factory }
    }

    /// Records ordered by type name, then prefix
    pub fn records(&self) -> Vec<ConfigRecord> {
        self.factory.records()
    }

    /// Every attribute of every record, in record order
    pub fn attributes(&self) -> Vec<ConfigAttribute> {
        self.records()
            .into_iter()
            .flat_map(|record| record.attributes)
            .collect()
    }
}
