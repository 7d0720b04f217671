//! Layered property merging and `${ENV:NAME}` substitution.
//!
//! Layers merge in precedence order (optional defaults, then required
//! properties, then process overrides; later wins). Substitution then runs
//! over the merged mapping: a value whose placeholders all name defined
//! environment variables is rewritten, and a value referencing any
//! undefined variable is dropped and reported.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::loader::Environment;

static ENV_PATTERN: OnceLock<Regex> = OnceLock::new();

fn env_pattern() -> &'static Regex {
    ENV_PATTERN.get_or_init(|| {
        Regex::new(r"\$\{ENV:([a-zA-Z][a-zA-Z0-9_]*)\}")
            .expect("environment placeholder pattern is valid")
    })
}

/// A property whose value references environment variables that are not set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndefinedVariablesError {
    property: String,
    variables: Vec<String>,
}

impl UndefinedVariablesError {
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Undefined names in first-seen order, without duplicates
    pub fn variables(&self) -> &[String] {
        &self.variables
    }
}

impl fmt::Display for UndefinedVariablesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration property `{}` references undefined environment variable(s): [{}]",
            self.property,
            self.variables.join(", ")
        )
    }
}

impl std::error::Error for UndefinedVariablesError {}

/// The outcome of resolution: an immutable key-sorted mapping plus one
/// error per dropped property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProperties {
    properties: BTreeMap<String, String>,
    errors: Vec<UndefinedVariablesError>,
}

impl ResolvedProperties {
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Errors sorted by property key
    pub fn errors(&self) -> &[UndefinedVariablesError] {
        &self.errors
    }

    pub fn into_parts(self) -> (BTreeMap<String, String>, Vec<UndefinedVariablesError>) {
        (self.properties, self.errors)
    }
}

/// Merge the three source layers; later layers override earlier ones
pub fn merge_layers(
    optional: &BTreeMap<String, String>,
    required: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    optional
        .iter()
        .chain(required)
        .chain(overrides)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Replace every `${ENV:NAME}` placeholder with the variable's value
pub fn replace_with_environment_variables(
    properties: &BTreeMap<String, String>,
    environment: &Environment,
) -> ResolvedProperties {
    let mut resolved = ResolvedProperties::default();

    for (key, value) in properties {
        match substitute(value, environment) {
            Ok(replaced) => {
                resolved.properties.insert(key.clone(), replaced);
            }
            Err(variables) => resolved.errors.push(UndefinedVariablesError {
                property: key.clone(),
                variables,
            }),
        }
    }

    resolved
}

/// Merge the layers, then substitute environment variables
pub fn resolve(
    optional: &BTreeMap<String, String>,
    required: &BTreeMap<String, String>,
    overrides: &BTreeMap<String, String>,
    environment: &Environment,
) -> ResolvedProperties {
    replace_with_environment_variables(&merge_layers(optional, required, overrides), environment)
}

fn substitute(value: &str, environment: &Environment) -> Result<String, Vec<String>> {
    let mut result = String::with_capacity(value.len());
    let mut undefined: Vec<String> = Vec::new();
    let mut last = 0;

    for captures in env_pattern().captures_iter(value) {
        let (Some(placeholder), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        result.push_str(&value[last..placeholder.start()]);
        match environment.get(name.as_str()) {
            Some(replacement) => result.push_str(replacement),
            None => {
                if !undefined.iter().any(|seen| seen == name.as_str()) {
                    undefined.push(name.as_str().to_string());
                }
            }
        }
        last = placeholder.end();
    }
    result.push_str(&value[last..]);

    if undefined.is_empty() {
        Ok(result)
    } else {
        Err(undefined)
    }
}
