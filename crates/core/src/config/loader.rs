use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;

use serde_yaml::Value;

use crate::errors::ConfigError;

/// Load a configuration file. `.yaml` / `.yml` files are flattened into
/// dotted keys; anything else is read as a properties file.
pub fn load_properties_from(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|extension| extension.to_str()) {
        Some("yaml") | Some("yml") => parse_yaml(path, &content),
        _ => Ok(parse_properties(&content)),
    }
}

/// Parse `key=value` / `key: value` / `key value` lines. `#` and `!` start
/// comments, a trailing backslash continues the line, and the last
/// assignment of a key wins.
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        properties.insert(unescape(key), unescape(value));
    }

    properties
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..index], line[index + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[index..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..index], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => result.push('\t'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('f') => result.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => result.push(decoded),
                    None => {
                        result.push_str("\\u");
                        result.push_str(&hex);
                    }
                }
            }
            Some(other) => result.push(other),
            None => {}
        }
    }
    result
}

fn parse_yaml(path: &Path, content: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let document: Value = serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let mut properties = BTreeMap::new();
    match document {
        Value::Null => {}
        Value::Mapping(_) => flatten(path, "", &document, &mut properties)?,
        _ => {
            return Err(ConfigError::UnsupportedValue {
                path: path.to_path_buf(),
                key: String::new(),
            })
        }
    }
    Ok(properties)
}

fn flatten(
    path: &Path,
    prefix: &str,
    value: &Value,
    properties: &mut BTreeMap<String, String>,
) -> Result<(), ConfigError> {
    let unsupported = || ConfigError::UnsupportedValue {
        path: path.to_path_buf(),
        key: prefix.to_string(),
    };

    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let key = scalar(key).ok_or_else(unsupported)?;
                let name = if prefix.is_empty() {
                    key
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(path, &name, child, properties)?;
            }
        }
        Value::Sequence(items) => {
            let values = items
                .iter()
                .map(scalar)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(unsupported)?;
            properties.insert(prefix.to_string(), values.join(","));
        }
        Value::Tagged(tagged) => flatten(path, prefix, &tagged.value, properties)?,
        other => {
            let rendered = scalar(other).ok_or_else(unsupported)?;
            properties.insert(prefix.to_string(), rendered);
        }
    }
    Ok(())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

/// Process-level settings, the highest-precedence configuration layer.
/// Captured once from `-Dkey=value` command line arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSettings {
    properties: BTreeMap<String, String>,
}

impl ProcessSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `-Dkey=value` argument; `-Dkey` alone sets an empty value
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let properties = args
            .into_iter()
            .filter_map(|arg| {
                let definition = arg.as_ref().strip_prefix("-D")?;
                let (key, value) = definition.split_once('=').unwrap_or((definition, ""));
                (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect();
        Self { properties }
    }

    /// Arguments of the running process; arguments that are not valid
    /// UTF-8 are skipped
    pub fn from_process() -> Self {
        Self::from_args(
            std::env::args_os()
                .skip(1)
                .filter_map(|arg| arg.into_string().ok()),
        )
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// `true` (any case) is true, any other value is false, absent is `default`
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(default)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Snapshot of environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    variables: BTreeMap<String, String>,
}

impl Environment {
    /// Variables of the running process; a variable whose name or value is
    /// not valid UTF-8 is skipped
    pub fn from_process() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let variables = vars
            .into_iter()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self { variables }
    }

    pub fn from_map(variables: BTreeMap<String, String>) -> Self {
        Self { variables }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_properties_formats() {
        let content = "\
# comment
! another comment

server.port=8080
server.host : localhost
name   spaced value
empty=
multi=first, \\
      second
escaped\\=key=tab\\there
unicode=caf\\u00e9
server.port=9090
";
        let properties = parse_properties(content);
        assert_eq!(properties.get("server.port").map(String::as_str), Some("9090"));
        assert_eq!(properties.get("server.host").map(String::as_str), Some("localhost"));
        assert_eq!(properties.get("name").map(String::as_str), Some("spaced value"));
        assert_eq!(properties.get("empty").map(String::as_str), Some(""));
        assert_eq!(properties.get("multi").map(String::as_str), Some("first, second"));
        assert_eq!(properties.get("escaped=key").map(String::as_str), Some("tab\there"));
        assert_eq!(properties.get("unicode").map(String::as_str), Some("café"));
        assert_eq!(properties.len(), 7);
    }

    #[test]
    fn test_load_properties_file() {
        let mut file = tempfile::Builder::new().suffix(".properties").tempfile().unwrap();
        writeln!(file, "db.url=postgres://localhost/app").unwrap();
        writeln!(file, "db.pool=5").unwrap();

        let properties = load_properties_from(file.path()).unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties["db.pool"], "5");
    }

    #[test]
    fn test_load_yaml_file_flattens_keys() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "server:\n  port: 8080\n  tls: false\nhosts:\n  - a\n  - b\nname: app\n"
        )
        .unwrap();

        let properties = load_properties_from(file.path()).unwrap();
        assert_eq!(properties["server.port"], "8080");
        assert_eq!(properties["server.tls"], "false");
        assert_eq!(properties["hosts"], "a,b");
        assert_eq!(properties["name"], "app");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_properties_from("/definitely/not/here.properties");
        if let Err(ConfigError::Io { path, .. }) = result {
            assert_eq!(path, Path::new("/definitely/not/here.properties"));
        } else {
            panic!("Expected Io error");
        }
    }

    #[test]
    fn test_yaml_nested_sequence_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        write!(file, "servers:\n  - host: a\n").unwrap();
        assert!(matches!(
            load_properties_from(file.path()),
            Err(ConfigError::UnsupportedValue { ref key, .. }) if key == "servers"
        ));
    }

    #[test]
    fn test_process_settings_from_args() {
        let settings = ProcessSettings::from_args([
            "--verbose",
            "-Dbootstrap.quiet=TRUE",
            "-Dconfig=etc/app.properties",
            "-Dflag",
            "-D",
            "-Dexpr=a=b",
        ]);

        assert_eq!(settings.get("config"), Some("etc/app.properties"));
        assert_eq!(settings.get("flag"), Some(""));
        assert_eq!(settings.get("expr"), Some("a=b"));
        assert_eq!(settings.properties().len(), 4);
        assert!(settings.get_bool("bootstrap.quiet", false));
        assert!(!settings.get_bool("flag", true));
        assert!(settings.get_bool("bootstrap.strict-config", true));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let environment = Environment::from_os_vars([
            (OsString::from("PORT"), OsString::from("8080")),
            (OsString::from("BROKEN"), OsString::from_vec(vec![0x66, 0xff, 0x6f])),
            (OsString::from_vec(vec![0xfe, 0x41]), OsString::from("value")),
        ]);

        assert_eq!(environment.get("PORT"), Some("8080"));
        assert_eq!(environment.get("BROKEN"), None);
        assert_eq!(environment.variables().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    #[serial_test::serial]
    fn test_from_process_tolerates_non_utf8_variable() {
        use std::os::unix::ffi::OsStringExt;

        std::env::set_var("BOOTWIRE_NON_UTF8", OsString::from_vec(vec![0x66, 0xff, 0x6f]));
        std::env::set_var("BOOTWIRE_PLAIN", "plain");
        let environment = Environment::from_process();
        std::env::remove_var("BOOTWIRE_NON_UTF8");
        std::env::remove_var("BOOTWIRE_PLAIN");

        assert_eq!(environment.get("BOOTWIRE_NON_UTF8"), None);
        assert_eq!(environment.get("BOOTWIRE_PLAIN"), Some("plain"));
    }
}
