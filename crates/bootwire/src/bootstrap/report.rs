use std::collections::BTreeSet;

use bootwire_core::config::{ConfigurationFactory, ConfigurationInspector};

const COLUMN_GAP: usize = 2;

/// Formats rows into left-aligned columns sized to their widest cell
#[derive(Debug, Clone)]
pub struct ColumnPrinter {
    rows: Vec<Vec<String>>,
    columns: usize,
}

impl ColumnPrinter {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let columns = headers.len();
        Self {
            rows: vec![headers],
            columns,
        }
    }

    /// Append a row; missing cells are blank and extra cells are dropped
    pub fn add_values<I, S>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = values.into_iter().take(self.columns).map(Into::into).collect();
        row.resize(self.columns, String::new());
        self.rows.push(row);
        self
    }

    /// Header line followed by one line per row
    pub fn lines(&self) -> Vec<String> {
        let widths: Vec<usize> = (0..self.columns)
            .map(|column| {
                self.rows
                    .iter()
                    .map(|row| row[column].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        self.rows
            .iter()
            .map(|row| {
                let mut line = String::new();
                for (column, cell) in row.iter().enumerate() {
                    if column + 1 == self.columns {
                        line.push_str(cell);
                    } else {
                        line.push_str(&format!("{:width$}", cell, width = widths[column] + COLUMN_GAP));
                    }
                }
                line.trim_end().to_string()
            })
            .collect()
    }
}

/// The configuration table: one row per attribute of every registered
/// configuration type
pub fn configuration_report(factory: &ConfigurationFactory) -> Vec<String> {
    let mut printer = ColumnPrinter::new(["PROPERTY", "DEFAULT", "RUNTIME", "DESCRIPTION"]);
    for attribute in ConfigurationInspector::new(factory).attributes() {
        printer.add_values([
            attribute.property_name(),
            attribute.default_value(),
            attribute.current_value(),
            attribute.description(),
        ]);
    }
    printer.lines()
}

/// Log the configuration table, then every unused property
pub fn log_configuration(factory: &ConfigurationFactory, unused: &BTreeSet<String>) {
    for line in configuration_report(factory) {
        tracing::info!("{}", line);
    }

    if !unused.is_empty() {
        tracing::warn!("UNUSED PROPERTIES");
        for property in unused {
            tracing::warn!("{}", property);
        }
        tracing::warn!("");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bootwire_core::config::{Config, Properties, WarningsMonitor};
    use std::collections::BTreeMap;

    #[derive(Debug, Default)]
    struct HttpServerConfig {
        port: u16,
        host: Option<String>,
    }

    impl Config for HttpServerConfig {
        fn describe(&mut self, properties: &mut Properties<'_>) {
            properties
                .property("http.port", "Listen port", &mut self.port)
                .property("http.host", "Bind address", &mut self.host);
        }
    }

    #[test]
    fn test_columns_sized_to_widest_cell() {
        let mut printer = ColumnPrinter::new(["A", "B", "C"]);
        printer.add_values(["long-value", "x", "last column"]);
        printer.add_values(["y", "wider", "z"]);

        assert_eq!(
            printer.lines(),
            vec![
                "A           B      C".to_string(),
                "long-value  x      last column".to_string(),
                "y           wider  z".to_string(),
            ]
        );
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut printer = ColumnPrinter::new(["KEY", "VALUE"]);
        printer.add_values(["only-key"]);
        assert_eq!(printer.lines()[1], "only-key");
    }

    #[test]
    fn test_configuration_report() {
        let properties: BTreeMap<String, String> =
            [("http.port".to_string(), "8080".to_string())].into_iter().collect();
        let factory = ConfigurationFactory::new(properties, WarningsMonitor::default());
        factory.register::<HttpServerConfig>(None);

        let lines = configuration_report(&factory);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("PROPERTY"));
        assert!(lines[0].ends_with("DESCRIPTION"));
        assert!(lines[1].starts_with("http.host"));
        assert!(lines[1].contains("----"));
        assert!(lines[2].starts_with("http.port"));
        assert!(lines[2].contains("8080"));
        assert!(lines[2].ends_with("Listen port"));
    }
}
