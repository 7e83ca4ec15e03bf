//! Output formatting for CLI

use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Pretty JSON, or `{}` if `data` cannot be serialized
pub fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// Format rows based on selected format. Text and table share the table layout.
pub fn format_rows<T: Serialize + Tabled>(rows: &[T], format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => to_json(&rows),
        OutputFormat::Table | OutputFormat::Text => Table::new(rows).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Tabled)]
    struct Row {
        id: i32,
        name: &'static str,
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_format_rows() {
        let rows = [Row { id: 1, name: "Playing" }];

        let json: serde_json::Value = serde_json::from_str(&format_rows(&rows, "json")).unwrap();
        assert_eq!(json[0]["name"], "Playing");

        let table = format_rows(&rows, "table");
        assert!(table.contains("Playing"));
        assert!(table.contains("name"));
    }
}
