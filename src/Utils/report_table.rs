/*
Pretty printing of key/value pairs (fit reports, batch summaries) as a table.
*/
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, PartialEq, Tabled)]
pub struct ReportRow {
    key: &'static str,
    value: String,
}

impl ReportRow {
    pub fn new(key: &'static str, value: String) -> Self {
        ReportRow { key, value }
    }
}

/// Renders `(key, value)` rows with rounded borders.
pub fn table_of(entries: Vec<(&'static str, String)>) -> String {
    let rows: Vec<ReportRow> = entries
        .into_iter()
        .map(|(key, value)| ReportRow::new(key, value))
        .collect();
    let mut table = Table::new(&rows);
    table.with(Style::modern_rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_of() {
        let table = table_of(vec![("SSR", "0.5".to_string()), ("Equation", "line".to_string())]);
        assert!(table.contains("key"));
        assert!(table.contains("SSR"));
        assert!(table.contains("line"));
        assert!(table.lines().count() >= 4);
    }
}
