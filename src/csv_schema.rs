//! Column descriptions for exchange CSV exports, generated by `#[derive(CsvSchema)]`

use csv::StringRecord;

/// A single CSV column expected by a record type
#[derive(Debug)]
pub struct CsvField {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub description: &'static str,
}

impl CsvField {
    fn matches(&self, header: &str) -> bool {
        self.name == header || self.aliases.contains(&header)
    }

    /// Quoted column name, followed by its description when it has one
    pub fn describe(&self) -> String {
        if self.description.is_empty() {
            format!("'{}'", self.name)
        } else {
            format!("'{}' ({})", self.name, self.description)
        }
    }
}

pub trait CsvSchema {
    fn csv_schema() -> &'static [CsvField];

    /// Required columns that are absent from the header row
    fn missing_columns(headers: &StringRecord) -> Vec<&'static CsvField> {
        Self::csv_schema()
            .iter()
            .filter(|field| field.required)
            .filter(|field| !headers.iter().any(|h| field.matches(clean_header(h))))
            .collect()
    }
}

/// Strips a UTF-8 byte order mark and surrounding whitespace from a header cell
pub fn clean_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}
