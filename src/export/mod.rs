//! Export sinks: flattened records to CSV, configuration objects to JSON.

pub mod csv;
pub mod json;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

pub use self::csv::write_csv;
pub use self::json::{write_json, DEFAULT_JSON_DEPTH};

/// Separator for multi-valued attributes in a single cell.
pub const LIST_DELIMITER: &str = ";";

/// An ordered field-name → scalar mapping, one row of tabular output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord {
    fields: Vec<(String, String)>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value of the same name in place.
    pub fn field(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    /// Optional text; missing values become empty cells.
    pub fn opt(self, name: &str, value: Option<&str>) -> Self {
        self.field(name, value.unwrap_or_default())
    }

    /// Multi-valued attribute joined by [`LIST_DELIMITER`].
    pub fn list(self, name: &str, values: &[String]) -> Self {
        self.field(name, values.join(LIST_DELIMITER))
    }

    /// Boolean rendered as `True` / `False`, empty when unknown.
    pub fn flag(self, name: &str, value: Option<bool>) -> Self {
        let text = match value {
            Some(true) => "True",
            Some(false) => "False",
            None => "",
        };
        self.field(name, text)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

/// Types that can be written as one CSV row.
pub trait Flatten {
    /// Header written even when there are no rows.
    const COLUMNS: &'static [&'static str];

    fn flatten(&self) -> FlatRecord;
}

/// `<prefix>_<tenant>_<yyyyMMdd-HHmm>.<extension>` inside `dir`.
///
/// Characters that are awkward in file names are replaced in the tenant part.
pub fn output_path(
    dir: &Path,
    prefix: &str,
    tenant: &str,
    timestamp: DateTime<Local>,
    extension: &str,
) -> PathBuf {
    let tenant: String = tenant
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    dir.join(format!(
        "{}_{}_{}.{}",
        prefix,
        tenant,
        timestamp.format("%Y%m%d-%H%M"),
        extension
    ))
}
