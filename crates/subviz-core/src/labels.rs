//! Address labels for graph nodes.
//!
//! An [`AddressBook`] maps addresses to display labels. It is loaded once
//! per run, usually from a CSV file with `id` and `Label` columns (the
//! layout graph tools such as Gephi use for node tables). When an address
//! appears more than once, the first entry wins.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::CoreError;

#[derive(Debug, Deserialize)]
struct LabelRow {
    id: String,
    #[serde(rename = "Label")]
    label: String,
}

#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    labels: HashMap<String, String>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label unless the address already has one.
    pub fn insert(&mut self, address: impl Into<String>, label: impl Into<String>) {
        self.labels
            .entry(address.into())
            .or_insert_with(|| label.into());
    }

    pub fn get(&self, address: &str) -> Option<&str> {
        self.labels.get(address).map(String::as_str)
    }

    /// Label for `address`, falling back to the address itself.
    pub fn label_for(&self, address: &str) -> String {
        self.get(address).unwrap_or(address).to_owned()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn from_csv_reader(reader: impl Read) -> Result<Self, CoreError> {
        let mut book = Self::new();
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        for (idx, row) in csv.deserialize::<LabelRow>().enumerate() {
            // Line 1 is the header.
            let row = row.map_err(|e| CoreError::LabelParse {
                line: idx + 2,
                message: e.to_string(),
            })?;
            if row.id.is_empty() {
                continue;
            }
            book.insert(row.id, row.label);
        }
        Ok(book)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, CoreError> {
        let file = std::fs::File::open(path)?;
        let book = Self::from_csv_reader(file)?;
        debug!(path = %path.display(), labels = book.len(), "loaded address labels");
        Ok(book)
    }
}

impl<A: Into<String>, L: Into<String>> FromIterator<(A, L)> for AddressBook {
    fn from_iter<T: IntoIterator<Item = (A, L)>>(iter: T) -> Self {
        let mut book = Self::new();
        for (address, label) in iter {
            book.insert(address, label);
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_wins() {
        let book: AddressBook = [("A", "first"), ("A", "second"), ("B", "bee")]
            .into_iter()
            .collect();
        assert_eq!(book.get("A"), Some("first"));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn missing_address_labels_itself() {
        let book = AddressBook::new();
        assert_eq!(book.label_for("5Grw"), "5Grw");
    }

    #[test]
    fn parses_csv_with_extra_columns() {
        let data = "id,Label,Note\nA, Exchange ,hot wallet\nB,Treasury,\n";
        let book = AddressBook::from_csv_reader(data.as_bytes()).expect("csv must parse");
        assert_eq!(book.label_for("A"), "Exchange");
        assert_eq!(book.label_for("B"), "Treasury");
    }

    #[test]
    fn reports_line_of_bad_row() {
        let data = "id,Label\nA,one\nB\n";
        let err = AddressBook::from_csv_reader(data.as_bytes()).expect_err("short row must fail");
        assert!(matches!(err, CoreError::LabelParse { line: 3, .. }));
    }
}
