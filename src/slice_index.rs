//
// slice_index.rs
// ct-organ-prep
//
// Maps each slice location to its source file name and persists the table sorted by location.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;

/// Spatial stacking order of a case, independent of file-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceOrderIndex {
    entries: BTreeMap<OrderedFloat<f64>, String>,
}

impl SliceOrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a slice. A second slice at the same location replaces the first.
    pub fn insert(&mut self, location: f64, file_name: impl Into<String>) {
        self.entries.insert(OrderedFloat(location), file_name.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows in ascending location order.
    pub fn rows(&self) -> impl Iterator<Item = (f64, &str)> {
        self.entries
            .iter()
            .map(|(location, name)| (location.into_inner(), name.as_str()))
    }

    /// Write `location,file_name` rows without a header.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to create slice index {:?}", path))?;

        for (location, name) in self.rows() {
            writer.write_record([format_location(location).as_str(), name])?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write slice index {:?}", path))?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to open slice index {:?}", path))?;

        let mut index = SliceOrderIndex::new();
        for record in reader.records() {
            let record = record?;
            let location: f64 = record
                .get(0)
                .context("Slice index row without a location")?
                .trim()
                .parse()
                .with_context(|| format!("Invalid slice location in {:?}", path))?;
            let name = record.get(1).context("Slice index row without a file name")?;
            index.insert(location, name);
        }
        Ok(index)
    }
}

/// Locations always keep a decimal point so "5" is written as "5.0".
fn format_location(location: f64) -> String {
    format!("{:?}", location)
}
