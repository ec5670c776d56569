//
// error.rs
// ct-organ-prep
//
// Typed failures raised by the preparation pipeline. I/O-heavy call sites wrap these in anyhow with context.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    /// An annotation shape carried a label outside the known organ set.
    #[error("Unknown organ label {label:?} in {}", path.display())]
    UnknownLabel { label: String, path: PathBuf },

    #[error("No DICOM slices found in {}", path.display())]
    EmptySeries { path: PathBuf },

    #[error("Inconsistent series geometry in {}: {reason}", path.display())]
    InconsistentGeometry { path: PathBuf, reason: String },

    #[error("Missing or unreadable {name} in {}", path.display())]
    MissingElement { name: &'static str, path: PathBuf },

    #[error("Output directory already exists: {}", path.display())]
    DirectoryExists { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
