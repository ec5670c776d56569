//
// lib.rs
// ct-organ-prep
//
// Exposes the crate's modules and re-exports the pipeline entry points for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: one module per pipeline stage plus shared utilities.
pub mod annotation;
pub mod assembler;
pub mod cli;
pub mod config;
pub mod dicom_access;
pub mod error;
pub mod fs_utils;
pub mod labels;
pub mod locator;
pub mod logging;
pub mod models;
pub mod nifti_io;
pub mod pipeline;
pub mod raster;
pub mod slice_index;
pub mod volume;
pub mod window;

pub use cli::{run as run_cli, Cli, Commands};
pub use error::PrepError;
pub use pipeline::{prepare_inference, prepare_training};
