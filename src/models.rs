//
// models.rs
// ct-organ-prep
//
// Serializable results of the training and inference preparation runs.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::window::WindowRange;

/// Output directories of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingLayout {
    pub dataset_dir: PathBuf,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub slices_dir: PathBuf,
}

/// Counts reported once a training run has finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub cases: usize,
    pub slices: usize,
    pub annotated_slices: usize,
    pub label_volumes: usize,
    pub window: Option<WindowRange>,
}

/// What the inference preparation hands back to its caller.
///
/// The window is returned only; persisting it is left to the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceOutputs {
    pub window: Option<WindowRange>,
    pub image_volumes: Vec<PathBuf>,
    pub slice_indexes: Vec<PathBuf>,
}
