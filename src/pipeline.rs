//
// pipeline.rs
// ct-organ-prep
//
// Training and inference preparation runs. Cases are processed one after another and the
// first failure aborts the run.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::annotation::load_annotation;
use crate::assembler::LabelSeriesWriter;
use crate::config::ConfigStore;
use crate::dicom_access::{read_slice, SliceRecord};
use crate::fs_utils::{ensure_dir, DirPolicy};
use crate::locator::{dicom_files, discover_cases, list_slices, CaseDir};
use crate::models::{InferenceOutputs, TrainingLayout, TrainingSummary};
use crate::raster::rasterize_slice;
use crate::slice_index::SliceOrderIndex;
use crate::volume::normalize_series;
use crate::window::WindowTracker;

/// Build image volumes, per-organ label volumes and slice indexes for every case under
/// the dataset root, then store the global window in `config`.
pub fn prepare_training(layout: &TrainingLayout, config: &mut ConfigStore) -> Result<()> {
    for dir in [&layout.images_dir, &layout.labels_dir, &layout.slices_dir] {
        ensure_dir(dir, DirPolicy::Fresh)
            .with_context(|| format!("Failed to prepare output directory {:?}", dir))?;
    }

    let cases = discover_cases(&layout.dataset_dir)?;
    info!("Found {} case(s) in {:?}", cases.len(), layout.dataset_dir);

    let mut tracker = WindowTracker::new();
    let mut summary = TrainingSummary::default();
    for case in &cases {
        process_training_case(case, layout, &mut tracker, &mut summary)
            .with_context(|| format!("Training preparation failed for case {}", case.id))?;
    }
    summary.window = tracker.range();

    match tracker.range() {
        Some(range) => {
            config.set_window(range);
            config.save()?;
            info!(
                "Saved scale_min={} scale_max={} to {:?}",
                range.scale_min,
                range.scale_max,
                config.path()
            );
        }
        None => warn!("No slices processed; {:?} left unchanged", config.path()),
    }

    info!(
        "Training preparation finished: {}",
        serde_json::to_string(&summary)?
    );
    Ok(())
}

/// One case: image volume, mask slices and label volumes for every organ, slice index.
pub fn process_training_case(
    case: &CaseDir,
    layout: &TrainingLayout,
    tracker: &mut WindowTracker,
    summary: &mut TrainingSummary,
) -> Result<()> {
    info!("Preparing training case {}", case.id);

    let image_path = layout.images_dir.join(format!("{}.nii.gz", case.id));
    normalize_series(&case.path, &image_path)?;

    let writer = LabelSeriesWriter::create(&layout.labels_dir, &case.id)?;
    let mut index = SliceOrderIndex::new();

    for slice in list_slices(&case.path)? {
        let (obj, record) = read_slice(&slice.dicom)?;
        // The native window must be read before the mask slices overwrite it.
        record_slice(&record, tracker, &mut index);

        let annotation = slice.annotation.as_deref().and_then(load_annotation);
        if annotation.is_some() {
            summary.annotated_slices += 1;
        }
        let source = slice.annotation.as_deref().unwrap_or(&slice.dicom);
        let masks = rasterize_slice((record.rows, record.columns), annotation.as_ref(), source)?;
        writer.write_slice(&obj, &record.file_name, &masks)?;
        summary.slices += 1;
    }

    let volumes = writer.finish()?;
    summary.label_volumes += volumes.iter().count();

    let index_path = layout.slices_dir.join(format!("{}.csv", case.id));
    index.write_csv(&index_path)?;
    summary.cases += 1;
    Ok(())
}

/// Build image volumes and slice indexes for the given case directories.
///
/// The window range is computed over every slice but only returned, never written to the
/// configuration store.
pub fn prepare_inference(
    case_dirs: &[PathBuf],
    images_dir: &Path,
    slices_dir: &Path,
) -> Result<InferenceOutputs> {
    ensure_dir(images_dir, DirPolicy::KeepExisting)?;
    ensure_dir(slices_dir, DirPolicy::KeepExisting)?;

    let mut tracker = WindowTracker::new();
    let mut outputs = InferenceOutputs::default();

    for dir in case_dirs {
        let case = CaseDir::from_path(dir);
        info!("Preparing inference case {}", case.id);

        let image_path = images_dir.join(format!("{}.nii.gz", case.id));
        normalize_series(&case.path, &image_path)
            .with_context(|| format!("Inference preparation failed for case {}", case.id))?;
        outputs.image_volumes.push(image_path);

        let mut index = SliceOrderIndex::new();
        for path in dicom_files(&case.path)? {
            let (_, record) = read_slice(&path)?;
            record_slice(&record, &mut tracker, &mut index);
        }

        let index_path = slices_dir.join(format!("{}.csv", case.id));
        index.write_csv(&index_path)?;
        outputs.slice_indexes.push(index_path);
    }

    outputs.window = tracker.range();
    Ok(outputs)
}

fn record_slice(record: &SliceRecord, tracker: &mut WindowTracker, index: &mut SliceOrderIndex) {
    tracker.observe(record.window_center, record.window_width);
    index.insert(record.slice_location, record.file_name.clone());
    debug!("{}", record.log_line());
}
