//
// assembler.rs
// ct-organ-prep
//
// Writes each slice's masks back as DICOM files next to the source metadata, then
// stacks every organ's slice directory into a label volume.
//
// Thales Matheus Mendonça Santos - November 2025

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::dictionary_std::{tags, StandardDataDictionary};
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use tracing::debug;

use crate::fs_utils::{ensure_dir, DirPolicy};
use crate::labels::{OrganLabel, PerLabel};
use crate::raster::{MaskRaster, SliceMasks};
use crate::volume::normalize_series;

/// Display window for the categorical mask values 0..=5.
pub const MASK_WINDOW_CENTER: &str = "3";
pub const MASK_WINDOW_WIDTH: &str = "6";

/// Used when a slice carries no SOP Class UID (CT Image Storage).
const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

/// Per-case output directories, one per organ label.
#[derive(Debug, Clone)]
pub struct LabelSeriesWriter {
    dirs: PerLabel<PathBuf>,
}

impl LabelSeriesWriter {
    /// Create `<labels_root>/<case>_<organ>` for every label.
    pub fn create(labels_root: &Path, case_id: &str) -> Result<Self> {
        let dirs = PerLabel::from_fn(|label| {
            labels_root.join(format!("{}_{}", case_id, label.organ_name()))
        });
        for (_, dir) in dirs.iter() {
            ensure_dir(dir, DirPolicy::Fresh)
                .with_context(|| format!("Failed to create label directory {:?}", dir))?;
        }
        Ok(Self { dirs })
    }

    pub fn dir(&self, label: OrganLabel) -> &Path {
        &self.dirs[label]
    }

    /// Write one mask file per label under the source slice's file name.
    pub fn write_slice(
        &self,
        source: &InMemDicomObject<StandardDataDictionary>,
        file_name: &str,
        masks: &SliceMasks,
    ) -> Result<()> {
        for (label, mask) in masks.iter() {
            let output = self.dirs[label].join(file_name);
            let burned = burn_mask(source, mask)?;
            burned
                .write_to_file(&output)
                .with_context(|| format!("Failed to write mask slice {:?}", output))?;
        }
        Ok(())
    }

    /// Stack every label directory into `<dir>.nii.gz` and return the volume paths.
    pub fn finish(self) -> Result<PerLabel<PathBuf>> {
        let volumes = PerLabel::from_fn(|label| label_volume_path(&self.dirs[label]));
        for (label, dir) in self.dirs.iter() {
            debug!("Assembling {} label volume from {:?}", label, dir);
            normalize_series(dir, &volumes[label])
                .with_context(|| format!("Failed to assemble {} label volume", label))?;
        }
        Ok(volumes)
    }
}

/// `<labels>/<case>_<organ>` becomes `<labels>/<case>_<organ>.nii.gz`.
pub fn label_volume_path(dir: &Path) -> PathBuf {
    let mut name = OsString::from(dir.as_os_str());
    name.push(".nii.gz");
    PathBuf::from(name)
}

/// Copy of `source` whose pixel data is the mask, stored as signed 16-bit samples.
///
/// Everything else is kept except the rescale (intercept 0, slope 1) and the
/// window, which is set to 3/6 for the categorical mask values.
pub fn burn_mask(
    source: &InMemDicomObject<StandardDataDictionary>,
    mask: &MaskRaster,
) -> Result<FileDicomObject<InMemDicomObject<StandardDataDictionary>>> {
    let mut obj = source.clone();

    let pixel_bytes: Vec<u8> = mask.iter().flat_map(|v| v.to_le_bytes()).collect();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::from(pixel_bytes),
    ));

    for (tag, value) in [
        (tags::SAMPLES_PER_PIXEL, 1_u16),
        (tags::BITS_ALLOCATED, 16),
        (tags::BITS_STORED, 16),
        (tags::HIGH_BIT, 15),
        (tags::PIXEL_REPRESENTATION, 1),
    ] {
        obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
    }
    obj.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        PrimitiveValue::from("MONOCHROME2"),
    ));
    obj.remove_element(tags::PLANAR_CONFIGURATION);

    for (tag, value) in [
        (tags::RESCALE_INTERCEPT, "0"),
        (tags::RESCALE_SLOPE, "1"),
        (tags::WINDOW_CENTER, MASK_WINDOW_CENTER),
        (tags::WINDOW_WIDTH, MASK_WINDOW_WIDTH),
    ] {
        obj.put(DataElement::new(tag, VR::DS, PrimitiveValue::from(value)));
    }

    // Pixel data is now native, so the file meta is rebuilt for Explicit VR Little Endian.
    let sop_class_uid = obj
        .element(tags::SOP_CLASS_UID)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
        .unwrap_or_else(|| CT_IMAGE_STORAGE.to_string());
    let sop_instance_uid = obj
        .element(tags::SOP_INSTANCE_UID)
        .ok()
        .and_then(|e| e.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
        .context("Source slice has no SOP Instance UID")?;

    let file_meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(sop_class_uid.as_str())
        .media_storage_sop_instance_uid(sop_instance_uid.as_str())
        .build()?;

    let mut file_obj =
        FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, file_meta);
    for elem in obj {
        file_obj.put(elem);
    }
    Ok(file_obj)
}
