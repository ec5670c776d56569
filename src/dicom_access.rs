use std::path::Path;

use anyhow::{Context, Result};
use dicom::core::Tag;
use dicom::dictionary_std::{tags, StandardDataDictionary};
use dicom::object::{open_file, DefaultDicomObject, InMemDicomObject};

use crate::error::PrepError;

/// Small helper trait to pull typed values from different DICOM object shapes.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn element_f64(&self, tag: Tag) -> Option<f64>;
    fn element_multi_f64(&self, tag: Tag) -> Option<Vec<f64>>;
    fn element_int(&self, tag: Tag) -> Option<i64>;
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.trim().to_string())
    }

    fn element_f64(&self, tag: Tag) -> Option<f64> {
        // Multi-valued attributes (e.g. two VOI windows) resolve to their first value.
        self.element_multi_f64(tag)
            .and_then(|values| values.first().copied())
    }

    fn element_multi_f64(&self, tag: Tag) -> Option<Vec<f64>> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_multi_float64().ok())
            .filter(|values| !values.is_empty())
    }

    fn element_int(&self, tag: Tag) -> Option<i64> {
        self.element(tag).ok().and_then(|e| e.to_int::<i64>().ok())
    }
}

impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        (**self).element_str(tag)
    }

    fn element_f64(&self, tag: Tag) -> Option<f64> {
        (**self).element_f64(tag)
    }

    fn element_multi_f64(&self, tag: Tag) -> Option<Vec<f64>> {
        (**self).element_multi_f64(tag)
    }

    fn element_int(&self, tag: Tag) -> Option<i64> {
        (**self).element_int(tag)
    }
}

/// Per-slice attributes the pipeline reads before any pixel data is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceRecord {
    pub file_name: String,
    pub slice_location: f64,
    pub instance_number: Option<i64>,
    pub window_center: f64,
    pub window_width: f64,
    pub rescale_intercept: Option<f64>,
    pub rows: usize,
    pub columns: usize,
}

impl SliceRecord {
    pub fn from_object<T: ElementAccess>(obj: &T, path: &Path) -> Result<Self, PrepError> {
        let required_f64 = |tag: Tag, name: &'static str| {
            obj.element_f64(tag).ok_or_else(|| PrepError::MissingElement {
                name,
                path: path.to_path_buf(),
            })
        };
        let required_dim = |tag: Tag, name: &'static str| {
            obj.element_int(tag)
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| PrepError::MissingElement {
                    name,
                    path: path.to_path_buf(),
                })
        };

        Ok(SliceRecord {
            file_name: file_name_of(path),
            slice_location: required_f64(tags::SLICE_LOCATION, "Slice Location")?,
            instance_number: obj.element_int(tags::INSTANCE_NUMBER),
            window_center: required_f64(tags::WINDOW_CENTER, "Window Center")?,
            window_width: required_f64(tags::WINDOW_WIDTH, "Window Width")?,
            rescale_intercept: obj.element_f64(tags::RESCALE_INTERCEPT),
            rows: required_dim(tags::ROWS, "Rows")?,
            columns: required_dim(tags::COLUMNS, "Columns")?,
        })
    }

    /// Format the per-slice debug line: file name, instance number, slice location.
    pub fn log_line(&self) -> String {
        let instance = self
            .instance_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{:>20}, {:>3}, {:>10}",
            self.file_name, instance, self.slice_location
        )
    }
}

/// Open a slice and read its record in one go.
pub fn read_slice(path: &Path) -> Result<(DefaultDicomObject, SliceRecord)> {
    let obj = open_file(path).with_context(|| format!("Failed to open DICOM file {:?}", path))?;
    let record = SliceRecord::from_object(&obj, path)?;
    Ok((obj, record))
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom::core::{DataElement, PrimitiveValue, VR};

    fn object_with_geometry() -> InMemDicomObject<StandardDataDictionary> {
        let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
        obj.put(DataElement::new(tags::SLICE_LOCATION, VR::DS, PrimitiveValue::from("-12.5")));
        obj.put(DataElement::new(tags::INSTANCE_NUMBER, VR::IS, PrimitiveValue::from("7")));
        obj.put(DataElement::new(
            tags::WINDOW_CENTER,
            VR::DS,
            PrimitiveValue::Strs(["40".to_string(), "300".to_string()].into()),
        ));
        obj.put(DataElement::new(
            tags::WINDOW_WIDTH,
            VR::DS,
            PrimitiveValue::Strs(["400".to_string(), "1500".to_string()].into()),
        ));
        obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(3_u16)));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(5_u16)));
        obj
    }

    #[test]
    fn record_reads_first_window_value() {
        let obj = object_with_geometry();
        let record = SliceRecord::from_object(&obj, Path::new("/data/case1/IM0007.dcm"))
            .expect("record");

        assert_eq!(record.file_name, "IM0007.dcm");
        assert_eq!(record.slice_location, -12.5);
        assert_eq!(record.instance_number, Some(7));
        assert_eq!(record.window_center, 40.0);
        assert_eq!(record.window_width, 400.0);
        assert_eq!(record.rescale_intercept, None);
        assert_eq!((record.rows, record.columns), (3, 5));
        assert_eq!(
            record.log_line(),
            "          IM0007.dcm,   7,      -12.5"
        );
    }

    #[test]
    fn missing_slice_location_is_reported() {
        let mut obj = object_with_geometry();
        obj.remove_element(tags::SLICE_LOCATION);
        let err = SliceRecord::from_object(&obj, Path::new("x.dcm")).unwrap_err();
        assert!(matches!(
            err,
            PrepError::MissingElement {
                name: "Slice Location",
                ..
            }
        ));
    }
}
