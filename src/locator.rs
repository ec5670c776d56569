//
// locator.rs
// ct-organ-prep
//
// Finds case directories under a dataset root and pairs each DICOM slice with its annotation file.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

pub const DICOM_EXTENSION: &str = "dcm";
pub const ANNOTATION_EXTENSION: &str = "json";

/// One patient/study directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDir {
    pub id: String,
    pub path: PathBuf,
}

impl CaseDir {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        CaseDir { id, path }
    }
}

/// A DICOM slice and the annotation sharing its base name, when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSource {
    pub dicom: PathBuf,
    pub annotation: Option<PathBuf>,
}

/// Immediate subdirectories of the dataset root, sorted by name. Plain files are skipped.
pub fn discover_cases(root: &Path) -> Result<Vec<CaseDir>> {
    let mut cases = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list dataset root {:?}", root))?;
        if entry.file_type().is_dir() {
            cases.push(CaseDir::from_path(entry.into_path()));
        }
    }
    Ok(cases)
}

/// DICOM files directly inside `dir`, in lexical order.
pub fn dicom_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to list directory {:?}", dir))?;
        if entry.file_type().is_file() && has_extension(entry.path(), DICOM_EXTENSION) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Slices of a case in lexical file order. This is only an iteration order;
/// the spatial order comes from the slice index.
pub fn list_slices(case_dir: &Path) -> Result<Vec<SliceSource>> {
    let slices = dicom_files(case_dir)?
        .into_iter()
        .map(|dicom| {
            let candidate = dicom.with_extension(ANNOTATION_EXTENSION);
            let annotation = candidate.is_file().then_some(candidate);
            SliceSource { dicom, annotation }
        })
        .collect();
    Ok(slices)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn cases_are_sorted_directories_only() {
        let root = tempdir().expect("tmpdir");
        fs::create_dir(root.path().join("case_b")).expect("case b");
        fs::create_dir(root.path().join("case_a")).expect("case a");
        fs::write(root.path().join("README.txt"), b"notes").expect("file");

        let cases = discover_cases(root.path()).expect("discover");
        let ids: Vec<_> = cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["case_a", "case_b"]);
        assert_eq!(cases[0].path, root.path().join("case_a"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = tempdir().expect("tmpdir");
        assert!(discover_cases(&root.path().join("nope")).is_err());
    }

    #[test]
    fn slices_pair_with_same_stem_annotations() {
        let root = tempdir().expect("tmpdir");
        let case = root.path();
        for name in ["IM0002.dcm", "IM0001.DCM", "IM0001.json", "IM0003.json", "notes.txt"] {
            fs::write(case.join(name), b"").expect("write");
        }

        let slices = list_slices(case).expect("slices");
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].dicom, case.join("IM0001.DCM"));
        assert_eq!(slices[0].annotation, Some(case.join("IM0001.json")));
        assert_eq!(slices[1].dicom, case.join("IM0002.dcm"));
        assert_eq!(slices[1].annotation, None);
    }
}
