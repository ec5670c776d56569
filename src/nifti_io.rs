//
// nifti_io.rs
// ct-organ-prep
//
// NIfTI-1 single-file volumes (INT16, RAS affine in the sform), gzip-compressed when the path ends in `.gz`.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array3, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

const NIFTI_UNITS_MM: u8 = 2;
const NIFTI_XFORM_SCANNER_ANAT: i16 = 1;

/// INT16 volume indexed `[i, j, k]` with a voxel-to-world (RAS, mm) affine.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiVolume {
    pub data: Array3<i16>,
    /// Rows of the affine: `srow_x`, `srow_y`, `srow_z`.
    pub affine: [[f64; 4]; 3],
}

impl NiftiVolume {
    /// Voxel size along each axis, taken from the affine column norms.
    pub fn spacing(&self) -> [f64; 3] {
        let mut spacing = [0.0; 3];
        for (axis, value) in spacing.iter_mut().enumerate() {
            *value = (0..3)
                .map(|row| self.affine[row][axis].powi(2))
                .sum::<f64>()
                .sqrt();
        }
        spacing
    }

    /// Header carrying the affine and spacing. Dimensions and datatype are filled in by the writer.
    pub fn header(&self) -> NiftiHeader {
        let [sx, sy, sz] = self.spacing();
        let srow = |row: &[f64; 4]| row.map(|v| v as f32);
        NiftiHeader {
            pixdim: [1.0, sx as f32, sy as f32, sz as f32, 1.0, 1.0, 1.0, 1.0],
            scl_slope: 1.0,
            scl_inter: 0.0,
            xyzt_units: NIFTI_UNITS_MM,
            sform_code: NIFTI_XFORM_SCANNER_ANAT,
            srow_x: srow(&self.affine[0]),
            srow_y: srow(&self.affine[1]),
            srow_z: srow(&self.affine[2]),
            ..NiftiHeader::default()
        }
    }

    fn from_parts(header: &NiftiHeader, data: Array3<i16>) -> Self {
        let affine = if header.sform_code > 0 {
            [header.srow_x, header.srow_y, header.srow_z].map(|row| row.map(f64::from))
        } else {
            // No sform: fall back to a diagonal affine from pixdim.
            let mut affine = [[0.0; 4]; 3];
            for (axis, row) in affine.iter_mut().enumerate() {
                row[axis] = f64::from(header.pixdim[axis + 1]);
            }
            affine
        };
        NiftiVolume { data, affine }
    }
}

pub fn write_nifti_gz(volume: &NiftiVolume, path: &Path) -> Result<()> {
    WriterOptions::new(path)
        .reference_header(&volume.header())
        .write_nifti(&volume.data)
        .with_context(|| format!("Failed to write volume {:?}", path))
}

/// Read a `.nii.gz` (or plain `.nii`) INT16 volume.
pub fn read_nifti(path: &Path) -> Result<NiftiVolume> {
    let obj = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to open volume {:?}", path))?;
    let header = obj.header().clone();
    let data = obj
        .into_volume()
        .into_ndarray::<i16>()
        .with_context(|| format!("Failed to decode volume {:?}", path))?
        .into_dimensionality::<Ix3>()
        .with_context(|| format!("Volume {:?} is not three-dimensional", path))?;
    Ok(NiftiVolume::from_parts(&header, data))
}
