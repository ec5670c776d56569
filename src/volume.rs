//
// volume.rs
// ct-organ-prep
//
// Stacks a directory of single-frame DICOM slices into one LAS-oriented NIfTI volume.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::open_file;
use dicom::pixeldata::PixelDecoder;
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, VoiLutOption};
use ndarray::{Array3, Axis};
use tracing::{debug, info};

use crate::dicom_access::ElementAccess;
use crate::error::PrepError;
use crate::locator::dicom_files;
use crate::nifti_io::{write_nifti_gz, NiftiVolume};

const GEOMETRY_TOLERANCE: f64 = 1e-4;
/// Largest relative deviation allowed between consecutive slice increments.
const INCREMENT_TOLERANCE: f64 = 0.1;
/// Voxel axis direction (in RAS) expected along x, y, z: Left, Anterior, Superior.
const CANONICAL_SIGNS: [f64; 3] = [-1.0, 1.0, 1.0];

struct SliceGeometry {
    path: PathBuf,
    rows: usize,
    columns: usize,
    position: [f64; 3],
    orientation: [f64; 6],
    pixel_spacing: [f64; 2],
    thickness: Option<f64>,
    pixels: Vec<f32>,
}

/// Convert a DICOM series directory to `output` (`.nii.gz`).
///
/// Fails on an empty directory or when the slices do not describe one regular grid.
pub fn normalize_series(dir: &Path, output: &Path) -> Result<NiftiVolume> {
    let volume = load_series(dir)?;
    write_nifti_gz(&volume, output)?;
    let (nx, ny, nz) = volume.data.dim();
    info!("Wrote volume {:?} ({} x {} x {})", output, nx, ny, nz);
    Ok(volume)
}

/// Stack every slice of `dir` into a canonical-orientation volume.
pub fn load_series(dir: &Path) -> Result<NiftiVolume> {
    let files = dicom_files(dir)?;
    if files.is_empty() {
        return Err(PrepError::EmptySeries {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let mut slices = files
        .iter()
        .map(|path| read_geometry(path))
        .collect::<Result<Vec<_>>>()?;
    check_consistency(dir, &slices)?;

    let normal = slice_normal(&slices[0].orientation);
    slices.sort_by(|a, b| dot(&a.position, &normal).total_cmp(&dot(&b.position, &normal)));
    let step = slice_step(dir, &slices, &normal)?;
    debug!("Stacked {} slices from {:?}", slices.len(), dir);

    let first = &slices[0];
    let (rows, columns) = (first.rows, first.columns);
    let mut data = Array3::<i16>::zeros((columns, rows, slices.len()));
    for (k, slice) in slices.iter().enumerate() {
        for (offset, value) in slice.pixels.iter().take(rows * columns).enumerate() {
            // Saturating cast; CT values fit comfortably in i16.
            data[[offset % columns, offset / columns, k]] = value.round() as i16;
        }
    }

    // Columns of the LPS affine: along a row, down a column, across slices.
    let [row_spacing, column_spacing] = first.pixel_spacing;
    let o = &first.orientation;
    let axes = [
        [o[0] * column_spacing, o[1] * column_spacing, o[2] * column_spacing],
        [o[3] * row_spacing, o[4] * row_spacing, o[5] * row_spacing],
        step,
    ];
    let mut affine = [[0.0; 4]; 3];
    for world in 0..3 {
        for (voxel, axis) in axes.iter().enumerate() {
            affine[world][voxel] = axis[world];
        }
        affine[world][3] = first.position[world];
    }
    // DICOM patient space is LPS, NIfTI world space is RAS.
    for row in affine.iter_mut().take(2) {
        row.iter_mut().for_each(|v| *v = -*v);
    }

    Ok(canonicalize(NiftiVolume { data, affine }))
}

fn read_geometry(path: &Path) -> Result<SliceGeometry> {
    let obj = open_file(path).with_context(|| format!("Failed to open DICOM file {:?}", path))?;

    let missing = |name: &'static str| PrepError::MissingElement {
        name,
        path: path.to_path_buf(),
    };
    let fixed = |tag: Tag, name: &'static str, len: usize| -> Result<Vec<f64>, PrepError> {
        obj.element_multi_f64(tag)
            .filter(|values| values.len() >= len)
            .ok_or_else(|| missing(name))
    };

    let position = fixed(tags::IMAGE_POSITION_PATIENT, "Image Position (Patient)", 3)?;
    let orientation = fixed(tags::IMAGE_ORIENTATION_PATIENT, "Image Orientation (Patient)", 6)?;
    let pixel_spacing = fixed(tags::PIXEL_SPACING, "Pixel Spacing", 2)?;
    let rows = obj
        .element_int(tags::ROWS)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| missing("Rows"))?;
    let columns = obj
        .element_int(tags::COLUMNS)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| missing("Columns"))?;

    let decoded = obj
        .decode_pixel_data()
        .with_context(|| format!("Failed to decode pixel data of {:?}", path))?;
    let options = ConvertOptions::new()
        .with_modality_lut(ModalityLutOption::Default)
        .with_voi_lut(VoiLutOption::Identity);
    let pixels = decoded
        .to_vec_with_options::<f32>(&options)
        .with_context(|| format!("Failed to convert pixel data of {:?}", path))?;
    if pixels.len() < rows * columns {
        return Err(PrepError::InconsistentGeometry {
            path: path.to_path_buf(),
            reason: format!("{} pixels for a {}x{} image", pixels.len(), rows, columns),
        }
        .into());
    }

    Ok(SliceGeometry {
        path: path.to_path_buf(),
        rows,
        columns,
        position: [position[0], position[1], position[2]],
        orientation: [
            orientation[0],
            orientation[1],
            orientation[2],
            orientation[3],
            orientation[4],
            orientation[5],
        ],
        pixel_spacing: [pixel_spacing[0], pixel_spacing[1]],
        thickness: obj.element_f64(tags::SLICE_THICKNESS),
        pixels,
    })
}

fn check_consistency(dir: &Path, slices: &[SliceGeometry]) -> Result<(), PrepError> {
    let first = &slices[0];
    let inconsistent = |slice: &SliceGeometry, what: &str| PrepError::InconsistentGeometry {
        path: dir.to_path_buf(),
        reason: format!("{} of {:?} differs from {:?}", what, slice.path, first.path),
    };

    for slice in &slices[1..] {
        if (slice.rows, slice.columns) != (first.rows, first.columns) {
            return Err(inconsistent(slice, "image size"));
        }
        if !close(&slice.orientation, &first.orientation) {
            return Err(inconsistent(slice, "orientation"));
        }
        if !close(&slice.pixel_spacing, &first.pixel_spacing) {
            return Err(inconsistent(slice, "pixel spacing"));
        }
    }
    Ok(())
}

/// Displacement between consecutive slices, averaged over the series.
fn slice_step(
    dir: &Path,
    slices: &[SliceGeometry],
    normal: &[f64; 3],
) -> Result<[f64; 3], PrepError> {
    if slices.len() == 1 {
        let thickness = slices[0].thickness.filter(|t| *t > 0.0).unwrap_or(1.0);
        return Ok(normal.map(|n| n * thickness));
    }

    let distances: Vec<f64> = slices
        .iter()
        .map(|slice| dot(&slice.position, normal))
        .collect();
    let increments: Vec<f64> = distances.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = (distances[distances.len() - 1] - distances[0]) / increments.len() as f64;

    if increments.iter().any(|inc| *inc < GEOMETRY_TOLERANCE) {
        return Err(PrepError::InconsistentGeometry {
            path: dir.to_path_buf(),
            reason: "two slices share the same position".to_string(),
        });
    }
    if increments
        .iter()
        .any(|inc| (inc - mean).abs() > INCREMENT_TOLERANCE * mean)
    {
        return Err(PrepError::InconsistentGeometry {
            path: dir.to_path_buf(),
            reason: format!("irregular slice increments {:?}", increments),
        });
    }

    let first = &slices[0].position;
    let last = &slices[slices.len() - 1].position;
    let count = increments.len() as f64;
    Ok([
        (last[0] - first[0]) / count,
        (last[1] - first[1]) / count,
        (last[2] - first[2]) / count,
    ])
}

/// Permute and flip voxel axes so they run Left, Anterior, Superior.
fn canonicalize(volume: NiftiVolume) -> NiftiVolume {
    let NiftiVolume { data, affine } = volume;

    // Greedy pairing of voxel axes with the world axis they are most aligned with.
    let mut pairs: Vec<(usize, usize)> = (0..3)
        .flat_map(|world| (0..3).map(move |voxel| (world, voxel)))
        .collect();
    pairs.sort_by(|a, b| affine[b.0][b.1].abs().total_cmp(&affine[a.0][a.1].abs()));
    let mut perm = [usize::MAX; 3];
    let mut voxel_used = [false; 3];
    for (world, voxel) in pairs {
        if perm[world] == usize::MAX && !voxel_used[voxel] {
            perm[world] = voxel;
            voxel_used[voxel] = true;
        }
    }

    let mut data = data.permuted_axes(perm);
    let mut canonical = [[0.0; 4]; 3];
    for world in 0..3 {
        canonical[world][3] = affine[world][3];
    }

    for (axis, &source) in perm.iter().enumerate() {
        let mut column = [affine[0][source], affine[1][source], affine[2][source]];
        if column[axis].signum() != CANONICAL_SIGNS[axis] {
            let last = data.len_of(Axis(axis)).saturating_sub(1) as f64;
            for world in 0..3 {
                canonical[world][3] += last * column[world];
            }
            column = column.map(|v| -v);
            data.invert_axis(Axis(axis));
        }
        for world in 0..3 {
            canonical[world][axis] = column[world];
        }
    }

    NiftiVolume {
        data: data.as_standard_layout().into_owned(),
        affine: canonical,
    }
}

fn slice_normal(orientation: &[f64; 6]) -> [f64; 3] {
    let (r, c) = (&orientation[0..3], &orientation[3..6]);
    [
        r[1] * c[2] - r[2] * c[1],
        r[2] * c[0] - r[0] * c[2],
        r[0] * c[1] - r[1] * c[0],
    ]
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn close(a: &[f64], b: &[f64]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| (x - y).abs() <= GEOMETRY_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axial_volume() -> NiftiVolume {
        // 3 columns x 2 rows x 2 slices, LPS axial acquisition already converted to RAS.
        let data = Array3::from_shape_fn((3, 2, 2), |(i, j, k)| (i + 10 * j + 100 * k) as i16);
        NiftiVolume {
            data,
            affine: [
                [-0.5, 0.0, 0.0, 100.0],
                [0.0, -0.5, 0.0, 50.0],
                [0.0, 0.0, 2.0, -10.0],
            ],
        }
    }

    #[test]
    fn axial_series_flips_only_the_row_axis() {
        let canonical = canonicalize(axial_volume());

        assert_eq!(canonical.data.dim(), (3, 2, 2));
        assert_eq!(canonical.data[[0, 0, 0]], 10);
        assert_eq!(canonical.data[[2, 1, 1]], 102);
        assert_eq!(
            canonical.affine,
            [
                [-0.5, 0.0, 0.0, 100.0],
                [0.0, 0.5, 0.0, 49.5],
                [0.0, 0.0, 2.0, -10.0],
            ]
        );
    }

    #[test]
    fn swapped_axes_are_permuted_back() {
        // Voxel axis 0 runs along world z, axis 2 along world x.
        let data = Array3::from_shape_fn((2, 1, 3), |(i, _, k)| (10 * i + k) as i16);
        let volume = NiftiVolume {
            data,
            affine: [
                [0.0, 0.0, -1.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [3.0, 0.0, 0.0, 0.0],
            ],
        };

        let canonical = canonicalize(volume);
        assert_eq!(canonical.data.dim(), (3, 1, 2));
        assert_eq!(canonical.data[[2, 0, 1]], 12);
        assert_eq!(canonical.affine[0][0], -1.0);
        assert_eq!(canonical.affine[2][2], 3.0);
    }

    #[test]
    fn normal_of_axial_orientation_points_superior() {
        assert_eq!(slice_normal(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }
}
