//
// raster.rs
// ct-organ-prep
//
// Burns polygon annotations into per-organ mask grids and the combined multi-organ mask.
//
// Thales Matheus Mendonça Santos - November 2025

use std::ops::RangeInclusive;
use std::path::Path;

use ndarray::{s, Array2};

use crate::annotation::AnnotationFile;
use crate::error::PrepError;
use crate::labels::{OrganLabel, PerLabel, ShapeLabel};

/// Per-slice mask with the same (rows, columns) shape as the source image.
pub type MaskRaster = Array2<i16>;

/// Masks for every organ label of a single slice.
pub type SliceMasks = PerLabel<MaskRaster>;

/// Build the masks for one slice.
///
/// Organ masks receive 1 inside each contour, the `All` mask receives the organ id.
/// Shapes are drawn in file order so later shapes win where contours overlap.
/// `source` is only used to report unknown labels.
pub fn rasterize_slice(
    dims: (usize, usize),
    annotation: Option<&AnnotationFile>,
    source: &Path,
) -> Result<SliceMasks, PrepError> {
    let mut masks = PerLabel::from_fn(|_| MaskRaster::zeros(dims));

    let Some(annotation) = annotation else {
        return Ok(masks);
    };

    for shape in &annotation.shapes {
        let organ = match OrganLabel::from_annotation(&shape.label) {
            Some(ShapeLabel::Organ(organ)) => organ,
            Some(ShapeLabel::Ignored) => continue,
            None => {
                return Err(PrepError::UnknownLabel {
                    label: shape.label.clone(),
                    path: source.to_path_buf(),
                })
            }
        };

        // Contour coordinates are truncated to whole pixels.
        let contour: Vec<(i32, i32)> = shape
            .points
            .iter()
            .map(|[x, y]| (*x as i32, *y as i32))
            .collect();

        fill_polygon(&mut masks[organ], &contour, 1);
        fill_polygon(&mut masks[OrganLabel::All], &contour, organ.id());
    }

    Ok(masks)
}

/// Solid-fill a closed polygon given as `(x, y)` vertices, outline included.
///
/// Interior pixels follow the even-odd rule sampled at pixel centres; everything
/// outside the grid is clipped.
pub fn fill_polygon(mask: &mut MaskRaster, vertices: &[(i32, i32)], value: i16) {
    let (rows, cols) = mask.dim();
    if vertices.is_empty() || rows == 0 || cols == 0 {
        return;
    }

    let vertices: Vec<(i64, i64)> = vertices
        .iter()
        .map(|&(x, y)| (i64::from(x), i64::from(y)))
        .collect();
    let edges = || {
        vertices
            .iter()
            .copied()
            .zip(vertices.iter().copied().cycle().skip(1))
    };

    let y_min = vertices.iter().map(|v| v.1).min().unwrap_or(0).max(0);
    let y_max = vertices
        .iter()
        .map(|v| v.1)
        .max()
        .unwrap_or(0)
        .min(rows as i64 - 1);

    let mut crossings: Vec<f64> = Vec::with_capacity(vertices.len());
    for y in y_min..=y_max {
        crossings.clear();
        for ((x0, y0), (x1, y1)) in edges() {
            // Half-open test so a vertex shared by two edges is counted once.
            if (y0 <= y && y < y1) || (y1 <= y && y < y0) {
                let t = (y - y0) as f64 / (y1 - y0) as f64;
                crossings.push(x0 as f64 + t * (x1 - x0) as f64);
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            fill_span(mask, y, span[0].ceil() as i64, span[1].floor() as i64, value);
        }
    }

    for (start, end) in edges() {
        draw_line(mask, start, end, value);
    }
}

fn fill_span(mask: &mut MaskRaster, y: i64, x_start: i64, x_end: i64, value: i16) {
    let cols = mask.ncols() as i64;
    let start = x_start.max(0);
    let end = x_end.min(cols - 1);
    if start > end {
        return;
    }
    mask.slice_mut(s![y as usize, start as usize..=end as usize]).fill(value);
}

/// Outline segment, sampled once per major-axis step inside the grid.
fn draw_line(mask: &mut MaskRaster, (x0, y0): (i64, i64), (x1, y1): (i64, i64), value: i16) {
    let (rows, cols) = mask.dim();
    let (dx, dy) = (x1 - x0, y1 - y0);
    if dx.abs() >= dy.abs() {
        for x in visible_span(x0, x1, cols) {
            put_pixel(mask, x, y0 + minor_offset(x - x0, dy, dx), value);
        }
    } else {
        for y in visible_span(y0, y1, rows) {
            put_pixel(mask, x0 + minor_offset(y - y0, dx, dy), y, value);
        }
    }
}

/// Coordinates between `a` and `b` that fall inside `0..extent`.
fn visible_span(a: i64, b: i64, extent: usize) -> RangeInclusive<i64> {
    a.min(b).max(0)..=a.max(b).min(extent as i64 - 1)
}

/// `step * d_minor / d_major` rounded half up, in exact integer arithmetic.
fn minor_offset(step: i64, d_minor: i64, d_major: i64) -> i64 {
    if d_major == 0 {
        return 0;
    }
    let mut num = i128::from(step) * i128::from(d_minor);
    let mut den = i128::from(d_major);
    if den < 0 {
        num = -num;
        den = -den;
    }
    (2 * num + den).div_euclid(2 * den) as i64
}

fn put_pixel(mask: &mut MaskRaster, x: i64, y: i64, value: i16) {
    let (rows, cols) = mask.dim();
    if x < 0 || y < 0 || x >= cols as i64 || y >= rows as i64 {
        return;
    }
    mask[[y as usize, x as usize]] = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Shape;
    use std::path::PathBuf;

    fn shape(label: &str, points: &[[f64; 2]]) -> Shape {
        Shape {
            label: label.to_string(),
            points: points.to_vec(),
        }
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<[f64; 2]> {
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    fn source() -> PathBuf {
        PathBuf::from("slice.json")
    }

    #[test]
    fn square_fill_includes_outline() {
        let mut mask = MaskRaster::zeros((5, 5));
        fill_polygon(&mut mask, &[(1, 1), (3, 1), (3, 3), (1, 3)], 7);

        for ((row, col), value) in mask.indexed_iter() {
            let inside = (1..=3).contains(&row) && (1..=3).contains(&col);
            assert_eq!(*value, if inside { 7 } else { 0 }, "pixel ({row}, {col})");
        }
    }

    #[test]
    fn triangle_fill_stays_within_hypotenuse() {
        let mut mask = MaskRaster::zeros((6, 6));
        fill_polygon(&mut mask, &[(0, 0), (4, 0), (0, 4)], 1);

        assert_eq!(mask[[0, 4]], 1);
        assert_eq!(mask[[2, 2]], 1);
        assert_eq!(mask[[4, 0]], 1);
        assert_eq!(mask[[3, 3]], 0);
        assert_eq!(mask[[5, 5]], 0);
    }

    #[test]
    fn contours_outside_the_grid_are_clipped() {
        let mut mask = MaskRaster::zeros((3, 3));
        fill_polygon(&mut mask, &[(-5, -5), (10, -5), (10, 10), (-5, 10)], 2);
        assert!(mask.iter().all(|&v| v == 2));
    }

    #[test]
    fn far_vertex_is_clipped_without_walking_the_segment() {
        // 3e9 saturates to i32::MAX once truncated to a pixel index.
        let annotation = AnnotationFile {
            shapes: vec![shape("1", &[[0.0, 0.0], [3e9, 3e9], [0.0, 3.0]])],
        };
        let masks = rasterize_slice((4, 4), Some(&annotation), &source()).expect("masks");

        let liver = &masks[OrganLabel::Liver];
        // Lower-left triangle, diagonal included.
        for ((row, col), value) in liver.indexed_iter() {
            assert_eq!(*value, i16::from(col <= row), "pixel ({row}, {col})");
        }
    }

    #[test]
    fn steep_outline_hits_one_pixel_per_row() {
        let mut mask = MaskRaster::zeros((5, 5));
        draw_line(&mut mask, (0, 0), (2, 4), 1);

        let lit: Vec<_> = mask
            .indexed_iter()
            .filter(|(_, v)| **v == 1)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(lit, vec![(0, 0), (1, 1), (2, 1), (3, 2), (4, 2)]);
    }

    #[test]
    fn missing_annotation_yields_empty_masks_for_every_label() {
        let masks = rasterize_slice((4, 4), None, &source()).expect("masks");
        for (label, mask) in masks.iter() {
            assert_eq!(mask.dim(), (4, 4), "{label}");
            assert!(mask.iter().all(|&v| v == 0), "{label}");
        }
    }

    #[test]
    fn ignored_label_never_touches_any_mask() {
        let annotation = AnnotationFile {
            shapes: vec![shape("2", &square(0.0, 0.0, 3.0, 3.0))],
        };
        let masks = rasterize_slice((4, 4), Some(&annotation), &source()).expect("masks");
        for (_, mask) in masks.iter() {
            assert!(mask.iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn kidney_alias_draws_into_kidney_and_combined_masks() {
        let annotation = AnnotationFile {
            shapes: vec![shape("d", &square(1.0, 1.0, 2.0, 2.0))],
        };
        let masks = rasterize_slice((4, 4), Some(&annotation), &source()).expect("masks");

        assert_eq!(masks[OrganLabel::Kidney][[1, 1]], 1);
        assert_eq!(masks[OrganLabel::All][[2, 2]], 5);
        assert!(masks[OrganLabel::Liver].iter().all(|&v| v == 0));
        assert_eq!(masks[OrganLabel::Kidney].iter().filter(|&&v| v == 1).count(), 4);
    }

    #[test]
    fn combined_mask_keeps_last_drawn_shape_on_overlap() {
        let annotation = AnnotationFile {
            shapes: vec![
                shape("1", &square(0.0, 0.0, 2.0, 2.0)),
                shape("4", &square(2.0, 2.0, 4.0, 4.0)),
            ],
        };
        let masks = rasterize_slice((5, 5), Some(&annotation), &source()).expect("masks");

        let all = &masks[OrganLabel::All];
        assert_eq!(all[[0, 0]], 1);
        assert_eq!(all[[4, 4]], 4);
        // (2, 2) lies on both contours; the spleen was drawn last.
        assert_eq!(all[[2, 2]], 4);
        // Organ masks stay binary even where shapes overlap.
        assert_eq!(masks[OrganLabel::Liver][[2, 2]], 1);
        assert_eq!(masks[OrganLabel::Spleen][[2, 2]], 1);
    }

    #[test]
    fn fractional_points_are_truncated() {
        let annotation = AnnotationFile {
            shapes: vec![shape("3", &square(1.9, 1.9, 2.9, 2.9))],
        };
        let masks = rasterize_slice((4, 4), Some(&annotation), &source()).expect("masks");
        assert_eq!(masks[OrganLabel::Pancreas].iter().filter(|&&v| v == 1).count(), 4);
        assert_eq!(masks[OrganLabel::Pancreas][[1, 1]], 1);
        assert_eq!(masks[OrganLabel::Pancreas][[3, 3]], 0);
    }

    #[test]
    fn unknown_label_is_a_typed_error() {
        let annotation = AnnotationFile {
            shapes: vec![shape("9", &square(0.0, 0.0, 1.0, 1.0))],
        };
        let err = rasterize_slice((4, 4), Some(&annotation), &source()).unwrap_err();
        assert!(matches!(err, PrepError::UnknownLabel { ref label, .. } if label == "9"));
    }
}
