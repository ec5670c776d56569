use serde::{Deserialize, Serialize};

/// Global display range observed over a run, persisted for intensity normalization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRange {
    pub scale_min: i64,
    pub scale_max: i64,
}

/// Running min/max of `center ± width / 2` over every slice handed to it.
///
/// One tracker lives for a whole run and is passed by reference into each case,
/// so the extrema are never reset between cases.
#[derive(Debug, Clone, Default)]
pub struct WindowTracker {
    range: Option<WindowRange>,
    slices: usize,
}

/// Integer display bounds of a single window center/width pair.
///
/// Both values are truncated to integers before the width is halved with floor division.
pub fn window_bounds(center: f64, width: f64) -> (i64, i64) {
    let center = center.trunc() as i64;
    let half = (width.trunc() as i64).div_euclid(2);
    (center - half, center + half)
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, center: f64, width: f64) {
        let (low, high) = window_bounds(center, width);
        self.slices += 1;
        self.range = Some(match self.range {
            Some(range) => WindowRange {
                scale_min: range.scale_min.min(low),
                scale_max: range.scale_max.max(high),
            },
            None => WindowRange {
                scale_min: low,
                scale_max: high,
            },
        });
    }

    /// Fold another tracker's extrema into this one.
    pub fn merge(&mut self, other: &WindowTracker) {
        self.slices += other.slices;
        self.range = match (self.range, other.range) {
            (Some(a), Some(b)) => Some(WindowRange {
                scale_min: a.scale_min.min(b.scale_min),
                scale_max: a.scale_max.max(b.scale_max),
            }),
            (a, b) => a.or(b),
        };
    }

    /// `None` until at least one slice has been observed.
    pub fn range(&self) -> Option<WindowRange> {
        self.range
    }

    pub fn slices_observed(&self) -> usize {
        self.slices
    }
}
