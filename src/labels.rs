//
// labels.rs
// ct-organ-prep
//
// Closed set of organ labels and the per-label lookup table used for masks and output directories.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;
use std::ops::{Index, IndexMut};

/// Organ labels produced for every slice. `All` is the combined mask, not a real organ.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OrganLabel {
    All,
    Liver,
    Pancreas,
    Spleen,
    Kidney,
}

/// Outcome of interpreting the label string of one annotation shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeLabel {
    Organ(OrganLabel),
    /// Label "2" is never rasterized.
    Ignored,
}

impl OrganLabel {
    pub const ALL: [OrganLabel; 5] = [
        OrganLabel::All,
        OrganLabel::Liver,
        OrganLabel::Pancreas,
        OrganLabel::Spleen,
        OrganLabel::Kidney,
    ];

    /// Value burned into the combined mask. `All` has no organ id of its own and reports 0.
    pub fn id(self) -> i16 {
        match self {
            OrganLabel::All => 0,
            OrganLabel::Liver => 1,
            OrganLabel::Pancreas => 3,
            OrganLabel::Spleen => 4,
            OrganLabel::Kidney => 5,
        }
    }

    /// Suffix used for the per-case label directories and volumes.
    pub fn organ_name(self) -> &'static str {
        match self {
            OrganLabel::All => "all",
            OrganLabel::Liver => "liver",
            OrganLabel::Pancreas => "pancreas",
            OrganLabel::Spleen => "spleen",
            OrganLabel::Kidney => "kidney",
        }
    }

    fn slot(self) -> usize {
        match self {
            OrganLabel::All => 0,
            OrganLabel::Liver => 1,
            OrganLabel::Pancreas => 2,
            OrganLabel::Spleen => 3,
            OrganLabel::Kidney => 4,
        }
    }

    /// Interpret an annotation label. Returns `None` for strings outside the known set.
    pub fn from_annotation(label: &str) -> Option<ShapeLabel> {
        let organ = match label {
            "2" => return Some(ShapeLabel::Ignored),
            // Kidneys were annotated as "d" in part of the dataset.
            "d" | "5" => OrganLabel::Kidney,
            "1" => OrganLabel::Liver,
            "3" => OrganLabel::Pancreas,
            "4" => OrganLabel::Spleen,
            _ => return None,
        };
        Some(ShapeLabel::Organ(organ))
    }
}

impl fmt::Display for OrganLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.organ_name())
    }
}

/// One value per organ label, in `OrganLabel::ALL` order.
#[derive(Debug, Clone, PartialEq)]
pub struct PerLabel<T>([T; 5]);

impl<T> PerLabel<T> {
    pub fn from_fn(f: impl FnMut(OrganLabel) -> T) -> Self {
        PerLabel(OrganLabel::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (OrganLabel, &T)> {
        OrganLabel::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<OrganLabel> for PerLabel<T> {
    type Output = T;

    fn index(&self, label: OrganLabel) -> &T {
        &self.0[label.slot()]
    }
}

impl<T> IndexMut<OrganLabel> for PerLabel<T> {
    fn index_mut(&mut self, label: OrganLabel) -> &mut T {
        &mut self.0[label.slot()]
    }
}
