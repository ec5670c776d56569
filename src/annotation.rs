use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Polygon annotations for one slice, as saved by the labelling tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationFile {
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

/// One closed contour. Points are `[x, y]` pixel coordinates (column, row).
#[derive(Debug, Clone, Deserialize)]
pub struct Shape {
    pub label: String,
    pub points: Vec<[f64; 2]>,
}

impl AnnotationFile {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Load the annotation for a slice. Unreadable or malformed files count as "no annotations".
pub fn load_annotation(path: &Path) -> Option<AnnotationFile> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("Cannot open annotation {:?}: {}", path, err);
            return None;
        }
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(annotation) => Some(annotation),
        Err(err) => {
            warn!("Ignoring malformed annotation {:?}: {}", path, err);
            None
        }
    }
}
