//
// config.rs
// ct-organ-prep
//
// Key-value configuration store shared with the training code. Only the window keys are written here.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toml::{Table, Value};

use crate::window::WindowRange;

pub const SCALE_MIN_KEY: &str = "scale_min";
pub const SCALE_MAX_KEY: &str = "scale_max";

/// TOML-backed store. Keys this crate does not own are written back untouched.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    table: Table,
}

impl ConfigStore {
    /// Read the store. A missing file starts an empty store that `save` will create.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = match fs::read_to_string(&path) {
            Ok(text) => text
                .parse::<Table>()
                .with_context(|| format!("Failed to parse config {:?}", path))?,
            Err(err) if err.kind() == ErrorKind::NotFound => Table::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read config {:?}", path))
            }
        };
        Ok(Self { path, table })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.table.get(key)
    }

    pub fn set_window(&mut self, range: WindowRange) {
        self.table
            .insert(SCALE_MIN_KEY.to_string(), Value::Integer(range.scale_min));
        self.table
            .insert(SCALE_MAX_KEY.to_string(), Value::Integer(range.scale_max));
    }

    pub fn window(&self) -> Option<WindowRange> {
        let scale_min = self.get(SCALE_MIN_KEY)?.as_integer()?;
        let scale_max = self.get(SCALE_MAX_KEY)?.as_integer()?;
        Some(WindowRange {
            scale_min,
            scale_max,
        })
    }

    pub fn save(&self) -> Result<()> {
        let text = toml::to_string(&self.table).context("Failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("Failed to write config {:?}", self.path))?;
        Ok(())
    }
}
