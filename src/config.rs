use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::fits::FitsSource;

/// Ingestion settings. Read from a JSON file; absent fields take defaults.
///
/// ```json
/// { "data_dir": "/data/sami/dr3", "database": "results/SAMI_spaxel_data.db" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the per-galaxy FITS maps.
    pub data_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// Cube binning in the file name, e.g. `default`.
    pub cube: String,
    /// Emission-line fit in gas file names.
    pub gas_fit: String,
    /// Kinematic fit in stellar file names.
    pub stellar_fit: String,
    pub width: usize,
    pub height: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database: PathBuf::from("results/SAMI_spaxel_data.db"),
            cube: "default".to_string(),
            gas_fit: "1-comp".to_string(),
            stellar_fit: "four-moment".to_string(),
            width: 50,
            height: 50,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn fits_source(&self) -> FitsSource {
        FitsSource {
            data_dir: self.data_dir.clone(),
            cube: self.cube.clone(),
            gas_fit: self.gas_fit.clone(),
            stellar_fit: self.stellar_fit.clone(),
            map_shape: self.shape(),
        }
    }
}
