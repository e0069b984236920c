//! JSON build configuration, field blobs on disk and build reports.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lasercal_core::{AngleUnit, LaserLine, SensorModel};
use lasercal_grid::CamGridData;
use serde::{Deserialize, Serialize};

use crate::coax::{load_coax_model, CoaxCalibrationData};
use crate::error::{ConfigIoError, LoadError};
use crate::field::CoordinateField;
use crate::loader::{load_cam_grid_data, GridBuildParams};
use crate::wire;

fn default_square_mm() -> f32 {
    1.0
}

/// Where a field comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildSource {
    /// Closed-form coax field.
    Coax {
        parameters: CoaxCalibrationData,
        /// Register an oriented line model per laser line.
        #[serde(default)]
        oriented_lines: bool,
    },
    /// Chessboard corners on the laser plane, read from a CSV file.
    Grid {
        csv: PathBuf,
        #[serde(default)]
        params: GridBuildParams,
    },
}

/// Output files of a build. Every entry is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputPaths {
    #[serde(default)]
    pub blob: Option<PathBuf>,
    #[serde(default)]
    pub checkerboard_png: Option<PathBuf>,
    #[serde(default)]
    pub table_dir: Option<PathBuf>,
}

/// Configuration of one field build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub source: BuildSource,
    #[serde(default)]
    pub outputs: OutputPaths,
    /// Side of the virtual squares of the checkerboard rendering, in mm.
    #[serde(default = "default_square_mm")]
    pub checkerboard_square_mm: f32,
}

impl CalibrationConfig {
    pub fn new(source: BuildSource) -> Self {
        Self {
            source,
            outputs: OutputPaths::default(),
            checkerboard_square_mm: default_square_mm(),
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Builds the field described by [`Self::source`].
    pub fn build_field(&self) -> Result<CoordinateField, LoadError> {
        let mut field = CoordinateField::new();
        match &self.source {
            BuildSource::Coax {
                parameters,
                oriented_lines,
            } => load_coax_model(&mut field, parameters, *oriented_lines)?,
            BuildSource::Grid { csv, params } => {
                let cam_grid = CamGridData::load_csv(csv)?;
                load_cam_grid_data(&mut field, &cam_grid, params)?;
            }
        }
        Ok(field)
    }
}

/// Writes the binary form of `field`.
pub fn save_field(field: &CoordinateField, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
    fs::write(path, wire::serialize(field))?;
    Ok(())
}

/// Reads a field written by [`save_field`].
pub fn load_field(path: impl AsRef<Path>) -> Result<CoordinateField, ConfigIoError> {
    let bytes = fs::read(path)?;
    Ok(wire::deserialize(&bytes)?)
}

/// Summary of a built field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    pub width: usize,
    pub height: usize,
    pub sensor_model: SensorModel,
    /// Triangulation angle per laser line, degrees.
    pub angles_deg: BTreeMap<LaserLine, f64>,
    pub oriented_lines: Vec<LaserLine>,
    pub valid_pixels: usize,
    pub discontinuities: usize,
}

impl FieldReport {
    pub fn from_field(field: &CoordinateField) -> Self {
        let size = field.sensor_size();
        let angles_deg = field
            .triangulation_angles()
            .map(|angles| {
                angles
                    .keys()
                    .map(|&line| (line, field.triangulation_angle(AngleUnit::Degrees, line)))
                    .collect()
            })
            .unwrap_or_default();
        let oriented_lines = LaserLine::ALL
            .into_iter()
            .filter(|&line| field.oriented_line_calibration(line).is_some())
            .collect();

        let mut valid_pixels = 0;
        for y in 0..size.height as i32 {
            for x in 0..size.width as i32 {
                if field.coordinates(x, y).is_some() {
                    valid_pixels += 1;
                }
            }
        }

        Self {
            width: size.width,
            height: size.height,
            sensor_model: field.sensor_model(),
            angles_deg,
            oriented_lines,
            valid_pixels,
            discontinuities: field.check_discontinuities(true, false).len(),
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
