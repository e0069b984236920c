//! High-level facade crate for the `lasercal-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the geometry, corner grid and coordinate field
//!   crates
//! - (feature `cli`) the `lasercal` command line tool that builds a field
//!   from coax parameters, a grid CSV or a JSON config and inspects stored
//!   fields
//!
//! ## Quickstart
//!
//! ```
//! use lasercal::{load_coax_model, CoaxCalibrationData, CoordinateField, LaserLine};
//!
//! let mut field = CoordinateField::new();
//! load_coax_model(&mut field, &CoaxCalibrationData::default(), false).expect("coax");
//! let p = field.to_3d(600, 500, LaserLine::Front);
//! println!("{p:?}");
//! ```
//!
//! ## API map
//! - `lasercal::core`: screen/plane correspondences, transforms, line
//!   equations, laser lines, logging.
//! - `lasercal::grid`: corner grids, cells and the corner CSV format.
//! - `lasercal::field`: the coordinate field, its loaders, the averager
//!   and the wire format.

pub use lasercal_core as core;
pub use lasercal_field as field;
pub use lasercal_grid as grid;

pub use lasercal_core::{AngleUnit, LaserLine, SensorModel, SensorSize};
pub use lasercal_field::{
    load_cam_grid_data, load_coax_model, CalibrationConfig, CoaxCalibrationData, CoordinateField,
    GridBuildParams,
};
pub use lasercal_grid::CamGridData;
