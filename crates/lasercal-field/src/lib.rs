//! Dense pixel to millimetre coordinate field of a laser triangulation
//! sensor.
//!
//! A [`CoordinateField`] is built once and then only read:
//!
//! - [`load_coax_model`] fills it in closed form from the coax (linear
//!   magnification) parameters, optionally with one
//!   [`LinearMagnificationModel`] per laser line;
//! - [`load_cam_grid_data`] densifies detected chessboard corners lying on
//!   the laser plane with the [`CellInterpolator`];
//! - [`UniformGridMapBuilder`] blends several local grid calibrations into
//!   one before densification.
//!
//! ## Quickstart
//!
//! ```
//! use lasercal_core::LaserLine;
//! use lasercal_field::{load_coax_model, CoaxCalibrationData, CoordinateField};
//!
//! let data = CoaxCalibrationData::default();
//! let mut field = CoordinateField::new();
//! load_coax_model(&mut field, &data, false).expect("valid parameters");
//!
//! let origin = field.to_3d(512, 512, LaserLine::Front);
//! assert_eq!(origin.map(|p| p.x), Some(0.0));
//! ```
//!
//! A built field travels between processes with [`wire::serialize`] and
//! [`wire::deserialize`].

mod averager;
mod coax;
mod error;
mod field;
mod interpolator;
mod io;
mod loader;
mod oriented;
pub mod wire;

pub use averager::{
    averaging_weights, sample_uniform_grid, UniformGridMapBuilder, DEFAULT_SAMPLE_STEP,
};
pub use coax::{load_coax_model, CoaxCalibrationData, LineParameters, TriangulationAngle};
pub use error::{
    AveragerError, ConfigIoError, ExportError, FieldError, InterpolationError, LoadError,
    WireError,
};
pub use field::{
    CoaxView, CoordinateField, CoordinatePlane, GridView, Roi, SensorView, TriangulationAngles,
};
pub use interpolator::CellInterpolator;
pub use io::{load_field, save_field, BuildSource, CalibrationConfig, FieldReport, OutputPaths};
pub use loader::{load_cam_grid_data, GridBuildParams};
pub use oriented::LinearMagnificationModel;

#[cfg(feature = "image")]
pub use field::save_png;
