//! Corner grids for laser triangulation calibration.
//!
//! A [`CornerGridMap`] holds sparse screen/plane correspondences row by row.
//! [`CalibrationCornerGrid`] builds one from detected chessboard corners
//! ([`CamGridData`]); [`UniformGridMap`] is a regularly resampled grid used
//! when several calibrations are averaged. [`Cell`] resolves the
//! quadrilaterals between two adjacent rows.

mod cam_grid;
mod cell;
mod corner_grid;
mod error;
mod grid_map;
mod uniform_grid;

pub use cam_grid::{CamGridData, GridSize, RawGrid};
pub use cell::{
    pixel_range, Cell, CellCorners, CellMode, CornerPosition, EdgePosition, PixelRange,
};
pub use corner_grid::{CalibrationCornerGrid, DEFAULT_MAX_X_DELTA};
pub use error::{CamGridError, CornerGridError};
pub use grid_map::{CornerGridMap, GridRow, RowBounds};
pub use uniform_grid::{sample_positions, UniformGridMap};
