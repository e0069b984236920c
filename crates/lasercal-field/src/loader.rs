//! Grid (Scheimpflug) loader: detected chessboard corners to a dense
//! field on the laser plane.

use lasercal_core::AngleUnit;
use lasercal_grid::{CalibrationCornerGrid, CamGridData, DEFAULT_MAX_X_DELTA};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::LoadError;
use crate::field::CoordinateField;
use crate::interpolator::CellInterpolator;

/// Options of a grid build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridBuildParams {
    /// Re-express every cell on its integer screen bounding box.
    pub rectify: bool,
    /// Extend the outer cells to the sensor borders.
    pub extrapolate: bool,
    /// Maximum screen x drift of a chessboard column between rows.
    pub max_x_delta: i32,
    /// Snap corners to the intersections of fitted row and column lines.
    pub linearize: bool,
}

impl Default for GridBuildParams {
    fn default() -> Self {
        Self {
            rectify: true,
            extrapolate: true,
            max_x_delta: DEFAULT_MAX_X_DELTA,
            linearize: false,
        }
    }
}

/// Builds `field` from the corners of `cam_grid`.
///
/// Plane coordinates are scaled to mm with `grid_delta * correction_factor`
/// and shifted so that the grid source origin (the sensor centre) maps to
/// `(0, 0)`. All laser lines get the angle of the grid source.
///
/// On failure the field is left partially written and must be discarded.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(field, cam_grid), fields(width = cam_grid.sensor_width, height = cam_grid.sensor_height))
)]
pub fn load_cam_grid_data(
    field: &mut CoordinateField,
    cam_grid: &CamGridData,
    params: &GridBuildParams,
) -> Result<(), LoadError> {
    if !cam_grid.has_data() {
        log::error!("calibration grid has no corners");
        return Err(LoadError::InvalidGridData("no corners".to_string()));
    }
    let size = cam_grid.sensor_size();
    if size.pixel_count() == 0 {
        log::error!("invalid sensor size {}x{}", size.width, size.height);
        return Err(LoadError::InvalidGridData(format!(
            "sensor size {}x{}",
            size.width, size.height
        )));
    }
    let scale = cam_grid.grid_delta * cam_grid.correction_factor;
    if !(scale.is_finite() && scale > 0.0) {
        log::error!("invalid grid delta {} with correction {}", cam_grid.grid_delta, cam_grid.correction_factor);
        return Err(LoadError::InvalidGridData(format!("grid scale {scale}")));
    }

    let stats = cam_grid.grid_size();
    log::info!(
        "loading grid: {} corners in {} rows, {}..{} per row",
        stats.points,
        stats.rows,
        stats.columns_min,
        stats.columns_max
    );

    let mut grid =
        CalibrationCornerGrid::from_raw_grid(size, &cam_grid.grid, params.max_x_delta, params.linearize)?;
    let mut transform = *grid.transform();
    transform.scale = scale;
    grid.set_transform(transform);

    let origin = cam_grid.origin();
    CellInterpolator::apply_translation_to_set_origin(&mut grid, origin.x, origin.y, 0.0, 0.0)?;

    CellInterpolator::new(field, size).all_cells_to_3d(grid.map(), params.extrapolate, params.rectify)?;

    field.set_all_triangulation_angles(cam_grid.triangulation_angle_rad(), AngleUnit::Radians)?;
    log::debug!(
        "grid field ready, triangulation angle {:.3} deg",
        cam_grid.triangulation_angle_deg()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasercal_core::{LaserLine, SensorModel, SensorSize};
    use lasercal_grid::RawGrid;
    use nalgebra::Point2;

    /// Square lattice of `pitch` pixels covering a `size` sensor, one
    /// corner on the sensor centre.
    fn lattice(size: SensorSize, pitch: i32) -> RawGrid {
        let (cx, cy) = ((size.width / 2) as i32, (size.height / 2) as i32);
        let mut grid = RawGrid::new();
        let mut y = cy % pitch + pitch;
        while y < size.height as i32 - pitch / 2 {
            let mut row = Vec::new();
            let mut x = cx % pitch + pitch;
            while x < size.width as i32 - pitch / 2 {
                row.push(Point2::new(x, y));
                x += pitch;
            }
            grid.insert(y, row);
            y += pitch;
        }
        grid
    }

    #[test]
    fn defaults_rectify_and_extrapolate() {
        let params = GridBuildParams::default();
        assert!(params.rectify && params.extrapolate && !params.linearize);
        assert_eq!(params.max_x_delta, DEFAULT_MAX_X_DELTA);
        let parsed: GridBuildParams = serde_json::from_str(r#"{"rectify": false}"#).expect("json");
        assert!(!parsed.rectify);
        assert!(parsed.extrapolate);
    }

    #[test]
    fn empty_grid_is_rejected() {
        let mut field = CoordinateField::new();
        let data = CamGridData::new(SensorSize::new(64, 64), 1.0, RawGrid::new());
        let err = load_cam_grid_data(&mut field, &data, &GridBuildParams::default()).expect_err("empty");
        assert!(matches!(err, LoadError::InvalidGridData(_)));
        assert!(field.is_empty());
    }

    #[test]
    fn lattice_builds_centred_field() {
        let size = SensorSize::new(320, 240);
        let mut data = CamGridData::new(size, 2.0, lattice(size, 40));
        data.set_triangulation_angle_rad(0.5);
        let mut field = CoordinateField::new();
        load_cam_grid_data(&mut field, &data, &GridBuildParams::default()).expect("build");

        assert_eq!(field.sensor_model(), SensorModel::CalibrationGridOnLaserPlane);
        let origin = field.to_3d(160, 120, LaserLine::Front).expect("origin valid");
        assert!(origin.x.abs() < 1e-3 && origin.y.abs() < 1e-3, "{origin:?}");

        // 40 px per 2 mm square, y grows towards the top of the image
        let p = field.coordinates(200, 80).expect("valid");
        assert!((p.x - 2.0).abs() < 1e-3, "{p:?}");
        assert!((p.y - 2.0).abs() < 1e-3, "{p:?}");

        for (x, y) in [(0, 0), (319, 0), (0, 239), (319, 239)] {
            assert!(field.coordinates(x, y).is_some(), "corner ({x}, {y})");
        }
        assert!((field.triangulation_angle(AngleUnit::Radians, LaserLine::Center) - 0.5).abs() < 1e-6);
    }
}
