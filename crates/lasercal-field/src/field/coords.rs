use lasercal_core::{AngleUnit, LaserLine, SensorModel, SensorSize};
use nalgebra::{Point2, Point3, Vector2, Vector3};

use super::view::{SensorView, TriangulationAngles};
use crate::error::FieldError;
use crate::oriented::LinearMagnificationModel;

/// Dense lookup table from sensor pixel to calibrated plane, in mm.
///
/// `(0, 0)` marks a pixel that was never computed. The pixel the real world
/// origin falls on also holds `(0, 0)`; it is told apart by its four valid
/// axis neighbours.
///
/// The table is written by the interpolator and the coax loader through a
/// crate-private writer. After a build the field is only read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoordinateField {
    pub(super) size: SensorSize,
    pub(super) x: Vec<f32>,
    pub(super) y: Vec<f32>,
    pub(super) view: SensorView,
}

impl CoordinateField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field of the given size with every pixel not computed.
    pub fn with_size(width: usize, height: usize, model: SensorModel) -> Self {
        let mut field = Self::new();
        field.reset_grid_cell_data(width, height, model);
        field
    }

    /// Reallocates the table and switches to `model`. Angles and oriented
    /// line models are dropped.
    pub fn reset_grid_cell_data(&mut self, width: usize, height: usize, model: SensorModel) {
        self.size = SensorSize::new(width, height);
        let area = self.size.pixel_count();
        self.x.clear();
        self.y.clear();
        self.x.resize(area, 0.0);
        self.y.resize(area, 0.0);
        self.view = SensorView::new(model);
    }

    pub fn sensor_size(&self) -> SensorSize {
        self.size
    }

    pub fn sensor_model(&self) -> SensorModel {
        self.view.model()
    }

    pub fn view(&self) -> &SensorView {
        &self.view
    }

    /// True for a field built from a grid lying on the laser plane.
    pub fn is_scheimpflug_case(&self) -> bool {
        matches!(self.view, SensorView::GridOnLaserPlane(_))
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub fn is_valid_coord(x: f32, y: f32) -> bool {
        !(x == 0.0 && y == 0.0)
    }

    #[inline]
    pub(super) fn index(&self, x: usize, y: usize) -> usize {
        self.size.width * y + x
    }

    /// Stored pair without any validity check. Panics outside the sensor.
    #[inline]
    pub(super) fn raw(&self, x: usize, y: usize) -> (f32, f32) {
        let i = self.index(x, y);
        (self.x[i], self.y[i])
    }

    /// Stored X and Y tables, row major.
    pub(crate) fn tables(&self) -> (&[f32], &[f32]) {
        (&self.x, &self.y)
    }

    #[inline]
    fn contains(&self, x: i32, y: i32) -> bool {
        self.size.contains(i64::from(x), i64::from(y))
    }

    /// Plane coordinates of pixel `(x, y)`.
    ///
    /// `None` outside the sensor or for a pixel that was not computed. A
    /// `(0, 0)` pixel away from the border is accepted as the origin when all
    /// four axis neighbours are valid.
    pub fn coordinates(&self, x: i32, y: i32) -> Option<Point2<f32>> {
        if !self.contains(x, y) {
            return None;
        }
        let (ux, uy) = (x as usize, y as usize);
        let (px, py) = self.raw(ux, uy);
        if Self::is_valid_coord(px, py) {
            return Some(Point2::new(px, py));
        }

        let (w, h) = (self.size.width, self.size.height);
        if ux == 0 || uy == 0 || ux + 1 >= w || uy + 1 >= h {
            return None;
        }
        let is_origin = [(ux - 1, uy), (ux + 1, uy), (ux, uy - 1), (ux, uy + 1)]
            .into_iter()
            .all(|(nx, ny)| {
                let (vx, vy) = self.raw(nx, ny);
                Self::is_valid_coord(vx, vy)
            });
        is_origin.then(|| Point2::new(px, py))
    }

    fn oriented_model(&self, line: LaserLine) -> Option<&LinearMagnificationModel> {
        self.view.oriented().and_then(|m| m.get(&line))
    }

    pub(super) fn primary_oriented_model(&self) -> Option<&LinearMagnificationModel> {
        self.view.oriented().and_then(|m| m.values().next())
    }

    /// World coordinates of pixel `(x, y)` lit by `line`.
    ///
    /// The oriented line model of `line` is used when registered. Otherwise
    /// coax fields return `(X, Y, Y / tan)` and grid fields return
    /// `(X, Y * sin, Y * cos)` with the triangulation angle of `line`.
    pub fn to_3d(&self, x: i32, y: i32, line: LaserLine) -> Option<Point3<f32>> {
        if let Some(model) = self.oriented_model(line) {
            if !self.contains(x, y) {
                return None;
            }
            let p = model.laser_screen_to_3d(f64::from(x), f64::from(y))?;
            return Some(Point3::new(p.x as f32, p.y as f32, p.z as f32));
        }

        let plane = self.coordinates(x, y)?;
        match &self.view {
            SensorView::GridOnLaserPlane(_) => {
                let angle = self.triangulation_angle(AngleUnit::Radians, line);
                let v = f64::from(plane.y);
                Some(Point3::new(
                    plane.x,
                    (v * angle.sin()) as f32,
                    (v * angle.cos()) as f32,
                ))
            }
            SensorView::LinearMagnification(_) => {
                let angle = self.triangulation_angle(AngleUnit::Radians, line);
                let mut tan = angle.tan() as f32;
                if tan == 0.0 {
                    log::warn!("triangulation angle of the {line} line is 0");
                    tan = 1.0;
                }
                Some(Point3::new(plane.x, plane.y, plane.y / tan))
            }
            SensorView::Undefined => {
                log::debug!("to_3d on a field without sensor model");
                None
            }
        }
    }

    /// [`Self::to_3d`] with zeros for an invalid pixel.
    pub fn to_3d_or_zero(&self, x: i32, y: i32, line: LaserLine) -> Vector3<f64> {
        self.to_3d(x, y, line)
            .map(|p| Vector3::new(f64::from(p.x), f64::from(p.y), f64::from(p.z)))
            .unwrap_or_else(Vector3::zeros)
    }

    /// Coordinates on the plane of laser `line`, in mm.
    pub fn screen_to_laser_plane(&self, x: i32, y: i32, line: LaserLine) -> Option<Point2<f32>> {
        if let Some(model) = self.oriented_model(line) {
            if !self.contains(x, y) {
                return None;
            }
            let p = model.laser_screen_to_laser_plane(f64::from(x), f64::from(y))?;
            return Some(Point2::new(p.x as f32, p.y as f32));
        }

        let plane = self.coordinates(x, y)?;
        match &self.view {
            SensorView::GridOnLaserPlane(_) => Some(plane),
            SensorView::LinearMagnification(_) => {
                let angle = self.triangulation_angle(AngleUnit::Radians, line);
                let v = if angle == 0.0 {
                    plane.y
                } else {
                    (f64::from(plane.y) / angle.sin()) as f32
                };
                Some(Point2::new(plane.x, v))
            }
            SensorView::Undefined => None,
        }
    }

    /// Coordinates on the horizontal plane, in mm.
    ///
    /// Grid fields approximate the vertical axis with the magnification of a
    /// horizontal segment around the pixel.
    pub fn screen_to_horizontal_plane(&self, x: i32, y: i32) -> Option<Point2<f32>> {
        if let Some(model) = self.primary_oriented_model() {
            if !self.contains(x, y) {
                return None;
            }
            let p = model.image_to_horizontal_plane(f64::from(x), f64::from(y))?;
            return Some(Point2::new(p.x as f32, p.y as f32));
        }

        let plane = self.coordinates(x, y)?;
        match &self.view {
            SensorView::LinearMagnification(_) => Some(plane),
            SensorView::GridOnLaserPlane(_) => {
                let pixel_to_mm = self.pixel_to_mm_on_horizontal_plane(100, x, y)?;
                Some(Point2::new(plane.x, (pixel_to_mm * f64::from(y)) as f32))
            }
            SensorView::Undefined => {
                log::error!("horizontal plane requested on a field without sensor model");
                None
            }
        }
    }

    /// Euclidean distance.
    pub fn dist(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        (a - b).norm()
    }

    /// 3-D distance between two pixels of the front laser line. Invalid
    /// pixels count as the origin.
    pub fn dist_from_2d(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> f64 {
        let a = self.to_3d_or_zero(x1, y1, LaserLine::Front);
        let b = self.to_3d_or_zero(x2, y2, LaserLine::Front);
        Self::dist(&a, &b)
    }

    /// Distance of two pixels on the stored plane, 0 when either is invalid.
    pub fn distance_on_internal_plane(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> f64 {
        match (self.coordinates(x1, y1), self.coordinates(x2, y2)) {
            (Some(a), Some(b)) => {
                let d = Vector2::new(f64::from(b.x - a.x), f64::from(b.y - a.y));
                d.norm()
            }
            _ => 0.0,
        }
    }

    pub fn triangulation_angles(&self) -> Option<&TriangulationAngles> {
        self.view.angles()
    }

    /// Triangulation angle of `line`. A line without angle logs an error and
    /// reads as 0.
    pub fn triangulation_angle(&self, unit: AngleUnit, line: LaserLine) -> f64 {
        let angle = self.view.angles().and_then(|a| a.get(&line).copied());
        match angle {
            Some(rad) => unit.from_radians(f64::from(rad)),
            None => {
                log::error!("unknown laser line {line} for triangulation angle");
                0.0
            }
        }
    }

    pub fn set_triangulation_angle(
        &mut self,
        angle: f64,
        unit: AngleUnit,
        line: LaserLine,
    ) -> Result<(), FieldError> {
        let rad = unit.to_radians(angle);
        match self.view.angles_mut() {
            Some(angles) => {
                angles.insert(line, rad as f32);
                Ok(())
            }
            None => {
                log::error!("cannot set triangulation angle of the {line} line, sensor model undefined");
                Err(FieldError::UndefinedSensorModel)
            }
        }
    }

    pub fn set_all_triangulation_angles(
        &mut self,
        angle: f64,
        unit: AngleUnit,
    ) -> Result<(), FieldError> {
        for line in LaserLine::ALL {
            self.set_triangulation_angle(angle, unit, line)?;
        }
        Ok(())
    }

    /// Rotation about the Y axis by `beta` radians.
    pub fn rotate_y(p: &Vector3<f64>, beta: f64) -> Vector3<f64> {
        let (s, c) = beta.sin_cos();
        Vector3::new(c * p.x + s * p.z, p.y, -s * p.x + c * p.z)
    }

    /// Point of the calibrated frame seen from a frame rotated by `beta`
    /// about the Y axis.
    pub fn from_calibrated_to_rotated(p: &Vector3<f64>, beta: f64) -> Vector3<f64> {
        Self::rotate_y(p, beta)
    }

    pub fn from_rotated_to_calibrated(p: &Vector3<f64>, beta: f64) -> Vector3<f64> {
        Self::rotate_y(p, -beta)
    }

    pub fn uses_oriented_line_calibration(&self) -> bool {
        self.view.oriented().is_some_and(|m| !m.is_empty())
    }

    pub fn reset_oriented_line_calibration(&mut self) {
        if let SensorView::LinearMagnification(v) = &mut self.view {
            v.oriented.clear();
        }
    }

    /// Registers the closed-form model of `line`. Only linear magnification
    /// fields accept oriented line models.
    pub fn set_oriented_line_calibration(
        &mut self,
        line: LaserLine,
        model: LinearMagnificationModel,
    ) -> Result<(), FieldError> {
        match &mut self.view {
            SensorView::LinearMagnification(v) => {
                v.oriented.insert(line, model);
                Ok(())
            }
            other => {
                let model = other.model();
                log::error!("oriented line calibration not supported for sensor model {model:?}");
                Err(FieldError::OrientedModelUnsupported(model))
            }
        }
    }

    pub fn oriented_line_calibration(&self, line: LaserLine) -> Option<&LinearMagnificationModel> {
        self.oriented_model(line)
    }

    /// Moves the reference of the oriented model of `line` so that pixel
    /// `pix` measures height 0.
    pub fn adjust_z_point_for_oriented_laser_line(
        &mut self,
        line: LaserLine,
        pix: Point2<f64>,
    ) -> Result<(), FieldError> {
        let model = match &mut self.view {
            SensorView::LinearMagnification(v) => v.oriented.get_mut(&line),
            _ => None,
        };
        match model {
            Some(model) => {
                model.adjust_line_to_reference_z(pix);
                Ok(())
            }
            None => Err(FieldError::MissingOrientedModel(line)),
        }
    }
}
