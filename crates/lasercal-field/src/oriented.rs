//! Closed-form model of one laser line that is not parallel to the sensor
//! rows.
//!
//! The horizontal plane mapping is the coax linear magnification. Heights are
//! measured from a reference line on that plane instead of from the row of
//! the optical centre, so the model stays exact when the projected laser line
//! is tilted.

use lasercal_core::{LaserLine, LineEquation};
use nalgebra::{Point2, Point3, Vector2};
use serde::{Deserialize, Serialize};

use crate::coax::{CoaxCalibrationData, TriangulationAngle};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearMagnificationModel {
    pub(crate) beta0: f64,
    pub(crate) betaz: f64,
    pub(crate) dpix_x: f64,
    pub(crate) dpix_y: f64,
    pub(crate) origin_x: f64,
    pub(crate) origin_y: f64,
    pub(crate) invert_x: bool,
    pub(crate) invert_y: bool,
    pub(crate) high_plane_on_image_top: bool,
    /// Laser line on the horizontal plane, in mm.
    pub(crate) reference: LineEquation,
}

impl Default for LinearMagnificationModel {
    fn default() -> Self {
        Self::from_coax(&CoaxCalibrationData::default(), LaserLine::Front)
    }
}

impl LinearMagnificationModel {
    /// Model of `line` with the magnification of `data` and the line's
    /// reference equation.
    pub fn from_coax(data: &CoaxCalibrationData, line: LaserLine) -> Self {
        let params = data.line_dependent_parameters(line);
        Self {
            beta0: data.beta0,
            betaz: params.beta_z,
            dpix_x: data.dpix_x,
            dpix_y: data.dpix_y,
            origin_x: data.origin_x as f64,
            origin_y: data.origin_y as f64,
            invert_x: data.invert_x,
            invert_y: data.invert_y,
            high_plane_on_image_top: params.high_plane_on_image_top,
            reference: params.line_xy,
        }
    }

    pub fn with_reference_line(mut self, reference: LineEquation) -> Self {
        self.reference = reference;
        self
    }

    pub fn reference_line(&self) -> &LineEquation {
        &self.reference
    }

    pub fn origin(&self) -> Point2<f64> {
        Point2::new(self.origin_x, self.origin_y)
    }

    /// Triangulation angle in radians, `None` for a null beta.
    pub fn triangulation_angle(&self) -> Option<f64> {
        TriangulationAngle {
            beta0: self.beta0,
            betaz: self.betaz,
            high_plane_on_image_top: self.high_plane_on_image_top,
        }
        .radians()
    }

    fn scale(&self) -> Option<Vector2<f64>> {
        if self.beta0 == 0.0 {
            return None;
        }
        let sx = if self.invert_x { -1.0 } else { 1.0 };
        let sy = if self.invert_y { -1.0 } else { 1.0 };
        Some(Vector2::new(
            sx * self.dpix_x / self.beta0,
            -sy * self.dpix_y / self.beta0,
        ))
    }

    /// Sensor pixel to the horizontal plane, in mm.
    pub fn image_to_horizontal_plane(&self, x: f64, y: f64) -> Option<Point2<f64>> {
        let s = self.scale()?;
        Some(Point2::new(
            s.x * (x - self.origin_x),
            s.y * (y - self.origin_y),
        ))
    }

    /// Pixel on the laser line to world coordinates. The height is the signed
    /// distance from the reference line over the tangent of the triangulation
    /// angle.
    pub fn laser_screen_to_3d(&self, x: f64, y: f64) -> Option<Point3<f64>> {
        let h = self.image_to_horizontal_plane(x, y)?;
        let tan = self.triangulation_angle()?.tan();
        if tan == 0.0 {
            return None;
        }
        let s = self.reference.signed_distance(h.x, h.y);
        Some(Point3::new(h.x, h.y, s / tan))
    }

    /// Pixel on the laser line to coordinates on the laser plane.
    pub fn laser_screen_to_laser_plane(&self, x: f64, y: f64) -> Option<Point2<f64>> {
        let h = self.image_to_horizontal_plane(x, y)?;
        let angle = self.triangulation_angle()?;
        let s = self.reference.signed_distance(h.x, h.y);
        let v = if angle == 0.0 { s } else { s / angle.sin() };
        Some(Point2::new(h.x, v))
    }

    /// Pixel at `dist_mm` from the tool centre point pixel `tcp`, measured on
    /// the horizontal plane.
    pub fn distance_tcp_mm_to_sensor_coord(
        &self,
        dist_mm: Vector2<f64>,
        tcp: Point2<f64>,
    ) -> Option<Point2<f64>> {
        let s = self.scale()?;
        if s.x == 0.0 || s.y == 0.0 {
            return None;
        }
        Some(Point2::new(tcp.x + dist_mm.x / s.x, tcp.y + dist_mm.y / s.y))
    }

    /// Moves the reference line so that it passes through pixel `pix`, which
    /// then measures height 0.
    pub fn adjust_line_to_reference_z(&mut self, pix: Point2<f64>) {
        match self.image_to_horizontal_plane(pix.x, pix.y) {
            Some(h) => self.reference = self.reference.parallel_through(h.x, h.y),
            None => log::warn!("cannot move reference line, model has null beta0"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b}");
    }

    fn reference_data() -> CoaxCalibrationData {
        CoaxCalibrationData {
            beta0: 0.3144555989,
            beta_z: 0.2489175749,
            ..CoaxCalibrationData::default()
        }
    }

    #[test]
    fn horizontal_reference_matches_coax_formulas() {
        let data = reference_data();
        let model = LinearMagnificationModel::from_coax(&data, LaserLine::Front);
        let p = model.laser_screen_to_3d(100.0, 100.0).expect("valid");
        let x = (100.0 - 512.0) * data.dpix_x / data.beta0;
        let y = -(100.0 - 512.0) * data.dpix_y / data.beta0;
        let angle = data.beta_z.atan2(data.beta0);
        assert_close(p.x, x, 1e-12);
        assert_close(p.y, y, 1e-12);
        assert_close(p.z, y / angle.tan(), 1e-9);

        let plane = model.laser_screen_to_laser_plane(100.0, 100.0).expect("valid");
        assert_close(plane.y, y / angle.sin(), 1e-9);
    }

    #[test]
    fn adjusted_reference_has_zero_height() {
        let mut model = LinearMagnificationModel::from_coax(&reference_data(), LaserLine::Front)
            .with_reference_line(LineEquation::from_slope(0.2, 1.0));
        model.adjust_line_to_reference_z(Point2::new(300.0, 700.0));
        let p = model.laser_screen_to_3d(300.0, 700.0).expect("valid");
        assert_close(p.z, 0.0, 1e-9);
        let q = model.laser_screen_to_3d(310.0, 700.0).expect("valid");
        assert!(q.z.abs() > 1e-3);
    }

    #[test]
    fn tcp_distance_inverts_horizontal_mapping() {
        let model = LinearMagnificationModel::from_coax(
            &CoaxCalibrationData {
                invert_x: true,
                ..reference_data()
            },
            LaserLine::Behind,
        );
        let tcp = Point2::new(400.0, 600.0);
        let d = Vector2::new(1.5, -0.75);
        let pix = model.distance_tcp_mm_to_sensor_coord(d, tcp).expect("valid");
        let a = model.image_to_horizontal_plane(tcp.x, tcp.y).expect("valid");
        let b = model.image_to_horizontal_plane(pix.x, pix.y).expect("valid");
        assert_close(b.x - a.x, d.x, 1e-9);
        assert_close(b.y - a.y, d.y, 1e-9);
    }

    #[test]
    fn null_beta0_is_rejected() {
        let model = LinearMagnificationModel::from_coax(
            &CoaxCalibrationData {
                beta0: 0.0,
                ..CoaxCalibrationData::default()
            },
            LaserLine::Front,
        );
        assert!(model.image_to_horizontal_plane(0.0, 0.0).is_none());
        assert!(model.laser_screen_to_3d(0.0, 0.0).is_none());
    }
}
