//! Local pixel/mm scale factors and the inverse mapping around a tool
//! centre point.

use lasercal_core::{LaserLine, SensorModel};
use nalgebra::{Point2, Vector2, Vector3};

use super::coords::CoordinateField;
use super::view::SensorView;

/// Distances below this are treated as zero by the factor functions.
const LENGTH_EPS: f64 = 1e-7;

/// Step in pixels used to estimate the scale around the tool centre point.
const TCP_SCALE_STEP: i32 = 100;

/// `[start, end]` of a segment of `length` pixels centred on `center`,
/// kept inside `0..limit` and at least 10 pixels long.
fn segment(length: i32, center: i32, limit: i32, clamp_length_to: i32) -> (i32, i32) {
    let length = length.saturating_abs().max(10).min(clamp_length_to - 1);
    let l1 = length / 2;
    let l2 = length - l1;
    let start = center.saturating_sub(l1).max(0).min(limit - length - 1);
    let end = center.saturating_add(l2).max(0).min(limit - 1);
    (start, end)
}

fn ratio(pixels: i32, mm: f64) -> f64 {
    if mm.abs() > LENGTH_EPS {
        f64::from(pixels) / mm
    } else {
        1.0
    }
}

impl CoordinateField {
    fn width_i32(&self) -> i32 {
        i32::try_from(self.size.width).unwrap_or(i32::MAX)
    }

    fn height_i32(&self) -> i32 {
        i32::try_from(self.size.height).unwrap_or(i32::MAX)
    }

    /// Pixels per mm along a horizontal segment of the front laser line.
    /// Returns 1 when the segment has no length in mm.
    pub fn factor_horizontal(&self, length: i32, center_x: i32, center_y: i32) -> f64 {
        let w = self.width_i32();
        let (x0, x1) = segment(length, center_x, w, w);
        ratio(x1 - x0, self.dist_from_2d(x0, center_y, x1, center_y))
    }

    /// Pixels per mm along a vertical segment of laser `line`.
    pub fn factor_vertical(&self, length: i32, center_x: i32, center_y: i32, line: LaserLine) -> f64 {
        let h = self.height_i32();
        let (y0, y1) = segment(length, center_y, h, h);
        let a = self.to_3d_or_zero(center_x, y0, line);
        let b = self.to_3d_or_zero(center_x, y1, line);
        ratio(y1 - y0, Self::dist(&a, &b))
    }

    /// Like [`Self::factor_vertical`] with the distance measured in the XZ
    /// plane only.
    pub fn factor_vertical_z(
        &self,
        length: i32,
        center_x: i32,
        center_y: i32,
        line: LaserLine,
    ) -> f64 {
        let h = self.height_i32();
        let (y0, y1) = segment(length, center_y, h, h);
        let a = self.to_3d_or_zero(center_x, y0, line);
        let b = self.to_3d_or_zero(center_x, y1, line);
        let a = Vector3::new(a.x, 0.0, a.z);
        let b = Vector3::new(b.x, 0.0, b.z);
        ratio(y1 - y0, Self::dist(&a, &b))
    }

    /// Distance in mm between two pixels projected on the horizontal plane.
    ///
    /// Grid fields have no horizontal plane; the distance is the pixel
    /// distance scaled with the magnification of a horizontal segment around
    /// the midpoint. This is an approximation that ignores the vertical
    /// magnification.
    pub fn distance_on_horizontal_plane(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Option<f64> {
        match &self.view {
            SensorView::LinearMagnification(_) => {
                let (a, b) = if let Some(model) = self.primary_oriented_model() {
                    let a = model.image_to_horizontal_plane(f64::from(x0), f64::from(y0))?;
                    let b = model.image_to_horizontal_plane(f64::from(x1), f64::from(y1))?;
                    (
                        Point2::new(a.x as f32, a.y as f32),
                        Point2::new(b.x as f32, b.y as f32),
                    )
                } else {
                    (self.coordinates(x0, y0)?, self.coordinates(x1, y1)?)
                };
                let d = b - a;
                Some(f64::from(d.x.hypot(d.y)))
            }
            SensorView::GridOnLaserPlane(_) => {
                let pixel_to_mm = self.pixel_to_mm_on_horizontal_plane(
                    (x1 - x0).abs() + 2,
                    (x0 + x1) / 2,
                    (y0 + y1) / 2,
                )?;
                let dx = f64::from((x1 - x0).abs());
                let dy = f64::from((y1 - y0).abs());
                Some(pixel_to_mm * dx.hypot(dy))
            }
            SensorView::Undefined => {
                log::error!("horizontal distance requested on a field without sensor model");
                None
            }
        }
    }

    /// mm per pixel along a horizontal segment centred on the pixel. The
    /// segment length is clamped to the sensor height.
    pub fn pixel_to_mm_on_horizontal_plane(
        &self,
        length: i32,
        center_x: i32,
        center_y: i32,
    ) -> Option<f64> {
        let (x0, x1) = segment(length, center_x, self.width_i32(), self.height_i32());
        let mm = if self.uses_oriented_line_calibration() {
            self.distance_on_horizontal_plane(x0, center_y, x1, center_y)?
        } else {
            let a = self.coordinates(x0, center_y)?;
            let b = self.coordinates(x1, center_y)?;
            let d = b - a;
            f64::from(d.x.hypot(d.y))
        };
        Some(mm / f64::from(x1 - x0))
    }

    /// Pixels at the given mm offsets from the tool centre point pixel
    /// `tcp`, measured on the horizontal plane of a coax field.
    ///
    /// Without an oriented line model the scale is estimated from the pixel
    /// `TCP_SCALE_STEP` pixels away on the diagonal, or closer when the
    /// sensor border is near. Returns an empty contour on failure.
    pub fn distance_tcp_mm_to_sensor_coord_coax(
        &self,
        contour_mm: &[Vector2<f64>],
        tcp: Point2<f64>,
    ) -> Vec<Point2<f64>> {
        match self.sensor_model() {
            SensorModel::CalibrationGridOnLaserPlane => {
                log::warn!("tcp distance not implemented for grid calibrated sensors");
                return Vec::new();
            }
            SensorModel::Undefined => {
                log::error!("tcp distance requested on a field without sensor model");
                return Vec::new();
            }
            SensorModel::LinearMagnification => {}
        }

        if let Some(model) = self.primary_oriented_model() {
            let mut out = Vec::with_capacity(contour_mm.len());
            for d in contour_mm {
                match model.distance_tcp_mm_to_sensor_coord(*d, tcp) {
                    Some(p) => out.push(p),
                    None => return Vec::new(),
                }
            }
            return out;
        }

        let tcp_px = (tcp.x.round() as i32, tcp.y.round() as i32);
        if self.screen_to_horizontal_plane(tcp_px.0, tcp_px.1).is_none() {
            log::warn!("TCP {} {} is not a valid point", tcp.x, tcp.y);
            return Vec::new();
        }

        let p1 = (tcp.x as i32, tcp.y as i32);
        let max_positive = (self.width_i32() - p1.0).min(self.height_i32() - p1.1);
        let max_negative = p1.0.max(p1.1);
        let delta = if max_positive > TCP_SCALE_STEP {
            TCP_SCALE_STEP
        } else if max_negative > TCP_SCALE_STEP {
            -TCP_SCALE_STEP
        } else if max_positive > max_negative {
            max_positive
        } else {
            -max_negative
        };
        let p2 = (p1.0 + delta, p1.1 + delta);

        let (Some(m1), Some(m2)) = (
            self.screen_to_horizontal_plane(p1.0, p1.1),
            self.screen_to_horizontal_plane(p2.0, p2.1),
        ) else {
            log::warn!("cannot estimate the scale around TCP {} {}", tcp.x, tcp.y);
            return Vec::new();
        };
        let scale_x = f64::from(m2.x - m1.x) / f64::from(p2.0 - p1.0);
        let scale_y = f64::from(m2.y - m1.y) / f64::from(p2.1 - p1.1);

        contour_mm
            .iter()
            .map(|d| Point2::new(tcp.x + d.x / scale_x, tcp.y + d.y / scale_y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldWriter;
    use lasercal_core::AngleUnit;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b}");
    }

    /// Coax field with 0.05 mm per pixel, origin at the centre.
    fn linear(width: usize, height: usize) -> CoordinateField {
        let mut field = CoordinateField::with_size(width, height, SensorModel::LinearMagnification);
        let (ox, oy) = ((width / 2) as f32, (height / 2) as f32);
        FieldWriter::new(&mut field).fill_with(|x, y| {
            ((x as f32 - ox) * 0.05, -(y as f32 - oy) * 0.05)
        });
        field
            .set_all_triangulation_angles(45.0, AngleUnit::Degrees)
            .expect("coax accepts angles");
        field
    }

    #[test]
    fn segment_is_clamped_inside_sensor() {
        assert_eq!(segment(100, 512, 1024, 1024), (462, 562));
        assert_eq!(segment(4, 512, 1024, 1024), (507, 517));
        assert_eq!(segment(100, 0, 1024, 1024), (0, 50));
        assert_eq!(segment(100, 1020, 1024, 1024), (923, 1023));
        assert_eq!(segment(5000, 10, 64, 64), (0, 42));
    }

    #[test]
    fn extreme_lengths_and_centres_saturate() {
        assert_eq!(segment(i32::MIN, 512, 1024, 1024), (0, 1023));
        assert_eq!(segment(100, i32::MAX, 1024, 1024), (923, 1023));
        assert_eq!(segment(100, i32::MIN, 1024, 1024), (0, 50));

        let field = linear(200, 100);
        let full = field.factor_horizontal(i32::MAX, 100, 50);
        assert_close(field.factor_horizontal(i32::MIN, 100, 50), full, 1e-9);
        assert!(field.factor_vertical(i32::MIN, 100, 50, LaserLine::Front) > 0.0);
        assert!(field.pixel_to_mm_on_horizontal_plane(i32::MIN, 100, 50).is_some());
    }

    #[test]
    fn horizontal_factor_is_inverse_pixel_size() {
        let field = linear(200, 100);
        assert_close(field.factor_horizontal(100, 100, 20), 20.0, 1e-3);
        assert_close(
            field.pixel_to_mm_on_horizontal_plane(50, 100, 20).expect("valid"),
            0.05,
            1e-6,
        );
        assert_close(
            field.distance_on_horizontal_plane(10, 10, 40, 50).expect("valid"),
            0.05 * 50.0,
            1e-4,
        );
    }

    #[test]
    fn vertical_factor_includes_height() {
        let field = linear(200, 100);
        // Y and Z both move by 0.05 mm per pixel at 45 degrees
        let f = field.factor_vertical(40, 100, 50, LaserLine::Front);
        assert_close(f, 1.0 / (0.05 * 2f64.sqrt()), 1e-2);
        let fz = field.factor_vertical_z(40, 100, 50, LaserLine::Front);
        assert_close(fz, 20.0, 1e-2);
    }

    #[test]
    fn invalid_segment_gives_unit_factor() {
        let field = CoordinateField::with_size(64, 64, SensorModel::LinearMagnification);
        assert_eq!(field.factor_horizontal(20, 30, 30), 1.0);
        assert_eq!(field.factor_vertical(20, 30, 30, LaserLine::Behind), 1.0);
    }

    #[test]
    fn tcp_offsets_map_back_to_pixels() {
        let field = linear(400, 300);
        let tcp = Point2::new(150.0, 120.0);
        let contour = [Vector2::new(1.0, 0.0), Vector2::new(0.0, 2.5)];
        let pix = field.distance_tcp_mm_to_sensor_coord_coax(&contour, tcp);
        assert_eq!(pix.len(), 2);
        assert_close(pix[0].x, 170.0, 1e-3);
        assert_close(pix[0].y, 120.0, 1e-3);
        assert_close(pix[1].x, 150.0, 1e-3);
        assert_close(pix[1].y, 70.0, 1e-3);
    }

    #[test]
    fn tcp_needs_coax_and_a_valid_pixel() {
        let field = linear(400, 300);
        let contour = [Vector2::new(1.0, 0.0)];
        assert!(field
            .distance_tcp_mm_to_sensor_coord_coax(&contour, Point2::new(-5.0, 10.0))
            .is_empty());
        let grid = CoordinateField::with_size(10, 10, SensorModel::CalibrationGridOnLaserPlane);
        assert!(grid
            .distance_tcp_mm_to_sensor_coord_coax(&contour, Point2::new(5.0, 5.0))
            .is_empty());
    }
}
