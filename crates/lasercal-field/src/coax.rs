//! Coax (linear magnification) calibration parameters and the closed-form
//! field they define.

use std::collections::BTreeMap;

use lasercal_core::{AngleUnit, LaserLine, LineEquation, SensorModel};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::LoadError;
use crate::field::{CoordinateField, FieldWriter};
use crate::oriented::LinearMagnificationModel;

/// Tolerance of [`CoaxCalibrationData`] equality on real parameters.
const PARAMETER_TOLERANCE: f64 = 1e-10;

/// Triangulation angle from the coax magnifications of one laser line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangulationAngle {
    pub beta0: f64,
    pub betaz: f64,
    pub high_plane_on_image_top: bool,
}

impl TriangulationAngle {
    /// Whether an angle puts the high plane on the top of the image.
    pub fn high_plane_from_angle(angle_rad: f64) -> bool {
        angle_rad.tan() > 0.0
    }

    /// Signed angle following the line direction convention.
    pub fn angle_from_line_direction(angle_rad: f64, high_plane_on_image_top: bool) -> f64 {
        if high_plane_on_image_top {
            angle_rad.abs()
        } else {
            -angle_rad.abs()
        }
    }

    /// `atan2(betaz, beta0)` signed by the high plane flag. `None` when
    /// either magnification is null.
    pub fn radians(&self) -> Option<f64> {
        if self.beta0 == 0.0 || self.betaz == 0.0 {
            return None;
        }
        Some(Self::angle_from_line_direction(
            self.betaz.atan2(self.beta0),
            self.high_plane_on_image_top,
        ))
    }

    pub fn compute(&self, unit: AngleUnit) -> Option<f64> {
        self.radians().map(|a| unit.from_radians(a))
    }
}

/// Parameters of one laser line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineParameters {
    pub beta_z: f64,
    pub high_plane_on_image_top: bool,
    pub line_xy: LineEquation,
}

/// Coax calibration key values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CoaxCalibrationData {
    /// Magnification on the horizontal plane.
    pub beta0: f64,
    pub beta_z: f64,
    pub beta_z2: f64,
    pub beta_z_tcp: f64,
    /// Pixel pitch in mm.
    pub dpix_x: f64,
    pub dpix_y: f64,
    pub width: usize,
    pub height: usize,
    pub origin_x: usize,
    pub origin_y: usize,
    /// Read and written with the other keys, not used by the field.
    pub axis_factor: f64,
    pub high_plane_on_image_top: bool,
    pub high_plane_on_image_top_2: bool,
    pub high_plane_on_image_top_tcp: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    pub line_xy: LineEquation,
    pub line_xy_2: LineEquation,
    pub line_xy_tcp: LineEquation,
}

impl Default for CoaxCalibrationData {
    fn default() -> Self {
        let horizontal = LineEquation::new(0.0, 1.0, 0.0);
        Self {
            beta0: 0.5,
            beta_z: 0.5,
            beta_z2: 0.5,
            beta_z_tcp: 0.5,
            dpix_x: 0.0106,
            dpix_y: 0.0106,
            width: 1024,
            height: 1024,
            origin_x: 512,
            origin_y: 512,
            axis_factor: 1.0,
            high_plane_on_image_top: true,
            high_plane_on_image_top_2: true,
            high_plane_on_image_top_tcp: true,
            invert_x: false,
            invert_y: false,
            line_xy: horizontal,
            line_xy_2: horizontal,
            line_xy_tcp: horizontal,
        }
    }
}

/// Equal when every parameter matches, reals within 1e-10. The laser line
/// equations are not compared.
impl PartialEq for CoaxCalibrationData {
    fn eq(&self, other: &Self) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= PARAMETER_TOLERANCE;
        close(self.beta0, other.beta0)
            && close(self.beta_z, other.beta_z)
            && close(self.beta_z2, other.beta_z2)
            && close(self.beta_z_tcp, other.beta_z_tcp)
            && close(self.dpix_x, other.dpix_x)
            && close(self.dpix_y, other.dpix_y)
            && self.width == other.width
            && self.height == other.height
            && self.origin_x == other.origin_x
            && self.origin_y == other.origin_y
            && close(self.axis_factor, other.axis_factor)
            && self.high_plane_on_image_top == other.high_plane_on_image_top
            && self.high_plane_on_image_top_2 == other.high_plane_on_image_top_2
            && self.high_plane_on_image_top_tcp == other.high_plane_on_image_top_tcp
            && self.invert_x == other.invert_x
            && self.invert_y == other.invert_y
    }
}

impl CoaxCalibrationData {
    /// Reads the legacy key value list. Missing keys keep their default,
    /// flags are true for any non-zero value. A negative `xcc`/`ycc` puts
    /// the origin on the sensor centre.
    pub fn from_parameters(params: &BTreeMap<String, f64>) -> Self {
        let defaults = Self::default();
        let real = |key: &str, default: f64| params.get(key).copied().unwrap_or(default);
        let flag = |key: &str, default: bool| params.get(key).map_or(default, |&v| v != 0.0);
        let size = |key: &str, default: usize| {
            params
                .get(key)
                .map_or(default, |&v| if v > 0.0 { v as usize } else { 0 })
        };
        let line = |l: LaserLine, default: LineEquation| {
            let suffix = Self::parameter_key_suffix(l);
            let keys = ["a", "b", "c"].map(|k| format!("laserLine_{k}{suffix}"));
            if keys.iter().all(|k| params.contains_key(k)) {
                LineEquation::new(real(&keys[0], 0.0), real(&keys[1], 0.0), real(&keys[2], 0.0))
            } else {
                default
            }
        };

        let width = size("sensorWidth", defaults.width);
        let height = size("sensorHeight", defaults.height);
        let origin = |key: &str, default: usize, extent: usize| match params.get(key) {
            Some(&v) if v >= 0.0 => v as usize,
            Some(_) => extent / 2,
            None => default,
        };

        Self {
            beta0: real("beta0", defaults.beta0),
            beta_z: real("betaZ", defaults.beta_z),
            beta_z2: real("betaZ_2", defaults.beta_z2),
            beta_z_tcp: real("betaZ_TCP", defaults.beta_z_tcp),
            dpix_x: real("DpixX", defaults.dpix_x),
            dpix_y: real("DpixY", defaults.dpix_y),
            width,
            height,
            origin_x: origin("xcc", defaults.origin_x, width),
            origin_y: origin("ycc", defaults.origin_y, height),
            axis_factor: real("axisCorrectionFactorY", defaults.axis_factor),
            high_plane_on_image_top: flag("HighPlaneOnImageTop", true),
            high_plane_on_image_top_2: flag("HighPlaneOnImageTop_2", true),
            high_plane_on_image_top_tcp: flag("HighPlaneOnImageTop_TCP", true),
            invert_x: flag("InvertX", false),
            invert_y: flag("InvertY", false),
            line_xy: line(LaserLine::Front, defaults.line_xy),
            line_xy_2: line(LaserLine::Behind, defaults.line_xy_2),
            line_xy_tcp: line(LaserLine::Center, defaults.line_xy_tcp),
        }
    }

    /// Suffix of the per-line parameter keys.
    pub fn parameter_key_suffix(line: LaserLine) -> &'static str {
        line.parameter_suffix()
    }

    pub fn line_dependent_parameters(&self, line: LaserLine) -> LineParameters {
        match line {
            LaserLine::Front => LineParameters {
                beta_z: self.beta_z,
                high_plane_on_image_top: self.high_plane_on_image_top,
                line_xy: self.line_xy,
            },
            LaserLine::Behind => LineParameters {
                beta_z: self.beta_z2,
                high_plane_on_image_top: self.high_plane_on_image_top_2,
                line_xy: self.line_xy_2,
            },
            LaserLine::Center => LineParameters {
                beta_z: self.beta_z_tcp,
                high_plane_on_image_top: self.high_plane_on_image_top_tcp,
                line_xy: self.line_xy_tcp,
            },
        }
    }

    pub fn triangulation_angle(&self, line: LaserLine) -> TriangulationAngle {
        let params = self.line_dependent_parameters(line);
        TriangulationAngle {
            beta0: self.beta0,
            betaz: params.beta_z,
            high_plane_on_image_top: params.high_plane_on_image_top,
        }
    }

    /// Triangulation angle of `line` in degrees.
    pub fn compute_triangulation_angle(&self, line: LaserLine) -> Option<f64> {
        self.triangulation_angle(line).compute(AngleUnit::Degrees)
    }

    /// Human readable inconsistencies. An empty list means the parameters
    /// describe a usable coax sensor.
    pub fn check_consistency(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.beta0 == 0.0 {
            issues.push("beta0 is null".to_string());
        }
        if self.dpix_x <= 0.0 || self.dpix_y <= 0.0 {
            issues.push(format!("invalid pixel size {} x {}", self.dpix_x, self.dpix_y));
        }
        if self.origin_x >= self.width || self.origin_y >= self.height {
            issues.push(format!(
                "origin ({}, {}) outside the {}x{} sensor",
                self.origin_x, self.origin_y, self.width, self.height
            ));
        }
        for line in LaserLine::ALL {
            let params = self.line_dependent_parameters(line);
            if params.beta_z == 0.0 {
                issues.push(format!("betaZ of the {line} line is null"));
                continue;
            }
            let Some(angle) = self.triangulation_angle(line).radians() else {
                continue;
            };
            if angle.abs() >= std::f64::consts::FRAC_PI_2 {
                issues.push(format!("triangulation angle of the {line} line is not below 90 degrees"));
            }
            let expected = self.beta0 * angle.abs().tan();
            if (expected - params.beta_z.abs()).abs() > 1e-6 {
                issues.push(format!(
                    "betaZ of the {line} line ({}) does not match beta0 * tan(angle) ({expected})",
                    params.beta_z
                ));
            }
            if TriangulationAngle::high_plane_from_angle(angle) != params.high_plane_on_image_top {
                issues.push(format!("angle sign of the {line} line contradicts HighPlaneOnImageTop"));
            }
            if !params.line_xy.is_valid() {
                issues.push(format!("laser line equation of the {line} line is degenerate"));
            }
        }
        issues
    }
}

/// Fills `field` with the closed-form coax mapping of `data`.
///
/// `X = ±(x - origin_x) * dpix_x / beta0` and
/// `Y = ∓(y - origin_y) * dpix_y / beta0`, signs following the invert
/// flags. Every laser line gets its triangulation angle; with
/// `use_oriented_line` an oriented model is registered per line as well.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(field, data), fields(width = data.width, height = data.height))
)]
pub fn load_coax_model(
    field: &mut CoordinateField,
    data: &CoaxCalibrationData,
    use_oriented_line: bool,
) -> Result<(), LoadError> {
    if data.beta0 == 0.0 {
        log::error!("coax calibration with null beta0");
        return Err(LoadError::InvalidCoaxParameters("beta0 is null".into()));
    }
    if data.dpix_x == 0.0 || data.dpix_y == 0.0 {
        log::error!("coax calibration with null pixel size");
        return Err(LoadError::InvalidCoaxParameters(format!(
            "pixel size {} x {}",
            data.dpix_x, data.dpix_y
        )));
    }
    if data.width == 0 || data.height == 0 {
        log::error!("coax calibration with empty sensor");
        return Err(LoadError::InvalidCoaxParameters(format!(
            "sensor size {}x{}",
            data.width, data.height
        )));
    }

    let mut angles = Vec::with_capacity(LaserLine::COUNT);
    for line in LaserLine::ALL {
        let Some(angle) = data.compute_triangulation_angle(line) else {
            log::error!("cannot compute the triangulation angle of the {line} line");
            return Err(LoadError::InvalidCoaxParameters(format!(
                "null betaZ for the {line} line"
            )));
        };
        angles.push((line, angle));
    }

    field.reset_grid_cell_data(data.width, data.height, SensorModel::LinearMagnification);

    let factor_x = data.dpix_x / data.beta0;
    let factor_y = data.dpix_y / data.beta0;
    let sign_x = if data.invert_x { -1.0 } else { 1.0 };
    let sign_y = if data.invert_y { -1.0 } else { 1.0 };
    let (ox, oy) = (data.origin_x as f64, data.origin_y as f64);
    FieldWriter::new(field).fill_with(|x, y| {
        let vx = sign_x * (x as f64 - ox) * factor_x;
        let vy = -sign_y * (y as f64 - oy) * factor_y;
        (vx as f32, vy as f32)
    });

    for (line, angle) in angles {
        field.set_triangulation_angle(angle, AngleUnit::Degrees, line)?;
    }
    if use_oriented_line {
        for line in LaserLine::ALL {
            field.set_oriented_line_calibration(line, LinearMagnificationModel::from_coax(data, line))?;
        }
    }
    log::debug!(
        "coax field {}x{} loaded, beta0 {} dpix {} x {}",
        data.width,
        data.height,
        data.beta0,
        data.dpix_x,
        data.dpix_y
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b}");
    }

    #[test]
    fn angle_follows_high_plane_flag() {
        let up = TriangulationAngle {
            beta0: 1.0,
            betaz: 1.0,
            high_plane_on_image_top: true,
        };
        assert_close(up.compute(AngleUnit::Degrees).expect("valid"), 45.0, 1e-12);
        let down = TriangulationAngle {
            high_plane_on_image_top: false,
            ..up
        };
        assert_close(down.compute(AngleUnit::Degrees).expect("valid"), -45.0, 1e-12);
        assert!(TriangulationAngle::high_plane_from_angle(0.3));
        assert!(!TriangulationAngle::high_plane_from_angle(-0.3));
        assert_eq!(TriangulationAngle { betaz: 0.0, ..up }.radians(), None);
    }

    #[test]
    fn legacy_keys_are_read() {
        let params: BTreeMap<String, f64> = [
            ("beta0", 0.3),
            ("betaZ_2", 0.2),
            ("DpixX", 0.0066),
            ("sensorWidth", 1280.0),
            ("xcc", -1.0),
            ("ycc", 100.0),
            ("HighPlaneOnImageTop_TCP", 0.0),
            ("InvertX", 1.0),
            ("laserLine_a_2", 0.1),
            ("laserLine_b_2", 1.0),
            ("laserLine_c_2", -2.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        let data = CoaxCalibrationData::from_parameters(&params);
        assert_eq!(data.beta0, 0.3);
        assert_eq!(data.beta_z, 0.5);
        assert_eq!(data.beta_z2, 0.2);
        assert_eq!(data.width, 1280);
        assert_eq!(data.origin_x, 640);
        assert_eq!(data.origin_y, 100);
        assert!(!data.high_plane_on_image_top_tcp);
        assert!(data.invert_x);
        let behind = data.line_dependent_parameters(LaserLine::Behind);
        assert_eq!(behind.line_xy, LineEquation::new(0.1, 1.0, -2.0));
        assert_eq!(CoaxCalibrationData::parameter_key_suffix(LaserLine::Center), "_TCP");
    }

    #[test]
    fn equality_uses_tolerance_and_ignores_lines() {
        let a = CoaxCalibrationData::default();
        let mut b = a.clone();
        b.beta0 += 1e-12;
        b.line_xy = LineEquation::new(1.0, 1.0, 1.0);
        assert_eq!(a, b);
        b.origin_y += 1;
        assert_ne!(a, b);
    }

    #[test]
    fn default_parameters_are_consistent() {
        assert!(CoaxCalibrationData::default().check_consistency().is_empty());
        let broken = CoaxCalibrationData {
            beta_z2: 0.0,
            origin_x: 2000,
            ..CoaxCalibrationData::default()
        };
        let issues = broken.check_consistency();
        assert_eq!(issues.len(), 2, "{issues:?}");
    }

    #[test]
    fn closed_form_field_has_origin_and_angles() {
        let data = CoaxCalibrationData {
            width: 64,
            height: 48,
            origin_x: 32,
            origin_y: 24,
            ..CoaxCalibrationData::default()
        };
        let mut field = CoordinateField::new();
        load_coax_model(&mut field, &data, false).expect("valid parameters");
        assert_eq!(field.sensor_model(), SensorModel::LinearMagnification);
        let origin = field.to_3d(32, 24, LaserLine::Front).expect("origin");
        assert_eq!((origin.x, origin.y, origin.z), (0.0, 0.0, 0.0));
        let p = field.coordinates(33, 23).expect("valid");
        assert_close(f64::from(p.x), 0.0212, 1e-6);
        assert_close(f64::from(p.y), 0.0212, 1e-6);
        assert_close(field.triangulation_angle(AngleUnit::Degrees, LaserLine::Center), 45.0, 1e-4);
        assert!(!field.uses_oriented_line_calibration());
    }

    #[test]
    fn invalid_parameters_leave_field_untouched() {
        let mut field = CoordinateField::new();
        let err = load_coax_model(
            &mut field,
            &CoaxCalibrationData {
                beta_z_tcp: 0.0,
                ..CoaxCalibrationData::default()
            },
            false,
        )
        .expect_err("null betaZ");
        assert!(matches!(err, LoadError::InvalidCoaxParameters(_)));
        assert!(field.is_empty());
    }

    #[test]
    fn oriented_models_are_registered_on_request() {
        let mut field = CoordinateField::new();
        load_coax_model(&mut field, &CoaxCalibrationData::default(), true).expect("valid");
        assert!(field.uses_oriented_line_calibration());
        for line in LaserLine::ALL {
            assert!(field.oriented_line_calibration(line).is_some());
        }
        let p = field.to_3d(600, 400, LaserLine::Front).expect("valid");
        let q = field.coordinates(600, 400).expect("valid");
        assert_close(f64::from(p.x), f64::from(q.x), 1e-5);
        assert_close(f64::from(p.y), f64::from(q.y), 1e-5);
    }
}
