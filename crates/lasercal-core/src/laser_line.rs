use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical laser line a measurement belongs to.
///
/// The numeric ids are part of the wire format and of the legacy parameter
/// naming (`betaZ`, `betaZ_2`, `betaZ_TCP`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaserLine {
    Front = 0,
    Behind = 1,
    Center = 2,
}

impl LaserLine {
    /// Number of laser lines.
    pub const COUNT: usize = 3;

    pub const ALL: [LaserLine; Self::COUNT] = [LaserLine::Front, LaserLine::Behind, LaserLine::Center];

    #[inline]
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(LaserLine::Front),
            1 => Some(LaserLine::Behind),
            2 => Some(LaserLine::Center),
            _ => None,
        }
    }

    /// Suffix appended to per-line parameter keys.
    pub fn parameter_suffix(self) -> &'static str {
        match self {
            LaserLine::Front => "",
            LaserLine::Behind => "_2",
            LaserLine::Center => "_TCP",
        }
    }
}

impl fmt::Display for LaserLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaserLine::Front => "front",
            LaserLine::Behind => "behind",
            LaserLine::Center => "center",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    Radians,
    Degrees,
}

impl AngleUnit {
    #[inline]
    pub fn to_radians(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle.to_radians(),
        }
    }

    #[inline]
    pub fn from_radians(self, angle: f64) -> f64 {
        match self {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle.to_degrees(),
        }
    }
}

/// Physical sensor geometry. Ids match the serialized tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorModel {
    #[default]
    Undefined = 0,
    /// Coax optics: closed-form linear magnification.
    LinearMagnification = 1,
    /// Scheimpflug optics: calibration grid lying on the laser plane.
    CalibrationGridOnLaserPlane = 2,
}

impl SensorModel {
    #[inline]
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(SensorModel::Undefined),
            1 => Some(SensorModel::LinearMagnification),
            2 => Some(SensorModel::CalibrationGridOnLaserPlane),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for line in LaserLine::ALL {
            assert_eq!(LaserLine::from_id(line.id()), Some(line));
        }
        assert_eq!(LaserLine::from_id(3), None);
        assert_eq!(SensorModel::from_id(2), Some(SensorModel::CalibrationGridOnLaserPlane));
        assert_eq!(SensorModel::from_id(-1), None);
    }

    #[test]
    fn degrees_convert_with_pi() {
        let deg = AngleUnit::Degrees.from_radians(std::f64::consts::FRAC_PI_2);
        assert!((deg - 90.0).abs() < 1e-12);
        assert!((AngleUnit::Degrees.to_radians(180.0) - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&LaserLine::Center).expect("serialize");
        assert_eq!(json, "\"center\"");
        let model: SensorModel =
            serde_json::from_str("\"linear_magnification\"").expect("deserialize");
        assert_eq!(model, SensorModel::LinearMagnification);
    }
}
