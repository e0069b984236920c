use std::collections::BTreeMap;

use lasercal_core::{LaserLine, SensorModel};

use crate::oriented::LinearMagnificationModel;

/// Triangulation angle per laser line, radians.
pub type TriangulationAngles = BTreeMap<LaserLine, f32>;

/// State of a linear magnification (coax) field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoaxView {
    pub(super) angles: TriangulationAngles,
    pub(super) oriented: BTreeMap<LaserLine, LinearMagnificationModel>,
}

impl CoaxView {
    pub fn angles(&self) -> &TriangulationAngles {
        &self.angles
    }

    pub fn oriented_models(&self) -> &BTreeMap<LaserLine, LinearMagnificationModel> {
        &self.oriented
    }
}

/// State of a field calibrated with a grid on the laser plane. All laser
/// lines share the stored plane, only the angle differs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridView {
    pub(super) angles: TriangulationAngles,
}

impl GridView {
    pub fn angles(&self) -> &TriangulationAngles {
        &self.angles
    }
}

/// Sensor model of a field together with the state only that model uses.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SensorView {
    #[default]
    Undefined,
    LinearMagnification(CoaxView),
    GridOnLaserPlane(GridView),
}

impl SensorView {
    pub fn new(model: SensorModel) -> Self {
        match model {
            SensorModel::Undefined => SensorView::Undefined,
            SensorModel::LinearMagnification => SensorView::LinearMagnification(CoaxView::default()),
            SensorModel::CalibrationGridOnLaserPlane => {
                SensorView::GridOnLaserPlane(GridView::default())
            }
        }
    }

    pub fn model(&self) -> SensorModel {
        match self {
            SensorView::Undefined => SensorModel::Undefined,
            SensorView::LinearMagnification(_) => SensorModel::LinearMagnification,
            SensorView::GridOnLaserPlane(_) => SensorModel::CalibrationGridOnLaserPlane,
        }
    }

    pub fn angles(&self) -> Option<&TriangulationAngles> {
        match self {
            SensorView::Undefined => None,
            SensorView::LinearMagnification(v) => Some(&v.angles),
            SensorView::GridOnLaserPlane(v) => Some(&v.angles),
        }
    }

    pub(super) fn angles_mut(&mut self) -> Option<&mut TriangulationAngles> {
        match self {
            SensorView::Undefined => None,
            SensorView::LinearMagnification(v) => Some(&mut v.angles),
            SensorView::GridOnLaserPlane(v) => Some(&mut v.angles),
        }
    }

    pub(super) fn oriented(&self) -> Option<&BTreeMap<LaserLine, LinearMagnificationModel>> {
        match self {
            SensorView::LinearMagnification(v) => Some(&v.oriented),
            _ => None,
        }
    }
}
