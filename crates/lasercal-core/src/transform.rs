use serde::{Deserialize, Serialize};

/// Affine map from grid plane coordinates to real world millimetres:
/// `real' = scale * (real + t)`, each axis optionally negated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealWorldTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for RealWorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RealWorldTransform {
    pub const fn identity() -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
            invert_x: false,
            invert_y: false,
        }
    }

    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let mut rx = self.scale * (x + self.tx);
        let mut ry = self.scale * (y + self.ty);
        if self.invert_x {
            rx = -rx;
        }
        if self.invert_y {
            ry = -ry;
        }
        (rx, ry)
    }

    /// True when the transform only rescales (no translation, no flips).
    pub fn has_only_scale(&self) -> bool {
        self.tx == 0.0 && self.ty == 0.0 && !self.invert_x && !self.invert_y
    }
}
