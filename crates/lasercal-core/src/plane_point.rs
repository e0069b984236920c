use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

use crate::transform::RealWorldTransform;

/// One of the four components of a [`ScreenToPlane`] correspondence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoordDimension {
    ScreenX,
    ScreenY,
    RealX,
    RealY,
}

/// Correspondence between a sensor pixel position and a plane position in mm.
///
/// Arithmetic acts component-wise on all four values, which is what the
/// edge and chord interpolation needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenToPlane {
    pub screen_x: f64,
    pub screen_y: f64,
    pub real_x: f64,
    pub real_y: f64,
}

impl ScreenToPlane {
    pub fn new(screen_x: f64, screen_y: f64, real_x: f64, real_y: f64) -> Self {
        Self {
            screen_x,
            screen_y,
            real_x,
            real_y,
        }
    }

    #[inline]
    pub fn get(&self, dim: CoordDimension) -> f64 {
        match dim {
            CoordDimension::ScreenX => self.screen_x,
            CoordDimension::ScreenY => self.screen_y,
            CoordDimension::RealX => self.real_x,
            CoordDimension::RealY => self.real_y,
        }
    }

    #[inline]
    pub fn screen(&self) -> Point2<f64> {
        Point2::new(self.screen_x, self.screen_y)
    }

    #[inline]
    pub fn real(&self) -> Point2<f64> {
        Point2::new(self.real_x, self.real_y)
    }

    /// Copy with the plane part mapped through `transform`.
    pub fn to_real_world(&self, transform: &RealWorldTransform) -> Self {
        let (real_x, real_y) = transform.apply(self.real_x, self.real_y);
        Self {
            real_x,
            real_y,
            ..*self
        }
    }
}

impl Add for ScreenToPlane {
    type Output = ScreenToPlane;

    fn add(self, rhs: Self) -> Self::Output {
        ScreenToPlane::new(
            self.screen_x + rhs.screen_x,
            self.screen_y + rhs.screen_y,
            self.real_x + rhs.real_x,
            self.real_y + rhs.real_y,
        )
    }
}

impl Sub for ScreenToPlane {
    type Output = ScreenToPlane;

    fn sub(self, rhs: Self) -> Self::Output {
        ScreenToPlane::new(
            self.screen_x - rhs.screen_x,
            self.screen_y - rhs.screen_y,
            self.real_x - rhs.real_x,
            self.real_y - rhs.real_y,
        )
    }
}

impl Mul<f64> for ScreenToPlane {
    type Output = ScreenToPlane;

    fn mul(self, rhs: f64) -> Self::Output {
        ScreenToPlane::new(
            self.screen_x * rhs,
            self.screen_y * rhs,
            self.real_x * rhs,
            self.real_y * rhs,
        )
    }
}

/// Sensor dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorSize {
    pub width: usize,
    pub height: usize,
}

impl SensorSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn contains_f64(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
