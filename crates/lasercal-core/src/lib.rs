//! Core types for laser triangulation sensor calibration.
//!
//! This crate holds the small geometric vocabulary shared by the corner
//! grid, the coordinate field and the loaders: screen/plane
//! correspondences, the real-world transform, 2-D line equations and the
//! laser line / sensor model enumerations. It does not know about grids or
//! dense fields.

mod image;
mod laser_line;
mod line;
mod logger;
mod plane_point;
mod transform;

pub use image::GrayImage;
pub use laser_line::{AngleUnit, LaserLine, SensorModel};
pub use line::{LineEquation, LineOrientation};
pub use plane_point::{CoordDimension, ScreenToPlane, SensorSize};
pub use transform::RealWorldTransform;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
