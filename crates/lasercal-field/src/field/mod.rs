//! Dense pixel to plane coordinate field.
//!
//! [`CoordinateField`] owns one `(X, Y)` pair per sensor pixel plus the
//! state of the sensor model it was built for. The pair lives on the plane
//! the calibration was made on: the horizontal plane for linear
//! magnification (coax) sensors and the laser plane for sensors calibrated
//! with a grid lying on the laser plane (Scheimpflug).

mod checks;
mod coords;
mod magnification;
mod render;
mod view;
mod writer;

pub use coords::CoordinateField;
pub use render::{CoordinatePlane, Roi};
pub use view::{CoaxView, GridView, SensorView, TriangulationAngles};
pub(crate) use writer::FieldWriter;

#[cfg(feature = "image")]
pub use render::save_png;
