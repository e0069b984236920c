//! Binary transfer format of a built [`CoordinateField`].
//!
//! Little endian, in order:
//!
//! ```text
//! i32 width, i32 height
//! i32 count, f32[count] X      count is width*height, or 0 with oriented models
//! i32 count, f32[count] Y
//! i32 angles, angles x (i32 laser line, f32 radians)
//! i32 sensor model
//! i32 models, models x (i32 laser line, oriented model)
//! ```
//!
//! The tables are present exactly when no oriented model is registered.
//!
//! An oriented model is `f64 beta0, betaz, dpix_x, dpix_y, origin_x,
//! origin_y`, `i32 invert_x, invert_y, high_plane_on_image_top` and the
//! `f64 a, b, c` of its reference line.

use lasercal_core::{AngleUnit, LaserLine, LineEquation, SensorModel};

use crate::error::WireError;
use crate::field::{CoordinateField, FieldWriter};
use crate::oriented::LinearMagnificationModel;

/// Largest sensor accepted by [`deserialize`], in pixels.
pub const MAX_PIXELS: usize = 1 << 26;

/// Encodes `field`. The tables are left out when oriented line models are
/// registered.
pub fn serialize(field: &CoordinateField) -> Vec<u8> {
    let size = field.sensor_size();
    let mut out = Encoder::with_capacity(16 + 8 * size.pixel_count());
    out.i32(size.width as i32);
    out.i32(size.height as i32);

    let (xs, ys) = field.tables();
    let with_tables = !field.uses_oriented_line_calibration();
    for table in [xs, ys] {
        if with_tables {
            out.i32(table.len() as i32);
            table.iter().for_each(|&v| out.f32(v));
        } else {
            out.i32(0);
        }
    }

    match field.triangulation_angles() {
        Some(angles) => {
            out.i32(angles.len() as i32);
            for (line, &rad) in angles {
                out.i32(line.id());
                out.f32(rad);
            }
        }
        None => out.i32(0),
    }

    out.i32(field.sensor_model().id());

    let models: Vec<(LaserLine, &LinearMagnificationModel)> = LaserLine::ALL
        .into_iter()
        .filter_map(|line| field.oriented_line_calibration(line).map(|m| (line, m)))
        .collect();
    out.i32(models.len() as i32);
    for (line, model) in models {
        out.i32(line.id());
        out.oriented(model);
    }
    out.bytes
}

/// Decodes a field written by [`serialize`].
///
/// Angles and oriented models go through the same setters as a build, so a
/// blob that a build could not have produced is rejected.
pub fn deserialize(bytes: &[u8]) -> Result<CoordinateField, WireError> {
    let mut input = Decoder::new(bytes);
    let width = input.i32()?;
    let height = input.i32()?;
    if width < 0 || height < 0 {
        log::error!("invalid serialized sensor size {width}x{height}");
        return Err(WireError::InvalidSize { width, height });
    }
    let area = (width as usize)
        .checked_mul(height as usize)
        .filter(|&area| area <= MAX_PIXELS)
        .ok_or_else(|| {
            log::error!("serialized sensor size {width}x{height} is too large");
            WireError::TooLarge {
                width,
                height,
                max: MAX_PIXELS,
            }
        })?;

    let xs = input.table(area)?;
    let ys = input.table(area)?;
    if xs.len() != ys.len() {
        log::error!("serialized tables differ: {} X, {} Y values", xs.len(), ys.len());
        return Err(WireError::TableMismatch {
            x: xs.len(),
            y: ys.len(),
        });
    }

    let count = input.count()?;
    let mut angles = Vec::with_capacity(count.min(LaserLine::COUNT));
    for _ in 0..count {
        let line = input.laser_line()?;
        let rad = input.f32()?;
        angles.push((line, rad));
    }

    let model_id = input.i32()?;
    let model = SensorModel::from_id(model_id).ok_or(WireError::UnknownSensorModel(model_id))?;

    let count = input.count()?;
    let mut models = Vec::with_capacity(count.min(LaserLine::COUNT));
    for _ in 0..count {
        let line = input.laser_line()?;
        models.push((line, input.oriented()?));
    }

    match (xs.is_empty(), models.len()) {
        (true, 0) if area > 0 => {
            log::error!("serialized field has neither tables nor oriented line models");
            return Err(WireError::MissingTables);
        }
        (false, n) if n > 0 => {
            log::error!("serialized field has tables and {n} oriented line models");
            return Err(WireError::UnexpectedTables(n));
        }
        _ => {}
    }

    let mut field = CoordinateField::new();
    field.reset_grid_cell_data(width as usize, height as usize, model);
    FieldWriter::new(&mut field).copy_from(&xs, &ys)?;
    for (line, rad) in angles {
        field.set_triangulation_angle(f64::from(rad), AngleUnit::Radians, line)?;
    }
    field.reset_oriented_line_calibration();
    for (line, model) in models {
        field.set_oriented_line_calibration(line, model)?;
    }
    Ok(field)
}

struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    fn with_capacity(n: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(n),
        }
    }

    fn i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn oriented(&mut self, m: &LinearMagnificationModel) {
        for v in [m.beta0, m.betaz, m.dpix_x, m.dpix_y, m.origin_x, m.origin_y] {
            self.f64(v);
        }
        for flag in [m.invert_x, m.invert_y, m.high_plane_on_image_top] {
            self.i32(i32::from(flag));
        }
        let (a, b, c) = m.reference.coefficients(false);
        for v in [a, b, c] {
            self.f64(v);
        }
    }
}

struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let end = self.offset + N;
        let Some(chunk) = self.bytes.get(self.offset..end) else {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed: end - self.bytes.len(),
            });
        };
        let mut buf = [0u8; N];
        buf.copy_from_slice(chunk);
        self.offset = end;
        Ok(buf)
    }

    fn i32(&mut self) -> Result<i32, WireError> {
        self.take().map(i32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32, WireError> {
        self.take().map(f32::from_le_bytes)
    }

    fn f64(&mut self) -> Result<f64, WireError> {
        self.take().map(f64::from_le_bytes)
    }

    fn count(&mut self) -> Result<usize, WireError> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| WireError::NegativeCount(n))
    }

    fn laser_line(&mut self) -> Result<LaserLine, WireError> {
        let id = self.i32()?;
        LaserLine::from_id(id).ok_or(WireError::UnknownLaserLine(id))
    }

    /// `count` values, where `count` must be `expected` or 0.
    fn table(&mut self, expected: usize) -> Result<Vec<f32>, WireError> {
        let found = self.i32()?;
        let n = usize::try_from(found).map_err(|_| WireError::NegativeCount(found))?;
        if n != 0 && n != expected {
            log::error!("serialized table holds {n} values, sensor has {expected}");
            return Err(WireError::ArrayLength { found, expected });
        }
        let available = self.bytes.len().saturating_sub(self.offset);
        if available < 4 * n {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed: 4 * n - available,
            });
        }
        (0..n).map(|_| self.f32()).collect()
    }

    fn flag(&mut self) -> Result<bool, WireError> {
        self.i32().map(|v| v != 0)
    }

    fn oriented(&mut self) -> Result<LinearMagnificationModel, WireError> {
        let beta0 = self.f64()?;
        let betaz = self.f64()?;
        let dpix_x = self.f64()?;
        let dpix_y = self.f64()?;
        let origin_x = self.f64()?;
        let origin_y = self.f64()?;
        let invert_x = self.flag()?;
        let invert_y = self.flag()?;
        let high_plane_on_image_top = self.flag()?;
        let a = self.f64()?;
        let b = self.f64()?;
        let c = self.f64()?;
        Ok(LinearMagnificationModel {
            beta0,
            betaz,
            dpix_x,
            dpix_y,
            origin_x,
            origin_y,
            invert_x,
            invert_y,
            high_plane_on_image_top,
            reference: LineEquation::new(a, b, c),
        })
    }
}
