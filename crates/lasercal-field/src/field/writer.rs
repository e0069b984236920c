use lasercal_core::SensorSize;

use super::coords::CoordinateField;
use crate::error::WireError;

/// Exclusive write access to the table of a [`CoordinateField`].
///
/// Only the builders of this crate hold one; the field itself has no public
/// mutator besides [`CoordinateField::reset_grid_cell_data`].
pub(crate) struct FieldWriter<'a> {
    field: &'a mut CoordinateField,
}

impl<'a> FieldWriter<'a> {
    pub(crate) fn new(field: &'a mut CoordinateField) -> Self {
        Self { field }
    }

    pub(crate) fn size(&self) -> SensorSize {
        self.field.size
    }

    #[inline]
    pub(crate) fn get(&self, x: usize, y: usize) -> (f32, f32) {
        self.field.raw(x, y)
    }

    #[inline]
    pub(crate) fn set(&mut self, x: usize, y: usize, vx: f32, vy: f32) {
        let i = self.field.index(x, y);
        self.field.x[i] = vx;
        self.field.y[i] = vy;
    }

    /// Adds a contribution computed in double precision.
    #[inline]
    pub(crate) fn accumulate(&mut self, x: usize, y: usize, vx: f64, vy: f64) {
        let i = self.field.index(x, y);
        let px = &mut self.field.x[i];
        *px = (f64::from(*px) + vx) as f32;
        let py = &mut self.field.y[i];
        *py = (f64::from(*py) + vy) as f32;
    }

    #[inline]
    pub(crate) fn divide(&mut self, x: usize, y: usize, count: f32) {
        let i = self.field.index(x, y);
        self.field.x[i] /= count;
        self.field.y[i] /= count;
    }

    /// Overwrites every pixel, row by row.
    pub(crate) fn fill_with<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize) -> (f32, f32),
    {
        let SensorSize { width, height } = self.field.size;
        for y in 0..height {
            for x in 0..width {
                let (vx, vy) = f(x, y);
                self.set(x, y, vx, vy);
            }
        }
    }

    /// Copies both tables. Empty slices leave the field not computed.
    pub(crate) fn copy_from(&mut self, xs: &[f32], ys: &[f32]) -> Result<(), WireError> {
        let expected = self.field.x.len();
        for values in [xs, ys] {
            if !values.is_empty() && values.len() != expected {
                return Err(WireError::ArrayLength {
                    found: values.len() as i32,
                    expected,
                });
            }
        }
        if !xs.is_empty() {
            self.field.x.copy_from_slice(xs);
        }
        if !ys.is_empty() {
            self.field.y.copy_from_slice(ys);
        }
        Ok(())
    }
}
