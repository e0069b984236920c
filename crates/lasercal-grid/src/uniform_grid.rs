use lasercal_core::{ScreenToPlane, SensorSize};

use crate::grid_map::CornerGridMap;

/// Grid sampled on a regular screen lattice.
///
/// Sample rows sit at `y = 0, step, 2*step, ...` plus the last sensor row,
/// columns likewise; all rows share the same screen x positions, so cells
/// resolve with [`crate::CellMode::FixedScreen`].
#[derive(Clone, Debug, PartialEq)]
pub struct UniformGridMap {
    map: CornerGridMap,
    step: usize,
}

impl AsRef<CornerGridMap> for UniformGridMap {
    fn as_ref(&self) -> &CornerGridMap {
        &self.map
    }
}

impl UniformGridMap {
    pub fn new(valid_area: SensorSize, step: usize) -> Self {
        Self {
            map: CornerGridMap::new(valid_area),
            step: step.max(1),
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn map(&self) -> &CornerGridMap {
        &self.map
    }

    /// Screen x positions of the sample columns.
    pub fn sample_columns(&self) -> Vec<usize> {
        sample_positions(self.map.valid_area().width, self.step)
    }

    /// Screen y positions of the sample rows.
    pub fn sample_rows(&self) -> Vec<usize> {
        sample_positions(self.map.valid_area().height, self.step)
    }

    /// Stores the samples of sensor row `y`. Rows must be pushed top to
    /// bottom; an empty row is skipped.
    pub fn push_row(&mut self, y: usize, samples: Vec<ScreenToPlane>) {
        if samples.is_empty() {
            return;
        }
        let y = y as i32;
        self.map.add_row(y, y, y, samples);
    }
}

/// `0, step, 2*step, ...` up to and including `len - 1`.
pub fn sample_positions(len: usize, step: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let mut out: Vec<usize> = (0..len).step_by(step.max(1)).collect();
    if out.last() != Some(&(len - 1)) {
        out.push(len - 1);
    }
    out
}
