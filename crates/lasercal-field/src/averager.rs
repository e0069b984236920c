//! Averaging of several local grid calibrations into one uniform grid.
//!
//! Each input grid is densified on its own, sampled on a shared screen
//! lattice and blended with a weight that falls off with the squared
//! distance between the grid's target centre and the requested centre.

use lasercal_core::{ScreenToPlane, SensorSize};
use lasercal_grid::{CornerGridMap, UniformGridMap};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::AveragerError;
use crate::field::CoordinateField;
use crate::interpolator::CellInterpolator;
use crate::loader::GridBuildParams;

/// Default spacing of the uniform sample lattice, in pixels.
pub const DEFAULT_SAMPLE_STEP: usize = 16;

/// Normalized inverse squared distance weights of `centers` seen from
/// `center`.
///
/// Centres that coincide with `center` share the whole weight equally and
/// every other centre gets 0.
pub fn averaging_weights(centers: &[Point2<f64>], center: Point2<f64>) -> Vec<f64> {
    if centers.is_empty() {
        return Vec::new();
    }
    let squared: Vec<f64> = centers.iter().map(|c| (c - center).norm_squared()).collect();

    let exact = squared.iter().filter(|&&d| d == 0.0).count();
    if exact > 0 {
        let share = 1.0 / exact as f64;
        return squared
            .iter()
            .map(|&d| if d == 0.0 { share } else { 0.0 })
            .collect();
    }

    let inverse: Vec<f64> = squared.iter().map(|d| 1.0 / d).collect();
    let total: f64 = inverse.iter().sum();
    inverse.into_iter().map(|v| v / total).collect()
}

/// Valid pixels of `field` on the lattice of spacing `step`.
pub fn sample_uniform_grid(field: &CoordinateField, step: usize) -> UniformGridMap {
    let mut grid = UniformGridMap::new(field.sensor_size(), step);
    let columns = grid.sample_columns();
    for y in grid.sample_rows() {
        let samples = columns
            .iter()
            .filter_map(|&x| {
                field.coordinates(x as i32, y as i32).map(|p| {
                    ScreenToPlane::new(x as f64, y as f64, f64::from(p.x), f64::from(p.y))
                })
            })
            .collect();
        grid.push_row(y, samples);
    }
    grid
}

/// Builder of an averaged [`UniformGridMap`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformGridMapBuilder {
    pub size: SensorSize,
    pub step: usize,
    pub params: GridBuildParams,
}

impl UniformGridMapBuilder {
    pub fn new(size: SensorSize) -> Self {
        Self {
            size,
            step: DEFAULT_SAMPLE_STEP,
            params: GridBuildParams::default(),
        }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn with_params(mut self, params: GridBuildParams) -> Self {
        self.params = params;
        self
    }

    /// Blends `inputs`, each a grid with the target centre it was
    /// calibrated around, into one uniform grid for `center`.
    ///
    /// Each input carries one weight from [`averaging_weights`], applied to
    /// both plane coordinates. A lattice point is kept only where every
    /// input field is valid.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, inputs), fields(inputs = inputs.len(), step = self.step))
    )]
    pub fn build(
        &self,
        inputs: &[(CornerGridMap, Point2<f64>)],
        center: Point2<f64>,
    ) -> Result<UniformGridMap, AveragerError> {
        if inputs.is_empty() {
            log::error!("no grids to average");
            return Err(AveragerError::NoInputs);
        }
        let centers: Vec<Point2<f64>> = inputs.iter().map(|(_, c)| *c).collect();
        let weights = averaging_weights(&centers, center);
        log::debug!("averaging weights {weights:?}");

        let mut fields = Vec::with_capacity(inputs.len());
        for (map, _) in inputs {
            let mut field = CoordinateField::new();
            CellInterpolator::new(&mut field, self.size).all_cells_to_3d(
                map,
                self.params.extrapolate,
                self.params.rectify,
            )?;
            fields.push(field);
        }

        let mut averaged = UniformGridMap::new(self.size, self.step);
        let columns = averaged.sample_columns();
        let mut total = 0usize;
        for y in averaged.sample_rows() {
            let mut samples = Vec::with_capacity(columns.len());
            for &x in &columns {
                let mut sum = Point2::<f64>::origin();
                let mut complete = true;
                for (field, w) in fields.iter().zip(&weights) {
                    match field.coordinates(x as i32, y as i32) {
                        Some(p) => {
                            sum.x += w * f64::from(p.x);
                            sum.y += w * f64::from(p.y);
                        }
                        None => {
                            complete = false;
                            break;
                        }
                    }
                }
                if complete {
                    samples.push(ScreenToPlane::new(x as f64, y as f64, sum.x, sum.y));
                }
            }
            total += samples.len();
            averaged.push_row(y, samples);
        }

        if total == 0 {
            log::error!("averaged grids share no valid sample");
            return Err(AveragerError::NoCommonSamples);
        }
        log::info!("averaged {} grids into {total} samples", inputs.len());
        Ok(averaged)
    }

    /// [`Self::build`] followed by the densification of the averaged grid
    /// into `field`.
    pub fn build_field(
        &self,
        field: &mut CoordinateField,
        inputs: &[(CornerGridMap, Point2<f64>)],
        center: Point2<f64>,
    ) -> Result<UniformGridMap, AveragerError> {
        let averaged = self.build(inputs, center)?;
        CellInterpolator::new(field, self.size).all_cells_to_3d(
            averaged.map(),
            self.params.extrapolate,
            self.params.rectify,
        )?;
        Ok(averaged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lasercal_core::RealWorldTransform;
    use lasercal_grid::GridRow;

    /// 5x4 corner lattice with 30 px pitch, plane units scaled by `scale`
    /// and shifted by `offset`.
    fn grid(size: SensorSize, scale: f64, offset: f64) -> CornerGridMap {
        let mut map = CornerGridMap::new(size);
        for j in 0..4 {
            let sy = 15.0 + 30.0 * j as f64;
            let row: GridRow = (0..5)
                .map(|i| ScreenToPlane::new(15.0 + 30.0 * i as f64, sy, i as f64 + 1.0, j as f64 + 1.0))
                .collect();
            map.add_row(sy as i32, sy as i32, sy as i32, row);
        }
        map.set_transform(RealWorldTransform {
            scale,
            tx: offset,
            ty: offset,
            ..RealWorldTransform::identity()
        });
        map
    }

    #[test]
    fn weights_follow_inverse_square() {
        let w = averaging_weights(
            &[Point2::new(1.0, 0.0), Point2::new(0.0, 2.0)],
            Point2::origin(),
        );
        assert_relative_eq!(w[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(w[1], 0.2, epsilon = 1e-12);
        assert!(averaging_weights(&[], Point2::origin()).is_empty());
    }

    #[test]
    fn coincident_centres_share_weight() {
        let c = Point2::new(3.0, 4.0);
        let w = averaging_weights(&[c, Point2::new(0.0, 0.0), c], c);
        assert_eq!(w, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn no_inputs_fail() {
        let builder = UniformGridMapBuilder::new(SensorSize::new(10, 10));
        let err = builder.build(&[], Point2::origin()).expect_err("empty");
        assert!(matches!(err, AveragerError::NoInputs));
    }

    #[test]
    fn blend_of_identical_grids_is_the_grid() {
        let size = SensorSize::new(150, 120);
        let builder = UniformGridMapBuilder::new(size).with_step(10);
        let inputs = [
            (grid(size, 2.0, 0.0), Point2::new(10.0, 0.0)),
            (grid(size, 2.0, 0.0), Point2::new(-30.0, 5.0)),
        ];
        let averaged = builder.build(&inputs, Point2::origin()).expect("averaged");
        assert_eq!(averaged.map().row_count(), 13);

        let row = &averaged.map().rows()[&30];
        let sample = row.iter().find(|p| p.screen_x == 60.0).expect("sample");
        // corner lattice: (x - 15) / 30 + 1 grid units, times 2
        assert_relative_eq!(sample.real_x, 2.0 * (45.0 / 30.0 + 1.0), epsilon = 1e-3);
        assert_relative_eq!(sample.real_y, 2.0 * (15.0 / 30.0 + 1.0), epsilon = 1e-3);
    }

    #[test]
    fn blend_weights_the_nearest_grid() {
        let size = SensorSize::new(150, 120);
        let builder = UniformGridMapBuilder::new(size).with_step(30);
        let inputs = [
            (grid(size, 1.0, 0.0), Point2::new(1.0, 0.0)),
            (grid(size, 1.0, 10.0), Point2::new(2.0, 0.0)),
        ];
        let averaged = builder.build(&inputs, Point2::origin()).expect("averaged");
        // weights 0.8 / 0.2 on a 10 unit offset
        let sample = averaged.map().rows()[&60]
            .iter()
            .find(|p| p.screen_x == 90.0)
            .copied()
            .expect("sample");
        assert_relative_eq!(sample.real_x, 3.5 + 2.0, epsilon = 1e-3);
        assert_relative_eq!(sample.real_y, 2.5 + 2.0, epsilon = 1e-3);

        let mut field = CoordinateField::new();
        builder
            .build_field(&mut field, &inputs, Point2::origin())
            .expect("densified");
        let p = field.coordinates(90, 60).expect("valid");
        assert_relative_eq!(f64::from(p.x), 5.5, epsilon = 1e-3);
    }

    #[test]
    fn sampling_skips_invalid_pixels() {
        let mut field = CoordinateField::new();
        let size = SensorSize::new(150, 120);
        CellInterpolator::new(&mut field, size)
            .all_cells_to_3d(&grid(size, 1.0, 0.0), false, true)
            .expect("densified");
        let sampled = sample_uniform_grid(&field, 30);
        // without extrapolation row 0 lies above the first corner row
        assert!(!sampled.map().rows().contains_key(&0));
        let row = &sampled.map().rows()[&30];
        assert!(row.iter().all(|p| p.screen_x >= 15.0 && p.screen_x <= 135.0));
        assert_eq!(row.len(), 4);
    }
}
