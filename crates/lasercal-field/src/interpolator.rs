//! Densification of a corner grid into a [`CoordinateField`].
//!
//! Every valid cell between two adjacent grid rows is rasterized strip by
//! strip. Pixels touched by several cells accumulate their values and are
//! averaged afterwards; pixels no cell reached are interpolated from their
//! nearest resolved neighbours.

use lasercal_core::{CoordDimension, RealWorldTransform, ScreenToPlane, SensorModel, SensorSize};
use lasercal_grid::{
    pixel_range, CalibrationCornerGrid, Cell, CellCorners, CellMode, CornerGridMap,
    CornerPosition, EdgePosition,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::InterpolationError;
use crate::field::{CoordinateField, FieldWriter};

/// Strip heights below this are rejected.
const STRIP_EPS: f64 = 1e-9;

const VERTICAL_EDGES: [EdgePosition; 2] = [EdgePosition::Left, EdgePosition::Right];
const HORIZONTAL_EDGES: [EdgePosition; 2] = [EdgePosition::Top, EdgePosition::Bottom];

/// Linear interpolation between two correspondences.
#[derive(Clone, Copy, Debug)]
struct SegmentInterpolator {
    start: ScreenToPlane,
    delta: ScreenToPlane,
}

impl SegmentInterpolator {
    fn new(start: ScreenToPlane, end: ScreenToPlane) -> Self {
        Self {
            start,
            delta: end - start,
        }
    }

    fn edge(cell: &CellCorners, edge: EdgePosition) -> Self {
        let [a, b] = edge.corners();
        Self::new(cell[a as usize], cell[b as usize])
    }

    #[inline]
    fn interpolate(&self, t: f64) -> ScreenToPlane {
        self.start + self.delta * t
    }

    /// Parameter of `value` along `dim`, 0 for a segment flat in `dim`.
    #[inline]
    fn t_at(&self, value: f64, dim: CoordDimension) -> f64 {
        let d = self.delta.get(dim);
        if d == 0.0 {
            0.0
        } else {
            (value - self.start.get(dim)) / d
        }
    }

    #[inline]
    fn at(&self, value: f64, dim: CoordDimension) -> ScreenToPlane {
        self.interpolate(self.t_at(value, dim))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Extension {
    TowardStart = 0,
    TowardEnd = 1,
}

/// Virtual cell reaching `target` along `dim`.
///
/// On each edge parallel to `dim` the corner on the `direction` side is
/// moved to `target`; the other corner becomes the edge midpoint.
fn extend_cell(
    cell: &CellCorners,
    target: f64,
    direction: Extension,
    dim: CoordDimension,
) -> CellCorners {
    let edges = match dim {
        CoordDimension::ScreenY => VERTICAL_EDGES,
        _ => HORIZONTAL_EDGES,
    };
    let mut out = *cell;
    for edge in edges {
        let segment = SegmentInterpolator::edge(cell, edge);
        let corners = edge.corners();
        let moved = direction as usize;
        out[corners[moved] as usize] = segment.at(target, dim);
        out[corners[1 - moved] as usize] = segment.interpolate(0.5);
    }
    out
}

/// Real world corners of a cell, optionally re-expressed on its integer
/// screen bounding box. `None` when a rectified edge is flat.
fn real_world_corners(
    cell: &Cell<'_>,
    rectify: bool,
    transform: &RealWorldTransform,
) -> Option<CellCorners> {
    if !cell.is_valid() {
        return None;
    }
    let mut corners = cell.corners();
    if rectify {
        let range = pixel_range(&corners);
        let (x_min, x_max) = (range.x_min.floor(), range.x_max.floor());
        let (y_min, y_max) = (range.y_min.floor(), range.y_max.floor());

        let original = corners;
        for edge in VERTICAL_EDGES {
            let segment = SegmentInterpolator::edge(&original, edge);
            if segment.delta.screen_y == 0.0 {
                return None;
            }
            let [a, b] = edge.corners();
            corners[a as usize] = segment.at(y_min, CoordDimension::ScreenY);
            corners[b as usize] = segment.at(y_max, CoordDimension::ScreenY);
        }
        for edge in HORIZONTAL_EDGES {
            let segment = SegmentInterpolator::edge(&corners, edge);
            if segment.delta.screen_x == 0.0 {
                return None;
            }
            let [a, b] = edge.corners();
            corners[a as usize] = segment.at(x_min, CoordDimension::ScreenX);
            corners[b as usize] = segment.at(x_max, CoordDimension::ScreenX);
        }
    }
    Some(corners.map(|c| c.to_real_world(transform)))
}

fn keep_first(failure: &mut Option<InterpolationError>, result: Result<(), InterpolationError>) {
    if let Err(e) = result {
        failure.get_or_insert(e);
    }
}

/// Builds a [`CoordinateField`] for a grid on the laser plane.
///
/// The interpolator owns the write capability on the field for as long as
/// it lives, together with the per-pixel count of contributions.
pub struct CellInterpolator<'a> {
    writer: FieldWriter<'a>,
    times_computed: Vec<u32>,
    width: usize,
    height: usize,
}

impl<'a> CellInterpolator<'a> {
    /// Resets `field` to `size` with the grid-on-laser-plane model.
    pub fn new(field: &'a mut CoordinateField, size: SensorSize) -> Self {
        field.reset_grid_cell_data(size.width, size.height, SensorModel::CalibrationGridOnLaserPlane);
        Self {
            writer: FieldWriter::new(field),
            times_computed: vec![0; size.pixel_count()],
            width: size.width,
            height: size.height,
        }
    }

    /// Number of contributions accumulated on pixel `(x, y)`.
    pub fn times_computed(&self, x: usize, y: usize) -> u32 {
        self.times_computed[self.width * y + x]
    }

    #[inline]
    fn tc(&self, x: usize, y: usize) -> u32 {
        self.times_computed[self.width * y + x]
    }

    #[inline]
    fn add(&mut self, x: usize, y: usize, p: &ScreenToPlane) {
        self.writer.accumulate(x, y, p.real_x, p.real_y);
        self.times_computed[self.width * y + x] += 1;
    }

    fn clip_x(&self, x: f64) -> usize {
        (x.floor().max(0.0) as usize).min(self.width - 1)
    }

    fn clip_y(&self, y: f64) -> usize {
        (y.floor().max(0.0) as usize).min(self.height - 1)
    }

    /// Densifies every cell of `grid` into the field.
    ///
    /// With `extrapolate` the first and last cell of each row are extended
    /// to the left and right sensor border, and the cells of the first and
    /// last row to the top and bottom border. With `rectify` every cell is
    /// first re-expressed on its integer screen bounding box.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, grid), fields(rows = grid.row_count(), width = self.width, height = self.height))
    )]
    pub fn all_cells_to_3d(
        &mut self,
        grid: &CornerGridMap,
        extrapolate: bool,
        rectify: bool,
    ) -> Result<(), InterpolationError> {
        if self.width == 0 || self.height == 0 {
            return Err(InterpolationError::EmptySensor {
                width: self.width,
                height: self.height,
            });
        }
        let rows: Vec<_> = grid.rows().iter().collect();
        if rows.len() < 2 {
            log::error!("calibration grid needs two rows, found {}", rows.len());
            return Err(InterpolationError::TooFewRows(rows.len()));
        }
        let transform = *grid.transform();

        let (top, bottom) = (rows[0].1, rows[1].1);
        let mode = if top.len() >= 2 && bottom.len() >= 2 {
            CellMode::detect(top, bottom).unwrap_or(CellMode::FixedChessboard)
        } else {
            CellMode::FixedChessboard
        };
        log::debug!("cell mode {mode:?}");

        let mut failure: Option<InterpolationError> = None;
        let mut uppermost = true;
        let mut last_row_cells: Vec<CellCorners> = Vec::new();

        for pair in rows.windows(2) {
            let (&key, top) = pair[0];
            let (_, bottom) = pair[1];
            if top.len() < 2 || bottom.len() < 2 {
                log::error!("bad calibration grid, each line needs at least two corners");
                keep_first(&mut failure, Err(InterpolationError::RowTooShort { row: key }));
                break;
            }

            last_row_cells.clear();
            let mut first: Option<CellCorners> = None;
            let mut last: Option<CellCorners> = None;

            for top_left in 0..top.len() - 1 {
                let cell = Cell::resolve(top, bottom, top_left, mode);
                let Some(corners) = real_world_corners(&cell, rectify, &transform) else {
                    continue;
                };
                keep_first(&mut failure, self.cell_to_3d(&corners));
                if extrapolate {
                    last_row_cells.push(corners);
                    first.get_or_insert(corners);
                }
                last = Some(corners);
            }

            if extrapolate {
                let (Some(first), Some(last)) = (first, last) else {
                    log::error!("row {key} has no valid cell");
                    keep_first(&mut failure, Err(InterpolationError::NoValidCell { row: key }));
                    break;
                };
                let left = extend_cell(&first, 0.0, Extension::TowardStart, CoordDimension::ScreenX);
                keep_first(&mut failure, self.cell_to_3d(&left));
                last_row_cells.push(left);

                let right = extend_cell(
                    &last,
                    self.width as f64,
                    Extension::TowardEnd,
                    CoordDimension::ScreenX,
                );
                keep_first(&mut failure, self.cell_to_3d(&right));
                last_row_cells.push(right);

                if uppermost {
                    for cell in &last_row_cells {
                        let up = extend_cell(cell, 0.0, Extension::TowardStart, CoordDimension::ScreenY);
                        keep_first(&mut failure, self.cell_to_3d(&up));
                    }
                    uppermost = false;
                }
            }

            if failure.is_some() {
                break;
            }
        }

        if extrapolate && failure.is_none() {
            for cell in &last_row_cells {
                let down = extend_cell(
                    cell,
                    self.height as f64,
                    Extension::TowardEnd,
                    CoordDimension::ScreenY,
                );
                keep_first(&mut failure, self.cell_to_3d(&down));
            }
        }

        let result = match failure {
            Some(e) => Err(e),
            None => {
                self.normalize();
                self.compute_missing_grid_points()
            }
        };
        if result.is_err() {
            log::error!("Cannot determine 3D data.");
        }
        result
    }

    /// Rasterizes one cell into the accumulation buffers.
    fn cell_to_3d(&mut self, cell: &CellCorners) -> Result<(), InterpolationError> {
        let tl = cell[CornerPosition::TopLeft as usize];
        let tr = cell[CornerPosition::TopRight as usize];
        let bl = cell[CornerPosition::BottomLeft as usize];
        let br = cell[CornerPosition::BottomRight as usize];

        let len_left = (bl.screen_y - tl.screen_y).abs() as i64;
        let len_right = (br.screen_y - tr.screen_y).abs() as i64;

        if br.screen_x - bl.screen_x <= 0.0 || tr.screen_x - tl.screen_x <= 0.0 {
            log::error!("Two corners are overlapping! Origin cannot be determined.");
            return Err(InterpolationError::OverlappingCorners);
        }
        if (len_left == 0) != (len_right == 0) {
            log::error!("Scheimpflug grid incomplete.");
            return Err(InterpolationError::IncompleteGrid);
        }
        let strips = len_left.max(len_right) as f64;
        if strips < STRIP_EPS {
            log::error!("Scheimpflug grid too narrow in y-direction.");
            return Err(InterpolationError::GridTooNarrow);
        }

        let left_edge = SegmentInterpolator::new(tl, bl);
        let right_edge = SegmentInterpolator::new(tr, br);
        let (w, h) = (self.width as i64, self.height as i64);

        for i in 0..=(strips as i64) {
            let t = i as f64 / strips;
            let left = left_edge.interpolate(t);
            let right = right_edge.interpolate(t);
            let chord = SegmentInterpolator::new(left, right);

            let x_start = self.clip_x(left.screen_x);
            let x_end = self.clip_x(right.screen_x) + 1;
            for x in x_start..=x_end {
                let xf = x as f64;
                let mut p = chord.at(xf, CoordDimension::ScreenX);
                let mut px = p.screen_x.round() as i64;
                if px != x as i64 {
                    p = chord.at(xf + 0.1, CoordDimension::ScreenX);
                    px = p.screen_x.round() as i64;
                }
                let py = p.screen_y.round() as i64;
                if (0..w).contains(&px) && (0..h).contains(&py) {
                    self.add(px as usize, py as usize, &p);
                }
            }

            // chord ends can be missed by the x stepping
            for end in [left, right] {
                let (cx, cy) = (self.clip_x(end.screen_x), self.clip_y(end.screen_y));
                if self.tc(cx, cy) < 1 {
                    let p = chord.at(cx as f64, CoordDimension::ScreenX);
                    self.add(cx, cy, &p);
                }
            }
        }

        for corner in [tl, tr, bl, br] {
            let (cx, cy) = (self.clip_x(corner.screen_x), self.clip_y(corner.screen_y));
            if self.tc(cx, cy) < 1 {
                log::debug!("vertex not computed {cx} {cy}");
            }
        }
        Ok(())
    }

    /// Divides every pixel with several contributions by their count.
    pub fn normalize(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let i = self.width * y + x;
                let count = self.times_computed[i];
                if count > 1 {
                    self.writer.divide(x, y, count as f32);
                    self.times_computed[i] = 1;
                }
            }
        }
    }

    /// Fills pixels between the first and last resolved pixel of each row
    /// from their neighbours.
    ///
    /// Unresolved pixels are tolerated on the border columns of a row, on
    /// rows up to the first resolved one and on the last sensor row.
    pub fn compute_missing_grid_points(&mut self) -> Result<(), InterpolationError> {
        let (w, h) = (self.width, self.height);
        let mut first_valid_y = h;
        let mut unresolved = 0usize;

        for y in 0..h {
            let Some(start) = (0..w).find(|&x| self.tc(x, y) != 0) else {
                continue;
            };
            let end = (start..w).rev().find(|&x| self.tc(x, y) != 0).unwrap_or(start);
            if first_valid_y > y {
                first_valid_y = y;
            }
            let border_row = y <= first_valid_y || y + 1 >= h;

            let mut bent = 0usize;
            for x in start..=end {
                if self.tc(x, y) == 0 && !self.value_by_neighbours(x, y) {
                    log::debug!("could not interpolate missing grid point {x} {y}");
                }
                let border_column = x <= start || x >= end;
                if !border_row && !border_column && self.tc(x, y) == 0 {
                    bent += 1;
                }
            }
            if bent > 0 {
                log::error!(
                    "Line {y} (x from {start} to {end}) Cannot map {bent} coordinates to real world! Grid bends too much?"
                );
                unresolved += bent;
            }
        }

        if unresolved > 0 {
            Err(InterpolationError::GridBendsTooMuch { unresolved })
        } else {
            Ok(())
        }
    }

    /// Interpolates pixel `(x, y)` between the nearest resolved pixels
    /// above/below and left/right. Both axes contribute when available.
    fn value_by_neighbours(&mut self, x: usize, y: usize) -> bool {
        let (w, h) = (self.width as i64, self.height as i64);
        self.writer.set(x, y, 0.0, 0.0);
        self.times_computed[self.width * y + x] = 0;

        for dim in [CoordDimension::ScreenY, CoordDimension::ScreenX] {
            let (mut xa, mut ya, mut xb, mut yb) = (x as i64, y as i64, x as i64, y as i64);
            match dim {
                CoordDimension::ScreenX => {
                    xa += 1;
                    while xa < w - 1 && self.tc(xa as usize, y) == 0 {
                        xa += 1;
                    }
                    xb -= 1;
                    while xb > 0 && self.tc(xb as usize, y) == 0 {
                        xb -= 1;
                    }
                }
                _ => {
                    ya += 1;
                    while ya < h - 1 && self.tc(x, ya as usize) == 0 {
                        ya += 1;
                    }
                    yb -= 1;
                    while yb > 0 && self.tc(x, yb as usize) == 0 {
                        yb -= 1;
                    }
                }
            }
            let inside = |v: i64, max: i64| (0..max).contains(&v);
            if !(inside(xa, w) && inside(xb, w) && inside(ya, h) && inside(yb, h)) {
                break;
            }

            let (xa, ya, xb, yb) = (xa as usize, ya as usize, xb as usize, yb as usize);
            let (count_a, count_b) = (self.tc(xa, ya), self.tc(xb, yb));
            if count_a == 0 || count_b == 0 {
                continue;
            }
            let resolved = |(px, py): (f32, f32), count: u32, sx: usize, sy: usize| {
                let c = f64::from(count);
                ScreenToPlane::new(sx as f64, sy as f64, f64::from(px) / c, f64::from(py) / c)
            };
            let segment = SegmentInterpolator::new(
                resolved(self.writer.get(xa, ya), count_a, xa, ya),
                resolved(self.writer.get(xb, yb), count_b, xb, yb),
            );
            let target = match dim {
                CoordDimension::ScreenX => x as f64,
                _ => y as f64,
            };
            let p = segment.at(target, dim);
            self.add(x, y, &p);
        }

        let count = self.tc(x, y);
        if count == 0 {
            return false;
        }
        self.writer.divide(x, y, count as f32);
        self.times_computed[self.width * y + x] = 1;
        true
    }

    /// Real world position of screen point `(screen_x, screen_y)` inside a
    /// cell, the mean of the row-first and the column-first bilinear
    /// interpolation.
    pub fn cell_point_to_3d(corners: &CellCorners, screen_x: f64, screen_y: f64) -> ScreenToPlane {
        let edge = |e| SegmentInterpolator::edge(corners, e);

        let left = edge(EdgePosition::Left).at(screen_y, CoordDimension::ScreenY);
        let right = edge(EdgePosition::Right).at(screen_y, CoordDimension::ScreenY);
        let horizontal = SegmentInterpolator::new(left, right).at(screen_x, CoordDimension::ScreenX);

        let top = edge(EdgePosition::Top).at(screen_x, CoordDimension::ScreenX);
        let bottom = edge(EdgePosition::Bottom).at(screen_x, CoordDimension::ScreenX);
        let vertical = SegmentInterpolator::new(top, bottom).at(screen_y, CoordDimension::ScreenY);

        ScreenToPlane::new(
            screen_x,
            screen_y,
            0.5 * (horizontal.real_x + vertical.real_x),
            0.5 * (horizontal.real_y + vertical.real_y),
        )
    }

    /// Bakes the grid transform into the plane coordinates so that screen
    /// point `(screen_x, screen_y)` maps to `(expected_x, expected_y)`.
    ///
    /// The translation is computed in untransformed grid units, then the
    /// scale and flips of the stored transform are applied. On return the
    /// grid transform is the identity.
    pub fn apply_translation_to_set_origin(
        grid: &mut CalibrationCornerGrid,
        screen_x: f64,
        screen_y: f64,
        expected_x: f64,
        expected_y: f64,
    ) -> Result<(), InterpolationError> {
        let mut transform = *grid.transform();
        grid.set_transform(RealWorldTransform::identity());
        let Some(corners) = grid.find_cell_data(screen_x, screen_y) else {
            log::error!("no valid cell at origin pixel {screen_x} {screen_y}");
            return Err(InterpolationError::OriginOutsideGrid {
                x: screen_x,
                y: screen_y,
            });
        };
        let origin = Self::cell_point_to_3d(&corners, screen_x, screen_y);

        transform.tx -= origin.real_x;
        transform.ty -= origin.real_y;
        grid.set_transform(transform);
        grid.apply_transform();

        let mut shift = *grid.transform();
        shift.tx += expected_x;
        shift.ty += expected_y;
        grid.set_transform(shift);
        grid.apply_transform();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasercal_grid::GridRow;
    use nalgebra::Point2;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} vs {b}");
    }

    /// Regular chessboard: corner (i, j) at screen (20 + 40i, 20 + 40j).
    fn square_grid(columns: usize, rows: usize, size: SensorSize) -> CornerGridMap {
        let mut map = CornerGridMap::new(size);
        for j in 0..rows {
            let sy = 20.0 + 40.0 * j as f64;
            let row: GridRow = (0..columns)
                .map(|i| ScreenToPlane::new(20.0 + 40.0 * i as f64, sy, i as f64, j as f64))
                .collect();
            map.add_row(sy as i32, sy as i32 - 1, sy as i32 + 1, row);
        }
        map.set_transform(RealWorldTransform {
            scale: 2.0,
            invert_y: true,
            ..RealWorldTransform::identity()
        });
        map
    }

    #[test]
    fn segment_parameter_is_zero_on_flat_dimension() {
        let s = SegmentInterpolator::new(
            ScreenToPlane::new(1.0, 5.0, 0.0, 0.0),
            ScreenToPlane::new(3.0, 5.0, 2.0, 4.0),
        );
        assert_eq!(s.t_at(7.0, CoordDimension::ScreenY), 0.0);
        let p = s.at(2.0, CoordDimension::ScreenX);
        assert_eq!((p.real_x, p.real_y), (1.0, 2.0));
    }

    #[test]
    fn extended_cell_keeps_edge_midpoints() {
        let cell: CellCorners = [
            ScreenToPlane::new(10.0, 10.0, 0.0, 0.0),
            ScreenToPlane::new(20.0, 10.0, 1.0, 0.0),
            ScreenToPlane::new(10.0, 20.0, 0.0, 1.0),
            ScreenToPlane::new(20.0, 20.0, 1.0, 1.0),
        ];
        let left = extend_cell(&cell, 0.0, Extension::TowardStart, CoordDimension::ScreenX);
        assert_eq!(left[0], ScreenToPlane::new(0.0, 10.0, -1.0, 0.0));
        assert_eq!(left[1], ScreenToPlane::new(15.0, 10.0, 0.5, 0.0));
        assert_eq!(left[2], ScreenToPlane::new(0.0, 20.0, -1.0, 1.0));

        let down = extend_cell(&cell, 40.0, Extension::TowardEnd, CoordDimension::ScreenY);
        assert_eq!(down[0], ScreenToPlane::new(10.0, 15.0, 0.0, 0.5));
        assert_eq!(down[3], ScreenToPlane::new(20.0, 40.0, 1.0, 3.0));
    }

    #[test]
    fn rectified_corners_sit_on_integer_box() {
        let top: GridRow = vec![
            ScreenToPlane::new(10.5, 10.2, 0.0, 0.0),
            ScreenToPlane::new(30.7, 11.9, 1.0, 0.0),
        ];
        let bottom: GridRow = vec![
            ScreenToPlane::new(11.4, 30.3, 0.0, 1.0),
            ScreenToPlane::new(31.2, 29.6, 1.0, 1.0),
        ];
        let cell = Cell::resolve(&top, &bottom, 0, CellMode::FixedChessboard);
        let corners =
            real_world_corners(&cell, true, &RealWorldTransform::identity()).expect("valid cell");
        assert_close(corners[0].screen_x, 10.0, 1e-12);
        assert_close(corners[0].screen_y, 10.0, 1e-12);
        assert_close(corners[3].screen_x, 31.0, 1e-12);
        assert_close(corners[3].screen_y, 30.0, 1e-12);
        assert_close(corners[1].screen_y, 10.0, 1e-12);
        assert_close(corners[2].screen_x, 10.0, 1e-12);
    }

    #[test]
    fn regular_grid_densifies_exactly() {
        let size = SensorSize::new(240, 200);
        let grid = square_grid(6, 5, size);
        let mut field = CoordinateField::new();
        let mut interpolator = CellInterpolator::new(&mut field, size);
        interpolator
            .all_cells_to_3d(&grid, true, true)
            .expect("regular grid");
        drop(interpolator);

        assert!(field.is_scheimpflug_case());
        for (x, y) in [(20, 20), (60, 100), (0, 0), (239, 199), (137, 61), (5, 190)] {
            let p = field.coordinates(x, y).expect("covered");
            assert_close(f64::from(p.x), 2.0 * (f64::from(x) - 20.0) / 40.0, 1e-3);
            assert_close(f64::from(p.y), -2.0 * (f64::from(y) - 20.0) / 40.0, 1e-3);
        }
        assert!(field.check_discontinuities(false, false).is_empty());
    }

    #[test]
    fn without_extrapolation_borders_stay_empty() {
        let size = SensorSize::new(240, 200);
        let grid = square_grid(6, 5, size);
        let mut field = CoordinateField::new();
        CellInterpolator::new(&mut field, size)
            .all_cells_to_3d(&grid, false, true)
            .expect("regular grid");
        assert!(field.coordinates(5, 5).is_none());
        assert!(field.coordinates(230, 100).is_none());
        assert!(field.coordinates(100, 100).is_some());
    }

    #[test]
    fn grid_shape_errors() {
        let size = SensorSize::new(240, 200);
        let mut field = CoordinateField::new();

        let single = square_grid(6, 1, size);
        let err = CellInterpolator::new(&mut field, size)
            .all_cells_to_3d(&single, true, true)
            .expect_err("one row");
        assert_eq!(err, InterpolationError::TooFewRows(1));

        let mut short = square_grid(6, 2, size);
        short.add_row(100, 99, 101, vec![ScreenToPlane::new(20.0, 100.0, 0.0, 2.0)]);
        let err = CellInterpolator::new(&mut field, size)
            .all_cells_to_3d(&short, true, true)
            .expect_err("short row");
        assert_eq!(err, InterpolationError::RowTooShort { row: 60 });
    }

    #[test]
    fn overlapping_corners_are_rejected() {
        let size = SensorSize::new(50, 50);
        let mut field = CoordinateField::new();
        let mut interpolator = CellInterpolator::new(&mut field, size);
        let flat: CellCorners = [
            ScreenToPlane::new(10.0, 10.0, 0.0, 0.0),
            ScreenToPlane::new(10.0, 10.0, 1.0, 0.0),
            ScreenToPlane::new(10.0, 20.0, 0.0, 1.0),
            ScreenToPlane::new(20.0, 20.0, 1.0, 1.0),
        ];
        assert_eq!(
            interpolator.cell_to_3d(&flat),
            Err(InterpolationError::OverlappingCorners)
        );
        let thin: CellCorners = [
            ScreenToPlane::new(10.0, 10.0, 0.0, 0.0),
            ScreenToPlane::new(20.0, 10.0, 1.0, 0.0),
            ScreenToPlane::new(10.0, 10.5, 0.0, 1.0),
            ScreenToPlane::new(20.0, 14.0, 1.0, 1.0),
        ];
        assert_eq!(
            interpolator.cell_to_3d(&thin),
            Err(InterpolationError::IncompleteGrid)
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let size = SensorSize::new(4, 3);
        let mut field = CoordinateField::new();
        let mut interpolator = CellInterpolator::new(&mut field, size);
        let p = ScreenToPlane::new(1.0, 1.0, 2.0, -4.0);
        let q = ScreenToPlane::new(1.0, 1.0, 4.0, -2.0);
        interpolator.add(1, 1, &p);
        interpolator.add(1, 1, &q);
        interpolator.add(2, 1, &q);
        interpolator.normalize();
        let once = (interpolator.writer.get(1, 1), interpolator.writer.get(2, 1));
        interpolator.normalize();
        let twice = (interpolator.writer.get(1, 1), interpolator.writer.get(2, 1));
        assert_eq!(once, twice);
        assert_eq!(once.0, (3.0, -3.0));
        assert_eq!(interpolator.times_computed(1, 1), 1);
    }

    #[test]
    fn holes_are_filled_from_both_axes() {
        let size = SensorSize::new(5, 5);
        let mut field = CoordinateField::new();
        let mut interpolator = CellInterpolator::new(&mut field, size);
        for y in 0..5 {
            for x in 0..5 {
                if (x, y) != (2, 2) && (x, y) != (3, 2) {
                    let p = ScreenToPlane::new(x as f64, y as f64, x as f64 + 1.0, -(y as f64) - 1.0);
                    interpolator.add(x, y, &p);
                }
            }
        }
        interpolator.compute_missing_grid_points().expect("holes filled");
        let (vx, vy) = interpolator.writer.get(2, 2);
        assert_close(f64::from(vx), 3.0, 1e-6);
        assert_close(f64::from(vy), -3.0, 1e-6);
        assert_eq!(interpolator.times_computed(3, 2), 1);
    }

    #[test]
    fn cell_point_is_bilinear_inside_a_square() {
        let corners: CellCorners = [
            ScreenToPlane::new(0.0, 0.0, 0.0, 0.0),
            ScreenToPlane::new(10.0, 0.0, 1.0, 0.0),
            ScreenToPlane::new(0.0, 10.0, 0.0, 1.0),
            ScreenToPlane::new(10.0, 10.0, 1.0, 1.0),
        ];
        let p = CellInterpolator::cell_point_to_3d(&corners, 2.5, 7.5);
        assert_close(p.real_x, 0.25, 1e-12);
        assert_close(p.real_y, 0.75, 1e-12);
        assert_eq!(p.screen(), Point2::new(2.5, 7.5));
    }
}
