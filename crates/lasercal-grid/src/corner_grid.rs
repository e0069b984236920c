//! Corner grid built from photographed chessboard corners.
//!
//! [`CalibrationCornerGrid::compute_corner_data`] turns rows of raw corner
//! pixels into a [`CornerGridMap`] whose plane coordinates are chessboard
//! indices (column, row). A line is fitted through every chessboard row and
//! column; the fits are used for plausibility logging, optional
//! linearization of the corners and navigation.

use lasercal_core::{LineEquation, LineOrientation, RealWorldTransform, ScreenToPlane, SensorSize};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::cam_grid::RawGrid;
use crate::cell::{Cell, CellCorners, CellMode, CornerPosition};
use crate::error::CornerGridError;
use crate::grid_map::{CornerGridMap, GridRow};

/// Maximum screen x drift of a chessboard column between rows.
pub const DEFAULT_MAX_X_DELTA: i32 = 20;

/// Rows whose y ranges touch within this many pixels are merged.
const ROW_MERGE_TOLERANCE: i32 = 10;

#[derive(Clone, Debug, Default)]
pub struct CalibrationCornerGrid {
    map: CornerGridMap,
    horizontal_lines: Vec<LineEquation>,
    vertical_lines: Vec<LineEquation>,
    columns: usize,
}

impl AsRef<CornerGridMap> for CalibrationCornerGrid {
    fn as_ref(&self) -> &CornerGridMap {
        &self.map
    }
}

impl CalibrationCornerGrid {
    pub fn new(valid_area: SensorSize) -> Self {
        Self {
            map: CornerGridMap::new(valid_area),
            ..Self::default()
        }
    }

    /// Convenience: new grid plus [`Self::compute_corner_data`].
    pub fn from_raw_grid(
        valid_area: SensorSize,
        rows: &RawGrid,
        max_x_delta: i32,
        linearize: bool,
    ) -> Result<Self, CornerGridError> {
        let mut grid = Self::new(valid_area);
        grid.compute_corner_data(rows, max_x_delta, linearize)?;
        Ok(grid)
    }

    pub fn reset(&mut self, valid_area: SensorSize) {
        *self = Self::new(valid_area);
    }

    pub fn map(&self) -> &CornerGridMap {
        &self.map
    }

    pub fn transform(&self) -> &RealWorldTransform {
        self.map.transform()
    }

    pub fn set_transform(&mut self, transform: RealWorldTransform) {
        self.map.set_transform(transform);
    }

    pub fn apply_transform(&mut self) {
        self.map.apply_transform();
    }

    pub fn row_count(&self) -> usize {
        self.map.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// Assigns chessboard indices to raw corners.
    ///
    /// `rows` maps each row's average screen y to its corners sorted by x.
    /// Corners of one column may drift by at most `max_x_delta` pixels
    /// between rows. Rows whose y ranges touch are merged, a trailing row
    /// with fewer than two corners is dropped. On success the transform
    /// flips y so that plane y grows towards the top of the image.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, rows), fields(rows = rows.len())))]
    pub fn compute_corner_data(
        &mut self,
        rows: &RawGrid,
        max_x_delta: i32,
        linearize: bool,
    ) -> Result<(), CornerGridError> {
        self.reset(self.map.valid_area());

        let mut last_x: Vec<i32> = Vec::new();
        let mut index_row = 0usize;

        for (&avg_y, corners) in rows {
            let mut y_min = avg_y + 1;
            let mut y_max = avg_y - 1;
            let mut line: GridRow = Vec::with_capacity(corners.len());
            let mut x_old = corners.first().map_or(0, |c| c.x - max_x_delta - 1);
            let mut index_col_expected = 0usize;

            for (k, corner) in corners.iter().enumerate() {
                let (x, y) = (corner.x, corner.y);
                y_min = y_min.min(y);
                y_max = y_max.max(y);

                if x <= x_old {
                    log::error!("row {avg_y}: x coordinates are not sorted ({x_old} -> {x})");
                    return Err(CornerGridError::NotSorted { row: avg_y, x });
                }
                if x <= x_old + max_x_delta {
                    log::error!("row {avg_y}: x coordinates are too close ({x_old} -> {x})");
                    return Err(CornerGridError::TooClose {
                        row: avg_y,
                        x,
                        previous: x_old,
                    });
                }

                let mut index_col = 0usize;
                while index_col < last_x.len() && x > last_x[index_col] + max_x_delta {
                    index_col += 1;
                }
                if index_col_expected != 0 && index_col > index_col_expected {
                    log::error!(
                        "row {avg_y}: column at x = {} missing between {x_old} and {x}",
                        last_x[index_col_expected]
                    );
                    return Err(CornerGridError::NotContiguous { row: avg_y, x });
                }

                if index_col == last_x.len() {
                    last_x.extend(corners[k..].iter().map(|c| c.x));
                }

                let expected_x_min = last_x[index_col] - max_x_delta;
                if x < expected_x_min {
                    if index_col > 0 {
                        log::error!(
                            "row {avg_y}: x = {x} falls between columns {} and {}",
                            last_x[index_col - 1],
                            last_x[index_col]
                        );
                        return Err(CornerGridError::UnexpectedColumn { row: avg_y, x });
                    }
                    let new_columns: Vec<i32> = corners[k..]
                        .iter()
                        .map(|c| c.x)
                        .take_while(|&cx| cx < expected_x_min)
                        .collect();
                    let offset = new_columns.len();
                    for (n, cx) in new_columns.into_iter().enumerate() {
                        last_x.insert(index_col + n, cx);
                    }
                    for stored in self.map.rows_mut().values_mut() {
                        for p in stored.iter_mut() {
                            if p.real_x >= index_col as f64 {
                                p.real_x += offset as f64;
                            }
                        }
                    }
                }

                line.push(ScreenToPlane::new(
                    x as f64,
                    y as f64,
                    index_col as f64,
                    index_row as f64,
                ));
                last_x[index_col] = x;
                index_col_expected = index_col + 1;
                x_old = x;
            }

            let candidates: Vec<i32> = self
                .map
                .line_boundaries()
                .iter()
                .filter(|(_, b)| {
                    (y_min - b.y_max).abs() < ROW_MERGE_TOLERANCE
                        || (y_max - b.y_min).abs() < ROW_MERGE_TOLERANCE
                })
                .map(|(&key, _)| key)
                .collect();
            if candidates.len() > 1 {
                log::warn!("row {avg_y}: touches {} rows, merging into the first", candidates.len());
            }

            if !(avg_y + 1 >= y_min && avg_y - 1 <= y_max) {
                log::error!("wrong input data: average y {avg_y} outside [{y_min}, {y_max}]");
                return Err(CornerGridError::WrongRowRange {
                    row: avg_y,
                    y_min,
                    y_max,
                });
            }

            match candidates.first() {
                None => {
                    self.map.add_row(avg_y, y_min, y_max, line);
                    index_row += 1;
                }
                Some(&into) => {
                    self.merge_row(avg_y, into, y_min, y_max, &line, &last_x, max_x_delta)?;
                }
            }
        }

        if let Some((&last_key, last_row)) = self.map.rows().iter().next_back() {
            if last_row.len() < 2 {
                log::info!("trimming last row {last_key}");
                self.map.remove_row(last_key);
            }
        }
        self.columns = last_x.len();

        self.fit_lines();
        if linearize {
            log::info!("linearizing corners");
            for p in self.align_points(1.0) {
                match self.linearized_corner_position(p.real_x as usize, p.real_y as usize) {
                    Some(q) => log::debug!(
                        "adjusted [{} {}] to [{:.3} {:.3}]",
                        p.screen_x,
                        p.screen_y,
                        q.x,
                        q.y
                    ),
                    None => log::debug!("invalid position for corner [{} {}]", p.screen_x, p.screen_y),
                }
            }
        }

        let mut transform = *self.map.transform();
        transform.invert_y = true;
        self.map.set_transform(transform);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn merge_row(
        &mut self,
        row: i32,
        into: i32,
        y_min: i32,
        y_max: i32,
        line: &[ScreenToPlane],
        last_x: &[i32],
        max_x_delta: i32,
    ) -> Result<(), CornerGridError> {
        log::debug!("merging row {row} into row {into}");
        if let Some(bounds) = self.map.bounds_mut().get_mut(&into) {
            bounds.y_min = bounds.y_min.min(y_min);
            bounds.y_max = bounds.y_max.max(y_max);
        }
        let Some(target) = self.map.rows_mut().get_mut(&into) else {
            return Ok(());
        };
        let Some(new_index_row) = target.first().map(|p| p.real_y) else {
            return Err(CornerGridError::MergeConflict { row, into });
        };

        for pt in line {
            let mut new_index_col = 0usize;
            while new_index_col < last_x.len()
                && ((last_x[new_index_col] + max_x_delta) as f64) < pt.screen_x
            {
                new_index_col += 1;
            }
            let pos = target
                .iter()
                .position(|s| s.screen_x >= pt.screen_x)
                .unwrap_or(target.len());
            let conflict = match target.get(pos) {
                Some(next) => next.real_x <= new_index_col as f64,
                None => pos > 0 && target[pos - 1].real_x >= new_index_col as f64,
            };
            if conflict {
                log::error!("row {row}: cannot merge corner at x = {} into row {into}", pt.screen_x);
                return Err(CornerGridError::MergeConflict { row, into });
            }
            target.insert(
                pos,
                ScreenToPlane::new(pt.screen_x, pt.screen_y, new_index_col as f64, new_index_row),
            );
        }
        Ok(())
    }

    /// Fits one line per chessboard row and column. Corners further than
    /// a pixel from their fit are logged as distortion.
    pub fn fit_lines(&mut self) -> bool {
        if self.map.is_empty() {
            return false;
        }
        let mut columns_x: Vec<Vec<f64>> = vec![Vec::new(); self.columns];
        let mut columns_y: Vec<Vec<f64>> = vec![Vec::new(); self.columns];
        let mut horizontal = Vec::with_capacity(self.map.row_count());

        for row in self.map.rows().values() {
            if row.is_empty() {
                continue;
            }
            let xs: Vec<f64> = row.iter().map(|p| p.screen_x).collect();
            let ys: Vec<f64> = row.iter().map(|p| p.screen_y).collect();
            for p in row {
                let i = p.real_x as usize;
                if i < self.columns {
                    columns_x[i].push(p.screen_x);
                    columns_y[i].push(p.screen_y);
                }
            }
            let fit = LineEquation::fit(&xs, &ys, LineOrientation::Horizontal);
            for (&x, &y) in xs.iter().zip(&ys) {
                let expected = fit.y_at(x);
                if fit.distance(x, y) > 1.0 || (expected - y).abs() > 2.0 {
                    log::warn!("distortion at corner ({x}, {y}): y should be {expected:.2}");
                }
            }
            horizontal.push(fit);
        }

        let mut vertical = Vec::with_capacity(self.columns);
        for (xs, ys) in columns_x.iter().zip(&columns_y) {
            let fit = LineEquation::fit(xs, ys, LineOrientation::Vertical);
            for (&x, &y) in xs.iter().zip(ys) {
                let expected = fit.x_at(y);
                if fit.distance(x, y) > 1.0 || (expected - x).abs() > 2.0 {
                    log::warn!("distortion at corner ({x}, {y}): x should be {expected:.2}");
                }
            }
            vertical.push(fit);
        }

        for (j, line) in horizontal.iter().enumerate() {
            if line.is_valid() {
                log::trace!(
                    "row {j}: inclination {:.3} deg through (0, {:.2})",
                    line.inclination_degrees(),
                    line.y_at(0.0)
                );
            }
        }
        self.horizontal_lines = horizontal;
        self.vertical_lines = vertical;
        true
    }

    /// Moves every corner onto the intersection of its row and column fit.
    ///
    /// Returns the original corners that moved by more than `threshold`
    /// pixels or could not be snapped. Corners without an intersection or
    /// with one outside the sensor keep their position.
    pub fn align_points(&mut self, threshold: f64) -> Vec<ScreenToPlane> {
        let valid_area = self.map.valid_area();
        let mut moved = Vec::new();
        let mut updates = Vec::new();

        for (&key, row) in self.map.rows() {
            for (idx, p) in row.iter().enumerate() {
                let Some(q) = self.linearized_corner_position(p.real_x as usize, p.real_y as usize)
                else {
                    log::warn!("no intersection for corner ({}, {})", p.real_x, p.real_y);
                    moved.push(*p);
                    continue;
                };
                if !valid_area.contains_f64(q.x, q.y) {
                    log::warn!("intersection outside of image area: ({:.2}, {:.2})", q.x, q.y);
                    moved.push(*p);
                    continue;
                }
                if (q.x - p.screen_x).abs() > threshold || (q.y - p.screen_y).abs() > threshold {
                    moved.push(*p);
                }
                updates.push((key, idx, q));
            }
        }

        let rows = self.map.rows_mut();
        for (key, idx, q) in updates {
            if let Some(p) = rows.get_mut(&key).and_then(|row| row.get_mut(idx)) {
                p.screen_x = q.x;
                p.screen_y = q.y;
            }
        }
        moved
    }

    /// Intersection of the fits of chessboard column `i` and row `j`.
    pub fn linearized_corner_position(&self, i: usize, j: usize) -> Option<Point2<f64>> {
        let h = self.horizontal_line(j)?;
        let v = self.vertical_line(i)?;
        h.intersect(v)
    }

    pub fn horizontal_line(&self, j: usize) -> Option<&LineEquation> {
        self.horizontal_lines.get(j)
    }

    pub fn vertical_line(&self, i: usize) -> Option<&LineEquation> {
        self.vertical_lines.get(i)
    }

    /// Row fits followed by column fits.
    pub fn all_lines(&self) -> Vec<LineEquation> {
        self.horizontal_lines
            .iter()
            .chain(&self.vertical_lines)
            .copied()
            .collect()
    }

    /// Cell enclosing the screen point `(x, y)`.
    ///
    /// Points above or below the grid yield a cell whose rows coincide,
    /// points left or right of a row yield coinciding columns; such cells
    /// are invalid.
    pub fn find_cell(&self, x: f64, y: f64) -> Cell<'_> {
        let rows: Vec<&GridRow> = self.map.rows().values().collect();
        let bounds: Vec<_> = self.map.line_boundaries().values().copied().collect();
        if rows.len() < 2 {
            return Cell::invalid();
        }
        let last = rows.len() - 1;

        let (mut one, mut two) = (0usize, 0usize);
        if y >= bounds[0].y_max as f64 {
            two = 1;
            while two < rows.len()
                && !(bounds[one].y_min as f64 <= y && y <= bounds[two].y_max as f64)
            {
                one += 1;
                two += 1;
            }
            if two == rows.len() {
                two = one;
            }
        }

        let mut indices = [0usize; 4];
        let mut remaining = 2i32;
        while remaining > 0 {
            let (tl, tr) = enclosing_columns(rows[one], x);
            let (bl, br) = enclosing_columns(rows[two], x);
            indices = [tl, tr, bl, br];

            let mut step = 2;
            let top_proj = project_on_segment(rows[one][tl].screen(), rows[one][tr].screen(), x, y);
            if (top_proj.y as i32) - (y as i32) > 0 {
                log::debug!("find_cell: y = {y} is above the top line ({:.2})", top_proj.y);
                step = 1;
                if one > 0 && one != two {
                    one -= 1;
                    two -= 1;
                } else {
                    two = one;
                }
            } else {
                let bot_proj =
                    project_on_segment(rows[two][bl].screen(), rows[two][br].screen(), x, y);
                if (y as i32) - (bot_proj.y as i32) > 0 {
                    log::debug!("find_cell: y = {y} is below the bottom line ({:.2})", bot_proj.y);
                    step = 1;
                    if one != two && two != last {
                        one += 1;
                        two += 1;
                    } else {
                        one = two;
                    }
                }
            }
            remaining -= step;
        }

        if one == two {
            return Cell::invalid();
        }
        Cell::from_indices(rows[one], rows[two], indices)
    }

    /// Real world corners of the cell enclosing `(x, y)` under the current
    /// transform.
    pub fn find_cell_data(&self, x: f64, y: f64) -> Option<CellCorners> {
        self.find_cell(x, y).real_world_corners(self.map.transform())
    }

    /// Average screen/plane scale over the cell rows, measured along the
    /// diagonals spanned by each row's first and last chessboard cell.
    /// Returns 0 when the grid has fewer than two usable rows.
    pub fn factor_real_to_pix(&self) -> f64 {
        let rows: Vec<&GridRow> = self.map.rows().values().collect();
        if rows.len() < 2 {
            return 0.0;
        }
        let transform = self.map.transform();
        let mut sum = 0.0;
        let mut count = 0usize;

        for pair in rows.windows(2) {
            let (top, bottom) = (pair[0], pair[1]);
            if top.len() < 2 || bottom.len() < 2 {
                break;
            }
            let mut first: Option<CellCorners> = None;
            let mut last: Option<CellCorners> = None;
            for tl in 0..top.len() - 1 {
                let Some(corners) = Cell::resolve(top, bottom, tl, CellMode::FixedChessboard)
                    .real_world_corners(transform)
                else {
                    continue;
                };
                first.get_or_insert(corners);
                last = Some(corners);
            }
            let (Some(first), Some(last)) = (first, last) else {
                break;
            };

            let d1 = last[CornerPosition::BottomRight as usize] - first[CornerPosition::TopLeft as usize];
            let d2 = last[CornerPosition::TopRight as usize] - first[CornerPosition::BottomLeft as usize];
            let ratio = |d: ScreenToPlane| d.screen_x.hypot(d.screen_y) / d.real_x.hypot(d.real_y);
            sum += 0.5 * (ratio(d1) + ratio(d2));
            count += 1;
        }
        if count > 0 {
            sum / count as f64
        } else {
            0.0
        }
    }
}

/// `(left, right)` column indices around screen x on one row.
fn enclosing_columns(row: &[ScreenToPlane], x: f64) -> (usize, usize) {
    let mut right = 0usize;
    while right < row.len() && row[right].screen_x < x {
        right += 1;
    }
    if right >= row.len() {
        let idx = row.len().saturating_sub(1);
        (idx, idx)
    } else if right > 0 {
        (right - 1, right)
    } else {
        (0, 0)
    }
}

fn project_on_segment(a: Point2<f64>, b: Point2<f64>, x: f64, y: f64) -> Point2<f64> {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return a;
    }
    let t = ((Point2::new(x, y) - a).dot(&ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn raw_lattice(rows: i32, cols: i32, x0: i32, y0: i32, step: i32) -> RawGrid {
        let mut grid = BTreeMap::new();
        for j in 0..rows {
            let y = y0 + j * step;
            grid.insert(y, (0..cols).map(|i| Point2::new(x0 + i * step, y)).collect());
        }
        grid
    }

    #[test]
    fn assigns_row_and_column_indices() {
        let raw = raw_lattice(3, 4, 20, 30, 40);
        let grid = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect("valid lattice");
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.column_count(), 4);
        let last = grid.map().rows().values().last().expect("row");
        assert_eq!((last[3].real_x, last[3].real_y), (3.0, 2.0));
        assert!(grid.transform().invert_y);
    }

    #[test]
    fn rows_starting_further_left_insert_columns() {
        let mut raw = BTreeMap::new();
        raw.insert(30, vec![Point2::new(100, 30), Point2::new(140, 30)]);
        raw.insert(70, vec![Point2::new(60, 70), Point2::new(101, 70), Point2::new(141, 70)]);
        let grid = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect("column insertion");
        let rows: Vec<_> = grid.map().rows().values().collect();
        assert_eq!(rows[0][0].real_x, 1.0);
        assert_eq!(rows[1][0].real_x, 0.0);
        assert_eq!(rows[1][1].real_x, 1.0);
        assert_eq!(grid.column_count(), 3);
    }

    #[test]
    fn rejects_unsorted_and_crowded_rows() {
        let mut raw = BTreeMap::new();
        raw.insert(30, vec![Point2::new(100, 30), Point2::new(90, 30)]);
        let err = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect_err("not sorted");
        assert!(matches!(err, CornerGridError::NotSorted { .. }));

        raw.insert(30, vec![Point2::new(100, 30), Point2::new(110, 30)]);
        let err = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect_err("too close");
        assert!(matches!(err, CornerGridError::TooClose { .. }));
    }

    #[test]
    fn rejects_missing_columns() {
        let mut raw = raw_lattice(1, 4, 20, 30, 40);
        raw.insert(70, vec![Point2::new(20, 70), Point2::new(100, 70)]);
        let err = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect_err("gap");
        assert!(matches!(err, CornerGridError::NotContiguous { .. }));
    }

    #[test]
    fn split_rows_are_merged() {
        let mut raw = raw_lattice(2, 4, 20, 30, 40);
        let second = raw.remove(&70).expect("row");
        raw.insert(70, second[..2].to_vec());
        raw.insert(74, second[2..].iter().map(|p| Point2::new(p.x, 74)).collect());
        let grid = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect("merge");
        assert_eq!(grid.row_count(), 2);
        let merged = grid.map().rows().get(&70).expect("merged row");
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[3].real_x, 3.0);
        assert_eq!(merged[3].real_y, 1.0);
        assert_eq!(grid.map().line_boundaries()[&70].y_max, 74);
    }

    #[test]
    fn trailing_single_corner_row_is_trimmed() {
        let mut raw = raw_lattice(2, 3, 20, 30, 40);
        raw.insert(200, vec![Point2::new(20, 200)]);
        let grid = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect("valid");
        assert_eq!(grid.row_count(), 2);
    }

    #[test]
    fn line_fits_and_linearization() {
        let mut raw = raw_lattice(3, 3, 40, 40, 40);
        // Nudge the centre corner by one pixel.
        raw.get_mut(&80).expect("row")[1] = Point2::new(81, 80);
        let mut grid =
            CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
                .expect("valid");
        assert_eq!(grid.all_lines().len(), 6);
        let p = grid.linearized_corner_position(0, 0).expect("corner");
        assert_relative_eq!(p.x, 40.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 40.0, epsilon = 1e-6);
        assert!(grid.linearized_corner_position(5, 0).is_none());

        let moved = grid.align_points(10.0);
        assert!(moved.is_empty());
        let centre = grid.map().rows()[&80][1];
        assert!((centre.screen_x - 81.0).abs() < 1.0);
    }

    #[test]
    fn find_cell_locates_enclosing_square() {
        let raw = raw_lattice(3, 4, 20, 30, 40);
        let grid = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect("valid");
        let cell = grid.find_cell(70.0, 90.0);
        assert!(cell.is_valid());
        let tl = cell.corner(CornerPosition::TopLeft);
        assert_eq!((tl.screen_x, tl.screen_y), (60.0, 70.0));
        let br = cell.corner(CornerPosition::BottomRight);
        assert_eq!((br.screen_x, br.screen_y), (100.0, 110.0));

        assert!(!grid.find_cell(5.0, 90.0).is_valid());
        assert!(!grid.find_cell(70.0, 5.0).is_valid());
    }

    #[test]
    fn find_cell_data_uses_transform() {
        let raw = raw_lattice(3, 4, 20, 30, 40);
        let mut grid =
            CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
                .expect("valid");
        let mut t = *grid.transform();
        t.scale = 2.0;
        grid.set_transform(t);
        let corners = grid.find_cell_data(70.0, 90.0).expect("inside");
        assert_eq!(corners[0].real_x, 2.0);
        assert_eq!(corners[0].real_y, -2.0);
    }

    #[test]
    fn factor_real_to_pix_matches_lattice_pitch() {
        let raw = raw_lattice(3, 4, 20, 30, 40);
        let grid = CalibrationCornerGrid::from_raw_grid(SensorSize::new(320, 240), &raw, 20, false)
            .expect("valid");
        assert_relative_eq!(grid.factor_real_to_pix(), 40.0, epsilon = 1e-9);
    }
}
