use std::collections::BTreeMap;
use std::fmt;

use lasercal_core::{RealWorldTransform, ScreenToPlane, SensorSize};
use nalgebra::Point2;

use crate::cell::{Cell, CellMode, EdgePosition};

/// One grid row, ordered by increasing screen x.
pub type GridRow = Vec<ScreenToPlane>;

/// Vertical extent of a row in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowBounds {
    pub y_min: i32,
    pub y_max: i32,
}

/// Sparse screen/plane correspondences keyed by the rows' average screen y.
///
/// Rows must be added in increasing key order with adjacent keys being
/// physically adjacent rows. The grid is filled once and read afterwards;
/// the only in-place change is [`CornerGridMap::apply_transform`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CornerGridMap {
    valid_area: SensorSize,
    rows: BTreeMap<i32, GridRow>,
    bounds: BTreeMap<i32, RowBounds>,
    transform: RealWorldTransform,
}

impl CornerGridMap {
    pub fn new(valid_area: SensorSize) -> Self {
        Self {
            valid_area,
            ..Self::default()
        }
    }

    /// Clears rows, bounds and transform.
    pub fn reset(&mut self, valid_area: SensorSize) {
        *self = Self::new(valid_area);
    }

    /// Inserts (or replaces) the row with key `y_avg`.
    pub fn add_row(&mut self, y_avg: i32, y_min: i32, y_max: i32, row: GridRow) {
        self.bounds.insert(y_avg, RowBounds { y_min, y_max });
        self.rows.insert(y_avg, row);
    }

    pub fn set_transform(&mut self, transform: RealWorldTransform) {
        self.transform = transform;
    }

    pub fn transform(&self) -> &RealWorldTransform {
        &self.transform
    }

    /// Applies the stored transform to every plane coordinate and resets
    /// the stored transform to identity.
    pub fn apply_transform(&mut self) {
        let transform = self.transform;
        for row in self.rows.values_mut() {
            for p in row.iter_mut() {
                *p = p.to_real_world(&transform);
            }
        }
        self.transform = RealWorldTransform::identity();
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &BTreeMap<i32, GridRow> {
        &self.rows
    }

    pub fn line_boundaries(&self) -> &BTreeMap<i32, RowBounds> {
        &self.bounds
    }

    pub fn valid_area(&self) -> SensorSize {
        self.valid_area
    }

    pub(crate) fn rows_mut(&mut self) -> &mut BTreeMap<i32, GridRow> {
        &mut self.rows
    }

    pub(crate) fn bounds_mut(&mut self) -> &mut BTreeMap<i32, RowBounds> {
        &mut self.bounds
    }

    pub(crate) fn remove_row(&mut self, key: i32) {
        self.rows.remove(&key);
        self.bounds.remove(&key);
    }

    /// Screen positions only, keyed like the grid.
    pub fn screen_rows(&self) -> BTreeMap<i32, Vec<Point2<f64>>> {
        self.rows
            .iter()
            .map(|(&key, row)| (key, row.iter().map(ScreenToPlane::screen).collect()))
            .collect()
    }

    pub fn all_nodes_screen(&self) -> Vec<Point2<f64>> {
        self.rows
            .values()
            .flat_map(|row| row.iter().map(ScreenToPlane::screen))
            .collect()
    }

    /// Screen segments of all chessboard cells: left and top edges of every
    /// cell, the bottom edges of the last row and the right edge of each
    /// row's last cell.
    pub fn all_segments_screen(&self) -> Vec<[Point2<f64>; 2]> {
        let mut out = Vec::new();
        if self.rows.len() < 2 {
            return out;
        }
        let rows: Vec<&GridRow> = self.rows.values().collect();
        let to_screen = |s: [ScreenToPlane; 2]| [s[0].screen(), s[1].screen()];

        for (pair_idx, pair) in rows.windows(2).enumerate() {
            let is_last = pair_idx + 2 == rows.len();
            let mut last_right = None;
            for tl in 0..pair[0].len().saturating_sub(1) {
                let cell = Cell::resolve(pair[0], pair[1], tl, CellMode::FixedChessboard);
                if !cell.is_valid() {
                    continue;
                }
                out.push(to_screen(cell.segment(EdgePosition::Left)));
                out.push(to_screen(cell.segment(EdgePosition::Top)));
                if is_last {
                    out.push(to_screen(cell.segment(EdgePosition::Bottom)));
                }
                last_right = Some(cell.segment(EdgePosition::Right));
            }
            if let Some(seg) = last_right {
                out.push(to_screen(seg));
            }
        }
        out
    }
}

impl fmt::Display for CornerGridMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid Screen Coordinates:")?;
        for row in self.rows.values() {
            for p in row {
                write!(
                    f,
                    "({:.2}, {:.2}) -> ({:.2}, {:.2});  ",
                    p.screen_x, p.screen_y, p.real_x, p.real_y
                )?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        writeln!(f, "Grid X [mm] Coordinates:")?;
        for row in self.rows.values() {
            for p in row {
                write!(f, "{:>10.2} ;", p.real_x)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;

        writeln!(f, "Grid Y [mm] Coordinates:")?;
        for row in self.rows.values() {
            for p in row {
                write!(f, "{:>10.2} ; ", p.real_y)?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}
