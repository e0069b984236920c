//! Quadrilateral cells spanned by two adjacent grid rows.

use lasercal_core::{CoordDimension, RealWorldTransform, ScreenToPlane};
use serde::{Deserialize, Serialize};

/// Corners of a cell, indexed by [`CornerPosition`].
pub type CellCorners = [ScreenToPlane; 4];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CornerPosition {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgePosition {
    Left,
    Right,
    Top,
    Bottom,
}

impl EdgePosition {
    /// Edge end points, start first (top before bottom, left before right).
    pub const fn corners(self) -> [CornerPosition; 2] {
        match self {
            EdgePosition::Left => [CornerPosition::TopLeft, CornerPosition::BottomLeft],
            EdgePosition::Right => [CornerPosition::TopRight, CornerPosition::BottomRight],
            EdgePosition::Top => [CornerPosition::TopLeft, CornerPosition::TopRight],
            EdgePosition::Bottom => [CornerPosition::BottomLeft, CornerPosition::BottomRight],
        }
    }
}

/// How the bottom row corners of a cell are matched to the top row ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMode {
    /// Plane coordinates are chessboard indices; neighbours differ by exactly 1.
    FixedChessboard,
    /// Bottom corners share the exact screen x of the top corners.
    FixedScreen,
    /// Bottom corners with the closest plane x.
    ClosestPlane,
    /// Bottom corners with the closest screen x.
    ClosestScreen,
}

impl CellMode {
    /// Order in which modes are tried when a grid's mode is detected.
    pub const DETECTION_ORDER: [CellMode; 4] = [
        CellMode::FixedChessboard,
        CellMode::FixedScreen,
        CellMode::ClosestPlane,
        CellMode::ClosestScreen,
    ];

    fn key(self) -> CoordDimension {
        match self {
            CellMode::FixedChessboard | CellMode::ClosestPlane => CoordDimension::RealX,
            CellMode::FixedScreen | CellMode::ClosestScreen => CoordDimension::ScreenX,
        }
    }

    fn is_exact(self) -> bool {
        matches!(self, CellMode::FixedChessboard | CellMode::FixedScreen)
    }

    /// First mode that yields a valid cell at the start of `top`/`bottom`.
    pub fn detect(top: &[ScreenToPlane], bottom: &[ScreenToPlane]) -> Option<CellMode> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|&mode| Cell::resolve(top, bottom, 0, mode).is_valid())
    }
}

/// Screen bounding box of a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelRange {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// A cell borrowing the two rows it was resolved from.
#[derive(Clone, Copy, Debug)]
pub struct Cell<'a> {
    top: &'a [ScreenToPlane],
    bottom: &'a [ScreenToPlane],
    top_left: usize,
    top_right: usize,
    bottom_left: usize,
    bottom_right: usize,
    valid: bool,
}

fn match_column(row: &[ScreenToPlane], target: f64, mode: CellMode) -> Option<usize> {
    if row.is_empty() {
        return None;
    }
    let dim = mode.key();
    let mut j = 0;
    while j + 1 < row.len() && row[j + 1].get(dim) <= target {
        j += 1;
    }
    let best = if j + 1 < row.len()
        && (row[j + 1].get(dim) - target).abs() < (row[j].get(dim) - target).abs()
    {
        j + 1
    } else {
        j
    };
    if mode.is_exact() && row[best].get(dim) != target {
        return None;
    }
    Some(best)
}

impl<'a> Cell<'a> {
    /// Cell whose top-left corner is `top[top_left]`, matching the bottom row
    /// according to `mode`.
    pub fn resolve(
        top: &'a [ScreenToPlane],
        bottom: &'a [ScreenToPlane],
        top_left: usize,
        mode: CellMode,
    ) -> Self {
        let top_right = top_left + 1;
        if top_right >= top.len() {
            return Self::invalid_on(top, bottom);
        }
        let dim = mode.key();
        let tl = &top[top_left];
        let tr = &top[top_right];

        let (Some(bottom_left), Some(bottom_right)) = (
            match_column(bottom, tl.get(dim), mode),
            match_column(bottom, tr.get(dim), mode),
        ) else {
            return Self::invalid_on(top, bottom);
        };

        let mut valid = bottom_left != bottom_right;
        if valid && mode == CellMode::FixedChessboard {
            let bl = &bottom[bottom_left];
            let br = &bottom[bottom_right];
            valid = tl.real_x.fract() == 0.0
                && tl.real_y.fract() == 0.0
                && tr.real_x == tl.real_x + 1.0
                && tr.real_y == tl.real_y
                && bl.real_x == tl.real_x
                && bl.real_y == tl.real_y + 1.0
                && br.real_x == tl.real_x + 1.0
                && br.real_y == tl.real_y + 1.0;
        }

        Self {
            top,
            bottom,
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            valid,
        }
    }

    /// Cell from explicit indices; valid when both rows span two columns.
    pub fn from_indices(
        top: &'a [ScreenToPlane],
        bottom: &'a [ScreenToPlane],
        [top_left, top_right, bottom_left, bottom_right]: [usize; 4],
    ) -> Self {
        let in_range = top_left.max(top_right) < top.len()
            && bottom_left.max(bottom_right) < bottom.len();
        Self {
            top,
            bottom,
            top_left,
            top_right,
            bottom_left,
            bottom_right,
            valid: in_range && top_left != top_right && bottom_left != bottom_right,
        }
    }

    pub fn invalid() -> Cell<'static> {
        Cell::invalid_on(&[], &[])
    }

    fn invalid_on(top: &'a [ScreenToPlane], bottom: &'a [ScreenToPlane]) -> Self {
        Self {
            top,
            bottom,
            top_left: 0,
            top_right: 0,
            bottom_left: 0,
            bottom_right: 0,
            valid: false,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Column indices in corner order.
    pub fn indices(&self) -> [usize; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    pub fn corner(&self, pos: CornerPosition) -> ScreenToPlane {
        let (row, idx) = match pos {
            CornerPosition::TopLeft => (self.top, self.top_left),
            CornerPosition::TopRight => (self.top, self.top_right),
            CornerPosition::BottomLeft => (self.bottom, self.bottom_left),
            CornerPosition::BottomRight => (self.bottom, self.bottom_right),
        };
        row.get(idx).copied().unwrap_or_default()
    }

    pub fn corners(&self) -> CellCorners {
        [
            self.corner(CornerPosition::TopLeft),
            self.corner(CornerPosition::TopRight),
            self.corner(CornerPosition::BottomLeft),
            self.corner(CornerPosition::BottomRight),
        ]
    }

    pub fn segment(&self, edge: EdgePosition) -> [ScreenToPlane; 2] {
        let [a, b] = edge.corners();
        [self.corner(a), self.corner(b)]
    }

    pub fn pixel_range(&self) -> PixelRange {
        pixel_range(&self.corners())
    }

    /// Corners with their plane part mapped through `transform`, `None`
    /// for an invalid cell.
    pub fn real_world_corners(&self, transform: &RealWorldTransform) -> Option<CellCorners> {
        if !self.valid {
            return None;
        }
        Some(self.corners().map(|c| c.to_real_world(transform)))
    }
}

/// Screen bounding box of four corners.
pub fn pixel_range(corners: &CellCorners) -> PixelRange {
    let mut range = PixelRange {
        x_min: f64::INFINITY,
        x_max: f64::NEG_INFINITY,
        y_min: f64::INFINITY,
        y_max: f64::NEG_INFINITY,
    };
    for c in corners {
        range.x_min = range.x_min.min(c.screen_x);
        range.x_max = range.x_max.max(c.screen_x);
        range.y_min = range.y_min.min(c.screen_y);
        range.y_max = range.y_max.max(c.screen_y);
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(y: f64, row_idx: f64, xs: &[(f64, f64)]) -> Vec<ScreenToPlane> {
        xs.iter()
            .map(|&(sx, col)| ScreenToPlane::new(sx, y, col, row_idx))
            .collect()
    }

    #[test]
    fn chessboard_mode_needs_unit_steps() {
        let top = row(10.0, 0.0, &[(10.0, 0.0), (30.0, 1.0), (50.0, 2.0)]);
        let bottom = row(30.0, 1.0, &[(31.0, 1.0), (51.0, 2.0)]);

        assert!(!Cell::resolve(&top, &bottom, 0, CellMode::FixedChessboard).is_valid());
        let cell = Cell::resolve(&top, &bottom, 1, CellMode::FixedChessboard);
        assert!(cell.is_valid());
        assert_eq!(cell.indices(), [1, 2, 0, 1]);
        assert_eq!(cell.corner(CornerPosition::BottomRight).screen_x, 51.0);
    }

    #[test]
    fn closest_screen_prefers_nearer_and_lower_on_ties() {
        let top = row(0.0, 0.0, &[(10.0, 0.0), (20.0, 1.0)]);
        let bottom = row(10.0, 1.0, &[(5.0, 0.0), (15.0, 1.0), (22.0, 2.0)]);
        let cell = Cell::resolve(&top, &bottom, 0, CellMode::ClosestScreen);
        // 10 is equidistant from 5 and 15: the lower index wins.
        assert_eq!(cell.indices(), [0, 1, 0, 2]);
        assert!(cell.is_valid());
    }

    #[test]
    fn fixed_screen_requires_exact_match() {
        let top = row(0.0, 0.0, &[(10.0, 0.0), (20.0, 1.0)]);
        let exact = row(10.0, 1.0, &[(10.0, 0.0), (20.0, 1.0)]);
        let shifted = row(10.0, 1.0, &[(11.0, 0.0), (20.0, 1.0)]);
        assert!(Cell::resolve(&top, &exact, 0, CellMode::FixedScreen).is_valid());
        assert!(!Cell::resolve(&top, &shifted, 0, CellMode::FixedScreen).is_valid());
        assert_eq!(CellMode::detect(&top, &shifted), Some(CellMode::FixedChessboard));
    }

    #[test]
    fn detection_falls_back_to_closest_modes() {
        let top = vec![
            ScreenToPlane::new(10.0, 0.0, 0.5, 0.5),
            ScreenToPlane::new(20.0, 0.0, 1.5, 0.5),
        ];
        let bottom = vec![
            ScreenToPlane::new(12.0, 10.0, 0.4, 1.5),
            ScreenToPlane::new(21.0, 10.0, 1.6, 1.5),
        ];
        assert_eq!(CellMode::detect(&top, &bottom), Some(CellMode::ClosestPlane));
        assert_eq!(CellMode::detect(&top, &bottom[..1]), None);
    }

    #[test]
    fn segments_and_range() {
        let top = row(0.0, 0.0, &[(0.0, 0.0), (10.0, 1.0)]);
        let bottom = row(8.0, 1.0, &[(1.0, 0.0), (12.0, 1.0)]);
        let cell = Cell::from_indices(&top, &bottom, [0, 1, 0, 1]);
        let [a, b] = cell.segment(EdgePosition::Right);
        assert_eq!((a.screen_x, b.screen_x), (10.0, 12.0));
        let range = cell.pixel_range();
        assert_eq!((range.x_min, range.x_max, range.y_min, range.y_max), (0.0, 12.0, 0.0, 8.0));
        assert!(!Cell::from_indices(&top, &bottom, [1, 1, 0, 1]).is_valid());
        assert!(Cell::invalid().real_world_corners(&RealWorldTransform::identity()).is_none());
    }
}
