use lasercal_core::SensorSize;
use lasercal_grid::{
    CalibrationCornerGrid, CamGridData, CellMode, CornerPosition, RawGrid, DEFAULT_MAX_X_DELTA,
};
use nalgebra::Point2;

const SENSOR: usize = 1024;

/// 19 x 19 chessboard corners with squares shrinking towards the bottom of
/// the image; corner (9, 9) sits on the sensor centre.
fn perspective_rows() -> RawGrid {
    let c = (SENSOR / 2) as f64;
    let mut grid = RawGrid::new();
    for gy in -9..=9 {
        let w = 1.0 + 0.01 * f64::from(gy);
        let sy = (c + 50.0 * f64::from(gy) / w).round() as i32;
        let row = (-9..=9)
            .map(|gx| Point2::new((c + 50.0 * f64::from(gx) / w).round() as i32, sy))
            .collect();
        grid.insert(sy, row);
    }
    grid
}

fn build(rows: &RawGrid) -> CalibrationCornerGrid {
    CalibrationCornerGrid::from_raw_grid(
        SensorSize::new(SENSOR, SENSOR),
        rows,
        DEFAULT_MAX_X_DELTA,
        false,
    )
    .expect("corner data")
}

#[test]
fn csv_rows_become_indexed_corners() {
    let mut csv = Vec::new();
    CamGridData::new(SensorSize::new(SENSOR, SENSOR), 1.35, perspective_rows())
        .write_csv(&mut csv)
        .expect("csv written");
    let data = CamGridData::read_csv(csv.as_slice()).expect("csv parsed");
    let stats = data.grid_size();
    assert_eq!((stats.rows, stats.points), (19, 19 * 19));
    assert_eq!(stats.columns_max, 19);

    let grid = build(&data.grid);
    assert_eq!(grid.row_count(), 19);
    assert_eq!(grid.column_count(), 19);
    assert!(grid.transform().invert_y);

    let rows: Vec<_> = grid.map().rows().values().collect();
    assert_eq!(CellMode::detect(rows[0], rows[1]), Some(CellMode::FixedChessboard));
    for (j, row) in rows.iter().enumerate() {
        for (i, p) in row.iter().enumerate() {
            assert_eq!((p.real_x, p.real_y), (i as f64, j as f64));
        }
    }
    assert_eq!(grid.all_lines().len(), 19 + 19);
}

#[test]
fn occluded_corner_shifts_column_indices() {
    let mut rows = perspective_rows();
    let first = rows.values_mut().next().expect("first row");
    first.remove(0);

    let grid = build(&rows);
    assert_eq!(grid.column_count(), 19);
    let rows: Vec<_> = grid.map().rows().values().collect();
    assert_eq!(rows[0].len(), 18);
    assert_eq!(rows[0][0].real_x, 1.0);
    assert_eq!(rows[1][0].real_x, 0.0);
}

#[test]
fn centre_cell_is_found() {
    let grid = build(&perspective_rows());
    let cell = grid.find_cell(537.0, 537.0);
    assert!(cell.is_valid());

    let tl = cell.corner(CornerPosition::TopLeft);
    let br = cell.corner(CornerPosition::BottomRight);
    assert_eq!((tl.screen_x, tl.screen_y), (512.0, 512.0));
    assert_eq!((br.screen_x, br.screen_y), (562.0, 562.0));
    assert_eq!((tl.real_x, tl.real_y), (9.0, 9.0));
    assert_eq!((br.real_x, br.real_y), (10.0, 10.0));

    // outside every row: no enclosing cell
    assert!(!grid.find_cell(537.0, 5.0).is_valid());

    // about 50 px per chessboard square
    let factor = grid.factor_real_to_pix();
    assert!(factor > 40.0 && factor < 60.0, "{factor}");
}
