/// Failures while assigning chessboard indices to detected corners.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CornerGridError {
    #[error("row {row}: corner at x = {x} is not sorted")]
    NotSorted { row: i32, x: i32 },
    #[error("row {row}: corner at x = {x} is too close to the previous one at x = {previous}")]
    TooClose { row: i32, x: i32, previous: i32 },
    #[error("row {row}: corner at x = {x} leaves a gap, columns are not contiguous")]
    NotContiguous { row: i32, x: i32 },
    #[error("row {row}: corner at x = {x} lies left of the known columns")]
    UnexpectedColumn { row: i32, x: i32 },
    #[error("row {row}: average y is outside the row's y range [{y_min}, {y_max}]")]
    WrongRowRange { row: i32, y_min: i32, y_max: i32 },
    #[error("row {row}: cannot merge with row {into}, column order conflict")]
    MergeConflict { row: i32, into: i32 },
}

/// Failures while reading or writing the CSV grid format.
#[derive(thiserror::Error, Debug)]
pub enum CamGridError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("grid data not found (missing `GridCoordinates` marker)")]
    DataNotFound,
    #[error("wrong grid header: {0}")]
    WrongHeader(String),
    #[error("line {line}: cannot parse `{token}`")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: {found} corners, header declares at most {max}")]
    TooManyCorners { line: usize, found: usize, max: usize },
    #[error("grid has no rows")]
    Empty,
}
