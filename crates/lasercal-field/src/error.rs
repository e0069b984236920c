use lasercal_core::{LaserLine, SensorModel};
use lasercal_grid::{CamGridError, CornerGridError};

/// State errors of the coordinate field.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("triangulation angle requires a defined sensor model")]
    UndefinedSensorModel,
    #[error("oriented line models require the linear magnification model, field is {0:?}")]
    OrientedModelUnsupported(SensorModel),
    #[error("no oriented line model registered for the {0} line")]
    MissingOrientedModel(LaserLine),
    #[error("pixel ({x}, {y}) has no valid coordinates")]
    InvalidCoordinate { x: i32, y: i32 },
    #[error("range {0} out of sensor bounds")]
    RangeOutOfIndex(String),
    #[error("coordinate field is empty")]
    Empty,
}

/// Geometric and coverage failures of the cell interpolator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("calibration grid needs at least two rows, found {0}")]
    TooFewRows(usize),
    #[error("bad calibration grid: row {row} has fewer than two corners")]
    RowTooShort { row: i32 },
    #[error("row {row} has no valid cell to extrapolate from")]
    NoValidCell { row: i32 },
    #[error("two corners are overlapping")]
    OverlappingCorners,
    #[error("calibration grid incomplete: one cell edge has zero height")]
    IncompleteGrid,
    #[error("calibration grid too narrow in y")]
    GridTooNarrow,
    #[error("cell edge is degenerate, cannot rectify")]
    DegenerateEdge,
    #[error("{unresolved} interior pixels cannot be mapped to real world, grid bends too much")]
    GridBendsTooMuch { unresolved: usize },
    #[error("no valid cell at origin pixel ({x}, {y})")]
    OriginOutsideGrid { x: f64, y: f64 },
    #[error("sensor size {width}x{height} is empty")]
    EmptySensor { width: usize, height: usize },
}

/// Configuration errors raised before a field is built.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("invalid coax parameters: {0}")]
    InvalidCoaxParameters(String),
    #[error("invalid grid data: {0}")]
    InvalidGridData(String),
    #[error("cannot determine 3D data")]
    Interpolation(#[from] InterpolationError),
    #[error(transparent)]
    CornerGrid(#[from] CornerGridError),
    #[error(transparent)]
    CamGrid(#[from] CamGridError),
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Failures of the binary field format.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("buffer truncated: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("invalid sensor size {width}x{height}")]
    InvalidSize { width: i32, height: i32 },
    #[error("sensor size {width}x{height} exceeds {max} pixels")]
    TooLarge { width: i32, height: i32, max: usize },
    #[error("X table holds {x} values, Y table {y}")]
    TableMismatch { x: usize, y: usize },
    #[error("empty tables without oriented line models")]
    MissingTables,
    #[error("tables serialized next to {0} oriented line models")]
    UnexpectedTables(usize),
    #[error("array holds {found} values, expected {expected} or 0")]
    ArrayLength { found: i32, expected: usize },
    #[error("unknown laser line id {0}")]
    UnknownLaserLine(i32),
    #[error("unknown sensor model id {0}")]
    UnknownSensorModel(i32),
    #[error("negative entry count {0}")]
    NegativeCount(i32),
    #[error(transparent)]
    Field(#[from] FieldError),
}

#[derive(thiserror::Error, Debug)]
pub enum AveragerError {
    #[error("no grids to average")]
    NoInputs,
    #[error("grids cover no common sample point")]
    NoCommonSamples,
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Failures writing debug renderings and tables.
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Field(#[from] FieldError),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
