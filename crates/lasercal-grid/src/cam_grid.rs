//! Sparse chessboard corner data as delivered by the camera calibration.
//!
//! The CSV layout is line based: `Key;value` header lines, a
//! `GridCoordinates` marker, a `YAvg; x00; y00; x01; y01;...` column header
//! and one row of integer corner coordinates per chessboard row.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use lasercal_core::SensorSize;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::CamGridError;

/// Raw corner rows keyed by average screen y, corners sorted by x.
pub type RawGrid = BTreeMap<i32, Vec<Point2<i32>>>;

const SEPARATOR: char = ';';
const DATA_START: &str = "GridCoordinates";
const ROW_KEY: &str = "YAvg";

/// Row/column statistics of a [`RawGrid`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridSize {
    pub points: usize,
    pub rows: usize,
    pub columns_min: usize,
    pub columns_max: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CamGridData {
    /// Chessboard square side in mm.
    pub grid_delta: f64,
    pub sensor_width: usize,
    pub sensor_height: usize,
    pub correction_factor: f64,
    triangulation_angle_rad: f64,
    has_triangulation_angle: bool,
    pub grid: RawGrid,
}

impl Default for CamGridData {
    fn default() -> Self {
        Self {
            grid_delta: 1.35,
            sensor_width: 1024,
            sensor_height: 1024,
            correction_factor: 1.0,
            triangulation_angle_rad: 0.0,
            has_triangulation_angle: false,
            grid: RawGrid::new(),
        }
    }
}

impl CamGridData {
    pub fn new(sensor: SensorSize, grid_delta: f64, grid: RawGrid) -> Self {
        Self {
            grid_delta,
            sensor_width: sensor.width,
            sensor_height: sensor.height,
            grid,
            ..Self::default()
        }
    }

    pub fn sensor_size(&self) -> SensorSize {
        SensorSize::new(self.sensor_width, self.sensor_height)
    }

    pub fn triangulation_angle_rad(&self) -> f64 {
        self.triangulation_angle_rad
    }

    pub fn triangulation_angle_deg(&self) -> f64 {
        self.triangulation_angle_rad.to_degrees()
    }

    pub fn set_triangulation_angle_rad(&mut self, angle: f64) {
        self.triangulation_angle_rad = angle;
        self.has_triangulation_angle = true;
    }

    pub fn has_triangulation_angle(&self) -> bool {
        self.has_triangulation_angle
    }

    /// Pixel the real world origin is placed at: the sensor centre.
    pub fn origin(&self) -> Point2<f64> {
        Point2::new(
            (self.sensor_width / 2) as f64,
            (self.sensor_height / 2) as f64,
        )
    }

    pub fn has_data(&self) -> bool {
        !self.grid.is_empty()
    }

    pub fn grid_size(&self) -> GridSize {
        let rows = self.grid.len();
        if rows == 0 {
            return GridSize::default();
        }
        let mut size = GridSize {
            rows,
            columns_min: usize::MAX,
            ..GridSize::default()
        };
        for row in self.grid.values() {
            size.points += row.len();
            size.columns_min = size.columns_min.min(row.len());
            size.columns_max = size.columns_max.max(row.len());
        }
        size
    }

    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, CamGridError> {
        let file = fs::File::open(path.as_ref())?;
        Self::read_csv(BufReader::new(file))
    }

    /// Parses the CSV layout. Unknown header keys are ignored.
    pub fn read_csv<R: BufRead>(reader: R) -> Result<Self, CamGridError> {
        let mut data = Self::default();
        let mut lines = reader.lines().enumerate();
        let mut found = false;

        for (n, line) in lines.by_ref() {
            let line = line?;
            if line.starts_with(DATA_START) {
                found = true;
                break;
            }
            let mut tokens = line.split(SEPARATOR);
            let key = tokens.next().unwrap_or("").trim();
            let value = tokens.next().unwrap_or("").trim();
            if tokens.next().is_some() {
                log::warn!("line {}: unknown trailing data in `{line}`", n + 1);
            }
            match key {
                "GridDelta" => data.grid_delta = parse_number(value, n)?,
                "SensorWidth" => data.sensor_width = parse_number(value, n)?,
                "SensorHeight" => data.sensor_height = parse_number(value, n)?,
                "CorrectionFactor" => data.correction_factor = parse_number(value, n)?,
                "TriangAngleRad" => data.set_triangulation_angle_rad(parse_number(value, n)?),
                "OrigX" | "OrigY" | "MaxDist" => log::debug!("ignoring legacy key {key}"),
                _ => {}
            }
        }
        if !found {
            return Err(CamGridError::DataNotFound);
        }

        let Some((n, header)) = lines.next() else {
            return Err(CamGridError::WrongHeader(String::new()));
        };
        let header = header?;
        let columns_max = parse_header(&header).map_err(|err| {
            log::error!("line {}: wrong grid header `{header}`", n + 1);
            err
        })?;

        for (n, line) in lines {
            let line = line?;
            let mut tokens = line.split(SEPARATOR);
            let key = tokens.next().unwrap_or("").trim();
            let values: Vec<&str> = tokens.map(str::trim).filter(|t| !t.is_empty()).collect();
            let mut corners = Vec::with_capacity(values.len() / 2);
            for pair in values.chunks_exact(2) {
                corners.push(Point2::new(
                    parse_number(pair[0], n)?,
                    parse_number(pair[1], n)?,
                ));
            }
            if corners.len() > columns_max {
                return Err(CamGridError::TooManyCorners {
                    line: n + 1,
                    found: corners.len(),
                    max: columns_max,
                });
            }
            if corners.is_empty() {
                log::debug!("grid data ended before EOF after {} rows", data.grid.len());
                break;
            }
            data.grid.insert(parse_number(key, n)?, corners);
        }

        if data.grid.is_empty() {
            return Err(CamGridError::Empty);
        }
        Ok(data)
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), CamGridError> {
        let mut file = fs::File::create(path.as_ref())?;
        self.write_csv(&mut file)?;
        Ok(())
    }

    pub fn write_csv<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "GridDelta{SEPARATOR}{}", self.grid_delta)?;
        writeln!(out, "SensorWidth{SEPARATOR}{}", self.sensor_width)?;
        writeln!(out, "SensorHeight{SEPARATOR}{}", self.sensor_height)?;
        writeln!(out, "CorrectionFactor{SEPARATOR}{}", self.correction_factor)?;
        writeln!(out, "TriangAngleRad{SEPARATOR}{}", self.triangulation_angle_rad)?;
        writeln!(out, "{DATA_START}")?;

        write!(out, "{ROW_KEY}{SEPARATOR}")?;
        for i in 0..self.grid_size().columns_max {
            write!(out, " x{i:02}{SEPARATOR} y{i:02}{SEPARATOR}")?;
        }
        writeln!(out)?;
        for (y_avg, row) in &self.grid {
            write!(out, "{y_avg:>4}{SEPARATOR}")?;
            for p in row {
                write!(out, "{:>4}{SEPARATOR}{:>4}{SEPARATOR}", p.x, p.y)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(token: &str, line: usize) -> Result<T, CamGridError> {
    token.trim().parse().map_err(|_| CamGridError::InvalidNumber {
        line: line + 1,
        token: token.to_string(),
    })
}

/// Validates `YAvg; x00; y00; ...` and returns the declared column count.
fn parse_header(header: &str) -> Result<usize, CamGridError> {
    let mut tokens = header.split(SEPARATOR);
    if tokens.next().map(str::trim) != Some(ROW_KEY) {
        return Err(CamGridError::WrongHeader(header.to_string()));
    }
    let mut count = 0usize;
    for tok in tokens.map(str::trim).filter(|t| !t.is_empty()) {
        let expected = if count % 2 == 0 { 'x' } else { 'y' };
        if !tok.starts_with(expected) {
            return Err(CamGridError::WrongHeader(header.to_string()));
        }
        count += 1;
    }
    if count % 2 != 0 {
        return Err(CamGridError::WrongHeader(header.to_string()));
    }
    Ok(count / 2)
}
