//! Debug renderings of a field: checkerboard, magnification maps and the
//! plain text table.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lasercal_core::{GrayImage, LaserLine, SensorSize};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::coords::CoordinateField;
use crate::error::{ExportError, FieldError};

const BACKGROUND: u8 = 123;
const INDEX_LINE_OFFSET: u8 = 70;
/// Spacing of the highlighted index lines, in mm.
const INDEX_LINE_SPACING_MM: f32 = 10.0;

/// Plane a checkerboard rendering is computed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatePlane {
    /// Plane of one laser line.
    LaserPlane(LaserLine),
    /// World X and Y of the front laser line.
    XyPlane,
    /// Stored table, invalid pixels included.
    InternalPlane,
}

/// Rectangle of sensor pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    pub fn new(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole sensor.
    pub fn full(size: SensorSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    fn fits(&self, size: SensorSize) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as usize + self.width <= size.width
            && self.y as usize + self.height <= size.height
    }
}

impl CoordinateField {
    fn plane_coordinates(&self, x: i32, y: i32, plane: CoordinatePlane) -> Option<Point2<f32>> {
        match plane {
            CoordinatePlane::LaserPlane(line) => self.screen_to_laser_plane(x, y, line),
            CoordinatePlane::XyPlane => self
                .to_3d(x, y, LaserLine::Front)
                .map(|p| Point2::new(p.x, p.y)),
            CoordinatePlane::InternalPlane => {
                if self.size.contains(i64::from(x), i64::from(y)) {
                    let (px, py) = self.raw(x as usize, y as usize);
                    Some(Point2::new(px, py))
                } else {
                    Some(Point2::origin())
                }
            }
        }
    }

    /// Renders virtual squares of `square_side` mm as black and white
    /// pixels. Every square index multiple of 10 mm is drawn grey, invalid
    /// pixels keep the background value 123.
    pub fn coords_to_checkerboard_image(
        &self,
        roi: Roi,
        square_side: f32,
        plane: CoordinatePlane,
    ) -> GrayImage {
        let mut image = GrayImage::filled(roi.width, roi.height, BACKGROUND);
        let grey_index = ((INDEX_LINE_SPACING_MM / square_side).ceil() as i64).max(1);

        for ix in 0..roi.width {
            for iy in 0..roi.height {
                let (x, y) = (roi.x + ix as i32, roi.y + iy as i32);
                let Some(p) = self.plane_coordinates(x, y, plane) else {
                    continue;
                };
                let i = (p.x / square_side).floor().abs() as i64;
                let j = (p.y / square_side).floor().abs() as i64;
                let offset = if i % grey_index == 0 || j % grey_index == 0 {
                    INDEX_LINE_OFFSET
                } else {
                    0
                };
                let value = if i % 2 == j % 2 { offset } else { 255 - offset };
                image.set(ix, iy, value);
            }
        }
        image
    }

    /// mm per pixel along x, averaged over `radius` pixels on each side and
    /// scaled to `0..=255` over the ROI.
    pub fn coords_to_magnification_x(&self, roi: Roi, radius: i32) -> Result<GrayImage, FieldError> {
        self.coords_to_magnification(roi, radius, true)
    }

    /// mm per pixel along y, see [`Self::coords_to_magnification_x`].
    pub fn coords_to_magnification_y(&self, roi: Roi, radius: i32) -> Result<GrayImage, FieldError> {
        self.coords_to_magnification(roi, radius, false)
    }

    fn coords_to_magnification(
        &self,
        roi: Roi,
        radius: i32,
        along_x: bool,
    ) -> Result<GrayImage, FieldError> {
        if !roi.fits(self.size) || self.is_empty() {
            return Err(FieldError::RangeOutOfIndex(format!("{roi:?}")));
        }
        let w = self.size.width as i32;
        let h = self.size.height as i32;

        let mut lengths = Vec::with_capacity(roi.width * roi.height);
        for iy in 0..roi.height {
            for ix in 0..roi.width {
                let (x, y) = (roi.x + ix as i32, roi.y + iy as i32);
                let (x1, x2, y1, y2) = if along_x {
                    ((x - radius).max(0), (x + radius).min(w - 1), y, y)
                } else {
                    (x, x, (y - radius).max(0), (y + radius).min(h - 1))
                };
                let pixels = if along_x { x2 - x1 } else { y2 - y1 };
                let (ax, ay) = self.raw(x1 as usize, y1 as usize);
                let (bx, by) = self.raw(x2 as usize, y2 as usize);
                let mm = f64::from(bx - ax).hypot(f64::from(by - ay));
                let length = if pixels != 0 {
                    mm / f64::from(pixels.abs())
                } else {
                    0.0
                };
                lengths.push(length);
            }
        }

        let (min, max) = lengths
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        log::info!("magnification range: {min} {max}");

        let mut image = GrayImage::filled(roi.width, roi.height, BACKGROUND);
        for (px, length) in image.data.iter_mut().zip(&lengths) {
            let rounded = (length * 1e6).round() * 1e-6;
            *px = if range > 0.0 {
                ((rounded - min) * 255.0 / range).clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
        Ok(image)
    }

    /// Writes the stored table of `roi` as text: a ` Range:` header, then one
    /// line per sensor row with `X,Y;` per pixel at 4 decimals.
    pub fn coords_to_table<W: Write>(&self, out: &mut W, roi: Roi) -> Result<(), ExportError> {
        if self.is_empty() {
            log::error!("requested empty grid in coords_to_table");
            return Err(FieldError::Empty.into());
        }
        if !roi.fits(self.size) {
            log::error!("range out of index");
            return Err(FieldError::RangeOutOfIndex(format!("{roi:?}")).into());
        }
        writeln!(
            out,
            " Range: x {} {} y {} {}",
            roi.x,
            roi.x + roi.width as i32,
            roi.y,
            roi.y + roi.height as i32
        )?;
        for iy in 0..roi.height {
            for ix in 0..roi.width {
                let (px, py) = self.raw(roi.x as usize + ix, roi.y as usize + iy);
                write!(out, "{px:.4},{py:.4};")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Writes the table to `dir/screen<prefix><sequence>.txt` and returns the
    /// path.
    pub fn coords_to_table_file(
        &self,
        dir: impl AsRef<Path>,
        prefix: &str,
        sequence: u32,
        roi: Roi,
    ) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(format!("screen{prefix}{sequence}.txt"));
        log::info!("printing 3D grid to {}", path.display());
        let mut out = BufWriter::new(fs::File::create(&path)?);
        self.coords_to_table(&mut out, roi)?;
        out.flush()?;
        Ok(path)
    }
}

/// Saves a rendering as PNG.
#[cfg(feature = "image")]
pub fn save_png(image: &GrayImage, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let buf = ::image::ImageBuffer::<::image::Luma<u8>, _>::from_raw(
        image.width as u32,
        image.height as u32,
        image.data.clone(),
    )
    .ok_or_else(|| FieldError::RangeOutOfIndex(format!("{}x{}", image.width, image.height)))?;
    buf.save(path.as_ref())?;
    Ok(())
}
