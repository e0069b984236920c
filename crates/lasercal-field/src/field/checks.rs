use nalgebra::Point2;

use super::coords::CoordinateField;

impl CoordinateField {
    /// Pixels breaking the layout of a finished field.
    ///
    /// The field is scanned column by column. A pixel is reported when it is
    /// invalid (unless `invalid_allowed`), when it is valid below a gap of
    /// invalid pixels in its column (unless `non_contiguous_allowed`), when
    /// its X is smaller than the X of its left neighbour, or when its Y is
    /// larger than the Y of the pixel above.
    pub fn check_discontinuities(
        &self,
        invalid_allowed: bool,
        non_contiguous_allowed: bool,
    ) -> Vec<Point2<i32>> {
        let (w, h) = (self.size.width, self.size.height);
        let mut points = Vec::new();
        let mut last_column_x = vec![f32::NAN; h];

        for i in 0..w {
            let mut column_x = vec![f32::NAN; h];
            let mut prev_up_y = f32::NAN;
            let mut first_valid = h;
            let mut last_valid = h;

            for j in 0..h {
                let coords = self.coordinates(i as i32, j as i32);
                let mut discontinuity = false;
                match coords {
                    Some(p) => {
                        if j < first_valid {
                            first_valid = j;
                        } else if j > last_valid && !non_contiguous_allowed {
                            log::debug!(
                                "valid pixel [{i} {j}] outside the contiguous range [{first_valid}, {last_valid}]"
                            );
                            discontinuity = true;
                        }

                        column_x[j] = p.x;
                        let left_x = last_column_x[j];
                        if !left_x.is_nan() && left_x > p.x {
                            log::debug!("horizontal discontinuity at [{i} {j}]: {left_x} > {}", p.x);
                            discontinuity = true;
                        }
                        if !prev_up_y.is_nan() && prev_up_y < p.y {
                            log::debug!("vertical discontinuity at [{i} {j}]: {prev_up_y} < {}", p.y);
                            discontinuity = true;
                        }
                    }
                    None => {
                        if !invalid_allowed {
                            log::debug!("invalid pixel [{i} {j}]");
                            discontinuity = true;
                        }
                        if j > first_valid && j < last_valid {
                            last_valid = j - 1;
                        }
                    }
                }
                prev_up_y = coords.map_or(f32::NAN, |p| p.y);
                if discontinuity {
                    points.push(Point2::new(i as i32, j as i32));
                }
            }
            last_column_x = column_x;
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldWriter;
    use lasercal_core::SensorModel;

    fn monotone(w: usize, h: usize) -> CoordinateField {
        let mut field = CoordinateField::with_size(w, h, SensorModel::LinearMagnification);
        FieldWriter::new(&mut field).fill_with(|x, y| (x as f32 + 1.0, -(y as f32) - 1.0));
        field
    }

    #[test]
    fn monotone_field_is_clean() {
        assert!(monotone(6, 5).check_discontinuities(false, false).is_empty());
    }

    #[test]
    fn reversed_x_is_reported() {
        let mut field = monotone(6, 5);
        FieldWriter::new(&mut field).set(3, 2, 0.5, -3.0);
        let points = field.check_discontinuities(false, false);
        // only (3, 2) breaks: its X is below the X of (2, 2)
        assert_eq!(points, vec![Point2::new(3, 2)]);
    }

    #[test]
    fn rising_y_is_reported() {
        let mut field = monotone(4, 4);
        FieldWriter::new(&mut field).set(1, 2, 2.0, 5.0);
        let points = field.check_discontinuities(false, false);
        assert!(points.contains(&Point2::new(1, 2)));
        // the pixel below sees a larger Y above it, which is fine
        assert!(!points.contains(&Point2::new(1, 3)));
    }

    #[test]
    fn gaps_in_a_column() {
        let mut field = monotone(3, 6);
        // a border pixel is never taken for the origin
        FieldWriter::new(&mut field).set(0, 2, 0.0, 0.0);
        let strict = field.check_discontinuities(false, false);
        assert!(strict.contains(&Point2::new(0, 2)));
        assert!(strict.contains(&Point2::new(0, 3)));

        let lenient = field.check_discontinuities(true, false);
        assert_eq!(
            lenient,
            vec![Point2::new(0, 3), Point2::new(0, 4), Point2::new(0, 5)]
        );
        assert!(field.check_discontinuities(true, true).is_empty());
    }
}
