//! 2-D line in implicit form `a*x + b*y + c = 0`.
//!
//! Used for the chessboard row/column fits of the corner grid and for the
//! laser line reference of oriented line models.

use nalgebra::{Matrix2, Point2, SymmetricEigen, Vector2};
use serde::{Deserialize, Serialize};

use crate::laser_line::AngleUnit;

const PARALLEL_EPS: f64 = 1e-6;
const ZERO_EPS: f64 = 1e-9;

/// Dominant direction of the points fed to [`LineEquation::fit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOrientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineEquation {
    a: f64,
    b: f64,
    c: f64,
}

impl Default for LineEquation {
    fn default() -> Self {
        Self::invalid()
    }
}

impl LineEquation {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub const fn invalid() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            c: 0.0,
        }
    }

    /// Line `y = m*x + q`.
    pub fn from_slope(m: f64, q: f64) -> Self {
        Self::new(m, -1.0, q)
    }

    /// Line through `(x, y)` with inclination `beta` measured from the
    /// horizontal axis, or from the vertical axis when `to_horizontal` is false.
    pub fn through_point_with_angle(
        x: f64,
        y: f64,
        beta: f64,
        unit: AngleUnit,
        to_horizontal: bool,
    ) -> Self {
        let mut beta = unit.to_radians(beta);
        if !to_horizontal {
            beta = std::f64::consts::FRAC_PI_2 - beta;
        }
        let a = beta.sin();
        let b = -beta.cos();
        Self::new(a, b, -a * x - b * y)
    }

    /// Orthogonal least squares fit. Returns an invalid line for fewer than
    /// two points or when all points coincide.
    pub fn fit(xs: &[f64], ys: &[f64], orientation: LineOrientation) -> Self {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return Self::invalid();
        }
        let inv_n = 1.0 / n as f64;
        let mx = xs[..n].iter().sum::<f64>() * inv_n;
        let my = ys[..n].iter().sum::<f64>() * inv_n;

        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for (&x, &y) in xs[..n].iter().zip(&ys[..n]) {
            let dx = x - mx;
            let dy = y - my;
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        if sxx + syy < ZERO_EPS {
            return Self::invalid();
        }

        // The normal is the eigenvector of the smallest eigenvalue.
        let eig = SymmetricEigen::new(Matrix2::new(sxx, sxy, sxy, syy));
        let idx = if eig.eigenvalues[0] <= eig.eigenvalues[1] {
            0
        } else {
            1
        };
        let normal: Vector2<f64> = eig.eigenvectors.column(idx).into_owned();
        let (mut a, mut b) = (normal.x, normal.y);
        let flip = match orientation {
            LineOrientation::Horizontal => b < 0.0,
            LineOrientation::Vertical => a < 0.0,
        };
        if flip {
            a = -a;
            b = -b;
        }
        Self::new(a, b, -a * mx - b * my)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.a != 0.0 || self.b != 0.0
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// `(a, b, c)`, optionally scaled so that `(a, b)` is a unit normal.
    pub fn coefficients(&self, normalized: bool) -> (f64, f64, f64) {
        if normalized && self.is_valid() {
            let m = self.magnitude();
            (self.a / m, self.b / m, self.c / m)
        } else {
            (self.a, self.b, self.c)
        }
    }

    /// Unit direction vector, oriented so that `x` grows along it for
    /// non-vertical lines.
    pub fn direction(&self) -> Vector2<f64> {
        if !self.is_valid() {
            return Vector2::zeros();
        }
        let s = if self.b < 0.0 { -1.0 } else { 1.0 };
        let m = self.magnitude();
        Vector2::new(s * self.b / m, -s * self.a / m)
    }

    /// Unsigned distance of a point from the line, 0 for an invalid line.
    pub fn distance(&self, x: f64, y: f64) -> f64 {
        self.signed_distance(x, y).abs()
    }

    pub fn signed_distance(&self, x: f64, y: f64) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        (self.a * x + self.b * y + self.c) / self.magnitude()
    }

    /// Orthogonal projection of a point onto the line.
    pub fn project(&self, x0: f64, y0: f64) -> Point2<f64> {
        if !self.is_valid() {
            return Point2::new(x0, y0);
        }
        let (a, b, c) = (self.a, self.b, self.c);
        let mag2 = a * a + b * b;
        let xp = (b * (b * x0 - a * y0) - a * c) / mag2;
        let yp = (a * (-b * x0 + a * y0) - b * c) / mag2;
        Point2::new(xp, yp)
    }

    pub fn intersect(&self, other: &LineEquation) -> Option<Point2<f64>> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let det = self.a * other.b - self.b * other.a;
        if det.abs() < PARALLEL_EPS {
            return None;
        }
        let x = (-other.b * self.c + self.b * other.c) / det;
        let y = (other.a * self.c - self.a * other.c) / det;
        Some(Point2::new(x, y))
    }

    /// `y` at the given `x`. For a vertical line this is 0 on the line and
    /// NaN elsewhere.
    pub fn y_at(&self, x: f64) -> f64 {
        if self.b != 0.0 {
            return -self.a / self.b * x - self.c / self.b;
        }
        if x == -self.c / self.a {
            0.0
        } else {
            log::debug!("vertical line x = {} queried at x = {}", -self.c / self.a, x);
            f64::NAN
        }
    }

    pub fn x_at(&self, y: f64) -> f64 {
        if self.a != 0.0 {
            return -self.b / self.a * y - self.c / self.a;
        }
        if y == -self.c / self.b {
            0.0
        } else {
            log::debug!("horizontal line y = {} queried at y = {}", -self.c / self.b, y);
            f64::NAN
        }
    }

    /// Angle of the line to the x axis in `(-90, 90]` degrees.
    pub fn inclination_degrees(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        let s = if self.b < 0.0 { -1.0 } else { 1.0 };
        let mut angle = (-s * self.a).atan2(s * self.b);
        if angle <= -std::f64::consts::FRAC_PI_2 {
            angle += std::f64::consts::PI;
        } else if angle > std::f64::consts::FRAC_PI_2 {
            angle -= std::f64::consts::PI;
        }
        angle.to_degrees()
    }

    /// Signed angle in radians rotating this line's direction onto `other`'s.
    pub fn angle_to(&self, other: &LineEquation) -> f64 {
        let u = self.direction();
        let v = other.direction();
        let cross = u.x * v.y - u.y * v.x;
        cross.atan2(u.dot(&v))
    }

    /// Shifts the line by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        if !self.is_valid() {
            return;
        }
        self.c -= self.a * dx + self.b * dy;
    }

    pub fn parallel_through(&self, x: f64, y: f64) -> LineEquation {
        LineEquation::new(self.a, self.b, -self.a * x - self.b * y)
    }

    pub fn perpendicular_through(&self, x: f64, y: f64) -> LineEquation {
        let a1 = self.b;
        let b1 = -self.a;
        LineEquation::new(a1, b1, -a1 * x - b1 * y)
    }

    /// Point at `signed_length` along the line from the projection of `start`.
    pub fn point_on_line(&self, start: Point2<f64>, signed_length: f64) -> Point2<f64> {
        if !self.is_valid() {
            return Point2::origin();
        }
        let p = self.project(start.x, start.y);
        p + self.direction() * signed_length
    }

    /// Two points on the line `distance` apart.
    pub fn two_points(&self, distance: f64) -> Option<(Point2<f64>, Point2<f64>)> {
        if !self.is_valid() {
            return None;
        }
        let p0 = self.project(0.0, 0.0);
        Some((p0, p0 + self.direction() * distance))
    }

    /// Intersections with an axis-aligned rectangle (at most two).
    pub fn intersect_rectangle(
        &self,
        mut x_min: f64,
        mut x_max: f64,
        mut y_min: f64,
        mut y_max: f64,
    ) -> Vec<Point2<f64>> {
        let mut out = Vec::with_capacity(2);
        if !self.is_valid() {
            return out;
        }
        if x_min > x_max {
            std::mem::swap(&mut x_min, &mut x_max);
        }
        if y_min > y_max {
            std::mem::swap(&mut y_min, &mut y_max);
        }

        if self.a.abs() < ZERO_EPS {
            let y = -self.c / self.b;
            if (y_min..=y_max).contains(&y) {
                out.push(Point2::new(x_min, y));
                out.push(Point2::new(x_max, y));
            }
            return out;
        }
        if self.b.abs() < ZERO_EPS {
            let x = -self.c / self.a;
            if (x_min..=x_max).contains(&x) {
                out.push(Point2::new(x, y_min));
                out.push(Point2::new(x, y_max));
            }
            return out;
        }

        for x in [x_min, x_max] {
            let y = self.y_at(x);
            if !y.is_nan() && (y_min..=y_max).contains(&y) {
                out.push(Point2::new(x, y));
            }
        }
        if out.len() == 2 {
            return out;
        }
        for y in [y_min, y_max] {
            let x = self.x_at(y);
            let p = Point2::new(x, y);
            if out.len() < 2 && !x.is_nan() && (x_min..=x_max).contains(&x) && !out.contains(&p) {
                out.push(p);
            }
        }
        out
    }
}
