use nalgebra::geometry::Point2;
use std::f64::consts::PI;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Degrees in a radian
const AM: f64 = 180.0 / PI;

/// An angle measured in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Degrees(pub f64);

/// An angle measured in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Radians(pub f64);

impl Degrees {
    pub fn to_radians(self) -> Radians {
        Radians(self.0 / AM)
    }
}

impl Radians {
    pub fn to_degrees(self) -> Degrees {
        Degrees(self.0 * AM)
    }

    pub fn cos(self) -> f64 {
        self.0.cos()
    }

    pub fn sin(self) -> f64 {
        self.0.sin()
    }
}

impl From<Degrees> for Radians {
    fn from(d: Degrees) -> Self {
        d.to_radians()
    }
}

impl From<Radians> for Degrees {
    fn from(r: Radians) -> Self {
        r.to_degrees()
    }
}

impl Add for Degrees {
    type Output = Degrees;
    fn add(self, rhs: Degrees) -> Degrees {
        Degrees(self.0 + rhs.0)
    }
}

impl Sub for Degrees {
    type Output = Degrees;
    fn sub(self, rhs: Degrees) -> Degrees {
        Degrees(self.0 - rhs.0)
    }
}

impl Neg for Degrees {
    type Output = Degrees;
    fn neg(self) -> Degrees {
        Degrees(-self.0)
    }
}

impl Mul<f64> for Degrees {
    type Output = Degrees;
    fn mul(self, rhs: f64) -> Degrees {
        Degrees(self.0 * rhs)
    }
}

impl Div<f64> for Degrees {
    type Output = Degrees;
    fn div(self, rhs: f64) -> Degrees {
        Degrees(self.0 / rhs)
    }
}

/// A point in polar form: radius `r` and angle `a`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Polar {
    pub r: f64,
    pub a: Degrees,
}

impl Polar {
    pub fn new(r: f64, a: Degrees) -> Self {
        Polar { r, a }
    }
}

/// Convert a polar point to drawing coordinates.
/// Drawing coordinates have y growing downwards, so positive angles turn counter-clockwise on screen.
pub fn polar_to_linear(p: Polar) -> Point2<f64> {
    let a = ((p.a.0 + 360.0) % 360.0) / AM;
    Point2::new(a.cos() * p.r, -a.sin() * p.r)
}

/// Convert drawing coordinates to a polar point, with the angle in `[0, 360)`.
///
/// This is not the inverse of [`polar_to_linear`]: the angle is measured against +y, not -y, so a
/// round trip mirrors the angle. The involute trace depends on that mirroring to produce a
/// leading flank with positive angles.
pub fn linear_to_polar(p: Point2<f64>) -> Polar {
    let r = (p.x * p.x + p.y * p.y).sqrt();
    if r == 0.0 {
        return Polar::new(0.0, Degrees(0.0));
    }
    let mut a = (p.y / r).asin() * AM;
    if p.x < 0.0 {
        a = 180.0 - a;
    }
    Polar::new(r, Degrees((a + 360.0) % 360.0))
}

/// Round `v` to `places` decimal places
pub fn round_places(v: f64, places: i32) -> f64 {
    let m = 10f64.powi(places);
    (v * m).round() / m
}

/// Two decimal places, used for human-facing numbers and coarse drawing offsets.
pub fn fix2(v: f64) -> f64 {
    round_places(v, 2)
}

/// Seven decimal places, used for path coordinates.
pub fn fix7(v: f64) -> f64 {
    round_places(v, 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f64 = 1e-10;

    fn points_equal(p1: Point2<f64>, p2: Point2<f64>) -> bool {
        (p1 - p2).norm() < EPSILON
    }

    #[test]
    fn test_unit_conversion() {
        assert_abs_diff_eq!(Degrees(180.0).to_radians().0, PI, epsilon = EPSILON);
        assert_abs_diff_eq!(Radians(PI / 2.0).to_degrees().0, 90.0, epsilon = EPSILON);
        let r: Radians = Degrees(27.0).into();
        assert_abs_diff_eq!(Degrees::from(r).0, 27.0, epsilon = EPSILON);
    }

    #[test]
    fn test_polar_to_linear_y_down() {
        assert!(points_equal(
            polar_to_linear(Polar::new(2.0, Degrees(0.0))),
            Point2::new(2.0, 0.0)
        ));
        // 90 degrees points up the screen, which is -y
        assert!(points_equal(
            polar_to_linear(Polar::new(1.0, Degrees(90.0))),
            Point2::new(0.0, -1.0)
        ));
        // Negative angles wrap
        assert!(points_equal(
            polar_to_linear(Polar::new(1.0, Degrees(-90.0))),
            Point2::new(0.0, 1.0)
        ));
    }

    #[test]
    fn test_linear_to_polar_quadrants() {
        let p = linear_to_polar(Point2::new(0.0, 1.0));
        assert_abs_diff_eq!(p.r, 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(p.a.0, 90.0, epsilon = EPSILON);

        let p = linear_to_polar(Point2::new(-1.0, 0.0));
        assert_abs_diff_eq!(p.a.0, 180.0, epsilon = EPSILON);

        let p = linear_to_polar(Point2::new(1.0, -1.0));
        assert_abs_diff_eq!(p.r, 2.0_f64.sqrt(), epsilon = EPSILON);
        assert_abs_diff_eq!(p.a.0, 315.0, epsilon = EPSILON);
    }

    #[test]
    fn test_round_trip_mirrors_angle() {
        let p = linear_to_polar(polar_to_linear(Polar::new(3.0, Degrees(30.0))));
        assert_abs_diff_eq!(p.r, 3.0, epsilon = EPSILON);
        assert_abs_diff_eq!(p.a.0, 330.0, epsilon = 1e-9);
    }

    #[test]
    fn test_origin() {
        let p = linear_to_polar(Point2::new(0.0, 0.0));
        assert_eq!(p.r, 0.0);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(fix2(2.37499), 2.37);
        assert_eq!(fix2(1.005_1), 1.01);
        assert_eq!(fix7(0.123456789), 0.1234568);
        assert_eq!(round_places(12.5, 0), 13.0);
    }
}
