//! Numeric shadows of geometric objects
//!
//! Every reference carries one immutable floating-point shadow. Shadows are only
//! a sanity oracle: they reject inconsistent assertions and pick between finitely
//! many exact candidates, they never prove anything on their own.

use super::symbols::ObjKind;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 2D point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another point
    pub fn distance(&self, other: &Point2D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Dot product with another point (as vectors from origin)
    pub fn dot(&self, other: &Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }
}

/// Floating-point shadow attached to a reference at creation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Numeric {
    Point(Point2D),
    /// Unit normal and offset: the line is `{p : normal·p = offset}`
    Line { normal: Point2D, offset: f64 },
    Circle { center: Point2D, radius: f64 },
    /// Angle in half-turns, meaningful modulo 1
    Angle(f64),
    /// Natural logarithm of a positive quantity
    Ratio(f64),
}

impl Numeric {
    pub fn point(x: f64, y: f64) -> Self {
        Numeric::Point(Point2D::new(x, y))
    }

    /// Line with the given normal, rescaled to unit length
    pub fn line(nx: f64, ny: f64, offset: f64) -> Self {
        let norm = (nx * nx + ny * ny).sqrt();
        assert!(norm > 0.0, "line normal must be non-zero");
        Numeric::Line {
            normal: Point2D::new(nx / norm, ny / norm),
            offset: offset / norm,
        }
    }

    /// Line through two distinct points
    pub fn line_through(a: Point2D, b: Point2D) -> Self {
        let (nx, ny) = (a.y - b.y, b.x - a.x);
        Self::line(nx, ny, nx * a.x + ny * a.y)
    }

    pub fn circle(x: f64, y: f64, radius: f64) -> Self {
        assert!(radius > 0.0, "circle radius must be positive");
        Numeric::Circle {
            center: Point2D::new(x, y),
            radius,
        }
    }

    /// Kind of object this shadow describes
    pub fn kind(&self) -> ObjKind {
        match self {
            Numeric::Point(_) => ObjKind::Point,
            Numeric::Line { .. } => ObjKind::Line,
            Numeric::Circle { .. } => ObjKind::Circle,
            Numeric::Angle(_) => ObjKind::Angle,
            Numeric::Ratio(_) => ObjKind::Ratio,
        }
    }

    /// Scalar value of an angle or ratio shadow
    pub fn scalar(&self) -> Option<f64> {
        match *self {
            Numeric::Angle(v) | Numeric::Ratio(v) => Some(v),
            _ => None,
        }
    }

    /// Direction of a line shadow in half-turns, in `[0, 1)`
    pub fn direction(&self) -> Option<f64> {
        match self {
            Numeric::Line { normal, .. } => {
                let turns = normal.y.atan2(normal.x) / PI + 0.5;
                Some(turns.rem_euclid(1.0))
            }
            _ => None,
        }
    }

    /// Whether two shadows describe the same object within `eps`
    pub fn agrees_with(&self, other: &Numeric, eps: f64) -> bool {
        self.discrepancy(other) < eps
    }

    /// Largest coordinate difference between two shadows, infinite across kinds
    pub fn discrepancy(&self, other: &Numeric) -> f64 {
        match (self, other) {
            (Numeric::Point(a), Numeric::Point(b)) => a.distance(b),
            (
                Numeric::Line { normal: n1, offset: c1 },
                Numeric::Line { normal: n2, offset: c2 },
            ) => {
                let same = (n1.x - n2.x).abs().max((n1.y - n2.y).abs()).max((c1 - c2).abs());
                let flipped = (n1.x + n2.x).abs().max((n1.y + n2.y).abs()).max((c1 + c2).abs());
                same.min(flipped)
            }
            (
                Numeric::Circle { center: a, radius: r1 },
                Numeric::Circle { center: b, radius: r2 },
            ) => a.distance(b).max((r1 - r2).abs()),
            (Numeric::Angle(a), Numeric::Angle(b)) => distance_to_integer(a - b),
            (Numeric::Ratio(a), Numeric::Ratio(b)) => (a - b).abs(),
            _ => f64::INFINITY,
        }
    }
}

/// Distance of `x` from the nearest integer
pub fn distance_to_integer(x: f64) -> f64 {
    (x - x.round()).abs()
}

/// Incidence and intersection tests used as rule pre-filters
pub mod ops {
    use super::*;

    /// Two circles cross in two distinct points
    pub fn circles_cross(a: &Numeric, b: &Numeric, eps: f64) -> bool {
        match (a, b) {
            (
                Numeric::Circle { center: c1, radius: r1 },
                Numeric::Circle { center: c2, radius: r2 },
            ) => {
                let d = c1.distance(c2);
                d > (r1 - r2).abs() + eps && d < r1 + r2 - eps
            }
            _ => false,
        }
    }

    /// A line crosses a circle in two distinct points
    pub fn line_crosses_circle(line: &Numeric, circle: &Numeric, eps: f64) -> bool {
        match (line, circle) {
            (Numeric::Line { normal, offset }, Numeric::Circle { center, radius }) => {
                (normal.dot(center) - offset).abs() < radius - eps
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_point_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);

        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_line_through_is_unoriented() {
        let a = Point2D::new(0.0, 1.0);
        let b = Point2D::new(2.0, 3.0);

        let l1 = Numeric::line_through(a, b);
        let l2 = Numeric::line_through(b, a);

        assert!(l1.agrees_with(&l2, EPS));
        assert!(Numeric::line_through(a, Point2D::new(4.0, 5.0)).agrees_with(&l1, EPS));
    }

    #[test]
    fn test_line_direction() {
        let horizontal = Numeric::line_through(Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0));
        let diagonal = Numeric::line_through(Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0));
        let vertical = Numeric::line_through(Point2D::new(0.0, 0.0), Point2D::new(0.0, 1.0));

        assert!(distance_to_integer(horizontal.direction().unwrap()) < EPS);
        assert!((diagonal.direction().unwrap() - 0.25).abs() < EPS);
        assert!((vertical.direction().unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_angles_agree_modulo_one() {
        assert!(Numeric::Angle(0.25).agrees_with(&Numeric::Angle(1.25), EPS));
        assert!(Numeric::Angle(0.999_999_999_9).agrees_with(&Numeric::Angle(0.0), EPS));
        assert!(!Numeric::Angle(0.25).agrees_with(&Numeric::Angle(0.75), EPS));
        assert!(!Numeric::Angle(0.25).agrees_with(&Numeric::Ratio(0.25), EPS));
    }

    #[test]
    fn test_circle_crossing() {
        let c1 = Numeric::circle(0.0, 0.0, 1.0);
        let c2 = Numeric::circle(1.0, 0.0, 1.0);
        let tangent = Numeric::circle(2.0, 0.0, 1.0);
        let far = Numeric::circle(5.0, 0.0, 1.0);

        assert!(ops::circles_cross(&c1, &c2, EPS));
        assert!(!ops::circles_cross(&c1, &tangent, EPS));
        assert!(!ops::circles_cross(&c1, &far, EPS));
    }

    #[test]
    fn test_line_circle_crossing() {
        let circle = Numeric::circle(0.0, 0.0, 1.0);
        let secant = Numeric::line(0.0, 1.0, 0.5);
        let tangent = Numeric::line(0.0, 1.0, 1.0);

        assert!(ops::line_crosses_circle(&secant, &circle, EPS));
        assert!(!ops::line_crosses_circle(&tangent, &circle, EPS));
    }

    #[test]
    fn test_discrepancy() {
        let a = Numeric::point(0.0, 0.0);
        let b = Numeric::point(3.0, 4.0);
        assert!((a.discrepancy(&b) - 5.0).abs() < EPS);
        assert_eq!(a.discrepancy(&Numeric::Angle(0.0)), f64::INFINITY);

        let up = Numeric::line(0.0, 1.0, 2.0);
        let down = Numeric::line(0.0, -1.0, -2.0);
        assert!(up.discrepancy(&down) < EPS);
    }
}
