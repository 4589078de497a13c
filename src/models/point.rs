use std::ops::{Add, Mul, Neg, Sub};

/// 2D point (or vector) with floating point image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate point by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Length when the point is read as a vector
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len <= f32::EPSILON {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len))
    }

    /// Dot product
    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product
    pub fn cross(&self, other: &Point) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Vector rotated by +90 degrees (image coordinates, y down)
    pub fn perpendicular(&self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1)
    pub fn lerp(&self, other: &Point, t: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert_relative_eq!(p1.distance(&p2), 5.0, epsilon = 1e-6);
        assert_relative_eq!(p1.distance_squared(&p2), 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vector_ops() {
        let v = Point::new(3.0, 4.0);
        let n = v.normalized().unwrap();
        assert_relative_eq!(n.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.dot(&v.perpendicular()), 0.0, epsilon = 1e-6);
        assert_relative_eq!(Point::new(1.0, 0.0).cross(&Point::new(0.0, 1.0)), 1.0);
        assert!(Point::default().normalized().is_none());

        let mid = Point::new(0.0, 0.0).lerp(&Point::new(10.0, 20.0), 0.25);
        assert_eq!(mid, Point::new(2.5, 5.0));
        assert_eq!(v - v * 2.0, -v);
    }
}
