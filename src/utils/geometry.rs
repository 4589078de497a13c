/// Geometry utilities for cluster axes, skew checks and result overlap
use crate::models::Point;

/// Least-squares line `x = a + b*y` through the given points
///
/// Rows are the independent variable because guard patterns are collected one
/// per scan row. Returns the centroid and the unit direction of increasing y,
/// or `None` when fewer than two distinct rows are present.
pub fn fit_line(points: &[Point]) -> Option<(Point, Point)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f32;
    let mean_x = points.iter().map(|p| p.x).sum::<f32>() / n;
    let mean_y = points.iter().map(|p| p.y).sum::<f32>() / n;

    let mut syy = 0.0f32;
    let mut sxy = 0.0f32;
    for p in points {
        let dy = p.y - mean_y;
        syy += dy * dy;
        sxy += dy * (p.x - mean_x);
    }
    if syy <= f32::EPSILON {
        return None;
    }

    let slope = sxy / syy;
    let dir = Point::new(slope, 1.0).normalized()?;
    Some((Point::new(mean_x, mean_y), dir))
}

/// Unsigned angle in degrees between two direction vectors
pub fn angle_between(a: &Point, b: &Point) -> f32 {
    let denom = a.length() * b.length();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Angle in degrees of `v` against the image rows, ignoring the vertical sign
pub fn row_angle(v: &Point) -> f32 {
    v.y.abs().atan2(v.x).to_degrees()
}

/// Signed perpendicular distance from `p` to the line through `origin` along unit `dir`
pub fn signed_distance(p: &Point, origin: &Point, dir: &Point) -> f32 {
    dir.cross(&(*p - *origin))
}

fn project(poly: &[Point; 4], axis: &Point) -> (f32, f32) {
    poly.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

/// Separating-axis overlap test for two convex quads
///
/// The quads count as overlapping when no edge normal separates them by more
/// than `padding` pixels.
pub fn quads_overlap(a: &[Point; 4], b: &[Point; 4], padding: f32) -> bool {
    for poly in [a, b] {
        for i in 0..4 {
            let edge = poly[(i + 1) % 4] - poly[i];
            let Some(axis) = edge.perpendicular().normalized() else {
                continue;
            };
            let (a_lo, a_hi) = project(a, &axis);
            let (b_lo, b_hi) = project(b, &axis);
            if a_hi + padding < b_lo || b_hi + padding < a_lo {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f32, y: f32, size: f32) -> [Point; 4] {
        [
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ]
    }

    #[test]
    fn test_fit_vertical_line() {
        let pts: Vec<Point> = (0..10).map(|y| Point::new(5.0, y as f32)).collect();
        let (c, dir) = fit_line(&pts).unwrap();
        assert_relative_eq!(c.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(c.y, 4.5, epsilon = 1e-5);
        assert_relative_eq!(dir.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(dir.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_fit_slanted_line() {
        let pts: Vec<Point> = (0..20)
            .map(|y| Point::new(2.0 + 0.5 * y as f32, y as f32))
            .collect();
        let (_, dir) = fit_line(&pts).unwrap();
        assert_relative_eq!(dir.x / dir.y, 0.5, epsilon = 1e-4);
        assert!(fit_line(&pts[..1]).is_none());
    }

    #[test]
    fn test_angles() {
        assert_relative_eq!(
            angle_between(&Point::new(1.0, 0.0), &Point::new(0.0, 1.0)),
            90.0,
            epsilon = 1e-3
        );
        assert_relative_eq!(row_angle(&Point::new(1.0, -1.0)), 45.0, epsilon = 1e-3);
        assert_relative_eq!(row_angle(&Point::new(-1.0, 0.0)), 180.0, epsilon = 1e-3);
    }

    #[test]
    fn test_signed_distance() {
        let d = signed_distance(
            &Point::new(3.0, 7.0),
            &Point::new(0.0, 0.0),
            &Point::new(0.0, 1.0),
        );
        assert_relative_eq!(d.abs(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_quads_overlap() {
        let a = square(0.0, 0.0, 10.0);
        assert!(quads_overlap(&a, &square(5.0, 5.0, 10.0), 0.0));
        assert!(!quads_overlap(&a, &square(20.0, 0.0, 10.0), 4.0));
        // A 3 px gap is bridged by 4 px of padding
        assert!(quads_overlap(&a, &square(13.0, 0.0, 10.0), 4.0));
    }
}
