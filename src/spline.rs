// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Fritsch-Carlson monotone cubic spline.
//!
//! The op-amp transfer curve is only known at a few measured points. The
//! reverse transfer table is sampled from this spline, so it must never
//! overshoot between knots: a non-monotone table would make the integrator
//! feedback loop unstable.

use alloc::vec::Vec;

use crate::error::ModelError;

/// A 2D point for spline interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Abscissa.
    pub x: f64,
    /// Ordinate.
    pub y: f64,
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

/// Cubic `a*d^3 + b*d^2 + c*d + y0` with `d = x - x0`.
#[derive(Clone, Copy, Debug)]
struct Segment {
    x0: f64,
    x1: f64,
    a: f64,
    b: f64,
    c: f64,
    y0: f64,
}

impl Segment {
    #[inline]
    fn evaluate(&self, x: f64) -> (f64, f64) {
        let d = x - self.x0;
        let y = ((self.a * d + self.b) * d + self.c) * d + self.y0;
        let dy = (3.0 * self.a * d + 2.0 * self.b) * d + self.c;
        (y, dy)
    }
}

/// Monotone cubic spline through a set of points sorted by x.
#[derive(Clone, Debug)]
pub struct MonotoneSpline {
    segments: Vec<Segment>,
}

impl MonotoneSpline {
    /// Fits the spline.
    ///
    /// Fails if fewer than three points are given or x is not strictly
    /// increasing.
    pub fn new(points: &[Point]) -> Result<Self, ModelError> {
        if points.len() < 3 {
            return Err(ModelError::TooFewPoints(points.len()));
        }
        if let Some(index) = points.windows(2).position(|w| w[1].x <= w[0].x) {
            return Err(ModelError::UnsortedPoints {
                index: index + 1,
                x: points[index + 1].x,
            });
        }

        let n = points.len() - 1;
        let dxs: Vec<f64> = points.windows(2).map(|w| w[1].x - w[0].x).collect();
        let slopes: Vec<f64> = points
            .windows(2)
            .zip(&dxs)
            .map(|(w, dx)| (w[1].y - w[0].y) / dx)
            .collect();

        // Tangents. Zero where the slope changes sign, otherwise the
        // weighted harmonic mean of the neighbouring slopes.
        let mut tangents = Vec::with_capacity(n + 1);
        tangents.push(slopes[0]);
        for i in 1..n {
            let (m0, m1) = (slopes[i - 1], slopes[i]);
            if m0 * m1 <= 0.0 {
                tangents.push(0.0);
            } else {
                let (dx0, dx1) = (dxs[i - 1], dxs[i]);
                let common = dx0 + dx1;
                tangents.push(3.0 * common / ((common + dx1) / m0 + (common + dx0) / m1));
            }
        }
        tangents.push(slopes[n - 1]);

        let segments = (0..n)
            .map(|i| {
                let c = tangents[i];
                let m = slopes[i];
                let inv_dx = 1.0 / dxs[i];
                let common = c + tangents[i + 1] - m - m;
                Segment {
                    x0: points[i].x,
                    x1: points[i + 1].x,
                    a: common * inv_dx * inv_dx,
                    b: (m - c - common) * inv_dx,
                    c,
                    y0: points[i].y,
                }
            })
            .collect();

        Ok(MonotoneSpline { segments })
    }

    /// Evaluates the spline at `x`, returning `(y, dy/dx)`.
    ///
    /// Outside the knot range the first or last cubic is extrapolated.
    pub fn evaluate(&self, x: f64) -> (f64, f64) {
        let last = self.segments.len() - 1;
        let i = self.segments.partition_point(|s| s.x1 < x).min(last);
        self.segments[i].evaluate(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OPAMP_VOLTAGE_8580;

    fn opamp_points() -> Vec<Point> {
        OPAMP_VOLTAGE_8580.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn opamp_curve_is_monotone_decreasing() {
        let spline = MonotoneSpline::new(&opamp_points()).unwrap();

        let mut prev_y = f64::MAX;
        let mut x = 1.30;
        while x < 8.91 {
            let (y, _) = spline.evaluate(x);
            assert!(y <= prev_y + 1e-9, "not monotone at x={x}: {y} > {prev_y}");
            prev_y = y;
            x += 0.0005;
        }
    }

    #[test]
    fn passes_through_knots() {
        let points = opamp_points();
        let spline = MonotoneSpline::new(&points).unwrap();

        for p in &points {
            let (y, _) = spline.evaluate(p.x);
            assert!((y - p.y).abs() < 1e-10, "x={}: expected {}, got {}", p.x, p.y, y);
        }
    }

    #[test]
    fn flat_neighbourhood_has_zero_tangent() {
        // Slope changes sign at x=1, so the tangent there is forced to zero.
        let points = [
            Point { x: 0.0, y: 0.0 },
            Point { x: 1.0, y: 1.0 },
            Point { x: 2.0, y: 0.0 },
        ];
        let spline = MonotoneSpline::new(&points).unwrap();
        let (_, dy) = spline.evaluate(1.0);
        assert_eq!(dy, 0.0);
    }

    #[test]
    fn extrapolates_outside_bounds() {
        let points = [
            Point { x: 10.0, y: 15.0 },
            Point { x: 15.0, y: 20.0 },
            Point { x: 20.0, y: 30.0 },
            Point { x: 25.0, y: 40.0 },
            Point { x: 30.0, y: 45.0 },
        ];
        let spline = MonotoneSpline::new(&points).unwrap();

        let (y, _) = spline.evaluate(5.0);
        assert!((y - 6.66667).abs() < 0.00001, "below range: got {y}");

        let (y, _) = spline.evaluate(40.0);
        assert!((y - 75.0).abs() < 0.00001, "above range: got {y}");
    }

    #[test]
    fn rejects_bad_input() {
        let two = [Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }];
        assert_eq!(MonotoneSpline::new(&two).unwrap_err(), ModelError::TooFewPoints(2));

        let unsorted = [
            Point { x: 0.0, y: 0.0 },
            Point { x: 2.0, y: 1.0 },
            Point { x: 2.0, y: 2.0 },
        ];
        assert_eq!(
            MonotoneSpline::new(&unsorted).unwrap_err(),
            ModelError::UnsortedPoints { index: 2, x: 2.0 }
        );
    }
}
