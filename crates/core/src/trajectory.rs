//! Trajectory Assembler
//!
//! Turns a placed word into the two time-stamped trajectories the renderers
//! consume, and brings arbitrary user-drawn paths to the canonical point count
//! the learners work with.

use crate::geometry::{BoundingBox, PlacedWord, Point};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points every learned or demonstrated shape is resampled to.
pub const CANONICAL_POINT_COUNT: usize = 70;
/// Number of points per letter the actuator receives.
pub const DOWNSAMPLED_POINT_COUNT: usize = 7;
/// Ratio between full and downsampled point spacing along a letter.
pub const DOWNSAMPLE_FACTOR: f64 =
    (CANONICAL_POINT_COUNT - 1) as f64 / (DOWNSAMPLED_POINT_COUNT - 1) as f64;

/// Smallest path a cubic spline can be fitted through.
const MIN_SPLINE_POINTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    #[error("cubic resampling needs at least {MIN_SPLINE_POINTS} points, got {0}")]
    TooFewPoints(usize),
    #[error("flat path must hold as many x as y coordinates, got {0} values")]
    OddLengthPath(usize),
    #[error("path contains non-finite coordinates")]
    NonFinite,
}

/// Which consumer a trajectory is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryTarget {
    /// Fast digital display; full resolution.
    Display,
    /// Mechanical actuator; downsampled.
    Actuator,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPoint {
    pub x: f64,
    pub y: f64,
    /// Seconds relative to the trajectory's start stamp.
    pub t: f64,
}

/// An ordered list of time-stamped points in a fixed reference frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub frame_id: String,
    /// Publication time plus the lead-in delay; consumers start here.
    pub start_at: DateTime<Utc>,
    pub points: Vec<TimedPoint>,
}

impl Trajectory {
    pub fn first_point(&self) -> Option<Point> {
        self.points.first().map(|p| Point::new(p.x, p.y))
    }
}

/// Timing model shared by both trajectories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryTimings {
    /// Offset of the first point, in seconds.
    pub t0: f64,
    /// Per-point delta of the downsampled trajectory, in seconds.
    pub dt: f64,
    /// Delay between publication and the start stamp, in seconds.
    pub lead_in: f64,
}

impl TrajectoryTimings {
    /// Timings used when the robot physically writes; the arm is slow.
    pub const WRITING: TrajectoryTimings = TrajectoryTimings {
        t0: 3.0,
        dt: 0.35,
        lead_in: 3.0,
    };

    /// Timings used when only the display draws.
    pub const DISPLAY_ONLY: TrajectoryTimings = TrajectoryTimings {
        t0: 0.01,
        dt: 0.1,
        lead_in: 2.5,
    };

    pub fn for_writing(robot_writes: bool) -> Self {
        if robot_writes {
            Self::WRITING
        } else {
            Self::DISPLAY_ONLY
        }
    }
}

/// Both renderings of one placed word.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTrajectories {
    pub full: Trajectory,
    pub downsampled: Trajectory,
}

#[derive(Debug, Clone)]
pub struct TrajectoryAssembler {
    frame_id: String,
    timings: TrajectoryTimings,
}

impl TrajectoryAssembler {
    pub fn new(frame_id: impl Into<String>, timings: TrajectoryTimings) -> Self {
        Self {
            frame_id: frame_id.into(),
            timings,
        }
    }

    pub fn timings(&self) -> TrajectoryTimings {
        self.timings
    }

    /// Builds the full and downsampled trajectories of `word`, both stamped
    /// from the same `now` so their first points coincide.
    pub fn assemble(&self, word: &PlacedWord, now: DateTime<Utc>) -> AssembledTrajectories {
        let lead_in = TimeDelta::milliseconds((self.timings.lead_in * 1000.0).round() as i64);
        let start_at = now + lead_in;

        let full = self.stamp(word, start_at, self.timings.dt / DOWNSAMPLE_FACTOR);
        let downsampled = self.stamp(
            &word.downsampled(DOWNSAMPLE_FACTOR),
            start_at,
            self.timings.dt,
        );
        AssembledTrajectories { full, downsampled }
    }

    fn stamp(&self, word: &PlacedWord, start_at: DateTime<Utc>, delta: f64) -> Trajectory {
        let points = word
            .letters
            .iter()
            .flat_map(|l| l.path.iter())
            .enumerate()
            .map(|(idx, p)| TimedPoint {
                x: p.x,
                y: p.y,
                t: self.timings.t0 + idx as f64 * delta,
            })
            .collect();
        Trajectory {
            frame_id: self.frame_id.clone(),
            start_at,
            points,
        }
    }
}

/// Splits a flat `[x.., y..]` path into points, flipping y back.
pub fn decode_flat_path(flat: &[f64]) -> Result<Vec<Point>, TrajectoryError> {
    if flat.len() % 2 != 0 {
        return Err(TrajectoryError::OddLengthPath(flat.len()));
    }
    if flat.iter().any(|v| !v.is_finite()) {
        return Err(TrajectoryError::NonFinite);
    }
    let (xs, ys) = flat.split_at(flat.len() / 2);
    Ok(xs.iter().zip(ys).map(|(&x, &y)| Point::new(x, -y)).collect())
}

/// Brings a drawn path to `count` points with a cubic spline over
/// parametric position in [0, 1], x and y independently.
pub fn resample(path: &[Point], count: usize) -> Result<Vec<Point>, TrajectoryError> {
    if path.len() < MIN_SPLINE_POINTS {
        return Err(TrajectoryError::TooFewPoints(path.len()));
    }
    if path.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(TrajectoryError::NonFinite);
    }
    let xs: Vec<f64> = path.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = path.iter().map(|p| p.y).collect();
    let fx = CubicSpline::uniform(&xs);
    let fy = CubicSpline::uniform(&ys);

    let last = count.saturating_sub(1).max(1) as f64;
    Ok((0..count)
        .map(|i| {
            let t = i as f64 / last;
            Point::new(fx.eval(t), fy.eval(t))
        })
        .collect())
}

/// Scales a shape so its vertical extent is one. Flat shapes are returned as is.
pub fn normalise_height(points: &[Point]) -> Vec<Point> {
    let Some(bb) = BoundingBox::around(points) else {
        return Vec::new();
    };
    let height = bb.height();
    if height <= f64::EPSILON {
        return points.to_vec();
    }
    points
        .iter()
        .map(|p| Point::new(p.x / height, p.y / height))
        .collect()
}

/// Resampling followed by height normalisation: what a demonstration goes
/// through before a learner sees it.
pub fn prepare_demonstration(path: &[Point]) -> Result<Vec<Point>, TrajectoryError> {
    Ok(normalise_height(&resample(path, CANONICAL_POINT_COUNT)?))
}

/// Natural cubic spline over uniformly spaced knots on [0, 1].
struct CubicSpline {
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
    h: f64,
}

impl CubicSpline {
    fn uniform(values: &[f64]) -> Self {
        let n = values.len();
        let h = 1.0 / (n - 1) as f64;
        let mut m = vec![0.0; n];

        // Tridiagonal system for interior second derivatives (Thomas algorithm):
        // m[i-1] + 4 m[i] + m[i+1] = 6 (v[i+1] - 2 v[i] + v[i-1]) / h^2
        let interior = n - 2;
        let mut c = vec![0.0; interior];
        let mut d = vec![0.0; interior];
        for k in 0..interior {
            let i = k + 1;
            let rhs = 6.0 * (values[i + 1] - 2.0 * values[i] + values[i - 1]) / (h * h);
            if k == 0 {
                c[k] = 1.0 / 4.0;
                d[k] = rhs / 4.0;
            } else {
                let denom = 4.0 - c[k - 1];
                c[k] = 1.0 / denom;
                d[k] = (rhs - d[k - 1]) / denom;
            }
        }
        for k in (0..interior).rev() {
            let next = if k + 1 < interior { m[k + 2] } else { 0.0 };
            m[k + 1] = d[k] - c[k] * next;
        }

        Self {
            values: values.to_vec(),
            second_derivatives: m,
            h,
        }
    }

    fn eval(&self, t: f64) -> f64 {
        let n = self.values.len();
        let t = t.clamp(0.0, 1.0);
        let seg = ((t / self.h).floor() as usize).min(n - 2);
        let x0 = seg as f64 * self.h;
        let a = (x0 + self.h - t) / self.h;
        let b = (t - x0) / self.h;
        let (y0, y1) = (self.values[seg], self.values[seg + 1]);
        let (m0, m1) = (self.second_derivatives[seg], self.second_derivatives[seg + 1]);
        a * y0
            + b * y1
            + ((a.powi(3) - a) * m0 + (b.powi(3) - b) * m1) * self.h * self.h / 6.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PlacedLetter;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn letter(name: &str, n: usize, x_offset: f64) -> PlacedLetter {
        let path: Vec<Point> = (0..n)
            .map(|i| Point::new(x_offset + i as f64 * 0.001, (i as f64 * 0.1).sin() * 0.01))
            .collect();
        let bbox = BoundingBox::around(&path).unwrap();
        PlacedLetter {
            letter: name.into(),
            path,
            bbox,
        }
    }

    #[test]
    fn downsample_factor_matches_point_counts() {
        assert_abs_diff_eq!(DOWNSAMPLE_FACTOR, 11.5);
    }

    #[test]
    fn both_trajectories_share_start_and_first_point() {
        let word = PlacedWord {
            letters: vec![
                letter("c", CANONICAL_POINT_COUNT, 0.0),
                letter("a", CANONICAL_POINT_COUNT, 0.1),
            ],
        };
        let assembler = TrajectoryAssembler::new("writing_surface", TrajectoryTimings::WRITING);
        let now = Utc::now();
        let out = assembler.assemble(&word, now);

        assert_eq!(out.full.start_at, out.downsampled.start_at);
        assert_eq!(out.full.start_at, now + TimeDelta::milliseconds(3000));
        assert_eq!(out.full.points[0].t, out.downsampled.points[0].t);
        assert_eq!(out.full.first_point(), out.downsampled.first_point());

        assert_eq!(out.full.points.len(), 2 * CANONICAL_POINT_COUNT);
        assert_eq!(out.downsampled.points.len(), 2 * DOWNSAMPLED_POINT_COUNT);

        let full_dt = out.full.points[1].t - out.full.points[0].t;
        let down_dt = out.downsampled.points[1].t - out.downsampled.points[0].t;
        assert_abs_diff_eq!(down_dt, 0.35, epsilon = 1e-9);
        assert_abs_diff_eq!(full_dt * DOWNSAMPLE_FACTOR, down_dt, epsilon = 1e-9);
        assert_eq!(out.full.frame_id, "writing_surface");
    }

    #[test]
    fn one_letter_spans_the_same_duration_in_both() {
        let word = PlacedWord {
            letters: vec![letter("o", CANONICAL_POINT_COUNT, 0.0)],
        };
        let out = TrajectoryAssembler::new("f", TrajectoryTimings::DISPLAY_ONLY)
            .assemble(&word, Utc::now());
        let full_end = out.full.points.last().unwrap().t;
        let down_end = out.downsampled.points.last().unwrap().t;
        assert_abs_diff_eq!(full_end, down_end, epsilon = 1e-9);
    }

    #[test]
    fn decodes_flat_paths() {
        let pts = decode_flat_path(&[1.0, 2.0, 3.0, -4.0, 5.0, 6.0]).unwrap();
        assert_eq!(
            pts,
            vec![Point::new(1.0, 4.0), Point::new(2.0, -5.0), Point::new(3.0, -6.0)]
        );
        assert_eq!(
            decode_flat_path(&[1.0, 2.0, 3.0]),
            Err(TrajectoryError::OddLengthPath(3))
        );
        assert_eq!(
            decode_flat_path(&[f64::NAN, 1.0]),
            Err(TrajectoryError::NonFinite)
        );
    }

    #[test]
    fn resampling_reproduces_linear_paths() {
        let path: Vec<Point> = (0..5).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
        let out = resample(&path, 9).unwrap();
        assert_eq!(out.len(), 9);
        for (i, p) in out.iter().enumerate() {
            assert_abs_diff_eq!(p.x, i as f64 * 0.5, epsilon = 1e-9);
            assert_abs_diff_eq!(p.y, i as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn resampling_rejects_short_paths() {
        let path = vec![Point::new(0.0, 0.0); 3];
        assert_eq!(
            resample(&path, CANONICAL_POINT_COUNT),
            Err(TrajectoryError::TooFewPoints(3))
        );
    }

    #[test]
    fn normalisation_gives_unit_height() {
        let path = vec![Point::new(0.0, 0.0), Point::new(1.0, 4.0), Point::new(2.0, 2.0)];
        let out = normalise_height(&path);
        assert_abs_diff_eq!(out[1].y, 1.0);
        assert_abs_diff_eq!(out[2].x, 0.5);
        let flat = vec![Point::new(0.0, 1.0), Point::new(1.0, 1.0)];
        assert_eq!(normalise_height(&flat), flat);
    }

    fn arbitrary_path() -> impl Strategy<Value = Vec<Point>> {
        prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 4..200)
            .prop_map(|v| v.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }

    proptest! {
        #[test]
        fn resampling_always_yields_canonical_count(path in arbitrary_path()) {
            let out = prepare_demonstration(&path).unwrap();
            prop_assert_eq!(out.len(), CANONICAL_POINT_COUNT);
        }

        #[test]
        fn resampling_is_idempotent_at_the_same_count(path in arbitrary_path()) {
            let once = resample(&path, CANONICAL_POINT_COUNT).unwrap();
            let twice = resample(&once, CANONICAL_POINT_COUNT).unwrap();
            for (a, b) in once.iter().zip(&twice) {
                prop_assert!((a.x - b.x).abs() < 1e-6);
                prop_assert!((a.y - b.y).abs() < 1e-6);
            }
        }
    }
}
