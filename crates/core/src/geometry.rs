//! Plain geometric value types shared by the layout, the learner seam and
//! the trajectory assembler.

use serde::{Deserialize, Serialize};

/// A 2D point on the writing surface (or in a learner's shape frame).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// The same point with the vertical axis flipped.
    ///
    /// Demonstrations arrive with y sign-inverted relative to display
    /// coordinates, so this converts between the two frames in both directions.
    pub fn flip_y(self) -> Self {
        Self {
            x: self.x,
            y: -self.y,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Smallest box containing every point, or `None` for an empty path.
    pub fn around(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let init = Self::new(first.x, first.y, first.x, first.y);
        Some(points.iter().fold(init, |bb, p| Self {
            x_min: bb.x_min.min(p.x),
            y_min: bb.y_min.min(p.y),
            x_max: bb.x_max.max(p.x),
            y_max: bb.y_max.max(p.y),
        }))
    }

    pub fn centre(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// A learned (or placeholder) letterform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Letter or category this shape draws.
    pub letter: String,
    /// Ordered stroke points in the learner frame (y up).
    pub points: Vec<Point>,
    /// Parameter vector of the underlying model, when the learner exposes one.
    pub params: Option<Vec<f64>>,
}

impl Shape {
    pub fn new(letter: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            letter: letter.into(),
            points,
            params: None,
        }
    }
}

/// One letter of a word after layout placed it on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedLetter {
    pub letter: String,
    pub path: Vec<Point>,
    pub bbox: BoundingBox,
}

/// A whole word positioned on the writing surface, in drawing order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacedWord {
    pub letters: Vec<PlacedLetter>,
}

impl PlacedWord {
    /// Bounding box of the whole word.
    pub fn global_bbox(&self) -> Option<BoundingBox> {
        self.letters
            .iter()
            .map(|l| l.bbox)
            .reduce(|acc, bb| acc.union(&bb))
    }

    pub fn point_count(&self) -> usize {
        self.letters.iter().map(|l| l.path.len()).sum()
    }

    /// Keeps roughly one point out of every `factor`, always including the
    /// first and last point of each letter.
    pub fn downsampled(&self, factor: f64) -> PlacedWord {
        let letters = self
            .letters
            .iter()
            .map(|l| PlacedLetter {
                letter: l.letter.clone(),
                path: downsample_path(&l.path, factor),
                bbox: l.bbox,
            })
            .collect();
        PlacedWord { letters }
    }
}

fn downsample_path(path: &[Point], factor: f64) -> Vec<Point> {
    if path.len() < 2 || factor <= 1.0 {
        return path.to_vec();
    }
    let last = path.len() - 1;
    let count = (last as f64 / factor).floor() as usize + 1;
    let mut out: Vec<Point> = (0..count)
        .map(|i| path[((i as f64 * factor).round() as usize).min(last)])
        .collect();
    if out.last() != path.last() {
        out.push(path[last]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn line(n: usize) -> Vec<Point> {
        (0..n).map(|i| Point::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn bounding_box_around_points() {
        let bb = BoundingBox::around(&[
            Point::new(1.0, 2.0),
            Point::new(-1.0, 5.0),
            Point::new(3.0, 0.5),
        ])
        .unwrap();
        assert_eq!(bb, BoundingBox::new(-1.0, 0.5, 3.0, 5.0));
        assert_abs_diff_eq!(bb.centre().x, 1.0);
        assert!(BoundingBox::around(&[]).is_none());
    }

    #[test]
    fn downsampling_canonical_letter_keeps_seven_points() {
        let word = PlacedWord {
            letters: vec![PlacedLetter {
                letter: "a".into(),
                path: line(70),
                bbox: BoundingBox::new(0.0, 0.0, 69.0, 0.0),
            }],
        };
        let down = word.downsampled(69.0 / 6.0);
        let path = &down.letters[0].path;
        assert_eq!(path.len(), 7);
        assert_eq!(path.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(path.last(), Some(&Point::new(69.0, 0.0)));
    }

    #[test]
    fn downsampling_with_unit_factor_is_identity() {
        let path = line(5);
        assert_eq!(downsample_path(&path, 1.0), path);
    }

    #[test]
    fn global_bbox_spans_letters() {
        let word = PlacedWord {
            letters: vec![
                PlacedLetter {
                    letter: "a".into(),
                    path: vec![],
                    bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                },
                PlacedLetter {
                    letter: "b".into(),
                    path: vec![],
                    bbox: BoundingBox::new(2.0, -1.0, 3.0, 1.0),
                },
            ],
        };
        assert_eq!(
            word.global_bbox(),
            Some(BoundingBox::new(0.0, -1.0, 3.0, 1.0))
        );
    }
}
