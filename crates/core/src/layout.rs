//! The seam to text layout, plus a minimal row layout.
//!
//! Layout decides where letters go on the writing surface and answers the
//! geometric questions demonstration routing asks: which template a path was
//! drawn in, which placed letter is nearest, which letter a gesture points at.

use crate::geometry::{BoundingBox, PlacedLetter, PlacedWord, Point, Shape};
use std::sync::Arc;
use tokio::sync::Mutex;

pub trait LetterLayout: Send + Sync {
    /// Positions the word's shapes on the surface, in order.
    fn place_word(&mut self, shapes: &[Shape]) -> PlacedWord;

    /// Forgets every placed letter and template.
    fn clear(&mut self);

    /// Lays out one empty template box per letter, for the learner to write in.
    fn place_reference_boxes(&mut self, letters: &[String]) -> Vec<BoundingBox>;

    /// Splits a path drawn across template boxes into one path per letter.
    /// `None` when the path does not lie within the templates.
    fn split_path_from_template(&self, path: &[Point]) -> Option<Vec<(String, Vec<Point>)>>;

    /// Placed letter nearest to the path, if any lies within tolerance.
    fn find_letter(&self, path: &[Point]) -> Option<(String, BoundingBox)>;

    /// Placed letter closest to `at`; with `strict`, only a letter whose box
    /// contains the point.
    fn closest_letter(&self, at: Point, strict: bool) -> Option<(String, BoundingBox)>;
}

pub type SharedLayout = Arc<Mutex<dyn LetterLayout>>;

/// Letters in equal cells along the upper part of the surface, templates
/// along the lower part. Display frame: x to the right, y down.
#[derive(Debug, Clone)]
pub struct RowLayout {
    width: f64,
    height: f64,
    placed: Vec<PlacedLetter>,
    templates: Vec<(String, BoundingBox)>,
}

const MARGIN_RATIO: f64 = 0.1;
const LETTER_HEIGHT_RATIO: f64 = 0.3;
const WORD_ROW_RATIO: f64 = 0.3;
const TEMPLATE_ROW_RATIO: f64 = 0.72;

impl RowLayout {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            placed: Vec::new(),
            templates: Vec::new(),
        }
    }

    pub fn placed(&self) -> &[PlacedLetter] {
        &self.placed
    }

    fn letter_height(&self) -> f64 {
        self.height * LETTER_HEIGHT_RATIO
    }

    fn cell_width(&self, count: usize) -> f64 {
        let usable = self.width * (1.0 - 2.0 * MARGIN_RATIO);
        (usable / count.max(1) as f64).min(self.letter_height())
    }

    fn cell_left(&self, index: usize, count: usize) -> f64 {
        let cell = self.cell_width(count);
        let used = cell * count as f64;
        (self.width - used) / 2.0 + index as f64 * cell
    }

    fn tolerance(&self) -> f64 {
        let count = self.placed.len().max(1);
        self.cell_width(count).max(self.letter_height())
    }
}

impl LetterLayout for RowLayout {
    fn place_word(&mut self, shapes: &[Shape]) -> PlacedWord {
        let count = shapes.len();
        let scale = self.letter_height() * 0.8;
        let centre_y = self.height * WORD_ROW_RATIO;

        self.placed = shapes
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| {
                let bb = BoundingBox::around(&shape.points)?;
                let glyph_centre = bb.centre();
                let cell_centre_x = self.cell_left(i, count) + self.cell_width(count) / 2.0;
                let path: Vec<Point> = shape
                    .points
                    .iter()
                    .map(|p| {
                        Point::new(
                            cell_centre_x + (p.x - glyph_centre.x) * scale,
                            centre_y - (p.y - glyph_centre.y) * scale,
                        )
                    })
                    .collect();
                let bbox = BoundingBox::around(&path)?;
                Some(PlacedLetter {
                    letter: shape.letter.clone(),
                    path,
                    bbox,
                })
            })
            .collect();

        PlacedWord {
            letters: self.placed.clone(),
        }
    }

    fn clear(&mut self) {
        self.placed.clear();
        self.templates.clear();
    }

    fn place_reference_boxes(&mut self, letters: &[String]) -> Vec<BoundingBox> {
        let count = letters.len();
        let cell = self.cell_width(count);
        let centre_y = self.height * TEMPLATE_ROW_RATIO;
        let half_height = self.letter_height() * 0.6;

        self.templates = letters
            .iter()
            .enumerate()
            .map(|(i, letter)| {
                let left = self.cell_left(i, count);
                let bbox = BoundingBox::new(
                    left + cell * 0.05,
                    centre_y - half_height,
                    left + cell * 0.95,
                    centre_y + half_height,
                );
                (letter.clone(), bbox)
            })
            .collect();
        self.templates.iter().map(|(_, bb)| *bb).collect()
    }

    fn split_path_from_template(&self, path: &[Point]) -> Option<Vec<(String, Vec<Point>)>> {
        if path.is_empty() || self.templates.is_empty() {
            return None;
        }
        let mut groups: Vec<Vec<Point>> = vec![Vec::new(); self.templates.len()];
        for p in path {
            let slot = self.templates.iter().position(|(_, bb)| bb.contains(p))?;
            groups[slot].push(*p);
        }
        let split: Vec<(String, Vec<Point>)> = self
            .templates
            .iter()
            .zip(groups)
            .filter(|(_, points)| !points.is_empty())
            .map(|((letter, _), points)| (letter.clone(), points))
            .collect();
        Some(split)
    }

    fn find_letter(&self, path: &[Point]) -> Option<(String, BoundingBox)> {
        let centre = BoundingBox::around(path)?.centre();
        let tolerance = self.tolerance();
        self.placed
            .iter()
            .map(|l| (l, l.bbox.centre().distance(&centre)))
            .filter(|(_, d)| *d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(l, _)| (l.letter.clone(), l.bbox))
    }

    fn closest_letter(&self, at: Point, strict: bool) -> Option<(String, BoundingBox)> {
        let candidates = self
            .placed
            .iter()
            .filter(|l| !strict || l.bbox.contains(&at));
        candidates
            .min_by(|a, b| {
                a.bbox
                    .centre()
                    .distance(&at)
                    .total_cmp(&b.bbox.centre().distance(&at))
            })
            .map(|l| (l.letter.clone(), l.bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::EchoShapeLearner;

    fn shapes(word: &str) -> Vec<Shape> {
        word.chars()
            .map(|c| Shape::new(c.to_string(), EchoShapeLearner::canonical_stroke()))
            .collect()
    }

    fn letters(word: &str) -> Vec<String> {
        word.chars().map(String::from).collect()
    }

    #[test]
    fn places_letters_left_to_right_without_overlap() {
        let mut layout = RowLayout::new(0.2, 0.1395);
        let word = layout.place_word(&shapes("cat"));
        assert_eq!(word.letters.len(), 3);
        for pair in word.letters.windows(2) {
            assert!(pair[0].bbox.x_max < pair[1].bbox.x_min);
        }
        let global = word.global_bbox().unwrap();
        assert!(global.x_min >= 0.0 && global.x_max <= 0.2);
        assert!(global.y_min >= 0.0 && global.y_max <= 0.1395);
    }

    #[test]
    fn splits_paths_across_templates() {
        let mut layout = RowLayout::new(0.2, 0.1395);
        let boxes = layout.place_reference_boxes(&letters("ab"));
        let path = vec![
            boxes[0].centre(),
            Point::new(boxes[0].centre().x, boxes[0].centre().y + 0.001),
            boxes[1].centre(),
        ];
        let split = layout.split_path_from_template(&path).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].0, "a");
        assert_eq!(split[0].1.len(), 2);
        assert_eq!(split[1].0, "b");
    }

    #[test]
    fn path_leaving_templates_is_not_split() {
        let mut layout = RowLayout::new(0.2, 0.1395);
        let boxes = layout.place_reference_boxes(&letters("ab"));
        let path = vec![boxes[0].centre(), Point::new(-1.0, -1.0)];
        assert!(layout.split_path_from_template(&path).is_none());
        layout.clear();
        assert!(layout.split_path_from_template(&[boxes[0].centre()]).is_none());
    }

    #[test]
    fn finds_nearest_letter_within_tolerance() {
        let mut layout = RowLayout::new(0.2, 0.1395);
        let word = layout.place_word(&shapes("cat"));
        let t = &word.letters[2];
        let near = vec![t.bbox.centre(), Point::new(t.bbox.centre().x + 0.002, t.bbox.centre().y)];
        assert_eq!(layout.find_letter(&near).map(|(l, _)| l), Some("t".to_string()));

        let far = vec![Point::new(5.0, 5.0), Point::new(5.1, 5.1)];
        assert!(layout.find_letter(&far).is_none());
    }

    #[test]
    fn strict_gesture_needs_a_hit() {
        let mut layout = RowLayout::new(0.2, 0.1395);
        let word = layout.place_word(&shapes("ab"));
        let on_b = word.letters[1].bbox.centre();
        assert_eq!(
            layout.closest_letter(on_b, true).map(|(l, _)| l),
            Some("b".to_string())
        );
        let off = Point::new(0.0, 0.0);
        assert!(layout.closest_letter(off, true).is_none());
        assert_eq!(
            layout.closest_letter(off, false).map(|(l, _)| l),
            Some("a".to_string())
        );
    }
}
