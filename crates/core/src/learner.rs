//! The seam to the shape-learning backend.
//!
//! The learning algorithm itself lives outside this crate. The controller only
//! needs to start a learner per letter, hand it demonstrations and feedback,
//! and receive the updated shape back.

use crate::{
    feedback::Feedback,
    geometry::{Point, Shape},
    trajectory::CANONICAL_POINT_COUNT,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::f64::consts::PI;

/// A demonstration attributed to one letter of the current word.
///
/// The path is in the learner frame (y up) and has not been resampled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DemonstrationSample {
    pub letter: String,
    pub path: Vec<Point>,
}

/// Result of applying feedback to a letter's learner.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackOutcome {
    /// Number of iterations the learner has been converged for; 0 while learning.
    pub iterations_converged: usize,
    /// Fresh candidate shape, absent when none was requested or produced.
    pub new_shape: Option<Shape>,
}

/// Contract for any shape-learning backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShapeLearner: Send + Sync {
    /// Starts (or resumes) learning `letter` at `index` in the current word and
    /// returns the learner's current best shape for it.
    async fn start_learner(&mut self, index: usize, letter: &str) -> Result<Shape>;

    /// Updates the learner with a demonstration resampled to the canonical
    /// point count, returning the updated shape.
    async fn learn_from_demonstration(
        &mut self,
        index: usize,
        letter: &str,
        demonstration: &[Point],
    ) -> Result<Shape>;

    /// Applies structured feedback on the letter at `feedback.shape_index`.
    async fn apply_feedback(&mut self, letter: &str, feedback: &Feedback) -> Result<FeedbackOutcome>;
}

/// A deterministic learner for development and integration testing.
///
/// New letters start from a canonical closed stroke, demonstrations are adopted
/// verbatim as the new shape, and feedback re-issues the stored shape.
#[derive(Debug, Default)]
pub struct EchoShapeLearner {
    shapes: HashMap<String, Shape>,
}

impl EchoShapeLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit-height loop of [`CANONICAL_POINT_COUNT`] points.
    pub fn canonical_stroke() -> Vec<Point> {
        let last = (CANONICAL_POINT_COUNT - 1) as f64;
        (0..CANONICAL_POINT_COUNT)
            .map(|i| {
                let theta = 2.0 * PI * i as f64 / last;
                Point::new(0.5 * theta.cos(), 0.5 * theta.sin())
            })
            .collect()
    }
}

#[async_trait]
impl ShapeLearner for EchoShapeLearner {
    async fn start_learner(&mut self, _index: usize, letter: &str) -> Result<Shape> {
        let shape = self
            .shapes
            .entry(letter.to_string())
            .or_insert_with(|| Shape::new(letter, Self::canonical_stroke()));
        Ok(shape.clone())
    }

    async fn learn_from_demonstration(
        &mut self,
        _index: usize,
        letter: &str,
        demonstration: &[Point],
    ) -> Result<Shape> {
        let shape = Shape::new(letter, demonstration.to_vec());
        self.shapes.insert(letter.to_string(), shape.clone());
        Ok(shape)
    }

    async fn apply_feedback(&mut self, letter: &str, feedback: &Feedback) -> Result<FeedbackOutcome> {
        let new_shape = if feedback.no_new_shape {
            None
        } else {
            self.shapes.get(letter).cloned()
        };
        Ok(FeedbackOutcome {
            iterations_converged: 0,
            new_shape,
        })
    }
}
