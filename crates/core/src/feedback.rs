//! Parser for the structured feedback sub-protocol.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const NO_NEW_SHAPE: &str = "noNewShape";

/// Feedback on one letter of the current word: which of the candidate shapes
/// the learner judged best, and whether a new candidate should be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub shape_index: usize,
    pub best_shape_index: usize,
    pub no_new_shape: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackParseError {
    #[error("feedback is missing the best shape index: '{0}'")]
    MissingField(String),
    #[error("shape type index must be an integer, received '{0}'")]
    InvalidShapeIndex(String),
    #[error("best shape index must be an integer, received '{0}'")]
    InvalidBestShapeIndex(String),
    #[error("unknown token in feedback string: '{0}'")]
    UnknownToken(String),
}

impl FromStr for Feedback {
    type Err = FeedbackParseError;

    /// Parses `<shapeIndex>_<bestShapeIndex>[_noNewShape]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim().split('_');

        let shape_field = fields.next().unwrap_or_default();
        let shape_index = shape_field
            .parse()
            .map_err(|_| FeedbackParseError::InvalidShapeIndex(shape_field.to_string()))?;

        let best_field = fields
            .next()
            .ok_or_else(|| FeedbackParseError::MissingField(s.to_string()))?;
        let best_shape_index = best_field
            .parse()
            .map_err(|_| FeedbackParseError::InvalidBestShapeIndex(best_field.to_string()))?;

        let no_new_shape = match fields.next() {
            None => false,
            Some(NO_NEW_SHAPE) => true,
            Some(other) => return Err(FeedbackParseError::UnknownToken(other.to_string())),
        };
        if let Some(extra) = fields.next() {
            return Err(FeedbackParseError::UnknownToken(extra.to_string()));
        }

        Ok(Self {
            shape_index,
            best_shape_index,
            no_new_shape,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_feedback() {
        let fb: Feedback = "2_5".parse().unwrap();
        assert_eq!(
            fb,
            Feedback {
                shape_index: 2,
                best_shape_index: 5,
                no_new_shape: false
            }
        );
    }

    #[test]
    fn parses_no_new_shape_flag() {
        let fb: Feedback = "2_5_noNewShape".parse().unwrap();
        assert_eq!((fb.shape_index, fb.best_shape_index), (2, 5));
        assert!(fb.no_new_shape);
    }

    #[test]
    fn rejects_non_integer_shape_index() {
        assert_eq!(
            "x_5".parse::<Feedback>(),
            Err(FeedbackParseError::InvalidShapeIndex("x".into()))
        );
    }

    #[test]
    fn rejects_missing_best_index() {
        assert!(matches!(
            "2".parse::<Feedback>(),
            Err(FeedbackParseError::MissingField(_))
        ));
    }

    #[test]
    fn rejects_bad_best_index_and_unknown_tokens() {
        assert_eq!(
            "2_y".parse::<Feedback>(),
            Err(FeedbackParseError::InvalidBestShapeIndex("y".into()))
        );
        assert_eq!(
            "2_5_again".parse::<Feedback>(),
            Err(FeedbackParseError::UnknownToken("again".into()))
        );
        assert_eq!(
            "2_5_noNewShape_x".parse::<Feedback>(),
            Err(FeedbackParseError::UnknownToken("x".into()))
        );
    }

    #[test]
    fn error_messages_name_the_offending_field() {
        let err = "x_5".parse::<Feedback>().unwrap_err();
        assert_eq!(err.to_string(), "shape type index must be an integer, received 'x'");
    }
}
