use crate::{phrases::Language, trajectory::TrajectoryTimings};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(format!("'{other}' is neither 'left' nor 'right'")),
        }
    }
}

/// Knobs of the interaction, fixed for the lifetime of a controller.
#[derive(Debug, Clone)]
pub struct InteractionSettings {
    pub language: Language,
    /// A robot takes part at all (gaze, posture, actuator control).
    pub robot_connected: bool,
    pub robot_speaking: bool,
    pub robot_writing: bool,
    pub robot_standing: bool,
    /// Hand the robot writes with; the tablet sits on that side.
    pub handedness: Side,
    pub person_side: Side,
    /// Look at a different side each time feedback is asked for.
    pub alternate_sides: bool,
    /// Learner sits in front of the robot rather than beside it.
    pub front_interaction: bool,
    pub frame_id: String,
    pub timings: TrajectoryTimings,
    /// Pause of waiting states between two polls.
    pub idle_delay: Duration,
    /// Pause after clearing the surface, so the display catches up.
    pub clear_settle: Duration,
    /// Pause between two bounding boxes sent to the display.
    pub bounding_box_settle: Duration,
}

impl InteractionSettings {
    /// Speaking and writing only make sense with a robot present.
    pub fn normalised(mut self) -> Self {
        self.robot_speaking &= self.robot_connected;
        self.robot_writing &= self.robot_connected;
        self.timings = TrajectoryTimings::for_writing(self.robot_writing);
        self
    }

    /// Settings with every pause removed, for driving the controller in tests.
    pub fn without_delays(mut self) -> Self {
        self.idle_delay = Duration::ZERO;
        self.clear_settle = Duration::ZERO;
        self.bounding_box_settle = Duration::ZERO;
        self
    }
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            language: Language::English,
            robot_connected: true,
            robot_speaking: true,
            robot_writing: true,
            robot_standing: true,
            handedness: Side::Right,
            person_side: Side::Right,
            alternate_sides: false,
            front_interaction: true,
            frame_id: "writing_surface".to_string(),
            timings: TrajectoryTimings::WRITING,
            idle_delay: Duration::from_millis(100),
            clear_settle: Duration::from_millis(500),
            bounding_box_settle: Duration::from_millis(200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_robot_means_no_speaking_or_writing() {
        let settings = InteractionSettings {
            robot_connected: false,
            ..Default::default()
        }
        .normalised();
        assert!(!settings.robot_speaking);
        assert!(!settings.robot_writing);
        assert_eq!(settings.timings, TrajectoryTimings::DISPLAY_ONLY);
    }

    #[test]
    fn parses_sides() {
        assert_eq!("LEFT".parse::<Side>(), Ok(Side::Left));
        assert!("up".parse::<Side>().is_err());
        assert_eq!(Side::Left.opposite(), Side::Right);
    }
}
