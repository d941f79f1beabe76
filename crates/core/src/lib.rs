pub mod context;
pub mod controller;
pub mod event;
pub mod feedback;
pub mod forwarder;
pub mod geometry;
pub mod ingress;
pub mod layout;
pub mod learner;
pub mod phrases;
pub mod session;
pub mod settings;
pub mod state;
pub mod trajectory;

use geometry::BoundingBox;
use serde::{Deserialize, Serialize};
use settings::Side;
use trajectory::{Trajectory, TrajectoryTarget};

/// Where the robot turns its head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "side", rename_all = "snake_case")]
pub enum GazeTarget {
    LearnerInFront,
    LearnerAt(Side),
    /// Tablet lying in front of the robot.
    TabletInFront,
    TabletAt(Side),
}

/// Represents commands that the controller issues to an external runtime.
///
/// This enum is the primary API for decoupling the interaction's decisions
/// from the runtime's execution of side effects (speech, motion, rendering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Speak the given text to the learner.
    Say { text: String },
    /// Turn the head towards a target.
    Look { target: GazeTarget },
    /// Put the writing arm back to its resting pose.
    ArmToRest,
    /// Return to the initial posture, standing or seated.
    ResetPosture { standing: bool },
    /// Hand a timed trajectory to the actuator or the display.
    PublishTrajectory {
        target: TrajectoryTarget,
        trajectory: Trajectory,
    },
    /// Draw a bounding box on the display.
    PublishBoundingBox { bbox: BoundingBox, selected: bool },
    /// Erase everything rendered on the display.
    ClearSurface,
    SetCameraEnabled { enabled: bool },
    /// Give up control of the writing arm and rest.
    ReleaseActuator,
    /// The interaction is over; the runtime should exit.
    Shutdown,
}
