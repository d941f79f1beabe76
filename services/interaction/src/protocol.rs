//! Defines the JSON message protocol spoken on the interaction bus.
//!
//! Every frame carries a `topic` tag. Clients (tablet, robot bridge, card
//! reader) publish [`BusMessage`]s; the service broadcasts [`ServerMessage`]s.

use cowriter_core::{
    Command, GazeTarget,
    event::{DemonstrationMessage, Device, Event},
    geometry::{BoundingBox, Point},
    trajectory::{Trajectory, TrajectoryTarget},
};
use serde::{Deserialize, Serialize};

/// Messages published by bus clients.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum BusMessage {
    /// A word the learner wants the robot to write.
    WordsToWrite { word: String },
    /// `<shapeIndex>_<bestShapeIndex>[_noNewShape]`.
    ShapeFeedback { feedback: String },
    /// A processed demonstration: all xs then all (sign-inverted) ys.
    UserShapes {
        path: Vec<f64>,
        #[serde(default)]
        shape_type: Option<String>,
    },
    /// A pointing gesture on the tablet.
    GestureInfo { x: f64, y: f64 },
    ShapeFinished,
    TestLearning,
    StopLearning,
    ClearScreen,
    NewChild,
    Heartbeat { device: Device },
}

impl From<BusMessage> for Event {
    fn from(msg: BusMessage) -> Self {
        match msg {
            BusMessage::WordsToWrite { word } => Event::WordRequested(word),
            BusMessage::ShapeFeedback { feedback } => Event::FeedbackReceived(feedback),
            BusMessage::UserShapes { path, shape_type } => {
                Event::DemonstrationReceived(DemonstrationMessage { path, shape_type })
            }
            BusMessage::GestureInfo { x, y } => Event::GestureHint(Point::new(x, y)),
            BusMessage::ShapeFinished => Event::ShapeFinished,
            BusMessage::TestLearning => Event::TestRequested,
            BusMessage::StopLearning => Event::StopRequested,
            BusMessage::ClearScreen => Event::ClearSurface,
            BusMessage::NewChild => Event::NewLearner,
            BusMessage::Heartbeat { device } => Event::Heartbeat(device),
        }
    }
}

/// Messages broadcast to every bus client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full-resolution trajectory for the tablet.
    WriteTraj { trajectory: Trajectory },
    /// Downsampled trajectory for the robot arm.
    WriteTrajDownsampled { trajectory: Trajectory },
    BoundingBoxes { bbox: BoundingBox, selected: bool },
    ClearScreen,
    CameraStatus { enabled: bool },
    Speech { text: String },
    Gaze { target: GazeTarget },
    ArmToRest,
    ResetPosture { standing: bool },
    ReleaseActuator,
    InteractionEnded,
    /// Sent only to the client whose message could not be understood.
    Error { message: String },
}

impl From<Command> for ServerMessage {
    fn from(command: Command) -> Self {
        match command {
            Command::Say { text } => ServerMessage::Speech { text },
            Command::Look { target } => ServerMessage::Gaze { target },
            Command::ArmToRest => ServerMessage::ArmToRest,
            Command::ResetPosture { standing } => ServerMessage::ResetPosture { standing },
            Command::PublishTrajectory { target, trajectory } => match target {
                TrajectoryTarget::Display => ServerMessage::WriteTraj { trajectory },
                TrajectoryTarget::Actuator => ServerMessage::WriteTrajDownsampled { trajectory },
            },
            Command::PublishBoundingBox { bbox, selected } => {
                ServerMessage::BoundingBoxes { bbox, selected }
            }
            Command::ClearSurface => ServerMessage::ClearScreen,
            Command::SetCameraEnabled { enabled } => ServerMessage::CameraStatus { enabled },
            Command::ReleaseActuator => ServerMessage::ReleaseActuator,
            Command::Shutdown => ServerMessage::InteractionEnded,
        }
    }
}
