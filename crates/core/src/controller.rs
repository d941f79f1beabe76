//! State Machine Core
//!
//! One handler per [`InteractionState`], run one at a time on a single task.
//! A handler takes the incoming [`TransitionContext`] and returns the next
//! state together with the context that state should see. Waiting handlers
//! sleep for a bounded idle delay and return to themselves instead of blocking.
//!
//! All side effects leave the controller as [`Command`]s on an unbounded
//! channel; the runtime on the other end executes them.

use crate::{
    Command, GazeTarget,
    context::TransitionContext,
    event::{Device, EventKind},
    feedback::Feedback,
    forwarder::{ConnectivityForwarder, Parked, Readiness, park},
    layout::SharedLayout,
    learner::ShapeLearner,
    phrases::{PhraseBook, PhraseCategory, format_phrase},
    session::{Arbitration, SessionContext, SharedSlots},
    settings::{InteractionSettings, Side},
    state::InteractionState,
    trajectory::{TrajectoryAssembler, TrajectoryTarget, prepare_demonstration},
};
use anyhow::{Result, anyhow};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use InteractionState::*;

type Transition = (InteractionState, TransitionContext);

/// The external collaborators a controller drives.
pub struct Collaborators {
    pub layout: SharedLayout,
    pub learner: Box<dyn ShapeLearner>,
    /// Readiness of the actuator, checked by `WAITING_FOR_ROBOT_TO_CONNECT`.
    pub robot: Arc<dyn Readiness>,
    /// Readiness of the display, checked by `WAITING_FOR_TABLET_TO_CONNECT`.
    pub tablet: Arc<dyn Readiness>,
}

pub struct Controller {
    slots: SharedSlots,
    session: SessionContext,
    layout: SharedLayout,
    learner: Box<dyn ShapeLearner>,
    robot: ConnectivityForwarder,
    tablet: ConnectivityForwarder,
    assembler: TrajectoryAssembler,
    phrases: PhraseBook,
    settings: InteractionSettings,
    commands: mpsc::UnboundedSender<Command>,
}

impl Controller {
    pub fn new(
        settings: InteractionSettings,
        slots: SharedSlots,
        collaborators: Collaborators,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        let settings = settings.normalised();
        Self {
            slots,
            session: SessionContext::new(settings.person_side),
            layout: collaborators.layout,
            learner: collaborators.learner,
            robot: ConnectivityForwarder::new(WaitingForRobotToConnect, collaborators.robot),
            tablet: ConnectivityForwarder::new(WaitingForTabletToConnect, collaborators.tablet),
            assembler: TrajectoryAssembler::new(settings.frame_id.clone(), settings.timings),
            phrases: PhraseBook::for_language(settings.language),
            settings,
            commands,
        }
    }

    /// Where every interaction begins: wait for the robot, then greet.
    pub fn startup() -> Transition {
        (
            WaitingForRobotToConnect,
            TransitionContext::initial([StartingInteraction]),
        )
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Runs handlers until the terminal state is reached.
    ///
    /// Only fails when the runtime stopped listening for commands.
    pub async fn run(&mut self, state: InteractionState, context: TransitionContext) -> Result<()> {
        let (mut state, mut context) = (state, context);
        while !state.is_terminal() {
            (state, context) = self.step(state, context).await?;
        }
        self.slots.lock().await.current = Some(state);
        info!("Interaction exited");
        Ok(())
    }

    /// Executes the handler of `state` once.
    pub async fn step(
        &mut self,
        state: InteractionState,
        context: TransitionContext,
    ) -> Result<Transition> {
        self.slots.lock().await.current = Some(state);
        match state {
            StartingInteraction => self.start_interaction().await,
            WaitingForRobotToConnect => self.wait_for_device(Device::Robot, context).await,
            WaitingForTabletToConnect => self.wait_for_device(Device::Tablet, context).await,
            WaitingForWord => self.wait_for_word(context).await,
            RespondingToNewWord => self.respond_to_new_word(context).await,
            PublishingWord => self.publish_word(context).await,
            WaitingForLetterToFinish => self.wait_for_letter_to_finish(context).await,
            AskingForFeedback => self.ask_for_feedback(context).await,
            WaitingForFeedback => self.wait_for_feedback(context).await,
            RespondingToFeedback => self.respond_to_feedback(context).await,
            RespondingToDemonstrationFullWord => self.respond_to_demonstration(context).await,
            RespondingToTestCard => self.respond_to_test_card().await,
            Stopping => self.stop_interaction().await,
            Exit => Ok((Exit, context)),
        }
    }

    // --- States ---

    async fn start_interaction(&mut self) -> Result<Transition> {
        info!(state = %StartingInteraction, "STATE: {}", StartingInteraction);
        if self.settings.robot_speaking {
            let side = self.first_side();
            let intro = self.phrases.intro.clone();
            self.look_and_say(&intro, side)?;
        }
        let next = if self.stop_pending().await {
            Stopping
        } else {
            WaitingForWord
        };
        Ok((next, TransitionContext::from_state(StartingInteraction)))
    }

    async fn wait_for_device(
        &mut self,
        device: Device,
        context: TransitionContext,
    ) -> Result<Transition> {
        let forwarder = match device {
            Device::Robot => self.robot.clone(),
            Device::Tablet => self.tablet.clone(),
        };
        let own = forwarder.state();
        let parked = forwarder.tick(&mut self.session.continuations, context);
        if self.stop_pending().await {
            return Ok((Stopping, TransitionContext::from_state(own)));
        }
        match parked {
            Parked::Resume { next, context } => {
                debug!(?device, %next, "Device ready; resuming");
                Ok((next, context))
            }
            Parked::Waiting => {
                self.idle().await;
                Ok((own, TransitionContext::from_state(own)))
            }
        }
    }

    async fn wait_for_word(&mut self, context: TransitionContext) -> Result<Transition> {
        if context.is_first_entry(WaitingForWord) {
            info!(state = %WaitingForWord, "STATE: {}", WaitingForWord);
            self.emit(Command::SetCameraEnabled { enabled: true })?;
        }
        self.greet_new_learner().await?;

        let mut next = TransitionContext::from_state(WaitingForWord);
        match self.arbitrate(&[EventKind::WordRequested]).await {
            Arbitration::Stop => {
                self.emit(Command::SetCameraEnabled { enabled: false })?;
                Ok((Stopping, next))
            }
            Arbitration::Word(word) => {
                self.emit(Command::SetCameraEnabled { enabled: false })?;
                next.word_received = Some(word);
                Ok((RespondingToNewWord, next))
            }
            _ => {
                self.idle().await;
                Ok((WaitingForWord, next))
            }
        }
    }

    async fn respond_to_new_word(&mut self, context: TransitionContext) -> Result<Transition> {
        info!(state = %RespondingToNewWord, "STATE: {}", RespondingToNewWord);
        let Some(word) = context.word_received else {
            warn!("No word to respond to");
            return Ok((WaitingForWord, TransitionContext::from_state(RespondingToNewWord)));
        };

        let seen_before = self.session.start_word(&word);
        if self.settings.robot_speaking {
            let category = if seen_before {
                PhraseCategory::WordAgainResponse
            } else {
                PhraseCategory::WordResponse
            };
            let phrase = self.session.rotation.next(&self.phrases, category, &word);
            self.say(&phrase)?;
        }

        self.clear_surface().await?;

        let letters = self.session.letters().to_vec();
        for (index, letter) in letters.iter().enumerate() {
            match self.learner.start_learner(index, letter).await {
                Ok(shape) => self.session.push_shape(shape),
                Err(e) => {
                    error!(%letter, error = %e, "Failed to start learner");
                    return Ok((WaitingForWord, TransitionContext::from_state(RespondingToNewWord)));
                }
            }
        }
        info!(%word, shapes = self.session.shapes().len(), "Learners started");

        let mut next = TransitionContext::from_state(RespondingToNewWord);
        next.word_to_write = Some(word);
        let arbitration = self
            .arbitrate(&[EventKind::TestRequested, EventKind::WordRequested])
            .await;
        Ok(Self::interrupt(arbitration, PublishingWord, next))
    }

    async fn publish_word(&mut self, context: TransitionContext) -> Result<Transition> {
        info!(state = %PublishingWord, "STATE: {}", PublishingWord);
        // A finish signal left over from an earlier publication must not end this one.
        self.slots.lock().await.pending.shape_finished = false;

        let shapes = self.session.shapes().to_vec();
        let placed = self.layout.lock().await.place_word(&shapes);
        let trajectories = self.assembler.assemble(&placed, Utc::now());
        let centre = trajectories.full.first_point();

        if self.settings.robot_connected {
            self.look_at_tablet()?;
        }
        debug!(
            points = trajectories.full.points.len(),
            downsampled = trajectories.downsampled.points.len(),
            "Publishing word trajectories"
        );
        self.emit(Command::PublishTrajectory {
            target: TrajectoryTarget::Actuator,
            trajectory: trajectories.downsampled,
        })?;
        self.emit(Command::PublishTrajectory {
            target: TrajectoryTarget::Display,
            trajectory: trajectories.full,
        })?;

        let mut next = TransitionContext::from_state(PublishingWord).with_plan([AskingForFeedback]);
        next.centre = centre;
        next.word_written = context
            .word_to_write
            .or_else(|| self.session.word().map(str::to_string));
        next.revised_letter = context.revised_letter;
        Ok((WaitingForLetterToFinish, next))
    }

    async fn wait_for_letter_to_finish(&mut self, context: TransitionContext) -> Result<Transition> {
        let finished = self.slots.lock().await.pending.shape_finished;
        let parked = park(
            WaitingForLetterToFinish,
            &mut self.session.continuations,
            context,
            finished,
            WaitingForFeedback,
        );

        let transition = match parked {
            Parked::Resume { next, context } => {
                self.slots.lock().await.pending.shape_finished = false;
                self.publish_reference_boxes().await?;
                (next, context)
            }
            Parked::Waiting => {
                self.idle().await;
                (
                    WaitingForLetterToFinish,
                    TransitionContext::from_state(WaitingForLetterToFinish),
                )
            }
        };
        if self.stop_pending().await {
            return Ok((
                Stopping,
                TransitionContext::from_state(WaitingForLetterToFinish),
            ));
        }
        Ok(transition)
    }

    async fn ask_for_feedback(&mut self, context: TransitionContext) -> Result<Transition> {
        info!(state = %AskingForFeedback, "STATE: {}", AskingForFeedback);
        if context.came_from == Some(PublishingWord) {
            let (category, subject) = match &context.revised_letter {
                Some(letter) => (PhraseCategory::AskingAfterFeedback, letter.clone()),
                None => (
                    PhraseCategory::AskingAfterWord,
                    context
                        .word_written
                        .clone()
                        .or_else(|| self.session.word().map(str::to_string))
                        .unwrap_or_default(),
                ),
            };
            info!(subject = %subject, "Asking for feedback");
            if self.settings.robot_speaking {
                let phrase = self.session.rotation.next(&self.phrases, category, &subject);
                let side = self.learner_side();
                self.look_and_say(&phrase, side)?;
                self.look_at_tablet()?;
            }
        }

        let arbitration = self
            .arbitrate(&[EventKind::TestRequested, EventKind::WordRequested])
            .await;
        Ok(Self::interrupt(
            arbitration,
            WaitingForFeedback,
            TransitionContext::from_state(AskingForFeedback),
        ))
    }

    async fn wait_for_feedback(&mut self, context: TransitionContext) -> Result<Transition> {
        if context.is_first_entry(WaitingForFeedback) {
            info!(state = %WaitingForFeedback, "STATE: {}", WaitingForFeedback);
            self.emit(Command::SetCameraEnabled { enabled: true })?;
        }
        self.greet_new_learner().await?;

        let mut next = TransitionContext::from_state(WaitingForFeedback);
        let target = match self
            .arbitrate(&[
                EventKind::TestRequested,
                EventKind::WordRequested,
                EventKind::DemonstrationReceived,
                EventKind::FeedbackReceived,
            ])
            .await
        {
            Arbitration::Idle => {
                self.idle().await;
                return Ok((WaitingForFeedback, next));
            }
            Arbitration::Stop => Stopping,
            Arbitration::Test => RespondingToTestCard,
            Arbitration::Word(word) => {
                next.word_received = Some(word);
                RespondingToNewWord
            }
            Arbitration::Demonstration(samples) => {
                next.demonstrations = samples;
                RespondingToDemonstrationFullWord
            }
            Arbitration::Feedback(raw) => {
                next.feedback_received = Some(raw);
                RespondingToFeedback
            }
        };

        self.emit(Command::SetCameraEnabled { enabled: false })?;
        if target == Stopping {
            return Ok((Stopping, next));
        }
        // The robot has to be there before we act on anything.
        Ok((WaitingForRobotToConnect, next.with_plan([target])))
    }

    async fn respond_to_feedback(&mut self, context: TransitionContext) -> Result<Transition> {
        info!(state = %RespondingToFeedback, "STATE: {}", RespondingToFeedback);
        let mut transition = (
            WaitingForFeedback,
            TransitionContext::from_state(RespondingToFeedback),
        );

        let raw = context.feedback_received.unwrap_or_default();
        match raw.parse::<Feedback>() {
            Ok(feedback) => {
                if let Some(republish) = self.apply_feedback(&feedback).await? {
                    transition = republish;
                }
            }
            Err(e) => error!(feedback = %raw, error = %e, "Rejecting feedback"),
        }

        let arbitration = self
            .arbitrate(&[EventKind::TestRequested, EventKind::WordRequested])
            .await;
        let (default_state, default_context) = transition;
        Ok(Self::interrupt(arbitration, default_state, default_context))
    }

    async fn respond_to_demonstration(&mut self, context: TransitionContext) -> Result<Transition> {
        info!(
            state = %RespondingToDemonstrationFullWord,
            "STATE: {}", RespondingToDemonstrationFullWord
        );
        let samples = context.demonstrations;
        if self.settings.robot_speaking {
            let letters: String = samples.iter().map(|s| s.letter.as_str()).collect();
            let phrase = self.session.rotation.next(
                &self.phrases,
                PhraseCategory::DemonstrationResponse,
                &letters,
            );
            self.say(&phrase)?;
        }

        for sample in &samples {
            let Some(index) = self.session.index_of(&sample.letter) else {
                warn!(letter = %sample.letter, "Demonstrated letter is not in the current word");
                continue;
            };
            let glyph = match prepare_demonstration(&sample.path) {
                Ok(glyph) => glyph,
                Err(e) => {
                    warn!(letter = %sample.letter, error = %e, "Discarding demonstration");
                    continue;
                }
            };
            info!(letter = %sample.letter, "Received demo");
            match self
                .learner
                .learn_from_demonstration(index, &sample.letter, &glyph)
                .await
            {
                Ok(shape) => {
                    self.session.replace_shape(index, shape);
                }
                Err(e) => error!(letter = %sample.letter, error = %e, "Learner rejected demonstration"),
            }
        }

        self.clear_surface().await?;

        let mut next = TransitionContext::from_state(RespondingToDemonstrationFullWord);
        next.word_to_write = self.session.word().map(str::to_string);
        if self.stop_pending().await {
            return Ok((Stopping, next));
        }
        Ok((PublishingWord, next))
    }

    async fn respond_to_test_card(&mut self) -> Result<Transition> {
        info!(state = %RespondingToTestCard, "STATE: {}", RespondingToTestCard);
        if self.settings.robot_speaking {
            let test = self.phrases.test.clone();
            self.say(&test)?;
        }
        let next = if self.stop_pending().await {
            Stopping
        } else {
            WaitingForWord
        };
        Ok((next, TransitionContext::from_state(RespondingToTestCard)))
    }

    async fn stop_interaction(&mut self) -> Result<Transition> {
        info!(state = %Stopping, "STATE: {}", Stopping);
        if self.settings.robot_speaking {
            let thanks = self.phrases.thank_you.clone();
            self.say(&thanks)?;
        }
        if self.settings.robot_connected {
            self.emit(Command::ReleaseActuator)?;
        }
        self.emit(Command::Shutdown)?;
        Ok((Exit, TransitionContext::from_state(Stopping)))
    }

    // --- Helpers ---

    /// Passes parsed feedback to the learner. Returns the republish chain when
    /// the learner produced a new shape for the letter.
    async fn apply_feedback(&mut self, feedback: &Feedback) -> Result<Option<Transition>> {
        let Some(letter) = self.session.letter_at(feedback.shape_index).map(str::to_string) else {
            error!(
                shape_index = feedback.shape_index,
                "Feedback refers to a letter outside the current word"
            );
            return Ok(None);
        };

        if self.settings.robot_speaking {
            let phrase = if feedback.no_new_shape {
                self.phrases.feedback_acknowledged.clone()
            } else {
                format_phrase(&self.phrases.working_on, &letter)
            };
            self.say(&phrase)?;
        }

        let outcome = match self.learner.apply_feedback(&letter, feedback).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%letter, error = %e, "Learner failed to apply feedback");
                return Ok(None);
            }
        };
        if feedback.no_new_shape {
            return Ok(None);
        }
        if outcome.iterations_converged > 0 {
            info!(%letter, iterations = outcome.iterations_converged, "Learner has converged");
            return Ok(None);
        }
        let Some(shape) = outcome.new_shape else {
            return Ok(None);
        };
        self.session.replace_shape(feedback.shape_index, shape);

        let mut next = TransitionContext::from_state(RespondingToFeedback)
            .with_plan([WaitingForTabletToConnect, PublishingWord]);
        next.word_to_write = self.session.word().map(str::to_string);
        next.revised_letter = Some(letter);
        Ok(Some((WaitingForRobotToConnect, next)))
    }

    /// Applies Stop > Test > Word to a handler's default transition.
    fn interrupt(
        arbitration: Arbitration,
        default_state: InteractionState,
        default_context: TransitionContext,
    ) -> Transition {
        match arbitration {
            Arbitration::Stop => (Stopping, default_context),
            Arbitration::Test => (RespondingToTestCard, default_context),
            Arbitration::Word(word) => {
                let context = TransitionContext {
                    came_from: default_context.came_from,
                    word_received: Some(word),
                    ..Default::default()
                };
                (RespondingToNewWord, context)
            }
            _ => (default_state, default_context),
        }
    }

    async fn greet_new_learner(&mut self) -> Result<()> {
        let arrived = std::mem::take(&mut self.slots.lock().await.pending.new_learner);
        if !arrived {
            return Ok(());
        }
        info!("Greeting new learner");
        if self.settings.robot_writing {
            self.emit(Command::ResetPosture {
                standing: self.settings.robot_standing,
            })?;
        }
        if self.settings.robot_speaking {
            let side = self.first_side();
            let intro = self.phrases.intro.clone();
            self.look_and_say(&intro, side)?;
        }
        self.clear_surface().await
    }

    async fn publish_reference_boxes(&mut self) -> Result<()> {
        let letters = self.session.letters().to_vec();
        let boxes = self.layout.lock().await.place_reference_boxes(&letters);
        for bbox in boxes {
            self.emit(Command::PublishBoundingBox {
                bbox,
                selected: false,
            })?;
            sleep(self.settings.bounding_box_settle).await;
        }
        Ok(())
    }

    async fn clear_surface(&mut self) -> Result<()> {
        self.layout.lock().await.clear();
        self.emit(Command::ClearSurface)?;
        sleep(self.settings.clear_settle).await;
        Ok(())
    }

    fn look_and_say(&self, text: &str, side: Side) -> Result<()> {
        if self.settings.robot_writing {
            self.emit(Command::ArmToRest)?;
        }
        if self.settings.robot_connected {
            let target = if self.settings.front_interaction {
                GazeTarget::LearnerInFront
            } else {
                GazeTarget::LearnerAt(side)
            };
            self.emit(Command::Look { target })?;
        }
        self.say(text)
    }

    fn look_at_tablet(&self) -> Result<()> {
        let target = if self.settings.front_interaction {
            GazeTarget::TabletInFront
        } else {
            GazeTarget::TabletAt(self.settings.handedness)
        };
        self.emit(Command::Look { target })
    }

    fn say(&self, text: &str) -> Result<()> {
        if !self.settings.robot_speaking || text.is_empty() {
            return Ok(());
        }
        info!("robot says: {}", text);
        self.emit(Command::Say {
            text: text.to_string(),
        })
    }

    /// Side to address the learner on; flips each time when alternating.
    fn learner_side(&mut self) -> Side {
        if self.settings.alternate_sides {
            self.session.alternate_side()
        } else {
            self.settings.person_side
        }
    }

    fn first_side(&self) -> Side {
        if self.settings.alternate_sides {
            self.session.next_side
        } else {
            self.settings.person_side
        }
    }

    fn emit(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("command channel closed; runtime is gone"))
    }

    async fn arbitrate(&self, handled: &[EventKind]) -> Arbitration {
        self.slots.lock().await.pending.arbitrate(handled)
    }

    async fn stop_pending(&self) -> bool {
        self.slots.lock().await.pending.stop
    }

    async fn idle(&self) {
        sleep(self.settings.idle_delay).await;
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
