//! Wires the controller to its collaborators and runs it.
//!
//! The controller runs on its own task. A second task drains its command
//! channel, logs each command and broadcasts it to the bus clients. When the
//! controller shuts down, the `ended` watch flips to `true` so the server can
//! stop as well.

use crate::{config::Config, protocol::ServerMessage, state::AppState};
use cowriter_core::{
    Command,
    controller::{Collaborators, Controller},
    event::Device,
    forwarder::{AlwaysReady, Watchdog},
    ingress::Ingress,
    layout::{RowLayout, SharedLayout},
    learner::EchoShapeLearner,
    session::{SharedSlots, Slots},
};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, broadcast, mpsc, watch},
    task::JoinHandle,
};
use tracing::{Instrument, error, info, info_span};

const BUS_CAPACITY: usize = 256;

pub struct Runtime {
    state: Arc<AppState>,
    controller: Controller,
    commands: mpsc::UnboundedReceiver<Command>,
}

/// Handles to a spawned runtime.
pub struct Running {
    pub controller: JoinHandle<()>,
    pub fan_out: JoinHandle<()>,
    /// Becomes `true` once the interaction has ended.
    pub ended: watch::Receiver<bool>,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        let slots: SharedSlots = Arc::new(Mutex::new(Slots::default()));
        let layout: SharedLayout = Arc::new(Mutex::new(RowLayout::new(
            config.screen_width,
            config.screen_height,
        )));
        let tablet = Arc::new(Watchdog::new("tablet", config.tablet_timeout));
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (bus, _) = broadcast::channel(BUS_CAPACITY);

        let controller = Controller::new(
            config.interaction_settings(),
            slots.clone(),
            Collaborators {
                layout: layout.clone(),
                learner: Box::new(EchoShapeLearner::new()),
                robot: Arc::new(AlwaysReady),
                tablet: tablet.clone(),
            },
            commands_tx,
        );
        let ingress = Ingress::new(slots, layout).with_watchdog(Device::Tablet, tablet);

        Self {
            state: Arc::new(AppState {
                ingress,
                bus,
                config: Arc::new(config),
            }),
            controller,
            commands,
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Starts the controller and the command fan-out.
    pub fn spawn(self) -> Running {
        let Runtime {
            state,
            mut controller,
            mut commands,
        } = self;
        let (ended_tx, ended) = watch::channel(false);

        let controller = tokio::spawn(
            async move {
                let (start, context) = Controller::startup();
                match controller.run(start, context).await {
                    Ok(()) => info!("Interaction finished."),
                    Err(e) => error!(error = ?e, "Interaction aborted."),
                }
            }
            .instrument(info_span!("controller")),
        );

        let bus = state.bus.clone();
        let fan_out = tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                info!(?command, "Executing command.");
                let shutdown = matches!(command, Command::Shutdown);
                // Nobody listening is fine; the command is still logged.
                let _ = bus.send(ServerMessage::from(command));
                if shutdown {
                    break;
                }
            }
            let _ = ended_tx.send(true);
        });

        Running {
            controller,
            fan_out,
            ended,
        }
    }
}
