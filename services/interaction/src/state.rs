//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources the handlers need.

use crate::{config::Config, protocol::ServerMessage};
use cowriter_core::ingress::Ingress;
use std::sync::Arc;
use tokio::sync::broadcast;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entry point of every notification into the controller.
    pub ingress: Ingress,
    /// Fan-out of controller output to every connected bus client.
    pub bus: broadcast::Sender<ServerMessage>,
    pub config: Arc<Config>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use cowriter_core::{
        layout::{RowLayout, SharedLayout},
        phrases::Language,
        session::{SharedSlots, Slots},
        settings::Side,
    };
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tracing::Level;

    pub(crate) fn config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            log_level: Level::INFO,
            language: Language::English,
            robot_connected: false,
            robot_speaking: false,
            robot_writing: false,
            robot_standing: true,
            handedness: Side::Right,
            person_side: Side::Right,
            alternate_sides: false,
            frame_id: "writing_surface".into(),
            tablet_timeout: Duration::from_millis(400),
            idle_delay: Duration::ZERO,
            screen_width: 0.2,
            screen_height: 0.1395,
        }
    }

    /// State with an idle ingress and no controller attached.
    pub(crate) fn app_state() -> (Arc<AppState>, SharedSlots) {
        let slots: SharedSlots = Arc::new(Mutex::new(Slots::default()));
        let layout: SharedLayout = Arc::new(Mutex::new(RowLayout::new(0.2, 0.1395)));
        let (bus, _) = broadcast::channel(16);
        let state = AppState {
            ingress: Ingress::new(slots.clone(), layout),
            bus,
            config: Arc::new(config()),
        };
        (Arc::new(state), slots)
    }
}
