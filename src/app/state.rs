//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::Lobby;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Points at the room new joins go to
    pub lobby: Lobby,
}

impl AppState {
    pub fn new(config: Config, lobby: Lobby) -> Self {
        Self {
            config: Arc::new(config),
            lobby,
        }
    }
}
