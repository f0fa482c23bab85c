//! Game simulation modules

pub mod combat;
pub mod lifecycle;
pub mod physics;
pub mod player;
pub mod room;
pub mod rules;
pub mod snapshot;
pub mod supervisor;

pub use player::{BuffKind, InputState, Player};
pub use room::{GameRoom, Outbound, Recipient, RoomError, RoomHandle, RoomState, RunState};
pub use rules::{AttackKind, GameRules};
pub use supervisor::{Lobby, RoomSupervisor};

use uuid::Uuid;

/// Mutation queued for a room, applied between ticks
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Join { player_id: Uuid, name: String },
    Input { player_id: Uuid, input: InputState },
    TogglePause { player_id: Uuid },
    Leave { player_id: Uuid },
    /// Posted by the respawn timer once the delay has elapsed
    Respawn { player_id: Uuid },
    GrantBuff {
        player_id: Uuid,
        kind: BuffKind,
        multiplier: f32,
        duration: f32,
    },
}
