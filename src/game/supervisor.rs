//! Room supervisor - keeps a playable room open across matches
//!
//! A room is single-use: once its match ends the actor exits. The supervisor
//! waits for that, opens a fresh room with the same rules, and publishes the
//! new handle through a watch channel that connections read from.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::watch;
use tracing::{error, info};
use uuid::Uuid;

use super::room::{GameRoom, RoomHandle};
use super::rules::GameRules;

/// Read side of the supervisor: always points at the room new joins go to
#[derive(Clone)]
pub struct Lobby {
    rooms_rx: watch::Receiver<RoomHandle>,
}

impl Lobby {
    /// Handle of the room currently accepting players
    pub fn current(&self) -> RoomHandle {
        self.rooms_rx.borrow().clone()
    }

    /// Wait for the next room to open. `None` once the supervisor has stopped.
    pub async fn next_room(&mut self) -> Option<RoomHandle> {
        self.rooms_rx.changed().await.ok()?;
        Some(self.current())
    }
}

/// Owns the active room and replaces it when its match is over
pub struct RoomSupervisor {
    rules: GameRules,
    rng: ChaCha8Rng,
    room: GameRoom,
    rooms_tx: watch::Sender<RoomHandle>,
}

impl RoomSupervisor {
    /// Create the supervisor and its first room. Room seeds derive from `seed`.
    pub fn new(rules: GameRules, seed: u64) -> (Self, Lobby) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (room, handle) = GameRoom::new(Uuid::new_v4(), rules.clone(), rng.gen());
        let (rooms_tx, rooms_rx) = watch::channel(handle);

        let supervisor = Self {
            rules,
            rng,
            room,
            rooms_tx,
        };
        (supervisor, Lobby { rooms_rx })
    }

    /// Run rooms back to back until no lobby is left to serve
    pub async fn run(self) {
        let Self {
            rules,
            mut rng,
            mut room,
            rooms_tx,
        } = self;

        loop {
            let room_id = room.id();
            if let Err(e) = tokio::spawn(room.run()).await {
                error!(room_id = %room_id, error = %e, "Room task failed");
            }

            if rooms_tx.receiver_count() == 0 {
                info!(room_id = %room_id, "No connections left to serve, supervisor stopping");
                break;
            }

            let (next, handle) = GameRoom::new(Uuid::new_v4(), rules.clone(), rng.gen());
            info!(previous_room_id = %room_id, room_id = %handle.id, "Opened next room");
            rooms_tx.send_replace(handle);
            room = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::RunState;

    #[tokio::test]
    async fn test_lobby_starts_on_idle_room() {
        let (_supervisor, lobby) = RoomSupervisor::new(GameRules::default(), 3);
        let room = lobby.current();
        assert_eq!(room.run_state(), RunState::Idle);
        assert_eq!(room.player_count(), 0);
        assert_eq!(lobby.clone().current().id, room.id);
    }
}
