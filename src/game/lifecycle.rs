//! Player lifecycle - join, leave, respawn

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{EndReason, ServerMsg};

use super::player::Player;
use super::room::{RoomState, RunState};

impl RoomState {
    /// Add a player. Re-joining with a known id is a no-op.
    pub fn join(&mut self, player_id: Uuid, name: &str, now: Instant) {
        if self.players.contains_key(&player_id) {
            debug!(room_id = %self.id, player_id = %player_id, "Player already in room");
            return;
        }

        if self.run_state == RunState::Ended {
            self.send_to(
                player_id,
                ServerMsg::JoinRejected {
                    reason: "match ended".to_string(),
                },
            );
            return;
        }

        if self.players.len() >= self.rules.max_players {
            self.send_to(
                player_id,
                ServerMsg::JoinRejected {
                    reason: "room full".to_string(),
                },
            );
            info!(room_id = %self.id, player_id = %player_id, "Join rejected, room full");
            return;
        }

        let (x, y) = self.spawn_point();
        let color = self.random_color();
        let player = Player::new(
            player_id,
            display_name(player_id, name),
            color,
            x,
            y,
            self.rules.max_health,
        );

        let joined = self.snapshots.player(&player);
        self.players.insert(player_id, player);

        self.broadcast(ServerMsg::PlayerJoined { player: joined });
        let roster = self.snapshots.roster(&self.players);
        self.send_to(player_id, ServerMsg::CurrentPlayers { players: roster });

        info!(
            room_id = %self.id,
            player_id = %player_id,
            player_count = self.players.len(),
            "Player joined room"
        );

        if self.run_state == RunState::Idle && self.players.len() >= self.rules.min_players {
            self.start(now);
        }
    }

    /// Remove a player if present
    pub fn leave(&mut self, player_id: Uuid) {
        if self.players.remove(&player_id).is_none() {
            return;
        }

        self.broadcast(ServerMsg::PlayerLeft { player_id });
        info!(
            room_id = %self.id,
            player_id = %player_id,
            player_count = self.players.len(),
            "Player left room"
        );

        let in_match = matches!(self.run_state, RunState::Running | RunState::Paused);
        if in_match && self.players.len() < self.rules.min_players {
            self.end(EndReason::InsufficientPlayers);
        }
    }

    /// Restore a knocked-out player. Returns false when the player has
    /// since left, in which case nothing happens.
    pub fn respawn(&mut self, player_id: Uuid) -> bool {
        if !self.players.contains_key(&player_id) {
            debug!(room_id = %self.id, player_id = %player_id, "Discarding respawn for departed player");
            return false;
        }

        let (x, y) = self.spawn_point();
        let max_health = self.rules.max_health;
        if let Some(player) = self.players.get_mut(&player_id) {
            player.reset_for_respawn(x, y, max_health);
        }

        info!(room_id = %self.id, player_id = %player_id, "Player respawned");
        true
    }

    /// Random x inside the arena, fixed drop height
    pub(super) fn spawn_point(&mut self) -> (f32, f32) {
        let (lo, hi) = self.rules.spawn_x_range();
        let x = self.rng.gen_range(lo..=hi);
        (x, self.rules.spawn_y)
    }

    fn random_color(&mut self) -> String {
        let hue: f32 = self.rng.gen_range(0.0..360.0);
        format!("hsl({hue:.0}, 70%, 50%)")
    }
}

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 24;

/// Requested name cut to `MAX_NAME_CHARS`, or a short id-based default when blank
fn display_name(player_id: Uuid, requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        format!("Player {}", &player_id.simple().to_string()[..4])
    } else {
        trimmed.chars().take(MAX_NAME_CHARS).collect::<String>().trim_end().to_string()
    }
}
