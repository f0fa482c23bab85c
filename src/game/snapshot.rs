//! Snapshot building for network transmission

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::protocol::{BuffSnapshot, PlayerSnapshot, ServerMsg};

use super::player::Player;

/// Builds outbound state payloads from the authoritative player table
pub struct SnapshotBuilder {
    max_health: u32,
}

impl SnapshotBuilder {
    pub fn new(max_health: u32) -> Self {
        Self { max_health }
    }

    pub fn player(&self, p: &Player) -> PlayerSnapshot {
        PlayerSnapshot {
            id: p.id,
            name: p.name.clone(),
            color: p.color.clone(),
            x: p.body.x,
            y: p.body.y,
            vx: p.body.vx,
            vy: p.body.vy,
            facing: p.facing,
            hp: p.health,
            max_hp: self.max_health,
            score: p.score,
            grounded: p.body.grounded,
            punch_cooldown: p.punch_cooldown,
            kick_cooldown: p.kick_cooldown,
            action: p.action,
            action_timer: p.action_timer,
            buffs: BuffSnapshot {
                speed: p.buffs.speed.map_or(0.0, |b| b.multiplier),
                damage: p.buffs.damage.map_or(0.0, |b| b.multiplier),
            },
        }
    }

    pub fn roster(&self, players: &BTreeMap<Uuid, Player>) -> Vec<PlayerSnapshot> {
        players.values().map(|p| self.player(p)).collect()
    }

    /// Build a per-tick state update
    pub fn build(&self, tick: u64, timer: f64, players: &BTreeMap<Uuid, Player>) -> ServerMsg {
        ServerMsg::StateUpdate {
            tick,
            players: self.roster(players),
            timer,
            server_time: unix_millis(),
        }
    }
}
