//! Room rules - arena, physics, and combat constants fixed at room creation

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Melee attack kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    /// Short range, fast recovery
    Punch,
    /// Longer range, harder hit, slower recovery
    Kick,
}

/// Damage/range/cooldown triple for one attack kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackStats {
    /// Health removed per contact
    pub damage: u32,
    /// Hitbox width extending from the attacker's leading edge
    pub range: f32,
    /// Cooldown after use (milliseconds)
    pub cooldown_ms: f32,
}

/// Constants for a single room.
///
/// Physics values are per tick, not per second: gravity is added to `vy`
/// once per tick, friction scales `vx` once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub arena_width: f32,
    pub arena_height: f32,

    pub gravity: f32,
    /// Horizontal velocity multiplier applied each tick, in (0, 1)
    pub friction: f32,
    pub move_accel: f32,
    pub max_speed: f32,
    /// Vertical velocity set on jump (negative is up)
    pub jump_impulse: f32,

    pub player_width: f32,
    pub player_height: f32,
    pub max_health: u32,
    pub spawn_y: f32,
    /// Minimum distance between a spawn point and either wall
    pub spawn_margin: f32,

    pub punch: AttackStats,
    pub kick: AttackStats,
    /// Attack animation length (seconds)
    pub action_duration: f32,
    pub respawn_delay: Duration,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Match length (seconds)
    pub match_duration: f64,
    pub min_players: usize,
    pub max_players: usize,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            arena_width: 1200.0,
            arena_height: 600.0,
            gravity: 0.8,
            friction: 0.85,
            move_accel: 1.5,
            max_speed: 10.0,
            jump_impulse: -18.0,
            player_width: 40.0,
            player_height: 80.0,
            max_health: 100,
            spawn_y: 100.0,
            spawn_margin: 50.0,
            punch: AttackStats {
                damage: 10,
                range: 60.0,
                cooldown_ms: 250.0,
            },
            kick: AttackStats {
                damage: 15,
                range: 90.0,
                cooldown_ms: 500.0,
            },
            action_duration: 0.2,
            respawn_delay: Duration::from_millis(2000),
            tick_rate: 30,
            match_duration: 180.0,
            min_players: 2,
            max_players: 8,
        }
    }
}

impl GameRules {
    pub fn attack(&self, kind: AttackKind) -> &AttackStats {
        match kind {
            AttackKind::Punch => &self.punch,
            AttackKind::Kick => &self.kick,
        }
    }

    /// Fixed tick quantum in seconds (action timer, buffs)
    pub fn tick_secs(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Fixed tick quantum in milliseconds (cooldowns)
    pub fn tick_millis(&self) -> f32 {
        1000.0 / self.tick_rate.max(1) as f32
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate.max(1)))
    }

    /// Range of x coordinates a player may spawn at
    pub fn spawn_x_range(&self) -> (f32, f32) {
        let lo = self.spawn_margin.min(self.arena_width - self.player_width).max(0.0);
        let hi = (self.arena_width - self.player_width - self.spawn_margin).max(lo);
        (lo, hi)
    }
}
