//! Fighter state owned by a room

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::combat::CombatSystem;
use super::physics::{Body, PhysicsSystem, Rect};
use super::rules::{AttackKind, GameRules};

/// Horizontal facing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Latest intents reported by a connection. Replaced wholesale on every
/// input message; missing fields read as released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// Punch
    pub attack1: bool,
    /// Kick
    pub attack2: bool,
}

/// Buff kinds available in the extended ruleset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    Speed,
    Damage,
}

/// A timed multiplier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buff {
    pub multiplier: f32,
    /// Seconds left
    pub remaining: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Buffs {
    pub speed: Option<Buff>,
    pub damage: Option<Buff>,
}

impl Buffs {
    pub fn grant(&mut self, kind: BuffKind, multiplier: f32, duration: f32) {
        let buff = Some(Buff {
            multiplier,
            remaining: duration,
        });
        match kind {
            BuffKind::Speed => self.speed = buff,
            BuffKind::Damage => self.damage = buff,
        }
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed.map_or(1.0, |b| b.multiplier)
    }

    pub fn damage_multiplier(&self) -> f32 {
        self.damage.map_or(1.0, |b| b.multiplier)
    }

    /// Count down by one tick quantum, dropping expired buffs
    pub fn tick(&mut self, dt: f32) {
        for slot in [&mut self.speed, &mut self.damage] {
            let expired = match slot.as_mut() {
                Some(buff) => {
                    buff.remaining -= dt;
                    buff.remaining <= 0.0
                }
                None => false,
            };
            if expired {
                *slot = None;
            }
        }
    }
}

/// Authoritative fighter state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    /// CSS color string used by renderers
    pub color: String,

    pub body: Body,
    pub facing: Facing,

    pub health: u32,
    pub score: u32,

    // Milliseconds remaining
    pub punch_cooldown: f32,
    pub kick_cooldown: f32,

    /// Attack currently animating
    pub action: Option<AttackKind>,
    /// Seconds until `action` clears
    pub action_timer: f32,

    pub input: InputState,
    pub buffs: Buffs,
}

impl Player {
    pub fn new(id: Uuid, name: String, color: String, x: f32, y: f32, max_health: u32) -> Self {
        Self {
            id,
            name,
            color,
            body: Body::at(x, y),
            facing: Facing::Right,
            health: max_health,
            score: 0,
            punch_cooldown: 0.0,
            kick_cooldown: 0.0,
            action: None,
            action_timer: 0.0,
            input: InputState::default(),
            buffs: Buffs::default(),
        }
    }

    /// Knocked-out players are skipped by movement, input and targeting
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn cooldown(&self, kind: AttackKind) -> f32 {
        match kind {
            AttackKind::Punch => self.punch_cooldown,
            AttackKind::Kick => self.kick_cooldown,
        }
    }

    pub fn cooldown_mut(&mut self, kind: AttackKind) -> &mut f32 {
        match kind {
            AttackKind::Punch => &mut self.punch_cooldown,
            AttackKind::Kick => &mut self.kick_cooldown,
        }
    }

    pub fn rect(&self, rules: &GameRules) -> Rect {
        PhysicsSystem::body_rect(&self.body, rules)
    }

    /// Decrement both cooldowns by one tick quantum
    pub fn tick_cooldowns(&mut self, rules: &GameRules) {
        let step = rules.tick_millis();
        self.punch_cooldown = CombatSystem::update_cooldown(self.punch_cooldown, step);
        self.kick_cooldown = CombatSystem::update_cooldown(self.kick_cooldown, step);
    }

    /// Apply left/right/jump intents to velocity and facing
    pub fn apply_movement(&mut self, rules: &GameRules) {
        let accel = rules.move_accel * self.buffs.speed_multiplier();

        if self.input.left {
            self.body.vx -= accel;
            self.facing = Facing::Left;
        }
        if self.input.right {
            self.body.vx += accel;
            self.facing = Facing::Right;
        }
        if self.input.jump && self.body.grounded {
            self.body.vy = rules.jump_impulse;
            self.body.grounded = false;
        }
    }

    /// Attack to launch this tick. Punch wins when both are held and ready.
    pub fn requested_attack(&self) -> Option<AttackKind> {
        if self.input.attack1 && CombatSystem::can_attack(self.punch_cooldown) {
            Some(AttackKind::Punch)
        } else if self.input.attack2 && CombatSystem::can_attack(self.kick_cooldown) {
            Some(AttackKind::Kick)
        } else {
            None
        }
    }

    /// Count down the attack animation, clearing the action when done
    pub fn tick_action(&mut self, dt: f32) {
        if self.action_timer > 0.0 {
            self.action_timer -= dt;
            if self.action_timer <= 0.0 {
                self.action_timer = 0.0;
                self.action = None;
            }
        }
    }

    /// Restore after a knockout at a fresh spawn point
    pub fn reset_for_respawn(&mut self, x: f32, y: f32, max_health: u32) {
        self.health = max_health;
        self.body = Body::at(x, y);
        self.action = None;
        self.action_timer = 0.0;
        self.buffs = Buffs::default();
    }
}
