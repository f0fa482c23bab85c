//! Platformer physics - gravity, friction, integration, arena bounds, AABB overlap

use super::rules::GameRules;

/// Kinematic state of a fighter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Feet resting on the arena floor
    pub grounded: bool,
}

impl Body {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }
}

/// Axis-aligned rectangle, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Stateless physics kernel
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Accelerate downwards. No terminal velocity.
    pub fn apply_gravity(body: &mut Body, rules: &GameRules) {
        body.vy += rules.gravity;
    }

    /// Exponential decay of horizontal velocity
    pub fn apply_friction(body: &mut Body, rules: &GameRules) {
        body.vx *= rules.friction;
    }

    pub fn integrate(body: &mut Body) {
        body.x += body.vx;
        body.y += body.vy;
    }

    /// Snap to floor and walls. The floor check runs first since it alone
    /// decides `grounded`.
    pub fn clamp_to_arena(body: &mut Body, rules: &GameRules) {
        if body.y + rules.player_height > rules.arena_height {
            body.y = rules.arena_height - rules.player_height;
            body.vy = 0.0;
            body.grounded = true;
        } else {
            body.grounded = false;
        }

        let max_x = rules.arena_width - rules.player_width;
        if body.x < 0.0 {
            body.x = 0.0;
            body.vx = 0.0;
        } else if body.x > max_x {
            body.x = max_x;
            body.vx = 0.0;
        }
    }

    /// Limit horizontal speed to `max_speed` keeping direction
    pub fn clamp_speed(body: &mut Body, max_speed: f32) {
        if body.vx.abs() > max_speed {
            body.vx = max_speed.copysign(body.vx);
        }
    }

    /// Gravity, friction, integration, then bounds, in that order
    pub fn step(body: &mut Body, rules: &GameRules) {
        Self::apply_gravity(body, rules);
        Self::apply_friction(body, rules);
        Self::integrate(body);
        Self::clamp_to_arena(body, rules);
    }

    /// Full-body hitbox of a fighter
    pub fn body_rect(body: &Body, rules: &GameRules) -> Rect {
        Rect::new(body.x, body.y, rules.player_width, rules.player_height)
    }

    /// Strict AABB intersection; touching edges do not overlap
    pub fn overlaps(a: &Rect, b: &Rect) -> bool {
        a.x < b.x + b.width
            && a.x + a.width > b.x
            && a.y < b.y + b.height
            && a.y + a.height > b.y
    }
}
