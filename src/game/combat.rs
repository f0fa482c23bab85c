//! Combat system - melee hitboxes, damage, knockouts

use std::collections::BTreeMap;

use uuid::Uuid;

use super::physics::{PhysicsSystem, Rect};
use super::player::{Facing, Player};
use super::rules::{AttackKind, GameRules};

/// One successful contact, produced and consumed within a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct AttackEvent {
    pub attacker_id: Uuid,
    pub target_id: Uuid,
    pub damage: u32,
    pub kind: AttackKind,
    /// Target health went from positive to zero
    pub knocked_out: bool,
}

/// Combat system for melee resolution
pub struct CombatSystem;

impl CombatSystem {
    pub fn can_attack(cooldown: f32) -> bool {
        cooldown <= 0.0
    }

    /// Reduce a cooldown by `step`, floored at zero
    pub fn update_cooldown(cooldown: f32, step: f32) -> f32 {
        (cooldown - step).max(0.0)
    }

    /// Apply damage to health, returns (new_health, knocked_out)
    pub fn apply_damage(current_health: u32, damage: u32) -> (u32, bool) {
        let new_health = current_health.saturating_sub(damage);
        (new_health, current_health > 0 && new_health == 0)
    }

    /// Damage after the attacker's damage buff
    pub fn attack_damage(attacker: &Player, kind: AttackKind, rules: &GameRules) -> u32 {
        let base = rules.attack(kind).damage as f32;
        (base * attacker.buffs.damage_multiplier()).round().max(0.0) as u32
    }

    /// Strike zone in front of the attacker, body height, kind's range wide
    pub fn hitbox(attacker: &Player, kind: AttackKind, rules: &GameRules) -> Rect {
        let range = rules.attack(kind).range;
        let x = match attacker.facing {
            Facing::Right => attacker.body.x + rules.player_width,
            Facing::Left => attacker.body.x - range,
        };
        Rect::new(x, attacker.body.y, range, rules.player_height)
    }

    /// Launch an attack and resolve every contact.
    ///
    /// The attacker always pays the cooldown and plays the animation, even on a
    /// whiff. Every other standing player whose body overlaps the hitbox takes
    /// the kind's damage; each knockout scores one point for the attacker.
    pub fn resolve_attack(
        attacker_id: Uuid,
        kind: AttackKind,
        players: &mut BTreeMap<Uuid, Player>,
        rules: &GameRules,
    ) -> Vec<AttackEvent> {
        let (hitbox, damage) = match players.get_mut(&attacker_id) {
            Some(attacker) if attacker.is_alive() && Self::can_attack(attacker.cooldown(kind)) => {
                *attacker.cooldown_mut(kind) = rules.attack(kind).cooldown_ms;
                attacker.action = Some(kind);
                attacker.action_timer = rules.action_duration;
                (
                    Self::hitbox(attacker, kind, rules),
                    Self::attack_damage(attacker, kind, rules),
                )
            }
            _ => return Vec::new(),
        };

        let mut events = Vec::new();
        for target in players.values_mut() {
            if target.id == attacker_id || !target.is_alive() {
                continue;
            }
            if !PhysicsSystem::overlaps(&hitbox, &target.rect(rules)) {
                continue;
            }

            let (new_health, knocked_out) = Self::apply_damage(target.health, damage);
            target.health = new_health;

            events.push(AttackEvent {
                attacker_id,
                target_id: target.id,
                damage,
                kind,
                knocked_out,
            });
        }

        let knockouts = events.iter().filter(|e| e.knocked_out).count() as u32;
        if knockouts > 0 {
            if let Some(attacker) = players.get_mut(&attacker_id) {
                attacker.score += knockouts;
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::BuffKind;

    fn table(positions: &[(f32, f32)]) -> (Vec<Uuid>, BTreeMap<Uuid, Player>) {
        let mut ids = Vec::new();
        let mut players = BTreeMap::new();
        for (i, &(x, y)) in positions.iter().enumerate() {
            let id = Uuid::new_v4();
            ids.push(id);
            players.insert(
                id,
                Player::new(id, format!("P{i}"), "hsl(0, 70%, 50%)".into(), x, y, 100),
            );
        }
        (ids, players)
    }

    #[test]
    fn test_hitbox_follows_facing() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(200.0, 100.0)]);
        let attacker = players.get_mut(&ids[0]).unwrap();

        let right = CombatSystem::hitbox(attacker, AttackKind::Punch, &rules);
        assert_eq!(right, Rect::new(240.0, 100.0, 60.0, 80.0));

        attacker.facing = Facing::Left;
        let left = CombatSystem::hitbox(attacker, AttackKind::Kick, &rules);
        assert_eq!(left, Rect::new(110.0, 100.0, 90.0, 80.0));
    }

    #[test]
    fn test_punch_hits_adjacent_target() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (120.0, 100.0)]);

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Punch, &mut players, &rules);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target_id, ids[1]);
        assert_eq!(events[0].damage, 10);
        assert!(!events[0].knocked_out);
        assert_eq!(players[&ids[1]].health, 90);
        assert_eq!(players[&ids[0]].punch_cooldown, 250.0);
        assert_eq!(players[&ids[0]].action, Some(AttackKind::Punch));
    }

    #[test]
    fn test_whiff_still_consumes_cooldown() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (800.0, 100.0)]);

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Kick, &mut players, &rules);

        assert!(events.is_empty());
        let attacker = &players[&ids[0]];
        assert_eq!(attacker.kick_cooldown, 500.0);
        assert_eq!(attacker.action, Some(AttackKind::Kick));
        assert_eq!(attacker.action_timer, rules.action_duration);
        assert_eq!(players[&ids[1]].health, 100);
    }

    #[test]
    fn test_attack_on_cooldown_is_noop() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (120.0, 100.0)]);
        players.get_mut(&ids[0]).unwrap().punch_cooldown = 50.0;

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Punch, &mut players, &rules);

        assert!(events.is_empty());
        assert_eq!(players[&ids[0]].action, None);
        assert_eq!(players[&ids[1]].health, 100);
    }

    #[test]
    fn test_all_targets_in_range_are_hit() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (150.0, 100.0), (170.0, 120.0)]);

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Kick, &mut players, &rules);

        assert_eq!(events.len(), 2);
        assert_eq!(players[&ids[1]].health, 85);
        assert_eq!(players[&ids[2]].health, 85);
    }

    #[test]
    fn test_knocked_out_players_are_not_targets() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (120.0, 100.0)]);
        players.get_mut(&ids[1]).unwrap().health = 0;

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Punch, &mut players, &rules);

        assert!(events.is_empty());
        assert_eq!(players[&ids[1]].health, 0);
    }

    #[test]
    fn test_knockout_scores_once() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (120.0, 100.0)]);
        players.get_mut(&ids[1]).unwrap().health = 10;

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Punch, &mut players, &rules);

        assert_eq!(events.len(), 1);
        assert!(events[0].knocked_out);
        assert_eq!(players[&ids[1]].health, 0);
        assert_eq!(players[&ids[0]].score, 1);
    }

    #[test]
    fn test_overkill_clamps_at_zero() {
        let (health, ko) = CombatSystem::apply_damage(4, 15);
        assert_eq!(health, 0);
        assert!(ko);

        let (health, ko) = CombatSystem::apply_damage(0, 15);
        assert_eq!(health, 0);
        assert!(!ko);
    }

    #[test]
    fn test_damage_buff_multiplies() {
        let rules = GameRules::default();
        let (ids, mut players) = table(&[(100.0, 100.0), (120.0, 100.0)]);
        players
            .get_mut(&ids[0])
            .unwrap()
            .buffs
            .grant(BuffKind::Damage, 1.5, 3.0);

        let events = CombatSystem::resolve_attack(ids[0], AttackKind::Kick, &mut players, &rules);

        assert_eq!(events[0].damage, 23);
        assert_eq!(players[&ids[1]].health, 77);
    }
}
