//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::player::{Facing, InputState};
use crate::game::rules::AttackKind;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the room under a display name
    Join {
        #[serde(default)]
        name: String,
    },

    /// Full intent snapshot, replaces the previous one
    Input(InputState),

    /// Pause or resume a running match
    TogglePause,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    #[serde(rename = "time limit")]
    TimeLimit,
    #[serde(rename = "insufficient players")]
    InsufficientPlayers,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::TimeLimit => "time limit",
            EndReason::InsufficientPlayers => "insufficient players",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { player_id: Uuid, server_time: u64 },

    /// Roster sent to a connection right after it joins
    CurrentPlayers { players: Vec<PlayerSnapshot> },

    /// Join refused (room full or finished)
    JoinRejected { reason: String },

    PlayerJoined { player: PlayerSnapshot },

    PlayerLeft { player_id: Uuid },

    GameStart,

    GameEnd { reason: EndReason },

    GamePaused { paused: bool },

    /// Authoritative state, once per running tick
    StateUpdate {
        tick: u64,
        players: Vec<PlayerSnapshot>,
        /// Match seconds remaining
        timer: f64,
        server_time: u64,
    },

    /// Successful attack contact
    PlayerHit {
        victim_id: Uuid,
        attacker_id: Uuid,
        kind: AttackKind,
        damage: u32,
    },

    /// Victim's health reached zero
    PlayerKo { victim_id: Uuid, attacker_id: Uuid },
}

/// Active buff multipliers, 0 when absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BuffSnapshot {
    pub speed: f32,
    pub damage: f32,
}

/// Player state in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub facing: Facing,
    pub hp: u32,
    pub max_hp: u32,
    pub score: u32,
    pub grounded: bool,
    /// Milliseconds until the punch is ready
    pub punch_cooldown: f32,
    /// Milliseconds until the kick is ready
    pub kick_cooldown: f32,
    pub action: Option<AttackKind>,
    pub action_timer: f32,
    pub buffs: BuffSnapshot,
}
