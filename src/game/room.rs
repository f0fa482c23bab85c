//! Room state machine and authoritative tick loop

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{EndReason, ServerMsg};

use super::combat::CombatSystem;
use super::physics::PhysicsSystem;
use super::player::{BuffKind, InputState, Player};
use super::rules::GameRules;
use super::snapshot::SnapshotBuilder;
use super::RoomCommand;

/// Room run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Fewer than two players have ever joined
    Idle,
    /// Simulation advancing, timer counting down
    Running,
    /// Simulation frozen
    Paused,
    /// Terminal
    Ended,
}

/// Who an outbound message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Room,
    Player(Uuid),
}

impl Recipient {
    pub fn includes(&self, player_id: Uuid) -> bool {
        match self {
            Recipient::Room => true,
            Recipient::Player(id) => *id == player_id,
        }
    }
}

/// Addressed server message
#[derive(Debug, Clone)]
pub struct Outbound {
    pub to: Recipient,
    pub msg: ServerMsg,
}

impl Outbound {
    pub fn room(msg: ServerMsg) -> Self {
        Self {
            to: Recipient::Room,
            msg,
        }
    }

    pub fn player(player_id: Uuid, msg: ServerMsg) -> Self {
        Self {
            to: Recipient::Player(player_id),
            msg,
        }
    }
}

/// Room state (owned by the room task)
pub struct RoomState {
    pub id: Uuid,
    pub(super) rules: GameRules,
    pub(super) run_state: RunState,
    pub(super) players: BTreeMap<Uuid, Player>,
    /// Match seconds remaining
    pub(super) timer: f64,
    pub(super) tick: u64,
    pub(super) end_reason: Option<EndReason>,
    pub(super) rng: ChaCha8Rng,
    /// Wall-clock reference for the match timer
    pub(super) last_timer_update: Instant,
    pub(super) snapshots: SnapshotBuilder,
    pub(super) outbox: Vec<Outbound>,
    pub(super) pending_respawns: Vec<Uuid>,
}

impl RoomState {
    pub fn new(id: Uuid, rules: GameRules, seed: u64, now: Instant) -> Self {
        Self {
            id,
            run_state: RunState::Idle,
            players: BTreeMap::new(),
            timer: rules.match_duration,
            tick: 0,
            end_reason: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_timer_update: now,
            snapshots: SnapshotBuilder::new(rules.max_health),
            outbox: Vec::new(),
            pending_respawns: Vec::new(),
            rules,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn timer(&self) -> f64 {
        self.timer
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn players(&self) -> &BTreeMap<Uuid, Player> {
        &self.players
    }

    pub fn player(&self, player_id: &Uuid) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Take messages produced since the last drain
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Take players knocked out since the last drain
    pub fn drain_respawns(&mut self) -> Vec<Uuid> {
        std::mem::take(&mut self.pending_respawns)
    }

    pub(super) fn broadcast(&mut self, msg: ServerMsg) {
        self.outbox.push(Outbound::room(msg));
    }

    pub(super) fn send_to(&mut self, player_id: Uuid, msg: ServerMsg) {
        self.outbox.push(Outbound::player(player_id, msg));
    }

    /// Replace a player's intents. Unknown players are ignored.
    pub fn handle_input(&mut self, player_id: Uuid, input: InputState) {
        match self.players.get_mut(&player_id) {
            Some(player) => player.input = input,
            None => debug!(room_id = %self.id, player_id = %player_id, "Input for unknown player"),
        }
    }

    /// Running <-> Paused. No-op in any other state, or when the
    /// request comes from a connection that is not in the room.
    pub fn toggle_pause(&mut self, player_id: Uuid, now: Instant) {
        if !self.players.contains_key(&player_id) {
            debug!(room_id = %self.id, player_id = %player_id, "Pause from unknown player");
            return;
        }

        let paused = match self.run_state {
            RunState::Running => true,
            RunState::Paused => {
                self.last_timer_update = now;
                false
            }
            RunState::Idle | RunState::Ended => {
                debug!(room_id = %self.id, state = ?self.run_state, "Ignoring pause toggle");
                return;
            }
        };

        self.run_state = if paused {
            RunState::Paused
        } else {
            RunState::Running
        };
        self.broadcast(ServerMsg::GamePaused { paused });
        info!(room_id = %self.id, paused, "Pause toggled");
    }

    pub fn grant_buff(&mut self, player_id: Uuid, kind: BuffKind, multiplier: f32, duration: f32) {
        if let Some(player) = self.players.get_mut(&player_id) {
            if player.is_alive() {
                player.buffs.grant(kind, multiplier, duration);
                debug!(room_id = %self.id, player_id = %player_id, ?kind, multiplier, "Buff granted");
            }
        }
    }

    pub(super) fn start(&mut self, now: Instant) {
        self.run_state = RunState::Running;
        self.last_timer_update = now;
        self.broadcast(ServerMsg::GameStart);
        info!(room_id = %self.id, player_count = self.players.len(), "Match started");
    }

    /// Transition to Ended. Only the first call has any effect.
    pub(super) fn end(&mut self, reason: EndReason) {
        if self.run_state == RunState::Ended {
            return;
        }
        self.run_state = RunState::Ended;
        self.end_reason = Some(reason);
        self.broadcast(ServerMsg::GameEnd { reason });
        info!(room_id = %self.id, reason = reason.as_str(), "Match ended");
    }

    /// Advance the simulation by one tick
    pub fn tick(&mut self, now: Instant) {
        match self.run_state {
            RunState::Running => {}
            RunState::Paused => {
                // Keep the reference current so resuming charges nothing
                self.last_timer_update = now;
                return;
            }
            RunState::Idle | RunState::Ended => return,
        }

        // Match timer follows wall-clock time; everything else is tick-quantized
        let elapsed = now
            .saturating_duration_since(self.last_timer_update)
            .as_secs_f64();
        self.last_timer_update = now;
        self.timer -= elapsed;
        if self.timer <= 0.0 {
            self.timer = 0.0;
            self.end(EndReason::TimeLimit);
            return;
        }

        self.tick += 1;
        let ids: Vec<Uuid> = self.players.keys().copied().collect();
        for id in ids {
            self.step_player(id);
        }

        let update = self.snapshots.build(self.tick, self.timer, &self.players);
        self.broadcast(update);
    }

    fn step_player(&mut self, id: Uuid) {
        let Self {
            id: room_id,
            rules,
            players,
            outbox,
            pending_respawns,
            ..
        } = self;

        let Some(player) = players.get_mut(&id) else {
            return;
        };
        if !player.is_alive() {
            return;
        }

        player.tick_cooldowns(rules);
        player.apply_movement(rules);

        if let Some(kind) = player.requested_attack() {
            for event in CombatSystem::resolve_attack(id, kind, players, rules) {
                outbox.push(Outbound::room(ServerMsg::PlayerHit {
                    victim_id: event.target_id,
                    attacker_id: event.attacker_id,
                    kind: event.kind,
                    damage: event.damage,
                }));

                if event.knocked_out {
                    info!(
                        room_id = %room_id,
                        victim_id = %event.target_id,
                        attacker_id = %event.attacker_id,
                        "Knockout"
                    );
                    outbox.push(Outbound::room(ServerMsg::PlayerKo {
                        victim_id: event.target_id,
                        attacker_id: event.attacker_id,
                    }));
                    pending_respawns.push(event.target_id);
                }
            }
        }

        let Some(player) = players.get_mut(&id) else {
            return;
        };
        let max_speed = rules.max_speed * player.buffs.speed_multiplier();
        PhysicsSystem::clamp_speed(&mut player.body, max_speed);
        PhysicsSystem::step(&mut player.body, rules);

        let dt = rules.tick_secs();
        player.tick_action(dt);
        player.buffs.tick(dt);
    }
}

/// Room task errors
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("Room is closed")]
    Closed,
}

/// Handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub id: Uuid,
    cmd_tx: mpsc::Sender<RoomCommand>,
    events_tx: broadcast::Sender<Outbound>,
    player_count: Arc<AtomicUsize>,
    state_rx: watch::Receiver<RunState>,
}

impl RoomHandle {
    pub async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.cmd_tx.send(cmd).await.map_err(|_| RoomError::Closed)
    }

    pub async fn join(&self, player_id: Uuid, name: impl Into<String>) -> Result<(), RoomError> {
        self.send(RoomCommand::Join {
            player_id,
            name: name.into(),
        })
        .await
    }

    pub async fn input(&self, player_id: Uuid, input: InputState) -> Result<(), RoomError> {
        self.send(RoomCommand::Input { player_id, input }).await
    }

    pub async fn toggle_pause(&self, player_id: Uuid) -> Result<(), RoomError> {
        self.send(RoomCommand::TogglePause { player_id }).await
    }

    pub async fn leave(&self, player_id: Uuid) -> Result<(), RoomError> {
        self.send(RoomCommand::Leave { player_id }).await
    }

    pub async fn grant_buff(
        &self,
        player_id: Uuid,
        kind: BuffKind,
        multiplier: f32,
        duration: f32,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::GrantBuff {
            player_id,
            kind,
            multiplier,
            duration,
        })
        .await
    }

    /// Receive every message the room emits from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.events_tx.subscribe()
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn run_state(&self) -> RunState {
        *self.state_rx.borrow()
    }
}

/// The authoritative room actor
pub struct GameRoom {
    state: RoomState,
    cmd_rx: mpsc::Receiver<RoomCommand>,
    /// Used by respawn timers to post back into the queue
    cmd_tx: mpsc::Sender<RoomCommand>,
    events_tx: broadcast::Sender<Outbound>,
    player_count: Arc<AtomicUsize>,
    state_tx: watch::Sender<RunState>,
}

impl GameRoom {
    /// Create a new room
    pub fn new(id: Uuid, rules: GameRules, seed: u64) -> (Self, RoomHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(256);
        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = RoomHandle {
            id,
            cmd_tx: cmd_tx.clone(),
            events_tx: events_tx.clone(),
            player_count: player_count.clone(),
            state_rx,
        };

        let room = Self {
            state: RoomState::new(id, rules, seed, Instant::now()),
            cmd_rx,
            cmd_tx,
            events_tx,
            player_count,
            state_tx,
        };

        (room, handle)
    }

    pub fn id(&self) -> Uuid {
        self.state.id
    }

    /// Run the authoritative tick loop until the match ends
    pub async fn run(mut self) {
        info!(room_id = %self.state.id, tick_rate = self.state.rules.tick_rate, "Room opened");

        let mut tick_interval = interval(self.state.rules.tick_interval());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            // Commands land between ticks, never inside one
            self.process_commands();
            self.state.tick(Instant::now());
            self.flush();

            if self.state.run_state() == RunState::Ended {
                break;
            }
        }

        info!(room_id = %self.state.id, ticks = self.state.tick_count(), "Room closed");
    }

    fn process_commands(&mut self) {
        while let Ok(cmd) = self.cmd_rx.try_recv() {
            self.apply(cmd, Instant::now());
        }
    }

    fn apply(&mut self, cmd: RoomCommand, now: Instant) {
        match cmd {
            RoomCommand::Join { player_id, name } => self.state.join(player_id, &name, now),
            RoomCommand::Input { player_id, input } => self.state.handle_input(player_id, input),
            RoomCommand::TogglePause { player_id } => self.state.toggle_pause(player_id, now),
            RoomCommand::Leave { player_id } => self.state.leave(player_id),
            RoomCommand::Respawn { player_id } => {
                self.state.respawn(player_id);
            }
            RoomCommand::GrantBuff {
                player_id,
                kind,
                multiplier,
                duration,
            } => self.state.grant_buff(player_id, kind, multiplier, duration),
        }
    }

    /// Publish queued messages, arm respawn timers, refresh shared counters
    fn flush(&mut self) {
        for out in self.state.drain_outbox() {
            // No subscribers is fine
            let _ = self.events_tx.send(out);
        }

        for player_id in self.state.drain_respawns() {
            self.schedule_respawn(player_id);
        }

        self.player_count
            .store(self.state.players.len(), Ordering::Relaxed);

        let run_state = self.state.run_state();
        if *self.state_tx.borrow() != run_state {
            self.state_tx.send_replace(run_state);
        }
    }

    /// Respawns run on wall-clock time regardless of pause
    fn schedule_respawn(&self, player_id: Uuid) {
        let tx = self.cmd_tx.clone();
        let delay = self.state.rules.respawn_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Room may have closed in the meantime
            let _ = tx.send(RoomCommand::Respawn { player_id }).await;
        });
    }
}
