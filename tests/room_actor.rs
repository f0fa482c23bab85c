//! Room actor tests driven through the public handle, on a paused clock

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_test::assert_ok;
use uuid::Uuid;

use brawl_arena::game::{
    BuffKind, GameRoom, GameRules, InputState, Outbound, RoomError, RoomHandle, RoomSupervisor,
    RunState,
};
use brawl_arena::ws::protocol::{EndReason, PlayerSnapshot, ServerMsg};

fn spawn_room(rules: GameRules) -> (RoomHandle, tokio::task::JoinHandle<()>) {
    let (room, handle) = GameRoom::new(Uuid::new_v4(), rules, 42);
    let task = tokio::spawn(room.run());
    (handle, task)
}

/// Next room message matching `pred`, skipping everything else
async fn wait_for<F>(rx: &mut broadcast::Receiver<Outbound>, mut pred: F) -> ServerMsg
where
    F: FnMut(&ServerMsg) -> bool,
{
    let deadline = Duration::from_secs(30);
    tokio::time::timeout(deadline, async {
        loop {
            match rx.recv().await {
                Ok(out) if pred(&out.msg) => return out.msg,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("room channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for room message")
}

fn find(players: &[PlayerSnapshot], id: Uuid) -> &PlayerSnapshot {
    players.iter().find(|p| p.id == id).expect("player in snapshot")
}

#[tokio::test(start_paused = true)]
async fn test_second_join_starts_and_leave_ends() {
    let (handle, task) = spawn_room(GameRules::default());
    let mut rx = handle.subscribe();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    assert_ok!(handle.join(a, "Alpha").await);
    assert_ok!(handle.join(b, "Bravo").await);

    wait_for(&mut rx, |m| matches!(m, ServerMsg::GameStart)).await;
    let update = wait_for(&mut rx, |m| matches!(m, ServerMsg::StateUpdate { .. })).await;
    match update {
        ServerMsg::StateUpdate { players, tick, .. } => {
            assert_eq!(players.len(), 2);
            assert!(tick >= 1);
        }
        other => panic!("unexpected message {other:?}"),
    }
    assert_eq!(handle.player_count(), 2);
    assert_eq!(handle.run_state(), RunState::Running);

    assert_ok!(handle.leave(a).await);
    let end = wait_for(&mut rx, |m| matches!(m, ServerMsg::GameEnd { .. })).await;
    assert!(matches!(
        end,
        ServerMsg::GameEnd {
            reason: EndReason::InsufficientPlayers
        }
    ));

    assert_ok!(task.await);
    assert_eq!(handle.run_state(), RunState::Ended);
}

#[tokio::test(start_paused = true)]
async fn test_time_limit_closes_room() {
    let rules = GameRules {
        match_duration: 1.0,
        ..GameRules::default()
    };
    let (handle, task) = spawn_room(rules);
    let mut rx = handle.subscribe();

    assert_ok!(handle.join(Uuid::new_v4(), "Alpha").await);
    assert_ok!(handle.join(Uuid::new_v4(), "Bravo").await);

    let end = wait_for(&mut rx, |m| matches!(m, ServerMsg::GameEnd { .. })).await;
    assert!(matches!(
        end,
        ServerMsg::GameEnd {
            reason: EndReason::TimeLimit
        }
    ));

    // Nothing follows the end of the match
    assert_ok!(task.await);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    // The queue is gone once the actor exits
    let late = handle.join(Uuid::new_v4(), "Late").await;
    assert!(matches!(late, Err(RoomError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn test_pause_round_trip_through_handle() {
    let (handle, _task) = spawn_room(GameRules::default());
    let mut rx = handle.subscribe();
    let a = Uuid::new_v4();

    assert_ok!(handle.join(a, "Alpha").await);
    assert_ok!(handle.join(Uuid::new_v4(), "Bravo").await);
    wait_for(&mut rx, |m| matches!(m, ServerMsg::GameStart)).await;

    assert_ok!(handle.toggle_pause(a).await);
    let paused = wait_for(&mut rx, |m| matches!(m, ServerMsg::GamePaused { .. })).await;
    assert!(matches!(paused, ServerMsg::GamePaused { paused: true }));
    assert_eq!(handle.run_state(), RunState::Paused);

    assert_ok!(handle.toggle_pause(a).await);
    let resumed = wait_for(&mut rx, |m| matches!(m, ServerMsg::GamePaused { .. })).await;
    assert!(matches!(resumed, ServerMsg::GamePaused { paused: false }));
    wait_for(&mut rx, |m| matches!(m, ServerMsg::StateUpdate { .. })).await;
    assert_eq!(handle.run_state(), RunState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_knockout_respawns_after_delay() {
    // Narrow arena: a kick toward the other player always connects
    let rules = GameRules {
        arena_width: 140.0,
        spawn_margin: 0.0,
        ..GameRules::default()
    };
    let max_health = rules.max_health;
    let respawn_delay = rules.respawn_delay;
    let (handle, _task) = spawn_room(rules);
    let mut rx = handle.subscribe();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    assert_ok!(handle.join(a, "Alpha").await);
    assert_ok!(handle.join(b, "Bravo").await);

    let players = match wait_for(&mut rx, |m| matches!(m, ServerMsg::StateUpdate { .. })).await {
        ServerMsg::StateUpdate { players, .. } => players,
        other => panic!("unexpected message {other:?}"),
    };
    let facing_left = find(&players, b).x < find(&players, a).x;

    assert_ok!(
        handle
            .grant_buff(a, BuffKind::Damage, 10.0, 0.2)
            .await
    );
    let kick = InputState {
        left: facing_left,
        attack2: true,
        ..InputState::default()
    };
    assert_ok!(handle.input(a, kick).await);

    let ko = wait_for(&mut rx, |m| matches!(m, ServerMsg::PlayerKo { .. })).await;
    assert!(matches!(
        ko,
        ServerMsg::PlayerKo { victim_id, attacker_id } if victim_id == b && attacker_id == a
    ));
    let knocked_out_at = tokio::time::Instant::now();
    assert_ok!(handle.input(a, InputState::default()).await);

    // Health comes back only after the respawn delay
    loop {
        let update = wait_for(&mut rx, |m| matches!(m, ServerMsg::StateUpdate { .. })).await;
        let ServerMsg::StateUpdate { players, .. } = update else {
            unreachable!()
        };
        let victim = find(&players, b);
        if victim.hp == max_health {
            assert!(knocked_out_at.elapsed() >= respawn_delay - Duration::from_millis(50));
            assert_eq!(find(&players, a).score, 1);
            break;
        }
        assert_eq!(victim.hp, 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_new_players_get_a_fresh_match_after_one_ends() {
    let (supervisor, mut lobby) = RoomSupervisor::new(GameRules::default(), 9);
    tokio::spawn(supervisor.run());

    let first = lobby.current();
    let mut rx = first.subscribe();
    let a = Uuid::new_v4();
    assert_ok!(first.join(a, "Alpha").await);
    assert_ok!(first.join(Uuid::new_v4(), "Bravo").await);
    wait_for(&mut rx, |m| matches!(m, ServerMsg::GameStart)).await;

    assert_ok!(first.leave(a).await);
    wait_for(&mut rx, |m| matches!(m, ServerMsg::GameEnd { .. })).await;

    let second = tokio::time::timeout(Duration::from_secs(5), lobby.next_room())
        .await
        .expect("timed out waiting for the next room")
        .expect("supervisor still running");
    assert_ne!(second.id, first.id);
    assert_eq!(second.run_state(), RunState::Idle);
    assert_eq!(lobby.current().id, second.id);

    // The finished room stays finished
    let late = first.join(Uuid::new_v4(), "Late").await;
    assert!(matches!(late, Err(RoomError::Closed)));

    let mut rx = second.subscribe();
    assert_ok!(second.join(Uuid::new_v4(), "Charlie").await);
    assert_ok!(second.join(Uuid::new_v4(), "Delta").await);
    wait_for(&mut rx, |m| matches!(m, ServerMsg::GameStart)).await;
    wait_for(&mut rx, |m| matches!(m, ServerMsg::StateUpdate { .. })).await;

    assert_eq!(second.run_state(), RunState::Running);
    assert_eq!(second.player_count(), 2);
}
