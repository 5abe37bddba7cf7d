use super::session::SessionCoordinator;
use super::types::{GameEvent, SessionState, WorldUpdate};
use crate::domain::{SessionError, SpatialOracle};
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Owns the session and drives it at a fixed rate until it terminates.
///
/// Transport requests are drained between ticks, so a join or leave never
/// lands in the middle of a simulated tick.
pub async fn world_task<O: SpatialOracle>(
    mut session: SessionCoordinator<O>,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    session_state_tx: watch::Sender<SessionState>,
    tick_interval: Duration,
) {
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        interval.tick().await;

        loop {
            match input_rx.try_recv() {
                Ok(ev) => handle_event(&mut session, ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // No transport left to feed the session.
                    info!("input channel closed; shutting session down");
                    let _ = session.shutdown();
                    break;
                }
            }
        }

        if session.state() == SessionState::Active {
            if let Err(e) = session.advance() {
                warn!(error = %e, tick = session.current_tick(), "tick failed");
            }
        }

        let _ = world_tx.send(session.world_update());

        let state = session.state();
        session_state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });

        if state == SessionState::Terminated {
            info!(
                tick = session.current_tick(),
                total_collected = session.total_collected(),
                "world task exiting"
            );
            break;
        }
    }
}

fn handle_event<O: SpatialOracle>(session: &mut SessionCoordinator<O>, ev: GameEvent) {
    match ev {
        GameEvent::Join { player_id, reply } => {
            let result = session.join(player_id).map(|_| ());
            // The connection gave up waiting; undo the join so the slot is not leaked.
            if let Err(Ok(())) = reply.send(result) {
                debug!(player_id, "join reply dropped; rolling back");
                if let Err(e) = session.rollback_join(player_id) {
                    warn!(player_id, error = %e, "join rollback failed");
                }
            }
        }
        GameEvent::Leave { player_id } => {
            if let Err(e) = session.leave(player_id) {
                debug!(player_id, error = %e, "leave ignored");
            }
        }
        GameEvent::Input {
            player_id,
            tick,
            frame,
        } => {
            let tick = tick.unwrap_or_else(|| session.current_tick());
            match session.submit_input(player_id, tick, frame) {
                Ok(()) => {}
                Err(
                    e @ (SessionError::StaleInput { .. }
                    | SessionError::InputTooEarly { .. }
                    | SessionError::UnknownPlayer(_)),
                ) => {
                    debug!(player_id, tick, error = %e, "input discarded");
                }
                Err(e) => {
                    warn!(player_id, tick, error = %e, "input rejected");
                }
            }
        }
        GameEvent::SeedPickups { positions, reply } => {
            let result = match positions {
                Some(positions) => session.seed_pickups(positions),
                None => session.seed_pickups_from_spawn_points(),
            };
            let _ = reply.send(result);
        }
        GameEvent::Shutdown => {
            if let Err(e) = session.shutdown() {
                warn!(error = %e, "shutdown rejected");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::level::LevelGeometry;
    use crate::domain::tuning::SessionConfig;
    use crate::domain::{InputFrame, Intent, Role};
    use crate::use_cases::types::SessionEvent;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    const TICK: Duration = Duration::from_millis(5);
    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        input_tx: mpsc::Sender<GameEvent>,
        world_rx: broadcast::Receiver<WorldUpdate>,
        state_rx: watch::Receiver<SessionState>,
        task: tokio::task::JoinHandle<()>,
    }

    fn start() -> Harness {
        let session = SessionCoordinator::new(
            SessionConfig::default(),
            Role::Authority,
            LevelGeometry::flat(-10.0, 10.0, 0.0),
        )
        .expect("valid config");
        let (input_tx, input_rx) = mpsc::channel(64);
        let (world_tx, world_rx) = broadcast::channel(1024);
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let task = tokio::spawn(world_task(session, input_rx, world_tx, state_tx, TICK));
        Harness {
            input_tx,
            world_rx,
            state_rx,
            task,
        }
    }

    async fn join(h: &Harness, player_id: u64) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        h.input_tx
            .send(GameEvent::Join { player_id, reply })
            .await
            .expect("world task running");
        rx.await.expect("join reply")
    }

    async fn next_update_where(
        rx: &mut broadcast::Receiver<WorldUpdate>,
        pred: impl Fn(&WorldUpdate) -> bool,
    ) -> WorldUpdate {
        timeout(WAIT, async {
            loop {
                match rx.recv().await {
                    Ok(update) if pred(&update) => return update,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => panic!("world updates closed"),
                }
            }
        })
        .await
        .expect("expected world update in time")
    }

    #[tokio::test]
    async fn when_player_joins_and_sends_input_then_world_updates_show_movement() {
        let mut h = start();
        join(&h, 1).await.expect("join accepted");

        h.input_tx
            .send(GameEvent::Input {
                player_id: 1,
                tick: None,
                frame: InputFrame::encode([Intent::MoveRight]),
            })
            .await
            .expect("send input");

        let update = next_update_where(&mut h.world_rx, |u| {
            u.players.iter().any(|p| p.id == 1 && p.x > -4.0)
        })
        .await;
        assert!(update.tick > 0);
        assert_eq!(*h.state_rx.borrow(), SessionState::Active);
    }

    #[tokio::test]
    async fn when_session_is_full_then_join_reply_is_an_error() {
        let h = start();
        join(&h, 1).await.expect("first");
        join(&h, 2).await.expect("second");
        assert_eq!(
            join(&h, 3).await,
            Err(SessionError::CapacityExceeded { player_id: 3 })
        );
    }

    #[tokio::test]
    async fn when_round_is_ready_then_pickups_appear_in_world_updates() {
        let mut h = start();
        join(&h, 1).await.expect("join");

        let (reply, rx) = oneshot::channel();
        h.input_tx
            .send(GameEvent::SeedPickups {
                positions: None,
                reply,
            })
            .await
            .expect("send seed");
        let ids = rx.await.expect("seed reply").expect("seeded");
        assert_eq!(ids.len(), 2);

        next_update_where(&mut h.world_rx, |u| u.pickups.len() == 2).await;
    }

    #[tokio::test]
    async fn when_join_reply_is_dropped_then_session_stays_open_for_the_next_player() {
        let mut h = start();
        let (reply, rx) = oneshot::channel();
        drop(rx);
        h.input_tx
            .send(GameEvent::Join {
                player_id: 1,
                reply,
            })
            .await
            .expect("send join");

        join(&h, 2).await.expect("join after abandoned join");
        let update = next_update_where(&mut h.world_rx, |u| u.players.iter().any(|p| p.id == 2))
            .await;
        assert!(update.players.iter().all(|p| p.id != 1));
        assert_eq!(
            update.players.iter().find(|p| p.id == 2).map(|p| p.x),
            Some(-4.0)
        );
        assert!(!update.events.contains(&SessionEvent::SessionTerminated));
        timeout(WAIT, h.state_rx.wait_for(|s| *s == SessionState::Active))
            .await
            .expect("active in time")
            .expect("state channel open");
        assert!(!h.task.is_finished());
    }

    #[tokio::test]
    async fn when_last_player_leaves_then_task_publishes_termination_and_exits() {
        let mut h = start();
        join(&h, 1).await.expect("join");
        h.input_tx
            .send(GameEvent::Leave { player_id: 1 })
            .await
            .expect("send leave");

        next_update_where(&mut h.world_rx, |u| {
            u.events.contains(&SessionEvent::SessionTerminated)
        })
        .await;
        timeout(WAIT, h.task)
            .await
            .expect("task exits in time")
            .expect("task did not panic");
        assert_eq!(*h.state_rx.borrow(), SessionState::Terminated);
    }
}
