// Authoritative session state: roster, spawn slots, pickups and score.

use super::types::{SessionEvent, TickReport, WorldUpdate};
use crate::domain::spawn::SpawnPool;
use crate::domain::systems::movement;
use crate::domain::systems::pickups::{CollectionEvent, PickupField};
use crate::domain::tuning::{MovementSettings, SessionConfig};
use crate::domain::{
    InputFrame, PickupEntity, PickupId, PickupSnapshot, PlayerEntity, PlayerId, PlayerSnapshot,
    Role, SessionError, SessionState, SpatialOracle,
};
use glam::Vec2;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How far ahead of the current tick a buffered input may be tagged.
pub const INPUT_LEAD_TICKS: u64 = 64;

/// The only surface the transport layer drives.
pub trait SessionCallbacks {
    fn on_join(&mut self, player_id: PlayerId) -> Result<(), SessionError>;
    fn on_leave(&mut self, player_id: PlayerId) -> Result<(), SessionError>;
    fn on_input(
        &mut self,
        player_id: PlayerId,
        tick: u64,
        frame: InputFrame,
    ) -> Result<(), SessionError>;
    fn on_tick(&mut self) -> Result<TickReport, SessionError>;
}

pub fn display_name(player_id: PlayerId) -> String {
    format!("Player_{player_id}")
}

/// Owns the roster, the player spawn pool and the pickup field of one session.
///
/// All mutation happens through `&mut self`, so a tick can never observe a
/// half-applied join or leave. Only the [`Role::Authority`] instance runs the
/// simulation; a [`Role::Replica`] only applies [`WorldUpdate`]s.
pub struct SessionCoordinator<O> {
    role: Role,
    state: SessionState,
    config: SessionConfig,
    settings: Arc<MovementSettings>,
    oracle: O,
    // Ordered by id so every tick walks players in ascending order.
    roster: BTreeMap<PlayerId, PlayerEntity>,
    spawn_pool: SpawnPool<PlayerId>,
    pickups: PickupField,
    // Latest frame per player per tick.
    pending_inputs: HashMap<PlayerId, BTreeMap<u64, InputFrame>>,
    current_tick: u64,
    total_collected: u64,
    // Last published update on the authority, last applied one on a replica.
    update_seq: u64,
    events: Vec<SessionEvent>,
}

impl<O: SpatialOracle> SessionCoordinator<O> {
    pub fn new(config: SessionConfig, role: Role, oracle: O) -> Result<Self, SessionError> {
        config.validate()?;

        let settings = Arc::new(config.movement.clone());
        let spawn_pool = SpawnPool::new(config.player_spawn_points.clone());
        let pickups = PickupField::new(
            config.pickup_spawn_points.clone(),
            config.pickup.half_extent,
        );

        Ok(Self {
            role,
            state: SessionState::Idle,
            config,
            settings,
            oracle,
            roster: BTreeMap::new(),
            spawn_pool,
            pickups,
            pending_inputs: HashMap::new(),
            current_tick: 0,
            total_collected: 0,
            update_seq: 0,
            events: Vec::new(),
        })
    }

    fn require_authority(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.role == Role::Authority {
            return Ok(());
        }
        warn!(operation, role = ?self.role, "mutation rejected outside the authority");
        Err(SessionError::AuthorityViolation {
            operation,
            role: self.role,
        })
    }

    fn require_live(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Terminated => Err(SessionError::Terminated),
            _ => Ok(()),
        }
    }

    /// Binds the lowest free spawn point to a new player.
    ///
    /// A rejected join leaves the roster and spawn pool untouched.
    pub fn join(&mut self, player_id: PlayerId) -> Result<&PlayerEntity, SessionError> {
        self.require_authority("join")?;
        self.require_live()?;

        if self.roster.contains_key(&player_id) {
            return Err(SessionError::AlreadyJoined(player_id));
        }

        let Some((slot, position)) = self.spawn_pool.assign(player_id) else {
            warn!(
                player_id,
                capacity = self.spawn_pool.capacity(),
                "join rejected; all spawn points occupied"
            );
            return Err(SessionError::CapacityExceeded { player_id });
        };

        if self.state == SessionState::Idle {
            self.state = SessionState::Active;
            info!("session active");
        }

        info!(player_id, slot, x = position.x, y = position.y, "player joined");
        self.events.push(SessionEvent::PlayerJoined {
            player_id,
            display_name: display_name(player_id),
        });

        let entity = PlayerEntity::new(
            player_id,
            position,
            self.config.player_depth,
            slot,
            Arc::clone(&self.settings),
        );
        let entity: &PlayerEntity = self.roster.entry(player_id).or_insert(entity);
        Ok(entity)
    }

    /// Removes a player and frees its spawn point. The last leave tears the session down.
    pub fn leave(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.require_authority("leave")?;
        self.require_live()?;

        let entity = self.remove_player(player_id)?;

        info!(player_id, score = entity.score, "player left");
        self.events.push(SessionEvent::PlayerLeft {
            player_id,
            display_name: display_name(player_id),
        });

        if self.roster.is_empty() {
            self.teardown("roster empty");
        }
        Ok(())
    }

    /// Undoes a join whose caller went away before it learned the outcome.
    ///
    /// Unlike [`leave`](Self::leave), emptying the roster here puts the session
    /// back to Idle instead of tearing it down.
    pub fn rollback_join(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.require_authority("rollback_join")?;
        self.require_live()?;

        self.remove_player(player_id)?;

        // An unpublished join is retracted; a published one is answered with a leave.
        let pending = self.events.len();
        self.events.retain(|event| {
            !matches!(event, SessionEvent::PlayerJoined { player_id: id, .. } if *id == player_id)
        });
        if self.events.len() == pending {
            self.events.push(SessionEvent::PlayerLeft {
                player_id,
                display_name: display_name(player_id),
            });
        }

        info!(player_id, "join rolled back");
        if self.roster.is_empty() {
            self.state = SessionState::Idle;
            info!("session idle");
        }
        Ok(())
    }

    fn remove_player(&mut self, player_id: PlayerId) -> Result<PlayerEntity, SessionError> {
        let entity = self
            .roster
            .remove(&player_id)
            .ok_or(SessionError::UnknownPlayer(player_id))?;
        self.spawn_pool.release(entity.spawn_slot, player_id);
        self.pending_inputs.remove(&player_id);
        Ok(entity)
    }

    /// Buffers `frame` for `tick`; a later frame for the same tick replaces it.
    pub fn submit_input(
        &mut self,
        player_id: PlayerId,
        tick: u64,
        frame: InputFrame,
    ) -> Result<(), SessionError> {
        self.require_authority("submit_input")?;
        self.require_live()?;

        if !self.roster.contains_key(&player_id) {
            return Err(SessionError::UnknownPlayer(player_id));
        }
        if tick < self.current_tick {
            return Err(SessionError::StaleInput {
                tick,
                current: self.current_tick,
            });
        }
        if tick - self.current_tick > INPUT_LEAD_TICKS {
            return Err(SessionError::InputTooEarly {
                tick,
                current: self.current_tick,
                lead: INPUT_LEAD_TICKS,
            });
        }

        self.pending_inputs
            .entry(player_id)
            .or_default()
            .insert(tick, frame);
        Ok(())
    }

    /// Simulates the current tick with the frames buffered for it.
    pub fn advance(&mut self) -> Result<TickReport, SessionError> {
        self.require_authority("advance")?;
        self.require_live()?;

        let tick = self.current_tick;
        let inputs: BTreeMap<PlayerId, InputFrame> = self
            .pending_inputs
            .iter_mut()
            .filter_map(|(id, frames)| frames.remove(&tick).map(|frame| (*id, frame)))
            .collect();
        self.tick(&inputs)
    }

    /// Runs one full tick over the roster in ascending id order.
    ///
    /// Players missing from `inputs` are simulated with an idle frame.
    pub fn tick(
        &mut self,
        inputs: &BTreeMap<PlayerId, InputFrame>,
    ) -> Result<TickReport, SessionError> {
        self.require_authority("tick")?;
        self.require_live()?;

        let tick = self.current_tick;
        let dt = self.config.tick_delta();
        let bounds = self.config.bounds;

        let mut collections = Vec::new();
        for (player_id, player) in self.roster.iter_mut() {
            let frame = inputs.get(player_id).copied().unwrap_or(InputFrame::IDLE);
            movement::tick_player(player, frame, dt, bounds, &self.oracle);

            // Contact runs against the freshly moved body, so a lower id takes a contested pickup.
            if let Some(event) = self.pickups.check_contact(player, &self.oracle) {
                collections.push(event);
            }
        }

        for event in &collections {
            self.on_collection(event)?;
        }

        self.current_tick += 1;
        let current = self.current_tick;
        self.pending_inputs.retain(|_, frames| {
            *frames = frames.split_off(&current);
            !frames.is_empty()
        });

        debug!(tick, players = self.roster.len(), "tick simulated");
        Ok(TickReport { tick, collections })
    }

    /// Credits a collection to its player and to the session total.
    pub fn on_collection(&mut self, event: &CollectionEvent) -> Result<(), SessionError> {
        self.require_authority("on_collection")?;

        let player = self
            .roster
            .get_mut(&event.player_id)
            .ok_or(SessionError::UnknownPlayer(event.player_id))?;
        player.score = player.score.saturating_add(1);
        let score = player.score;
        self.total_collected += 1;

        self.events.push(SessionEvent::PickupCollected {
            player_id: event.player_id,
            pickup_id: event.pickup.id,
            tick: self.current_tick,
        });
        self.events.push(SessionEvent::ScoreChanged {
            player_id: event.player_id,
            score,
            total_collected: self.total_collected,
        });
        Ok(())
    }

    pub fn seed_pickups(&mut self, positions: Vec<Vec2>) -> Result<Vec<PickupId>, SessionError> {
        self.require_authority("seed_pickups")?;
        self.require_live()?;

        let ids = self.pickups.seed(positions);
        info!(count = ids.len(), "pickups seeded");
        Ok(ids)
    }

    pub fn seed_pickups_from_spawn_points(&mut self) -> Result<Vec<PickupId>, SessionError> {
        self.require_authority("seed_pickups")?;
        self.require_live()?;

        let ids = self.pickups.seed_from_spawn_points();
        info!(count = ids.len(), "pickups seeded from spawn points");
        Ok(ids)
    }

    /// Ends the session explicitly. Terminated is absorbing, so repeated calls are no-ops.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        self.require_authority("shutdown")?;
        if self.state != SessionState::Terminated {
            self.teardown("shutdown requested");
        }
        Ok(())
    }

    fn teardown(&mut self, reason: &'static str) {
        self.roster.clear();
        self.spawn_pool.release_all();
        self.pickups.clear();
        self.pending_inputs.clear();
        self.state = SessionState::Terminated;
        self.events.push(SessionEvent::SessionTerminated);
        info!(
            reason,
            tick = self.current_tick,
            total_collected = self.total_collected,
            "session terminated"
        );
    }

    /// Applies authority-decided state on a replica.
    ///
    /// Returns `Ok(false)` for an update that is not newer than the last one applied,
    /// so a redelivered update never replays its events.
    pub fn apply_replicated(&mut self, update: &WorldUpdate) -> Result<bool, SessionError> {
        if self.role != Role::Replica {
            warn!(role = ?self.role, "replicated state offered to the authority");
            return Err(SessionError::AuthorityViolation {
                operation: "apply_replicated",
                role: self.role,
            });
        }
        self.require_live()?;

        if update.seq <= self.update_seq {
            debug!(
                seq = update.seq,
                last = self.update_seq,
                tick = update.tick,
                "ignoring out-of-date world update"
            );
            return Ok(false);
        }
        self.update_seq = update.seq;

        self.roster
            .retain(|id, _| update.players.iter().any(|p| p.id == *id));
        for snap in &update.players {
            let settings = &self.settings;
            let player = self.roster.entry(snap.id).or_insert_with(|| {
                PlayerEntity::new(snap.id, Vec2::ZERO, snap.z, 0, Arc::clone(settings))
            });
            player.position = Vec2::new(snap.x, snap.y);
            player.depth = snap.z;
            player.horizontal_velocity = snap.vx;
            player.vertical_velocity = snap.vy;
            player.grounded = snap.grounded;
            player.score = snap.score;
        }

        self.pickups.replace_replicated(&update.pickups);
        self.total_collected = update.total_collected;
        self.current_tick = update.tick;
        self.events.extend(update.events.iter().cloned());

        if update
            .events
            .iter()
            .any(|e| matches!(e, SessionEvent::SessionTerminated))
        {
            self.roster.clear();
            self.pickups.clear();
            self.state = SessionState::Terminated;
        } else if self.state == SessionState::Idle && !self.roster.is_empty() {
            self.state = SessionState::Active;
        }
        Ok(true)
    }

    /// Builds the replicated view of the session and flushes pending events into it.
    pub fn world_update(&mut self) -> WorldUpdate {
        if self.role == Role::Authority {
            self.update_seq += 1;
        }
        WorldUpdate {
            seq: self.update_seq,
            tick: self.current_tick,
            players: self.roster.values().map(PlayerSnapshot::from).collect(),
            pickups: self.pickups.live().iter().map(PickupSnapshot::from).collect(),
            total_collected: self.total_collected,
            events: self.drain_events(),
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn roster(&self) -> &BTreeMap<PlayerId, PlayerEntity> {
        &self.roster
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&PlayerEntity> {
        self.roster.get(&player_id)
    }

    pub fn pickups(&self) -> &[PickupEntity] {
        self.pickups.live()
    }

    pub fn total_collected(&self) -> u64 {
        self.total_collected
    }
}

impl<O: SpatialOracle> SessionCallbacks for SessionCoordinator<O> {
    fn on_join(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.join(player_id).map(|_| ())
    }

    fn on_leave(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        self.leave(player_id)
    }

    fn on_input(
        &mut self,
        player_id: PlayerId,
        tick: u64,
        frame: InputFrame,
    ) -> Result<(), SessionError> {
        self.submit_input(player_id, tick, frame)
    }

    fn on_tick(&mut self) -> Result<TickReport, SessionError> {
        self.advance()
    }
}
