// Use-case level inputs/outputs for the game loop.

use crate::domain::systems::pickups::CollectionEvent;
use crate::domain::{InputFrame, PickupId, PickupSnapshot, PlayerId, PlayerSnapshot, SessionError};
use glam::Vec2;
use tokio::sync::oneshot;

pub use crate::domain::SessionState;

/// Requests from the transport layer into the world task.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Leave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        // Untagged frames apply to the next simulated tick.
        tick: Option<u64>,
        frame: InputFrame,
    },
    // "Round ready": explicit positions, or every pickup spawn point when `None`.
    SeedPickups {
        positions: Option<Vec<Vec2>>,
        reply: oneshot::Sender<Result<Vec<PickupId>, SessionError>>,
    },
    Shutdown,
}

/// Outward notifications, in the order the authority produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PlayerJoined {
        player_id: PlayerId,
        display_name: String,
    },
    PlayerLeft {
        player_id: PlayerId,
        display_name: String,
    },
    PickupCollected {
        player_id: PlayerId,
        pickup_id: PickupId,
        tick: u64,
    },
    ScoreChanged {
        player_id: PlayerId,
        score: u32,
        total_collected: u64,
    },
    SessionTerminated,
}

/// Result of one fully simulated tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub collections: Vec<CollectionEvent>,
}

/// Replicated state published after every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldUpdate {
    // Publication order; replicas drop anything not newer than the last applied.
    pub seq: u64,
    // Ticks simulated so far; an input tagged with this tick applies next.
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    pub pickups: Vec<PickupSnapshot>,
    pub total_collected: u64,
    pub events: Vec<SessionEvent>,
}
