// Domain-level simulation entities and snapshot types.

use crate::domain::ports::Extent;
use crate::domain::tuning::MovementSettings;
use glam::Vec2;
use std::sync::Arc;

pub type PlayerId = u64;
pub type PickupId = u64;

/// Which side of the replication boundary a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs the simulation and decides every outcome.
    Authority,
    /// Applies already-decided replicated state only.
    Replica,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub id: PlayerId,
    pub position: Vec2,
    // Fixed depth for presentation; never simulated.
    pub depth: f32,
    pub vertical_velocity: f32,
    // Recomputed from input every tick.
    pub horizontal_velocity: f32,
    pub grounded: bool,
    pub score: u32,
    pub spawn_slot: usize,
    pub settings: Arc<MovementSettings>,
}

impl PlayerEntity {
    pub fn new(
        id: PlayerId,
        position: Vec2,
        depth: f32,
        spawn_slot: usize,
        settings: Arc<MovementSettings>,
    ) -> Self {
        Self {
            id,
            position,
            depth,
            vertical_velocity: 0.0,
            horizontal_velocity: 0.0,
            grounded: false,
            score: 0,
            spawn_slot,
            settings,
        }
    }

    pub fn extent(&self) -> Extent {
        Extent::new(
            self.position,
            Vec2::new(self.settings.half_width, self.settings.half_height),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupEntity {
    pub id: PickupId,
    pub position: Vec2,
    pub collected: bool,
    // Pickup spawn point this pickup occupies, if it was seeded from one.
    pub spawn_slot: Option<usize>,
}

/// Replicated view of one player for a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickupSnapshot {
    pub id: PickupId,
    pub x: f32,
    pub y: f32,
}

impl From<&PlayerEntity> for PlayerSnapshot {
    fn from(p: &PlayerEntity) -> Self {
        Self {
            id: p.id,
            x: p.position.x,
            y: p.position.y,
            z: p.depth,
            vx: p.horizontal_velocity,
            vy: p.vertical_velocity,
            grounded: p.grounded,
            score: p.score,
        }
    }
}

impl From<&PickupEntity> for PickupSnapshot {
    fn from(p: &PickupEntity) -> Self {
        Self {
            id: p.id,
            x: p.position.x,
            y: p.position.y,
        }
    }
}
