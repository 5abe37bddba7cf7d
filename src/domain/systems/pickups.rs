use crate::domain::ports::{Extent, SpatialOracle};
use crate::domain::spawn::SpawnPool;
use crate::domain::state::{PickupEntity, PickupId, PickupSnapshot, PlayerEntity, PlayerId};
use glam::Vec2;
use tracing::{debug, info};

/// A player touched a live pickup on the authority.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEvent {
    pub player_id: PlayerId,
    /// The pickup as it was removed, with `collected` set.
    pub pickup: PickupEntity,
}

/// Owns every live pickup and the pickup spawn points.
///
/// Pickups are kept in seed order; contact checks scan that order so the
/// first overlapping pickup always wins.
#[derive(Debug, Clone)]
pub struct PickupField {
    spawn_pool: SpawnPool<PickupId>,
    pickups: Vec<PickupEntity>,
    half_extent: f32,
    next_pickup_id: PickupId,
}

impl PickupField {
    pub fn new(spawn_points: Vec<Vec2>, half_extent: f32) -> Self {
        Self {
            spawn_pool: SpawnPool::new(spawn_points),
            pickups: Vec::new(),
            half_extent,
            next_pickup_id: 1,
        }
    }

    /// Creates one pickup per position and appends them to the live set.
    ///
    /// No de-duplication happens here: seeding the same positions twice yields
    /// two overlapping batches unless the caller clears first.
    pub fn seed<I>(&mut self, positions: I) -> Vec<PickupId>
    where
        I: IntoIterator<Item = Vec2>,
    {
        positions
            .into_iter()
            .map(|position| self.spawn(position, None))
            .collect()
    }

    /// Seeds a pickup on every free pickup spawn point.
    pub fn seed_from_spawn_points(&mut self) -> Vec<PickupId> {
        let mut ids = Vec::new();
        loop {
            let id = self.next_pickup_id;
            let Some((slot, position)) = self.spawn_pool.assign(id) else {
                break;
            };
            ids.push(self.spawn(position, Some(slot)));
        }
        ids
    }

    fn spawn(&mut self, position: Vec2, spawn_slot: Option<usize>) -> PickupId {
        let id = self.next_pickup_id;
        self.next_pickup_id = self.next_pickup_id.wrapping_add(1);
        self.pickups.push(PickupEntity {
            id,
            position,
            collected: false,
            spawn_slot,
        });
        debug!(pickup_id = id, x = position.x, y = position.y, "pickup spawned");
        id
    }

    fn extent(&self, pickup: &PickupEntity) -> Extent {
        Extent::new(pickup.position, Vec2::splat(self.half_extent))
    }

    /// Collects the first live pickup overlapping `player`, at most once per pickup.
    pub fn check_contact<O>(&mut self, player: &PlayerEntity, oracle: &O) -> Option<CollectionEvent>
    where
        O: SpatialOracle + ?Sized,
    {
        let player_extent = player.extent();
        let index = self
            .pickups
            .iter()
            .position(|p| !p.collected && oracle.overlaps(player_extent, self.extent(p)))?;

        let mut pickup = self.pickups.remove(index);
        pickup.collected = true;
        if let Some(slot) = pickup.spawn_slot {
            self.spawn_pool.release(slot, pickup.id);
        }

        info!(
            player_id = player.id,
            pickup_id = pickup.id,
            "pickup collected"
        );
        Some(CollectionEvent {
            player_id: player.id,
            pickup,
        })
    }

    /// Releases every pickup and frees all pickup spawn points.
    pub fn clear(&mut self) {
        self.pickups.clear();
        self.spawn_pool.release_all();
    }

    /// Overwrites the live set with already-decided replicated pickups.
    pub fn replace_replicated(&mut self, snapshots: &[PickupSnapshot]) {
        self.pickups = snapshots
            .iter()
            .map(|s| PickupEntity {
                id: s.id,
                position: Vec2::new(s.x, s.y),
                collected: false,
                spawn_slot: None,
            })
            .collect();
    }

    pub fn live(&self) -> &[PickupEntity] {
        &self.pickups
    }

    #[cfg(test)]
    pub fn get(&self, id: PickupId) -> Option<&PickupEntity> {
        self.pickups.iter().find(|p| p.id == id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }
}
