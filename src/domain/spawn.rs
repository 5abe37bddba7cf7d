// Index-based spawn point assignment.

use glam::Vec2;

/// Ordered spawn points with per-slot occupancy.
///
/// A slot is either free or bound to exactly one owner. Assignment always
/// takes the lowest free slot and never wraps around.
#[derive(Debug, Clone)]
pub struct SpawnPool<K> {
    points: Vec<Vec2>,
    occupants: Vec<Option<K>>,
}

impl<K: Copy + PartialEq> SpawnPool<K> {
    pub fn new(points: Vec<Vec2>) -> Self {
        let occupants = vec![None; points.len()];
        Self { points, occupants }
    }

    /// Binds the lowest free slot to `owner`; `None` when every slot is taken.
    pub fn assign(&mut self, owner: K) -> Option<(usize, Vec2)> {
        let slot = self.occupants.iter().position(Option::is_none)?;
        self.occupants[slot] = Some(owner);
        Some((slot, self.points[slot]))
    }

    /// Frees `slot` if `owner` holds it. Returns whether anything changed.
    pub fn release(&mut self, slot: usize, owner: K) -> bool {
        match self.occupants.get_mut(slot) {
            Some(occupant) if *occupant == Some(owner) => {
                *occupant = None;
                true
            }
            _ => false,
        }
    }

    pub fn release_all(&mut self) {
        self.occupants.iter_mut().for_each(|o| *o = None);
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    #[cfg(test)]
    pub fn occupied(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    #[cfg(test)]
    pub fn is_full(&self) -> bool {
        self.occupied() == self.capacity()
    }
}
