use glam::Vec2;

/// Outcome of a downward ground probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundProbe {
    /// Probe hit ground at `point`, `distance` below the origin.
    Grounded { point: Vec2, distance: f32 },
    Airborne,
}

impl GroundProbe {
    pub fn is_grounded(&self) -> bool {
        matches!(self, GroundProbe::Grounded { .. })
    }
}

/// Axis-aligned collision extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub center: Vec2,
    pub half_size: Vec2,
}

impl Extent {
    pub fn new(center: Vec2, half_size: Vec2) -> Self {
        Self { center, half_size }
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half_size
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half_size
    }

    /// Touching edges count as overlap.
    pub fn intersects(&self, other: &Extent) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x <= b_max.x && b_min.x <= a_max.x && a_min.y <= b_max.y && b_min.y <= a_max.y
    }
}

// Port for the synchronous environment queries the simulation depends on.
// Implementations must be side-effect free so ticks stay deterministic.
pub trait SpatialOracle {
    fn probe_down(&self, origin: Vec2, max_distance: f32, layer: &str) -> GroundProbe;

    fn overlaps(&self, a: Extent, b: Extent) -> bool {
        a.intersects(&b)
    }
}

impl<T: SpatialOracle + ?Sized> SpatialOracle for &T {
    fn probe_down(&self, origin: Vec2, max_distance: f32, layer: &str) -> GroundProbe {
        (**self).probe_down(origin, max_distance, layer)
    }

    fn overlaps(&self, a: Extent, b: Extent) -> bool {
        (**self).overlaps(a, b)
    }
}

impl<T: SpatialOracle + ?Sized> SpatialOracle for std::sync::Arc<T> {
    fn probe_down(&self, origin: Vec2, max_distance: f32, layer: &str) -> GroundProbe {
        (**self).probe_down(origin, max_distance, layer)
    }

    fn overlaps(&self, a: Extent, b: Extent) -> bool {
        (**self).overlaps(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_extents_share_an_edge_then_they_overlap() {
        let a = Extent::new(Vec2::new(0.0, 0.0), Vec2::splat(0.5));
        let b = Extent::new(Vec2::new(1.0, 0.0), Vec2::splat(0.5));
        assert!(a.intersects(&b));
    }

    #[test]
    fn when_extents_are_apart_then_they_do_not_overlap() {
        let a = Extent::new(Vec2::new(0.0, 0.0), Vec2::splat(0.5));
        let b = Extent::new(Vec2::new(0.0, 1.01), Vec2::splat(0.5));
        assert!(!a.intersects(&b));
    }
}
