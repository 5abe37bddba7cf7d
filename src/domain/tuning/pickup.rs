//! Gameplay tuning for collectible pickups.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickupTuning {
    /// Half of the pickup's square collision extent.
    pub half_extent: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self { half_extent: 0.25 }
    }
}
