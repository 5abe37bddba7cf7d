// In-memory level geometry used as the server's spatial oracle.

use crate::domain::ports::{GroundProbe, SpatialOracle};
use glam::Vec2;
use serde::{Deserialize, Serialize};

fn default_layer() -> String {
    "Ground".to_string()
}

/// Solid axis-aligned slab. Bodies land on `top`; a probe that starts inside
/// the slab reports contact with the top surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub min_x: f32,
    pub max_x: f32,
    pub top: f32,
    pub bottom: f32,
    #[serde(default = "default_layer")]
    pub layer: String,
}

impl Platform {
    fn spans(&self, x: f32) -> bool {
        x >= self.min_x && x <= self.max_x
    }

    fn is_well_formed(&self) -> bool {
        [self.min_x, self.max_x, self.top, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.bottom < self.top
            && !self.layer.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelGeometry {
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl LevelGeometry {
    pub fn new(platforms: Vec<Platform>) -> Self {
        Self { platforms }
    }

    /// A single ground slab one unit thick.
    pub fn flat(min_x: f32, max_x: f32, top: f32) -> Self {
        Self::new(vec![Platform {
            min_x,
            max_x,
            top,
            bottom: top - 1.0,
            layer: default_layer(),
        }])
    }

    /// Returns the index of the first malformed platform, if any.
    pub fn first_malformed(&self) -> Option<usize> {
        self.platforms.iter().position(|p| !p.is_well_formed())
    }
}

impl SpatialOracle for LevelGeometry {
    fn probe_down(&self, origin: Vec2, max_distance: f32, layer: &str) -> GroundProbe {
        self.platforms
            .iter()
            .filter(|p| p.layer == layer && p.spans(origin.x))
            .filter_map(|p| {
                if origin.y <= p.top && origin.y >= p.bottom {
                    // Started inside solid ground.
                    return Some((p.top, 0.0));
                }
                let distance = origin.y - p.top;
                (distance >= 0.0 && distance <= max_distance).then_some((p.top, distance))
            })
            // First nearest hit wins so overlapping platforms resolve the same way every time.
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(top, distance)| GroundProbe::Grounded {
                point: Vec2::new(origin.x, top),
                distance,
            })
            .unwrap_or(GroundProbe::Airborne)
    }
}
