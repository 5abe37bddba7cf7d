//! Gameplay tuning for player-controlled bodies.
//!
//! Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSettings {
    /// Downward acceleration in units per second squared.
    pub gravity: f32,

    /// Most negative vertical velocity a falling body may reach.
    pub max_fall_speed: f32,

    /// Horizontal speed in units per second while a direction is held.
    pub move_speed: f32,

    /// Vertical velocity applied when jumping from the ground.
    pub jump_force: f32,

    /// Reach of the downward ground probe, measured from the feet.
    pub ground_probe_distance: f32,

    /// Half of the body's collision height.
    pub half_height: f32,

    /// Half of the body's collision width (pickup contact only).
    pub half_width: f32,

    /// Layer the ground probe is allowed to hit.
    pub ground_layer: String,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            gravity: 30.0,
            max_fall_speed: -20.0,
            move_speed: 5.0,
            jump_force: 12.0,
            ground_probe_distance: 0.1,
            half_height: 0.5,
            half_width: 0.5,
            ground_layer: "Ground".to_string(),
        }
    }
}
