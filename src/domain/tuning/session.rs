// Everything a session needs before its first tick.

use super::{MovementSettings, PickupTuning};
use crate::domain::errors::SessionError;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rectangle bodies are clamped into after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fixed simulation rate.
    pub tick_rate_hz: u32,
    pub movement: MovementSettings,
    pub pickup: PickupTuning,
    pub bounds: Bounds,
    /// Depth assigned to every player body.
    #[serde(default)]
    pub player_depth: f32,
    pub player_spawn_points: Vec<Vec2>,
    pub pickup_spawn_points: Vec<Vec2>,
}

impl SessionConfig {
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.tick_rate_hz as f32
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz))
    }

    /// Rejects missing or degenerate values so problems surface before the first tick.
    pub fn validate(&self) -> Result<(), SessionError> {
        let m = &self.movement;
        let invalid = |reason: &str| Err(SessionError::InvalidConfiguration(reason.to_string()));

        if self.tick_rate_hz == 0 {
            return invalid("tick_rate_hz must be positive");
        }

        let scalars = [
            ("gravity", m.gravity),
            ("max_fall_speed", m.max_fall_speed),
            ("move_speed", m.move_speed),
            ("jump_force", m.jump_force),
            ("ground_probe_distance", m.ground_probe_distance),
            ("half_height", m.half_height),
            ("half_width", m.half_width),
            ("pickup.half_extent", self.pickup.half_extent),
            ("player_depth", self.player_depth),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(&format!("{name} must be finite"));
        }

        if m.gravity <= 0.0 {
            return invalid("gravity must be positive");
        }
        if m.max_fall_speed >= 0.0 {
            return invalid("max_fall_speed must be negative");
        }
        if m.move_speed <= 0.0 {
            return invalid("move_speed must be positive");
        }
        if m.jump_force <= 0.0 {
            return invalid("jump_force must be positive");
        }
        if m.ground_probe_distance <= 0.0 {
            return invalid("ground_probe_distance must be positive");
        }
        if m.half_height <= 0.0 || m.half_width <= 0.0 {
            return invalid("player extent must be positive");
        }
        if m.ground_layer.trim().is_empty() {
            return invalid("ground_layer must be named");
        }
        if self.pickup.half_extent <= 0.0 {
            return invalid("pickup.half_extent must be positive");
        }

        let b = &self.bounds;
        if !b.min.is_finite() || !b.max.is_finite() || b.min.x >= b.max.x || b.min.y >= b.max.y {
            return invalid("bounds must be a finite rectangle with min < max");
        }

        if self.player_spawn_points.is_empty() {
            return invalid("at least one player spawn point is required");
        }
        if let Some(p) = self
            .player_spawn_points
            .iter()
            .chain(self.pickup_spawn_points.iter())
            .find(|p| !b.contains(**p))
        {
            return invalid(&format!("spawn point {p} lies outside bounds"));
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 50,
            movement: MovementSettings::default(),
            pickup: PickupTuning::default(),
            bounds: Bounds::new(Vec2::new(-10.0, -5.0), Vec2::new(10.0, 10.0)),
            player_depth: 0.0,
            player_spawn_points: vec![Vec2::new(-4.0, 0.5), Vec2::new(4.0, 0.5)],
            pickup_spawn_points: vec![Vec2::new(0.0, 0.5), Vec2::new(6.0, 0.5)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: SessionError) -> String {
        match err {
            SessionError::InvalidConfiguration(reason) => reason,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn when_defaults_are_used_then_config_is_valid() {
        assert_eq!(SessionConfig::default().validate(), Ok(()));
    }

    #[test]
    fn when_move_speed_is_not_positive_then_validation_fails() {
        let mut cfg = SessionConfig::default();
        cfg.movement.move_speed = 0.0;
        let err = cfg.validate().expect_err("zero move speed must be rejected");
        assert_eq!(reason(err), "move_speed must be positive");
    }

    #[test]
    fn when_bounds_are_inverted_then_validation_fails() {
        let mut cfg = SessionConfig::default();
        cfg.bounds = Bounds::new(Vec2::new(5.0, 0.0), Vec2::new(-5.0, 10.0));
        assert!(matches!(
            cfg.validate(),
            Err(SessionError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn when_no_player_spawn_points_exist_then_validation_fails() {
        let mut cfg = SessionConfig::default();
        cfg.player_spawn_points.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn when_a_spawn_point_is_outside_bounds_then_validation_fails() {
        let mut cfg = SessionConfig::default();
        cfg.pickup_spawn_points.push(Vec2::new(100.0, 0.0));
        let err = cfg.validate().expect_err("out of bounds pickup must be rejected");
        assert!(reason(err).contains("outside bounds"));
    }

    #[test]
    fn when_gravity_is_nan_then_validation_fails() {
        let mut cfg = SessionConfig::default();
        cfg.movement.gravity = f32::NAN;
        assert_eq!(reason(cfg.validate().unwrap_err()), "gravity must be finite");
    }

    #[test]
    fn when_tick_rate_is_fifty_then_delta_is_twenty_millis() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.tick_interval(), Duration::from_millis(20));
        assert!((cfg.tick_delta() - 0.02).abs() < f32::EPSILON);
    }
}
