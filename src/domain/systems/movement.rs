use crate::domain::input::{InputFrame, Intent};
use crate::domain::ports::{GroundProbe, SpatialOracle};
use crate::domain::state::PlayerEntity;
use crate::domain::tuning::Bounds;
use glam::Vec2;

/// Advances one player body by a single fixed tick.
///
/// The result depends only on the body's kinematic state, `frame`, the shared
/// movement settings, `dt`, `bounds` and the oracle's answers, so the same
/// inputs always produce bit-identical output.
///
/// Returns the ground probe taken before the move.
pub fn tick_player<O>(
    p: &mut PlayerEntity,
    frame: InputFrame,
    dt: f32,
    bounds: Bounds,
    oracle: &O,
) -> GroundProbe
where
    O: SpatialOracle + ?Sized,
{
    let s = &p.settings;
    let feet = |pos: Vec2| pos - Vec2::new(0.0, s.half_height);

    // horizontal: recomputed every tick, never accumulated
    p.horizontal_velocity = frame.horizontal_axis() * s.move_speed;

    // vertical
    let ground = oracle.probe_down(feet(p.position), s.ground_probe_distance, &s.ground_layer);
    if ground.is_grounded() {
        if frame.contains(Intent::Jump) {
            p.vertical_velocity = s.jump_force;
        } else if p.vertical_velocity < 0.0 {
            p.vertical_velocity = 0.0;
        }
    } else {
        p.vertical_velocity = (p.vertical_velocity - s.gravity * dt).max(s.max_fall_speed);
    }

    // position integrate
    let mut next = p.position + Vec2::new(p.horizontal_velocity, p.vertical_velocity) * dt;

    // Snap back onto the surface if this tick's fall carried the feet into the ground.
    if let GroundProbe::Grounded { point, .. } =
        oracle.probe_down(feet(next), s.ground_probe_distance, &s.ground_layer)
    {
        if p.vertical_velocity < 0.0 {
            next.y = point.y + s.half_height;
            p.vertical_velocity = 0.0;
        }
    }

    // Clamping leaves velocity alone so a body pressed against a bound keeps pushing.
    p.position = bounds.clamp(next);
    p.grounded = ground.is_grounded();
    ground
}
