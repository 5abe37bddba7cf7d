pub mod movement;
pub mod pickup;
pub mod session;

pub use movement::MovementSettings;
pub use pickup::PickupTuning;
pub use session::{Bounds, SessionConfig};
