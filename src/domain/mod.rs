// Domain layer: core simulation types and rules.

pub mod errors;
pub mod input;
pub mod level;
pub mod ports;
pub mod spawn;
pub mod state;
pub mod systems;
pub mod tuning;

pub use errors::SessionError;
pub use input::{InputFrame, Intent};
pub use ports::{Extent, GroundProbe, SpatialOracle};
pub use state::{
    PickupEntity, PickupId, PickupSnapshot, PlayerEntity, PlayerId, PlayerSnapshot, Role,
    SessionState,
};
