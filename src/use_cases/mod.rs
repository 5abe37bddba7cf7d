// Use cases layer: session workflows and the tick loop.

pub mod game;
pub mod session;
pub mod types;

pub use session::{INPUT_LEAD_TICKS, SessionCallbacks, SessionCoordinator};
pub use types::{GameEvent, SessionEvent, SessionState, TickReport, WorldUpdate};
