// Network adapter modules split by external client sockets vs internal HTTP routes.

pub mod client;
pub mod internal;

pub use client::{world_update_serializer, ws_handler};
pub use internal::seed_pickups_handler;
