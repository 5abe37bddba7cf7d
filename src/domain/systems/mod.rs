pub mod movement;
pub mod pickups;
