pub mod beams;
pub mod combat;
pub mod physics;
pub mod planets;
pub mod projectiles;
pub mod ship;
