//! Quadrant Server Library
//!
//! Authoritative server for a four-team real-time space-combat arena: a
//! 10 Hz fixed-tick simulation of a 2-D galaxy behind a WebSocket JSON
//! protocol. The binary in `main.rs` wires the world, the broadcast hub,
//! the game loop, and the HTTP surface together.

pub mod config;
pub mod game;
pub mod net;
pub mod util;
