pub mod bots;
pub mod catalogue;
pub mod commands;
pub mod constants;
pub mod spatial;
pub mod state;
pub mod systems;
pub mod tick;
pub mod tournament;

use parking_lot::RwLock;

use crate::game::state::GameState;

/// The process-wide world: one [`GameState`] behind one reader-writer lock.
///
/// Writers are the kernel, the command handlers, and the disconnect path;
/// readers are the snapshot serialiser and the team-stats endpoint. Never
/// acquire the hub registry lock while holding this one.
pub struct World {
    pub state: RwLock<GameState>,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self {
            state: RwLock::new(GameState::new(seed)),
        }
    }
}
