//! Bot scheduling
//!
//! The kernel calls [`BotScheduler::run`] once per tick with the write lock
//! held. Brains only read the world and return suggestions; suggestions are
//! buffered and applied after every bot has thought, so earlier bots in slot
//! order get no information advantage over later ones.
//!
//! The baseline brain here flies, shields, and shoots well enough to crew an
//! empty server. Real tactical play is the business of external controllers
//! implementing [`BotBrain`].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::game::catalogue::{team, ShipClass};
use crate::game::state::{GameState, PlayerStatus, Slot};
use crate::game::systems::projectiles::fire_torpedo;
use crate::net::protocol::Outbox;
use crate::util::angle;

/// Steering and weapon suggestion for one bot, one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct Suggestion {
    pub des_dir: Option<f64>,
    pub des_speed: Option<i32>,
    pub shields: Option<bool>,
    /// Launch a torpedo along this heading
    pub fire_torp: Option<f64>,
}

/// A tactical controller for bot slots
pub trait BotBrain: Send {
    /// Runs under the world write lock; must only read `state`
    fn think(&mut self, state: &GameState, bot: Slot) -> Option<Suggestion>;
}

/// Collects suggestions from the brain and applies them after the sweep
pub struct BotScheduler {
    brain: Box<dyn BotBrain>,
    pending: Vec<(Slot, Suggestion)>,
}

impl BotScheduler {
    pub fn new(brain: Box<dyn BotBrain>) -> Self {
        Self {
            brain,
            pending: Vec::new(),
        }
    }

    /// Tick every alive bot, then apply the buffered suggestions
    pub fn run(&mut self, state: &mut GameState, _outbox: &mut Outbox) {
        self.pending.clear();
        for slot in 0..state.players.len() {
            let p = &state.players[slot];
            if !p.is_bot || !p.is_alive() {
                continue;
            }
            if let Some(suggestion) = self.brain.think(state, slot) {
                self.pending.push((slot, suggestion));
            }
        }

        for (slot, suggestion) in self.pending.drain(..) {
            if !state.players[slot].is_alive() {
                continue;
            }
            if let Some(dir) = suggestion.des_dir {
                state.players[slot].des_dir = angle::normalize_rad(dir);
            }
            if let Some(speed) = suggestion.des_speed {
                let max = state.players[slot].effective_max_speed();
                state.players[slot].des_speed = speed.clamp(0, max);
            }
            if let Some(up) = suggestion.shields {
                state.players[slot].shields_up = up;
            }
            if let Some(dir) = suggestion.fire_torp {
                fire_torpedo(state, slot, dir);
            }
        }
    }
}

/// Nearest alive player on another team
fn nearest_enemy(state: &GameState, bot: Slot) -> Option<(Slot, f64)> {
    let me = &state.players[bot];
    state
        .players
        .iter()
        .filter(|p| p.is_alive() && p.team != me.team)
        .map(|p| (p.id, p.pos.distance_to(me.pos)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Shipped controller: chase the nearest enemy, shield when close, lob the
/// occasional torpedo. Deterministic under a fixed seed.
pub struct DefaultBrain {
    rng: SmallRng,
}

impl DefaultBrain {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl BotBrain for DefaultBrain {
    fn think(&mut self, state: &GameState, bot: Slot) -> Option<Suggestion> {
        let me = &state.players[bot];
        let Some((enemy, dist)) = nearest_enemy(state, bot) else {
            // Nobody to fight: idle at low warp
            return Some(Suggestion {
                des_speed: Some(2),
                shields: Some(false),
                ..Default::default()
            });
        };

        let bearing = (state.players[enemy].pos - me.pos).angle();
        let mut suggestion = Suggestion {
            des_dir: Some(bearing),
            des_speed: Some(if dist > 20_000.0 { 8 } else { 5 }),
            shields: Some(dist < 6000.0),
            ..Default::default()
        };

        // Fire when roughly on the bearing and inside torpedo reach
        let aimed = angle::rad_diff(me.dir, bearing) < std::f64::consts::FRAC_PI_4;
        if aimed && dist < 5000.0 && self.rng.gen_bool(0.3) {
            suggestion.fire_torp = Some(bearing);
        }
        Some(suggestion)
    }
}

/// Team with the fewest connected slots, for bot placement and balancing
pub fn weakest_team(state: &GameState) -> u8 {
    team::ALL
        .iter()
        .copied()
        .min_by_key(|&flag| state.roster_per_team(flag))
        .unwrap_or(team::FED)
}

/// Spawn one bot, on `team_flag` or the weakest team. Returns its slot.
pub fn add_bot(state: &mut GameState, team_flag: Option<u8>) -> Option<Slot> {
    let slot = state.find_free_slot()?;
    let flag = match team_flag {
        Some(f) if team::is_valid(f) => f,
        _ => weakest_team(state),
    };

    let number: u32 = state.rng.gen_range(100..1000);
    let p = &mut state.players[slot];
    p.name = format!("Drone{number}");
    p.team = flag;
    p.is_bot = true;
    p.connected = true;
    p.status = PlayerStatus::Outfit;
    p.reset_ship(ShipClass::Cruiser);
    state.place_at_home(slot);
    state.players[slot].status = PlayerStatus::Alive;
    Some(slot)
}

/// Remove one bot, preferring the team with the most connected slots
pub fn remove_bot(state: &mut GameState) -> Option<Slot> {
    let victim = state
        .players
        .iter()
        .filter(|p| p.is_bot && p.status != PlayerStatus::Free)
        .max_by_key(|p| state.roster_per_team(p.team))
        .map(|p| p.id)?;
    state.players[victim].free();
    Some(victim)
}

/// Top every team up to `per_team` members with bots
pub fn fill_bots(state: &mut GameState, per_team: usize) -> usize {
    let mut added = 0;
    for flag in team::ALL {
        while state.roster_per_team(flag) < per_team {
            if add_bot(state, Some(flag)).is_none() {
                return added;
            }
            added += 1;
        }
    }
    added
}

/// Free every bot slot
pub fn clear_bots(state: &mut GameState) -> usize {
    let mut cleared = 0;
    for slot in 0..state.players.len() {
        if state.players[slot].is_bot && state.players[slot].status != PlayerStatus::Free {
            state.players[slot].free();
            cleared += 1;
        }
    }
    cleared
}

/// Add bots until every team matches the largest team's roster
pub fn balance_teams(state: &mut GameState) -> usize {
    let largest = team::ALL
        .iter()
        .map(|&flag| state.roster_per_team(flag))
        .max()
        .unwrap_or(0);
    if largest == 0 {
        return 0;
    }
    let mut added = 0;
    for flag in team::ALL {
        while state.roster_per_team(flag) < largest {
            if add_bot(state, Some(flag)).is_none() {
                return added;
            }
            added += 1;
        }
    }
    added
}

/// Bots currently holding a slot
pub fn bot_count(state: &GameState) -> usize {
    state
        .players
        .iter()
        .filter(|p| p.is_bot && p.status != PlayerStatus::Free)
        .count()
}
