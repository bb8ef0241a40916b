//! Game state definitions and structures
//!
//! The authoritative world record: the 32-slot player roster, the 40-planet
//! galaxy, live projectiles, and tournament bookkeeping. One value of
//! [`GameState`] exists per process, guarded by a reader-writer lock; the
//! simulation kernel and the command handlers mutate it under the write lock.

use hashbrown::HashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::catalogue::{self, team, PlanetSpec, ShipClass, PLANETS};
use crate::game::constants::{galaxy, timing};
use crate::util::angle;
use crate::util::vec2::Vec2;

/// Player slot index, stable for the lifetime of a session
pub type Slot = usize;

/// Player lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// Slot empty
    Free,
    /// Slot reserved, ship not yet in the world
    Outfit,
    /// Simulated every tick
    Alive,
    /// Deterministic explosion countdown
    Explode,
    /// Awaiting respawn
    Dead,
}

/// Cause of the most recent death
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhyDead {
    None,
    Torp,
    Phaser,
    Plasma,
    Explosion,
    Planet,
    Quit,
}

/// Proximity alert classification, recomputed every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
}

/// Lock-on target kind; only planets can be locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    None,
    Planet(usize),
}

/// Victory classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinType {
    None,
    Genocide,
    Conquest,
    Timeout,
}

/// One roster slot
#[derive(Debug, Clone)]
pub struct Player {
    // Identity
    pub id: Slot,
    pub name: String,
    pub team: u8,
    pub ship: ShipClass,
    pub is_bot: bool,
    pub owner_client: Option<Uuid>,
    pub connected: bool,
    pub pending_quit: bool,

    // Lifecycle
    pub status: PlayerStatus,
    pub explode_timer: i32,

    // Kinematics
    pub pos: Vec2,
    pub dir: f64,
    pub des_dir: f64,
    pub speed: i32,
    pub des_speed: i32,
    pub sub_dir: i32,
    pub acc_frac: i32,

    // Resources
    pub shields: i32,
    pub damage: i32,
    pub fuel: i32,
    pub wtemp: i32,
    pub etemp: i32,
    pub armies: i32,
    pub num_torps: i32,
    pub num_plasma: i32,

    // Action flags
    pub shields_up: bool,
    pub cloaked: bool,
    pub repairing: bool,
    pub repair_request: bool,
    pub repair_counter: u64,
    pub bombing: bool,
    pub beaming: bool,
    pub beaming_up: bool,
    pub orbiting: Option<usize>,
    pub tractoring: Option<Slot>,
    pub pressoring: Option<Slot>,
    pub engine_overheat: bool,
    pub overheat_timer: i32,
    pub lock: Lock,
    pub alert: AlertLevel,

    // Death bookkeeping
    pub killed_by: Option<Slot>,
    pub why_dead: WhyDead,
    pub deaths: u32,
    pub kills: f64,
    pub kills_streak: f64,
    pub respawn_msg_sent: bool,

    // Refit
    pub next_ship: Option<ShipClass>,
}

impl Player {
    pub fn empty(id: Slot) -> Self {
        Self {
            id,
            name: String::new(),
            team: team::NONE,
            ship: ShipClass::Cruiser,
            is_bot: false,
            owner_client: None,
            connected: false,
            pending_quit: false,
            status: PlayerStatus::Free,
            explode_timer: 0,
            pos: Vec2::ZERO,
            dir: 0.0,
            des_dir: 0.0,
            speed: 0,
            des_speed: 0,
            sub_dir: 0,
            acc_frac: 0,
            shields: 0,
            damage: 0,
            fuel: 0,
            wtemp: 0,
            etemp: 0,
            armies: 0,
            num_torps: 0,
            num_plasma: 0,
            shields_up: false,
            cloaked: false,
            repairing: false,
            repair_request: false,
            repair_counter: 0,
            bombing: false,
            beaming: false,
            beaming_up: false,
            orbiting: None,
            tractoring: None,
            pressoring: None,
            engine_overheat: false,
            overheat_timer: 0,
            lock: Lock::None,
            alert: AlertLevel::Green,
            killed_by: None,
            why_dead: WhyDead::None,
            deaths: 0,
            kills: 0.0,
            kills_streak: 0.0,
            respawn_msg_sent: false,
            next_ship: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == PlayerStatus::Alive
    }

    /// Reset every ship stat to the class maxima and clear transient state.
    /// Position, heading, team, and score bookkeeping are untouched.
    pub fn reset_ship(&mut self, class: ShipClass) {
        let stats = class.stats();
        self.ship = class;
        self.shields = stats.max_shields;
        self.damage = 0;
        self.fuel = stats.max_fuel;
        self.wtemp = 0;
        self.etemp = 0;
        self.armies = 0;
        self.speed = 0;
        self.des_speed = 0;
        self.sub_dir = 0;
        self.acc_frac = 0;
        self.num_torps = 0;
        self.num_plasma = 0;
        self.shields_up = false;
        self.cloaked = false;
        self.repairing = false;
        self.repair_request = false;
        self.repair_counter = 0;
        self.bombing = false;
        self.beaming = false;
        self.beaming_up = false;
        self.orbiting = None;
        self.tractoring = None;
        self.pressoring = None;
        self.engine_overheat = false;
        self.overheat_timer = 0;
        self.lock = Lock::None;
        self.alert = AlertLevel::Green;
    }

    /// Release the slot entirely
    pub fn free(&mut self) {
        *self = Player::empty(self.id);
    }

    /// Maximum speed for the current hull state: damage derates the class
    /// maximum down to a floor of warp 1, overheat forces warp 1.
    pub fn effective_max_speed(&self) -> i32 {
        if self.engine_overheat {
            return 1;
        }
        let stats = self.ship.stats();
        let max = stats.max_speed;
        let derated = (max + 2) - (max + 1) * self.damage / stats.max_damage;
        derated.clamp(1, max)
    }
}

/// One planet slot; position and name never change after init
#[derive(Debug, Clone)]
pub struct Planet {
    pub id: usize,
    pub name: &'static str,
    pub pos: Vec2,
    pub owner: u8,
    pub armies: i32,
    pub flags: u8,
    /// Per-team visibility bitmask, OR of team flags that have orbited
    pub info: u8,
}

impl Planet {
    fn from_spec(id: usize, spec: &PlanetSpec) -> Self {
        Self {
            id,
            name: spec.name,
            pos: Vec2::new(spec.x, spec.y),
            owner: spec.owner,
            armies: spec.armies,
            flags: spec.flags,
            // Owners start knowing their own planets
            info: spec.owner,
        }
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Projectile motion state; explicit discriminants match the wire encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProjectileStatus {
    Moving = 1,
    Exploding = 3,
}

/// A torpedo or plasma bolt in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    pub owner: Slot,
    pub team: u8,
    pub pos: Vec2,
    pub dir: f64,
    /// World units per tick
    pub speed: f64,
    pub damage: i32,
    pub fuse: i32,
    pub status: ProjectileStatus,
}

/// Per-player tournament tallies, kept for the lifetime of the tournament
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TournamentStats {
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: i64,
    pub damage_taken: i64,
}

/// Complete authoritative world state
pub struct GameState {
    pub players: Vec<Player>,
    pub planets: Vec<Planet>,
    pub torps: Vec<Projectile>,
    pub plasmas: Vec<Projectile>,

    pub frame: u64,
    pub tick_count: u64,

    // Tournament
    pub t_mode: bool,
    pub t_start: u64,
    pub t_remain: i64,
    pub tournament_stats: HashMap<Slot, TournamentStats>,

    // Victory
    pub game_over: bool,
    pub winner: u8,
    pub win_type: WinType,

    /// Set once the empty galaxy has been re-initialised; cleared when any
    /// slot becomes active again
    pub galaxy_reset: bool,
    /// Teams that have held a slot since the last galaxy reset
    pub teams_ever_active: u8,

    pub next_torp_id: u64,
    pub next_plasma_id: u64,

    /// Deterministic under a fixed seed for reproducible combat rolls
    pub rng: SmallRng,
}

impl GameState {
    pub fn new(seed: u64) -> Self {
        Self {
            players: (0..galaxy::MAX_PLAYERS).map(Player::empty).collect(),
            planets: PLANETS
                .iter()
                .enumerate()
                .map(|(i, spec)| Planet::from_spec(i, spec))
                .collect(),
            torps: Vec::new(),
            plasmas: Vec::new(),
            frame: 0,
            tick_count: 0,
            t_mode: false,
            t_start: 0,
            t_remain: 0,
            tournament_stats: HashMap::new(),
            game_over: false,
            winner: team::NONE,
            win_type: WinType::None,
            galaxy_reset: true,
            teams_ever_active: 0,
            next_torp_id: 0,
            next_plasma_id: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Restore every planet to its catalogue row
    pub fn reset_planets(&mut self) {
        for (i, spec) in PLANETS.iter().enumerate() {
            self.planets[i] = Planet::from_spec(i, spec);
        }
    }

    /// Drop all projectiles and restart the monotonic id counters
    pub fn clear_projectiles(&mut self) {
        self.torps.clear();
        self.plasmas.clear();
        self.next_torp_id = 0;
        self.next_plasma_id = 0;
        for p in &mut self.players {
            p.num_torps = 0;
            p.num_plasma = 0;
        }
    }

    pub fn alloc_torp_id(&mut self) -> u64 {
        let id = self.next_torp_id;
        self.next_torp_id += 1;
        id
    }

    pub fn alloc_plasma_id(&mut self) -> u64 {
        let id = self.next_plasma_id;
        self.next_plasma_id += 1;
        id
    }

    pub fn find_free_slot(&self) -> Option<Slot> {
        self.players
            .iter()
            .position(|p| p.status == PlayerStatus::Free)
    }

    /// Mutable access to two distinct players at once
    pub fn pair_mut(&mut self, a: Slot, b: Slot) -> (&mut Player, &mut Player) {
        assert_ne!(a, b, "pair_mut requires distinct slots");
        if a < b {
            let (left, right) = self.players.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.players.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    pub fn connected_human_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.connected && !p.is_bot)
            .count()
    }

    /// Count of slots in any non-Free state
    pub fn active_slot_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.status != PlayerStatus::Free)
            .count()
    }

    /// Alive and connected players per team flag
    pub fn alive_connected_per_team(&self, flag: u8) -> usize {
        self.players
            .iter()
            .filter(|p| p.is_alive() && p.connected && p.team == flag)
            .count()
    }

    /// Connected players per team whose slot is in play (Alive, Explode, or
    /// Dead awaiting respawn). This is the tournament head count; a pilot
    /// exploding must not flap tournament mode.
    pub fn playing_per_team(&self, flag: u8) -> usize {
        self.players
            .iter()
            .filter(|p| {
                p.connected
                    && p.team == flag
                    && matches!(
                        p.status,
                        PlayerStatus::Alive | PlayerStatus::Explode | PlayerStatus::Dead
                    )
            })
            .count()
    }

    pub fn alive_per_team(&self, flag: u8) -> usize {
        self.players
            .iter()
            .filter(|p| p.is_alive() && p.team == flag)
            .count()
    }

    pub fn planets_per_team(&self, flag: u8) -> usize {
        self.planets.iter().filter(|p| p.owner == flag).count()
    }

    /// Connected, non-Free slots per team flag (for balance and stats)
    pub fn roster_per_team(&self, flag: u8) -> usize {
        self.players
            .iter()
            .filter(|p| p.connected && p.status != PlayerStatus::Free && p.team == flag)
            .count()
    }

    /// Whether any non-Free slot on the team flies a starbase, excluding one
    /// slot (the player being checked)
    pub fn team_has_starbase(&self, flag: u8, exclude: Option<Slot>) -> bool {
        self.players.iter().any(|p| {
            p.status != PlayerStatus::Free
                && p.team == flag
                && p.ship == ShipClass::Starbase
                && Some(p.id) != exclude
        })
    }

    /// Index and distance of the planet nearest to `pos`
    pub fn nearest_planet(&self, pos: Vec2) -> (usize, f64) {
        let mut best = (0, f64::MAX);
        for planet in &self.planets {
            let d = planet.pos.distance_to(pos);
            if d < best.1 {
                best = (planet.id, d);
            }
        }
        best
    }

    /// Place a player at their team home with uniform scatter and a random
    /// heading, clamped inside the galaxy.
    pub fn place_at_home(&mut self, slot: Slot) {
        use crate::game::constants::spawn::HOME_SCATTER;
        let team_flag = self.players[slot].team;
        let home = catalogue::team_home(team_flag);
        let dx = self.rng.gen_range(-HOME_SCATTER..HOME_SCATTER);
        let dy = self.rng.gen_range(-HOME_SCATTER..HOME_SCATTER);
        let heading = angle::normalize_rad(self.rng.gen_range(0.0..std::f64::consts::TAU));
        let p = &mut self.players[slot];
        p.pos = Vec2::new(
            (home.x + dx).clamp(0.0, galaxy::WIDTH),
            (home.y + dy).clamp(0.0, galaxy::HEIGHT),
        );
        p.dir = heading;
        p.des_dir = heading;
    }

    /// Transition a victim into the Explode countdown. Does not touch kill
    /// credit; that is the combat module's job.
    pub fn start_explosion(&mut self, slot: Slot, killed_by: Option<Slot>, why: WhyDead) {
        let p = &mut self.players[slot];
        p.status = PlayerStatus::Explode;
        p.explode_timer = timing::EXPLODE_TIMER_FRAMES;
        p.killed_by = killed_by;
        p.why_dead = why;
        p.bombing = false;
        p.beaming = false;
        p.beaming_up = false;
        p.orbiting = None;
        p.lock = Lock::None;
        p.tractoring = None;
        p.pressoring = None;
        p.armies = 0;
        p.deaths += 1;
        p.kills_streak = 0.0;
    }
}
