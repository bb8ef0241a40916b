/// Galaxy geometry and roster limits
pub mod galaxy {
    /// Galaxy width in world units
    pub const WIDTH: f64 = 100_000.0;
    /// Galaxy height in world units
    pub const HEIGHT: f64 = 100_000.0;
    /// Fixed player roster size (slots are reused across sessions)
    pub const MAX_PLAYERS: usize = 32;
    /// Fixed planet roster size
    pub const MAX_PLANETS: usize = 40;
    /// Enemy within this range raises a red alert
    pub const RED_RANGE: f64 = WIDTH / 10.0;
    /// Enemy within this range raises a yellow alert
    pub const YELLOW_RANGE: f64 = WIDTH / 7.0;
}

/// Simulation timing
pub mod timing {
    /// Server tick rate in Hz
    pub const TICK_RATE: u32 = 10;
    /// Tick duration in milliseconds
    pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;
    /// Frames a destroyed ship spends in the Explode state
    pub const EXPLODE_TIMER_FRAMES: i32 = 10;
    /// Seconds between a declared victory and the galaxy reset
    pub const VICTORY_RESET_SECS: u64 = 10;
}

/// Movement and translation
pub mod motion {
    /// World units travelled per tick per warp unit of speed
    pub const UNITS_PER_WARP: f64 = 20.0;
    /// Sub-unit accumulator scale for turning and acceleration
    pub const FRAC_SCALE: i32 = 1000;
    /// Largest speed that still shifts the turn-rate divisor
    pub const MAX_TURN_SHIFT: u32 = 30;
}

/// Weapons and damage radii
pub mod combat {
    /// Torpedo proximity-hit radius
    pub const EXPLOSION_DIST: f64 = 350.0;
    /// Plasma proximity-hit radius
    pub const PLASMA_EXPLOSION_DIST: f64 = 500.0;
    /// Full ship-explosion damage inside this radius
    pub const SHIP_EXPLOSION_DIST: f64 = 350.0;
    /// Ship-explosion damage falls linearly to zero at this radius
    pub const SHIP_EXPLOSION_MAX_DIST: f64 = 700.0;
    /// Base phaser range, scaled by class phaser damage
    pub const PHASER_DIST: f64 = 6000.0;
    /// Phaser ray hit radius against players
    pub const ZAP_PLAYER_DIST: f64 = 390.0;
    /// Phaser ray hit radius against plasma bolts
    pub const ZAP_PLASMA_DIST: f64 = 270.0;
    /// Fuel cost multiplier per point of torpedo damage
    pub const TORP_FUEL_MULT: i32 = 20;
    /// Weapon heat added per torpedo launch
    pub const TORP_WTEMP: i32 = 50;
    /// Weapon heat added per phaser discharge
    pub const PHASER_WTEMP: i32 = 70;
    /// Weapon heat added per plasma launch
    pub const PLASMA_WTEMP: i32 = 100;
    /// Firing is refused when weapon temp is within this margin of the cap
    pub const WTEMP_FIRE_MARGIN: i32 = 100;
}

/// Orbit entry and planet interaction
pub mod orbit {
    /// Orbit radius around a planet
    pub const ORBIT_DIST: f64 = 800.0;
    /// Maximum distance at which orbit can be entered
    pub const ENT_ORBIT_DIST: f64 = 900.0;
    /// Maximum speed at which orbit can be entered
    pub const ORBIT_SPEED: i32 = 2;
    /// Angular advance per tick while orbiting, radians
    pub const ORBIT_STEP: f64 = std::f64::consts::PI / 64.0;
    /// Hostile armed planets fire on ships within this range
    pub const PLANET_FIRE_DIST: f64 = 1500.0;
    /// Frames between planet interaction pulses (bomb/beam/planet fire)
    pub const PLANET_PULSE_FRAMES: u64 = 5;
    /// Army cap on any planet
    pub const MAX_ARMIES: i32 = 40;
    /// Frames between army growth on Agri planets
    pub const AGRI_REPOP_FRAMES: u64 = 100;
    /// Frames between army growth on ordinary planets
    pub const REPOP_FRAMES: u64 = 600;
    /// Kills-streak required before armies may be beamed up
    pub const ARMY_KILL_REQUIREMENT: f64 = 2.0;
}

/// Lock-on autopilot thresholds
pub mod lock {
    /// Distance below which a locked ship drops into orbit
    pub const CAPTURE_DIST: f64 = 3000.0;
    /// Speed below which a locked ship may drop into orbit
    pub const CAPTURE_SPEED: i32 = 4;
    /// Distance above which a locked ship runs at full throttle
    pub const FULL_THROTTLE_DIST: f64 = 5000.0;
}

/// Tractor and pressor beams
pub mod beam {
    /// Base beam range, scaled by class tractor range multiplier
    pub const TRACTOR_DIST: f64 = 6000.0;
    /// Displacement numerator, scaled by class tractor strength over mass
    pub const TRACTOR_FORCE: f64 = 20.0;
    /// Fuel drained from the source per beam tick
    pub const FUEL_COST: i32 = 20;
    /// Engine heat added to the source per beam tick
    pub const ETEMP_COST: i32 = 5;
}

/// Engine temperature and overheat
pub mod engine {
    /// Absolute engine temperature ceiling
    pub const ETEMP_CAP: i32 = 1500;
    /// Base overheat odds per tick while above the class ceiling
    pub const OVERHEAT_ODDS: u32 = 40;
    /// Overheat odds above the first escalation threshold
    pub const OVERHEAT_ODDS_HOT: u32 = 20;
    /// Overheat odds above the second escalation threshold
    pub const OVERHEAT_ODDS_CRITICAL: u32 = 8;
    /// First escalation threshold
    pub const HOT_THRESHOLD: i32 = 1200;
    /// Second escalation threshold
    pub const CRITICAL_THRESHOLD: i32 = 1400;
    /// Overheat duration lower bound, ticks
    pub const OVERHEAT_MIN_TICKS: i32 = 100;
    /// Overheat duration upper bound, ticks (exclusive)
    pub const OVERHEAT_MAX_TICKS: i32 = 250;
    /// Fuel drained per tick while cloaked
    pub const CLOAK_DRAIN: i32 = 10;
}

/// Tournament mode
pub mod tournament {
    /// Alive, connected players per team required to enter
    pub const MIN_PER_TEAM: usize = 4;
    /// Teams meeting the minimum required to enter
    pub const MIN_TEAMS: usize = 2;
    /// Tournament duration in seconds
    pub const DURATION_SECS: i64 = 1800;
    /// Remaining-time marks that trigger an announcement, seconds
    pub const ANNOUNCE_MARKS: [i64; 3] = [600, 300, 60];
}

/// Networking limits
pub mod net {
    /// Maximum concurrent WebSocket connections
    pub const MAX_CONNECTIONS: usize = 128;
    /// Maximum inbound frame size in bytes
    pub const MAX_FRAME_BYTES: usize = 4096;
    /// Inbound messages allowed per rolling second per connection
    pub const MAX_MESSAGES_PER_SEC: u32 = 50;
    /// Hub inbound channel depth
    pub const HUB_QUEUE: usize = 256;
    /// Per-client outbound channel depth
    pub const CLIENT_QUEUE: usize = 256;
    /// Read deadline; the connection dies if nothing arrives in this window
    pub const READ_DEADLINE_SECS: u64 = 60;
    /// Ping interval, kept under the read deadline
    pub const PING_INTERVAL_SECS: u64 = 54;
    /// Write deadline per outbound frame
    pub const WRITE_DEADLINE_SECS: u64 = 10;
    /// Slash commands allowed per second per client
    pub const SLASH_COMMANDS_PER_SEC: u32 = 1;
    /// Slash command burst allowance
    pub const SLASH_COMMAND_BURST: u32 = 3;
}

/// Respawn placement
pub mod spawn {
    /// Uniform scatter applied around the team home on spawn, world units
    pub const HOME_SCATTER: f64 = 5000.0;
}
