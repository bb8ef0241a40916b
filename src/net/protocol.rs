//! Wire protocol message definitions
//!
//! JSON text frames in a `{"type": ..., "data": ...}` envelope, both
//! directions. Inbound payloads are validated by the command handlers; the
//! outbound snapshot is the authoritative view that heals any dropped
//! best-effort message.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::game::state::{
    AlertLevel, GameState, Planet, PlayerStatus, Projectile, ProjectileStatus, Slot, WhyDead,
    WinType,
};

/// Messages from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    Login {
        name: String,
        team: i64,
        ship: i64,
    },
    Move {
        dir: f64,
        speed: f64,
    },
    /// Torpedo launch along `dir`
    Fire {
        dir: f64,
    },
    Phaser {
        /// Target slot, -1 for none
        #[serde(default = "minus_one")]
        target: i64,
        #[serde(default)]
        dir: f64,
    },
    Shields {
        /// Explicit state; omitted means toggle
        #[serde(default)]
        up: Option<bool>,
    },
    Orbit {},
    Repair {},
    Lock {
        #[serde(rename = "type")]
        kind: String,
        target: i64,
    },
    Beam {
        up: bool,
    },
    Bomb {},
    Tractor {
        #[serde(rename = "targetId")]
        target_id: i64,
    },
    Pressor {
        #[serde(rename = "targetId")]
        target_id: i64,
    },
    Plasma {
        dir: f64,
    },
    Detonate {},
    Cloak {},
    Message {
        text: String,
    },
    TeamMsg {
        text: String,
    },
    PrivMsg {
        text: String,
        target: i64,
    },
    Quit {},
}

fn minus_one() -> i64 {
    -1
}

/// Broadcast text classification, used by clients for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Chat,
    Team,
    Priv,
    Info,
    Warning,
    Kill,
    Victory,
}

/// A chat or server-notice line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLine {
    pub text: String,
    pub kind: MessageKind,
    /// Sending slot for chat kinds, absent for server notices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Slot>,
}

impl ChatLine {
    pub fn notice(kind: MessageKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            from: None,
        }
    }

    pub fn chat(kind: MessageKind, from: Slot, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
            from: Some(from),
        }
    }
}

/// Phaser discharge visual
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaserVisual {
    pub from: Slot,
    /// Hit slot, -1 for a clean miss or a plasma intercept
    pub to: i64,
    pub dir: f64,
    pub range: f64,
}

/// Connected roster sizes per team
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TeamRoster {
    pub fed: usize,
    pub rom: usize,
    pub kli: usize,
    pub ori: usize,
}

/// Payload of `team_update` and of the HTTP team-stats endpoint
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TeamCounts {
    pub total: usize,
    pub teams: TeamRoster,
}

impl TeamCounts {
    pub fn from_state(state: &GameState) -> Self {
        use crate::game::catalogue::team;
        let teams = TeamRoster {
            fed: state.roster_per_team(team::FED),
            rom: state.roster_per_team(team::ROM),
            kli: state.roster_per_team(team::KLI),
            ori: state.roster_per_team(team::ORI),
        };
        Self {
            total: teams.fed + teams.rom + teams.kli + teams.ori,
            teams,
        }
    }
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Per-tick world snapshot
    Update(Snapshot),
    Message(ChatLine),
    Phaser(PhaserVisual),
    #[serde(rename = "login_success")]
    LoginSuccess { id: Slot },
    Error { message: String },
    #[serde(rename = "team_update")]
    TeamUpdate(TeamCounts),
}

/// Delivery address for an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Team(u8),
    Player(Slot),
    Client(Uuid),
}

/// Deferred outbound messages collected while the world lock is held and
/// flushed to the hub after it is released. Most ticks defer only a
/// handful of messages, so the buffer lives inline.
#[derive(Debug, Default)]
pub struct Outbox {
    pub queue: SmallVec<[(Target, ServerMessage); 4]>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&mut self, msg: ServerMessage) {
        self.queue.push((Target::All, msg));
    }

    pub fn team(&mut self, flag: u8, msg: ServerMessage) {
        self.queue.push((Target::Team(flag), msg));
    }

    pub fn player(&mut self, slot: Slot, msg: ServerMessage) {
        self.queue.push((Target::Player(slot), msg));
    }

    pub fn client(&mut self, id: Uuid, msg: ServerMessage) {
        self.queue.push((Target::Client(id), msg));
    }

    /// Broadcast a server notice to everyone
    pub fn notice(&mut self, kind: MessageKind, text: impl Into<String>) {
        self.all(ServerMessage::Message(ChatLine::notice(kind, text)));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Per-player snapshot entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: Slot,
    pub name: String,
    pub team: u8,
    pub ship: u8,
    pub status: PlayerStatus,
    pub x: f64,
    pub y: f64,
    pub dir: f64,
    pub speed: i32,
    pub shields: i32,
    pub damage: i32,
    pub fuel: i32,
    pub wtemp: i32,
    pub etemp: i32,
    pub armies: i32,
    pub shields_up: bool,
    pub cloaked: bool,
    pub repairing: bool,
    pub bombing: bool,
    pub beaming: bool,
    pub orbiting: i64,
    pub tractoring: i64,
    pub pressoring: i64,
    pub alert: AlertLevel,
    pub kills: f64,
    pub deaths: u32,
    pub why_dead: WhyDead,
    pub is_bot: bool,
}

/// Per-planet snapshot entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetSnapshot {
    pub id: usize,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub owner: u8,
    pub armies: i32,
    pub flags: u8,
    pub info: u8,
}

impl PlanetSnapshot {
    fn from_planet(p: &Planet) -> Self {
        Self {
            id: p.id,
            name: p.name.to_string(),
            x: p.pos.x,
            y: p.pos.y,
            owner: p.owner,
            armies: p.armies,
            flags: p.flags,
            info: p.info,
        }
    }
}

/// Torpedo or plasma snapshot entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub owner: Slot,
    pub team: u8,
    pub x: f64,
    pub y: f64,
    pub dir: f64,
    pub status: u8,
}

impl ProjectileSnapshot {
    fn from_projectile(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner: p.owner,
            team: p.team,
            x: p.pos.x,
            y: p.pos.y,
            dir: p.dir,
            status: match p.status {
                ProjectileStatus::Moving => 1,
                ProjectileStatus::Exploding => 3,
            },
        }
    }
}

/// Full world snapshot, broadcast every tick
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub frame: u64,
    pub players: Vec<PlayerSnapshot>,
    pub planets: Vec<PlanetSnapshot>,
    pub torps: Vec<ProjectileSnapshot>,
    pub plasmas: Vec<ProjectileSnapshot>,
    pub game_over: bool,
    pub winner: u8,
    pub win_type: WinType,
    pub t_mode: bool,
    pub t_remain: i64,
}

impl Snapshot {
    pub fn from_state(state: &GameState) -> Self {
        Self {
            frame: state.frame,
            players: state
                .players
                .iter()
                .filter(|p| p.status != PlayerStatus::Free)
                .map(|p| PlayerSnapshot {
                    id: p.id,
                    name: p.name.clone(),
                    team: p.team,
                    ship: p.ship as u8,
                    status: p.status,
                    x: p.pos.x,
                    y: p.pos.y,
                    dir: p.dir,
                    speed: p.speed,
                    shields: p.shields,
                    damage: p.damage,
                    fuel: p.fuel,
                    wtemp: p.wtemp,
                    etemp: p.etemp,
                    armies: p.armies,
                    shields_up: p.shields_up,
                    cloaked: p.cloaked,
                    repairing: p.repairing,
                    bombing: p.bombing,
                    beaming: p.beaming,
                    orbiting: p.orbiting.map_or(-1, |i| i as i64),
                    tractoring: p.tractoring.map_or(-1, |i| i as i64),
                    pressoring: p.pressoring.map_or(-1, |i| i as i64),
                    alert: p.alert,
                    kills: p.kills,
                    deaths: p.deaths,
                    why_dead: p.why_dead,
                    is_bot: p.is_bot,
                })
                .collect(),
            planets: state.planets.iter().map(PlanetSnapshot::from_planet).collect(),
            torps: state
                .torps
                .iter()
                .map(ProjectileSnapshot::from_projectile)
                .collect(),
            plasmas: state
                .plasmas
                .iter()
                .map(ProjectileSnapshot::from_projectile)
                .collect(),
            game_over: state.game_over,
            winner: state.winner,
            win_type: state.win_type,
            t_mode: state.t_mode,
            t_remain: state.t_remain,
        }
    }
}
