//! Client command handlers
//!
//! One handler per inbound message kind. Each parses an already-typed
//! payload, validates it, takes the world write lock for the shortest
//! possible span, and defers every outbound message into an [`Outbox`]
//! flushed through the hub after the lock is released. Rule rejections
//! answer the originating client; state preconditions fail silently.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::debug;

use crate::game::bots;
use crate::game::catalogue::{team, ShipClass};
use crate::game::constants::{beam as beamc, net as netc, orbit as orbc, tournament};
use crate::game::state::{GameState, Lock, PlayerStatus, Slot, WhyDead};
use crate::game::systems::{combat, physics, projectiles};
use crate::game::World;
use crate::net::hub::{ClientHandle, Hub};
use crate::net::protocol::{
    ChatLine, ClientMessage, MessageKind, Outbox, ServerMessage, Target, TeamCounts,
};
use crate::util::{angle, sanitize};

/// Everything a handler needs to touch the world and answer the client
pub struct CommandContext<'a> {
    pub world: &'a World,
    pub hub: &'a Hub,
    pub client: &'a ClientHandle,
}

impl CommandContext<'_> {
    fn error(&self, message: impl Into<String>) {
        self.hub.send(
            Target::Client(self.client.id),
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }

    /// Slot owned by this client, with the stale-handle repair path
    fn resolve(&self, state: &GameState) -> Option<Slot> {
        let slot = self.client.slot()?;
        if slot >= state.players.len()
            || state.players[slot].owner_client != Some(self.client.id)
        {
            debug!(client = %self.client.id, slot, "stale player handle, clearing");
            self.client.set_slot(None, team::NONE);
            return None;
        }
        Some(slot)
    }

    /// Slot owned by this client, only while Alive
    fn resolve_alive(&self, state: &GameState) -> Option<Slot> {
        let slot = self.resolve(state)?;
        state.players[slot].is_alive().then_some(slot)
    }
}

/// Dispatch one decoded client message
pub fn handle_message(ctx: &CommandContext, msg: ClientMessage) {
    match msg {
        ClientMessage::Login { name, team, ship } => handle_login(ctx, name, team, ship),
        ClientMessage::Quit {} => handle_quit(ctx),
        ClientMessage::Move { dir, speed } => handle_move(ctx, dir, speed),
        ClientMessage::Orbit {} => handle_orbit(ctx),
        ClientMessage::Lock { kind, target } => handle_lock(ctx, &kind, target),
        ClientMessage::Fire { dir } => handle_fire(ctx, dir),
        ClientMessage::Phaser { target, dir } => handle_phaser(ctx, target, dir),
        ClientMessage::Plasma { dir } => handle_plasma(ctx, dir),
        ClientMessage::Detonate {} => handle_detonate(ctx),
        ClientMessage::Shields { up } => handle_shields(ctx, up),
        ClientMessage::Tractor { target_id } => handle_beam_toggle(ctx, target_id, true),
        ClientMessage::Pressor { target_id } => handle_beam_toggle(ctx, target_id, false),
        ClientMessage::Cloak {} => handle_cloak(ctx),
        ClientMessage::Repair {} => handle_repair(ctx),
        ClientMessage::Beam { up } => handle_beam_armies(ctx, up),
        ClientMessage::Bomb {} => handle_bomb(ctx),
        ClientMessage::Message { text } => handle_chat(ctx, text),
        ClientMessage::TeamMsg { text } => handle_team_chat(ctx, text),
        ClientMessage::PrivMsg { text, target } => handle_priv_chat(ctx, text, target),
    }
}

fn handle_login(ctx: &CommandContext, name: String, team_raw: i64, ship_raw: i64) {
    if ctx.client.quitting.load(Ordering::Acquire) {
        ctx.error("Connection is closing");
        return;
    }
    if ctx.client.slot().is_some() {
        ctx.error("Already logged in");
        return;
    }
    let Some(flag) = u8::try_from(team_raw).ok().filter(|f| team::is_valid(*f)) else {
        ctx.error("Invalid team");
        return;
    };
    let Some(class) = ShipClass::from_index(ship_raw) else {
        ctx.error("Invalid ship class");
        return;
    };

    let mut outbox = Outbox::new();
    let assigned = {
        let mut state = ctx.world.state.write();

        // Soft balance: the fullest team is closed while any team is smaller
        let chosen = state.roster_per_team(flag);
        let largest = team::ALL
            .iter()
            .map(|&f| state.roster_per_team(f))
            .max()
            .unwrap_or(0);
        let smallest = team::ALL
            .iter()
            .map(|&f| state.roster_per_team(f))
            .min()
            .unwrap_or(0);
        if chosen == largest && smallest < chosen {
            ctx.error(format!(
                "The {} are full; join a smaller team",
                team::name(flag)
            ));
            return;
        }

        if class == ShipClass::Starbase && state.team_has_starbase(flag, None) {
            ctx.error("Your team already fields a starbase");
            return;
        }

        let Some(slot) = state.find_free_slot() else {
            ctx.error("No free player slots");
            return;
        };

        let clean_name = sanitize::sanitize_name(&name, &mut state.rng);
        let p = &mut state.players[slot];
        p.name = clean_name;
        p.team = flag;
        p.is_bot = false;
        p.connected = true;
        p.owner_client = Some(ctx.client.id);
        p.status = PlayerStatus::Outfit;
        p.reset_ship(class);
        state.place_at_home(slot);
        state.players[slot].status = PlayerStatus::Alive;
        state.teams_ever_active |= flag;
        state.galaxy_reset = false;

        outbox.client(ctx.client.id, ServerMessage::LoginSuccess { id: slot });
        outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
        slot
    };

    ctx.client.set_slot(Some(assigned), flag);
    ctx.hub.flush(outbox);
}

fn handle_quit(ctx: &CommandContext) {
    let mut outbox = Outbox::new();
    {
        let mut state = ctx.world.state.write();
        let Some(slot) = ctx.resolve(&state) else {
            return;
        };
        state.players[slot].pending_quit = true;
        match state.players[slot].status {
            PlayerStatus::Alive => state.start_explosion(slot, None, WhyDead::Quit),
            PlayerStatus::Explode => {}
            _ => state.players[slot].free(),
        }
        outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
    }
    ctx.client.quitting.store(true, Ordering::Release);
    ctx.hub.flush(outbox);

    // Let the farewell explosion play out before dropping the socket
    let kick = ctx.client.kick.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        kick.notify_waiters();
    });
}

fn handle_move(ctx: &CommandContext, dir: f64, speed: f64) {
    if !dir.is_finite() || !speed.is_finite() || speed < 0.0 {
        return;
    }
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    let p = &mut state.players[slot];
    p.des_dir = angle::normalize_rad(dir);
    p.des_speed = (speed.round() as i32).clamp(0, p.effective_max_speed());
    if p.orbiting.is_some() {
        p.orbiting = None;
        p.bombing = false;
        p.beaming = false;
        p.beaming_up = false;
    }
    p.lock = Lock::None;
    if p.des_speed > 0 {
        p.repairing = false;
        p.repair_request = false;
    }
}

fn handle_orbit(ctx: &CommandContext) {
    let mut outbox = Outbox::new();
    {
        let mut state = ctx.world.state.write();
        let Some(slot) = ctx.resolve_alive(&state) else {
            return;
        };

        if state.players[slot].orbiting.is_some() {
            let p = &mut state.players[slot];
            p.orbiting = None;
            p.bombing = false;
            p.beaming = false;
            p.beaming_up = false;
            return;
        }

        if state.players[slot].speed > orbc::ORBIT_SPEED {
            return;
        }
        let (idx, dist) = state.nearest_planet(state.players[slot].pos);
        if dist > orbc::ENT_ORBIT_DIST {
            return;
        }
        physics::enter_orbit(&mut state, slot, idx);
        outbox.player(
            slot,
            ServerMessage::Message(ChatLine::notice(
                MessageKind::Info,
                format!("Entering standard orbit around {}", state.planets[idx].name),
            )),
        );
    }
    ctx.hub.flush(outbox);
}

fn handle_lock(ctx: &CommandContext, kind: &str, target: i64) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    match kind {
        "none" => {
            state.players[slot].lock = Lock::None;
        }
        "planet" => {
            let Some(idx) = usize::try_from(target)
                .ok()
                .filter(|&i| i < state.planets.len())
            else {
                return;
            };
            if state.players[slot].orbiting.is_some() && state.players[slot].orbiting != Some(idx)
            {
                let p = &mut state.players[slot];
                p.orbiting = None;
                p.bombing = false;
                p.beaming = false;
                p.beaming_up = false;
            }
            state.players[slot].lock = Lock::Planet(idx);
        }
        _ => {}
    }
}

fn handle_fire(ctx: &CommandContext, dir: f64) {
    if !dir.is_finite() {
        return;
    }
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    projectiles::fire_torpedo(&mut state, slot, angle::normalize_rad(dir));
}

fn handle_phaser(ctx: &CommandContext, target: i64, dir: f64) {
    if !dir.is_finite() {
        return;
    }
    let mut outbox = Outbox::new();
    {
        let mut state = ctx.world.state.write();
        let Some(slot) = ctx.resolve_alive(&state) else {
            return;
        };
        let target = usize::try_from(target)
            .ok()
            .filter(|&t| t < state.players.len());
        combat::phaser_fire(
            &mut state,
            slot,
            target,
            angle::normalize_rad(dir),
            &mut outbox,
        );
    }
    ctx.hub.flush(outbox);
}

fn handle_plasma(ctx: &CommandContext, dir: f64) {
    if !dir.is_finite() {
        return;
    }
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    projectiles::fire_plasma(&mut state, slot, angle::normalize_rad(dir));
}

fn handle_detonate(ctx: &CommandContext) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    projectiles::detonate_enemy_torps(&mut state, slot);
}

fn handle_shields(ctx: &CommandContext, up: Option<bool>) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    let p = &mut state.players[slot];
    let raise = up.unwrap_or(!p.shields_up);
    p.shields_up = raise;
    if raise {
        p.repairing = false;
        p.repair_request = false;
    }
}

fn handle_beam_toggle(ctx: &CommandContext, target_raw: i64, tractor: bool) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    let Some(target) = usize::try_from(target_raw)
        .ok()
        .filter(|&t| t < state.players.len() && t != slot)
    else {
        return;
    };

    // Re-issuing against the current target releases the beam
    let current = if tractor {
        state.players[slot].tractoring
    } else {
        state.players[slot].pressoring
    };
    if current == Some(target) {
        let p = &mut state.players[slot];
        p.tractoring = None;
        p.pressoring = None;
        return;
    }

    if !state.players[target].is_alive() {
        return;
    }
    let stats = state.players[slot].ship.stats();
    let dist = state.players[slot]
        .pos
        .distance_to(state.players[target].pos);
    if dist > beamc::TRACTOR_DIST * stats.tractor_range {
        return;
    }

    let p = &mut state.players[slot];
    if tractor {
        p.tractoring = Some(target);
        p.pressoring = None;
    } else {
        p.pressoring = Some(target);
        p.tractoring = None;
    }
}

fn handle_cloak(ctx: &CommandContext) {
    let mut outbox = Outbox::new();
    {
        let mut state = ctx.world.state.write();
        let Some(slot) = ctx.resolve_alive(&state) else {
            return;
        };
        let p = &mut state.players[slot];
        p.cloaked = !p.cloaked;
        let text = if p.cloaked {
            format!("{} engages cloaking device", p.name)
        } else {
            format!("{} decloaks", p.name)
        };
        outbox.notice(MessageKind::Info, text);
    }
    ctx.hub.flush(outbox);
}

fn handle_repair(ctx: &CommandContext) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    let p = &mut state.players[slot];
    p.repair_request = true;
    p.des_speed = 0;
    p.shields_up = false;
}

fn handle_beam_armies(ctx: &CommandContext, up: bool) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    let p = &mut state.players[slot];
    if p.orbiting.is_none() {
        return;
    }
    if p.beaming && p.beaming_up == up {
        p.beaming = false;
    } else {
        p.beaming = true;
        p.beaming_up = up;
        p.bombing = false;
    }
}

fn handle_bomb(ctx: &CommandContext) {
    let mut state = ctx.world.state.write();
    let Some(slot) = ctx.resolve_alive(&state) else {
        return;
    };
    let p = &mut state.players[slot];
    if p.orbiting.is_none() {
        return;
    }
    if p.bombing {
        p.bombing = false;
    } else {
        p.bombing = true;
        p.beaming = false;
        p.beaming_up = false;
    }
}

fn handle_chat(ctx: &CommandContext, text: String) {
    if let Some(rest) = text.strip_prefix('/') {
        handle_slash_command(ctx, rest.trim());
        return;
    }
    let mut outbox = Outbox::new();
    {
        let state = ctx.world.state.read();
        let Some(slot) = ctx.resolve(&state) else {
            return;
        };
        let clean = sanitize::sanitize_chat(&text);
        if clean.is_empty() {
            return;
        }
        outbox.all(ServerMessage::Message(ChatLine::chat(
            MessageKind::Chat,
            slot,
            clean,
        )));
    }
    ctx.hub.flush(outbox);
}

fn handle_team_chat(ctx: &CommandContext, text: String) {
    let mut outbox = Outbox::new();
    {
        let state = ctx.world.state.read();
        let Some(slot) = ctx.resolve(&state) else {
            return;
        };
        let clean = sanitize::sanitize_chat(&text);
        if clean.is_empty() {
            return;
        }
        outbox.team(
            state.players[slot].team,
            ServerMessage::Message(ChatLine::chat(MessageKind::Team, slot, clean)),
        );
    }
    ctx.hub.flush(outbox);
}

fn handle_priv_chat(ctx: &CommandContext, text: String, target: i64) {
    let mut outbox = Outbox::new();
    {
        let state = ctx.world.state.read();
        let Some(slot) = ctx.resolve(&state) else {
            return;
        };
        let Some(target) = usize::try_from(target)
            .ok()
            .filter(|&t| t < state.players.len() && state.players[t].status != PlayerStatus::Free)
        else {
            return;
        };
        let clean = sanitize::sanitize_chat(&text);
        if clean.is_empty() {
            return;
        }
        let line = ServerMessage::Message(ChatLine::chat(MessageKind::Priv, slot, clean));
        outbox.player(target, line.clone());
        // Echo to the sender so their own window shows the whisper
        if target != slot {
            outbox.player(slot, line);
        }
    }
    ctx.hub.flush(outbox);
}

fn parse_ship_name(raw: &str) -> Option<ShipClass> {
    match raw.to_ascii_lowercase().as_str() {
        "scout" | "sc" => Some(ShipClass::Scout),
        "destroyer" | "dd" => Some(ShipClass::Destroyer),
        "cruiser" | "ca" => Some(ShipClass::Cruiser),
        "battleship" | "bb" => Some(ShipClass::Battleship),
        "assault" | "as" => Some(ShipClass::Assault),
        "starbase" | "sb" => Some(ShipClass::Starbase),
        _ => None,
    }
}

fn parse_team_name(raw: &str) -> Option<u8> {
    match raw.to_ascii_lowercase().as_str() {
        "fed" | "federation" => Some(team::FED),
        "rom" | "romulan" | "romulans" => Some(team::ROM),
        "kli" | "klingon" | "klingons" => Some(team::KLI),
        "ori" | "orion" | "orions" => Some(team::ORI),
        _ => None,
    }
}

const HELP_TEXT: &str = "Commands: /addbot [team], /removebot, /fillbots, /clearbots, \
                         /balance, /refit <class>, /help";

fn handle_slash_command(ctx: &CommandContext, line: &str) {
    let allowed = ctx.client.slash_limiter.lock().check(
        netc::SLASH_COMMAND_BURST,
        Duration::from_secs((netc::SLASH_COMMAND_BURST / netc::SLASH_COMMANDS_PER_SEC) as u64),
    );
    if !allowed {
        ctx.error("Too many commands; slow down");
        return;
    }

    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next();

    let mut outbox = Outbox::new();
    {
        let mut state = ctx.world.state.write();
        let Some(slot) = ctx.resolve(&state) else {
            return;
        };

        match cmd.as_str() {
            "addbot" => {
                let team_flag = arg.and_then(parse_team_name);
                match bots::add_bot(&mut state, team_flag) {
                    Some(bot) => {
                        let text = format!(
                            "{} has joined the {}",
                            state.players[bot].name,
                            team::name(state.players[bot].team)
                        );
                        outbox.notice(MessageKind::Info, text);
                        outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
                    }
                    None => outbox.client(
                        ctx.client.id,
                        ServerMessage::Error {
                            message: "No free player slots".into(),
                        },
                    ),
                }
            }
            "removebot" => {
                if bots::remove_bot(&mut state).is_some() {
                    outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
                }
            }
            "fillbots" => {
                let added = bots::fill_bots(&mut state, tournament::MIN_PER_TEAM);
                if added > 0 {
                    outbox.notice(MessageKind::Info, format!("{added} bots reported for duty"));
                    outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
                }
            }
            "clearbots" => {
                let cleared = bots::clear_bots(&mut state);
                if cleared > 0 {
                    outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
                }
            }
            "balance" => {
                let added = bots::balance_teams(&mut state);
                if added > 0 {
                    outbox.notice(MessageKind::Info, "Teams rebalanced with bots");
                    outbox.all(ServerMessage::TeamUpdate(TeamCounts::from_state(&state)));
                }
            }
            "refit" => match arg.and_then(parse_ship_name) {
                Some(class) => {
                    state.players[slot].next_ship = Some(class);
                    outbox.player(
                        slot,
                        ServerMessage::Message(ChatLine::notice(
                            MessageKind::Info,
                            format!("Refit to {} queued for your next launch", class.stats().name),
                        )),
                    );
                }
                None => outbox.client(
                    ctx.client.id,
                    ServerMessage::Error {
                        message: "Usage: /refit <scout|destroyer|cruiser|battleship|assault|starbase>"
                            .into(),
                    },
                ),
            },
            "help" => {
                outbox.player(
                    slot,
                    ServerMessage::Message(ChatLine::notice(MessageKind::Info, HELP_TEXT)),
                );
            }
            _ => outbox.client(
                ctx.client.id,
                ServerMessage::Error {
                    message: format!("Unknown command '/{cmd}'; try /help"),
                },
            ),
        }
    }
    ctx.hub.flush(outbox);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::galaxy;
    use crate::util::vec2::Vec2;
    use std::sync::Arc;

    struct Fixture {
        world: Arc<World>,
        hub: Arc<Hub>,
        _hub_rx: tokio::sync::mpsc::Receiver<(Target, ServerMessage)>,
    }

    fn fixture() -> Fixture {
        let (hub, rx) = Hub::new();
        Fixture {
            world: Arc::new(World::new(99)),
            hub,
            _hub_rx: rx,
        }
    }

    fn connect(fx: &Fixture) -> Arc<ClientHandle> {
        let (handle, _rx) = fx.hub.register(uuid::Uuid::new_v4()).unwrap();
        handle
    }

    fn login(fx: &Fixture, client: &ClientHandle, name: &str, flag: u8, ship: i64) {
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client,
        };
        handle_login(&ctx, name.into(), flag as i64, ship);
    }

    #[test]
    fn test_login_assigns_slot_and_spawns() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);

        assert_eq!(client.slot(), Some(0));
        let state = fx.world.state.read();
        let p = &state.players[0];
        assert_eq!(p.name, "Kirk");
        assert_eq!(p.team, team::FED);
        assert_eq!(p.ship, ShipClass::Cruiser);
        assert_eq!(p.status, PlayerStatus::Alive);
        assert!(!p.shields_up);
        assert_eq!(p.owner_client, Some(client.id));
    }

    #[test]
    fn test_login_rejects_second_login() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        login(&fx, &client, "Kirk2", team::ROM, 2);
        // Still in the first slot, no second slot taken
        assert_eq!(client.slot(), Some(0));
        assert_eq!(fx.world.state.read().active_slot_count(), 1);
    }

    #[test]
    fn test_login_rejects_invalid_team_and_ship() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", 3, 2); // 3 is FED|ROM, not a single team
        assert_eq!(client.slot(), None);

        let client2 = connect(&fx);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client2,
        };
        handle_login(&ctx, "Kirk".into(), team::FED as i64, 9);
        assert_eq!(client2.slot(), None);
    }

    #[test]
    fn test_login_team_balance() {
        let fx = fixture();
        let a = connect(&fx);
        login(&fx, &a, "A", team::FED, 2);
        assert!(a.slot().is_some());

        // Fed now leads 1-0; a second Fed is turned away until the others
        // catch up
        let b = connect(&fx);
        login(&fx, &b, "B", team::FED, 2);
        assert_eq!(b.slot(), None, "fullest team must reject while others are smaller");

        login(&fx, &b, "B", team::ROM, 2);
        assert!(b.slot().is_some());
    }

    #[test]
    fn test_login_starbase_cap() {
        let fx = fixture();
        let a = connect(&fx);
        login(&fx, &a, "BaseOne", team::FED, 5);
        assert!(a.slot().is_some());

        // Even out the rosters so the balance rule stays quiet
        for flag in [team::ROM, team::KLI, team::ORI] {
            let c = connect(&fx);
            login(&fx, &c, "Filler", flag, 2);
            assert!(c.slot().is_some());
        }

        let b = connect(&fx);
        login(&fx, &b, "BaseTwo", team::FED, 5);
        assert_eq!(b.slot(), None, "second starbase on one team is refused");

        // A starbase on another team is fine
        login(&fx, &b, "BaseTwo", team::ROM, 5);
        assert!(b.slot().is_some());
    }

    #[test]
    fn test_login_sanitises_name() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "<script>alert(1)</script>", team::FED, 2);
        let state = fx.world.state.read();
        assert!(state.players[0].name.starts_with("Pilot"));
    }

    #[tokio::test]
    async fn test_quit_explodes_and_blocks_relogin() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_quit(&ctx);

        {
            let state = fx.world.state.read();
            assert_eq!(state.players[0].status, PlayerStatus::Explode);
            assert_eq!(state.players[0].why_dead, WhyDead::Quit);
        }
        assert!(client.quitting.load(Ordering::Acquire));

        // Login after quit is refused even though the handle cleared
        client.set_slot(None, team::NONE);
        handle_login(&ctx, "Kirk".into(), team::FED as i64, 2);
        assert_eq!(client.slot(), None);
    }

    #[test]
    fn test_move_sets_course_and_breaks_orbit() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        {
            let mut state = fx.world.state.write();
            physics::enter_orbit(&mut state, 0, 0);
            state.players[0].bombing = true;
            state.players[0].repairing = true;
        }
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_move(&ctx, 1.5, 6.0);

        let state = fx.world.state.read();
        let p = &state.players[0];
        assert!((p.des_dir - 1.5).abs() < 1e-9);
        assert_eq!(p.des_speed, 6);
        assert_eq!(p.orbiting, None);
        assert!(!p.bombing);
        assert!(!p.repairing);
        assert_eq!(p.lock, Lock::None);
    }

    #[test]
    fn test_move_clamps_to_damage_derated_max() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        {
            let mut state = fx.world.state.write();
            state.players[0].damage = ShipClass::Cruiser.stats().max_damage - 1;
        }
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_move(&ctx, 0.0, 9.0);
        assert_eq!(
            fx.world.state.read().players[0].des_speed,
            fx.world.state.read().players[0].effective_max_speed()
        );
    }

    #[test]
    fn test_move_rejects_non_finite() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_move(&ctx, f64::NAN, 4.0);
        handle_move(&ctx, 0.0, f64::INFINITY);
        let state = fx.world.state.read();
        assert_eq!(state.players[0].des_speed, 0);
    }

    #[test]
    fn test_orbit_toggle_boundaries() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };

        // Exactly at the entry distance and speed: allowed
        {
            let mut state = fx.world.state.write();
            let planet_pos = state.planets[4].pos;
            state.players[0].pos = planet_pos + Vec2::new(orbc::ENT_ORBIT_DIST, 0.0);
            state.players[0].speed = orbc::ORBIT_SPEED;
        }
        handle_orbit(&ctx);
        assert_eq!(fx.world.state.read().players[0].orbiting, Some(4));

        // Toggle back out
        handle_orbit(&ctx);
        assert_eq!(fx.world.state.read().players[0].orbiting, None);

        // One unit out of range: refused
        {
            let mut state = fx.world.state.write();
            let planet_pos = state.planets[4].pos;
            state.players[0].pos = planet_pos + Vec2::new(orbc::ENT_ORBIT_DIST + 1.0, 0.0);
            state.players[0].speed = 0;
        }
        handle_orbit(&ctx);
        assert_eq!(fx.world.state.read().players[0].orbiting, None);

        // Too fast: refused
        {
            let mut state = fx.world.state.write();
            let planet_pos = state.planets[4].pos;
            state.players[0].pos = planet_pos + Vec2::new(100.0, 0.0);
            state.players[0].speed = orbc::ORBIT_SPEED + 1;
        }
        handle_orbit(&ctx);
        assert_eq!(fx.world.state.read().players[0].orbiting, None);
    }

    #[test]
    fn test_lock_none_clears() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_lock(&ctx, "planet", 7);
        assert_eq!(fx.world.state.read().players[0].lock, Lock::Planet(7));
        handle_lock(&ctx, "none", -1);
        assert_eq!(fx.world.state.read().players[0].lock, Lock::None);
    }

    #[test]
    fn test_lock_breaks_other_orbit() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        {
            let mut state = fx.world.state.write();
            physics::enter_orbit(&mut state, 0, 3);
        }
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_lock(&ctx, "planet", 8);
        let state = fx.world.state.read();
        assert_eq!(state.players[0].orbiting, None);
        assert_eq!(state.players[0].lock, Lock::Planet(8));
    }

    #[test]
    fn test_shields_toggle_idempotence() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        let initial = fx.world.state.read().players[0].shields_up;
        handle_shields(&ctx, None);
        handle_shields(&ctx, None);
        assert_eq!(fx.world.state.read().players[0].shields_up, initial);

        handle_shields(&ctx, Some(true));
        assert!(fx.world.state.read().players[0].shields_up);
    }

    #[test]
    fn test_cloak_toggle_idempotence() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_cloak(&ctx);
        assert!(fx.world.state.read().players[0].cloaked);
        handle_cloak(&ctx);
        assert!(!fx.world.state.read().players[0].cloaked);
    }

    #[test]
    fn test_shields_up_cancels_repair() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        {
            let mut state = fx.world.state.write();
            state.players[0].repairing = true;
        }
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_shields(&ctx, Some(true));
        assert!(!fx.world.state.read().players[0].repairing);
    }

    #[test]
    fn test_tractor_engages_and_excludes_pressor() {
        let fx = fixture();
        let a = connect(&fx);
        login(&fx, &a, "A", team::FED, 2);
        let b = connect(&fx);
        login(&fx, &b, "B", team::ROM, 2);
        {
            let mut state = fx.world.state.write();
            state.players[0].pos = Vec2::new(50_000.0, 50_000.0);
            state.players[1].pos = Vec2::new(52_000.0, 50_000.0);
            state.players[0].pressoring = Some(1);
        }
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &a,
        };
        handle_beam_toggle(&ctx, 1, true);
        {
            let state = fx.world.state.read();
            assert_eq!(state.players[0].tractoring, Some(1));
            assert_eq!(state.players[0].pressoring, None);
        }

        // Re-issue releases
        handle_beam_toggle(&ctx, 1, true);
        assert_eq!(fx.world.state.read().players[0].tractoring, None);
    }

    #[test]
    fn test_tractor_range_and_self_checks() {
        let fx = fixture();
        let a = connect(&fx);
        login(&fx, &a, "A", team::FED, 2);
        let b = connect(&fx);
        login(&fx, &b, "B", team::ROM, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &a,
        };

        handle_beam_toggle(&ctx, 0, true);
        assert_eq!(fx.world.state.read().players[0].tractoring, None);

        {
            let mut state = fx.world.state.write();
            state.players[0].pos = Vec2::new(10_000.0, 10_000.0);
            state.players[1].pos = Vec2::new(90_000.0, 90_000.0);
        }
        handle_beam_toggle(&ctx, 1, true);
        assert_eq!(fx.world.state.read().players[0].tractoring, None);
    }

    #[test]
    fn test_bomb_and_beam_require_orbit() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_bomb(&ctx);
        handle_beam_armies(&ctx, true);
        {
            let state = fx.world.state.read();
            assert!(!state.players[0].bombing);
            assert!(!state.players[0].beaming);
        }

        {
            let mut state = fx.world.state.write();
            physics::enter_orbit(&mut state, 0, 0);
        }
        handle_bomb(&ctx);
        assert!(fx.world.state.read().players[0].bombing);

        // Beaming replaces bombing
        handle_beam_armies(&ctx, false);
        {
            let state = fx.world.state.read();
            assert!(!state.players[0].bombing);
            assert!(state.players[0].beaming);
            assert!(!state.players[0].beaming_up);
        }
    }

    #[test]
    fn test_refit_slash_command_queues_next_ship() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_slash_command(&ctx, "refit battleship");
        assert_eq!(
            fx.world.state.read().players[0].next_ship,
            Some(ShipClass::Battleship)
        );
    }

    #[test]
    fn test_addbot_and_clearbots() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_slash_command(&ctx, "addbot kli");
        assert_eq!(bots::bot_count(&fx.world.state.read()), 1);
        handle_slash_command(&ctx, "clearbots");
        assert_eq!(bots::bot_count(&fx.world.state.read()), 0);
    }

    #[test]
    fn test_slash_commands_rate_limited() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        for _ in 0..netc::SLASH_COMMAND_BURST {
            handle_slash_command(&ctx, "help");
        }
        // The burst is spent; this one is refused before touching the world
        handle_slash_command(&ctx, "addbot");
        assert_eq!(bots::bot_count(&fx.world.state.read()), 0);
    }

    #[test]
    fn test_move_speed_zero_while_orbiting_keeps_position() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        {
            let mut state = fx.world.state.write();
            physics::enter_orbit(&mut state, 0, 0);
        }
        let pos_before = fx.world.state.read().players[0].pos;
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_move(&ctx, 0.0, 0.0);
        let state = fx.world.state.read();
        assert_eq!(state.players[0].pos, pos_before);
        assert_eq!(state.players[0].speed, 0);
    }

    #[test]
    fn test_fire_command_launches() {
        let fx = fixture();
        let client = connect(&fx);
        login(&fx, &client, "Kirk", team::FED, 2);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_fire(&ctx, 0.5);
        let state = fx.world.state.read();
        assert_eq!(state.torps.len(), 1);
        assert_eq!(state.players[0].num_torps, 1);
        assert!(state.players[0].pos.x < galaxy::WIDTH);
    }

    #[test]
    fn test_commands_ignored_when_not_logged_in() {
        let fx = fixture();
        let client = connect(&fx);
        let ctx = CommandContext {
            world: &fx.world,
            hub: &fx.hub,
            client: &client,
        };
        handle_move(&ctx, 1.0, 5.0);
        handle_fire(&ctx, 0.0);
        handle_bomb(&ctx);
        let state = fx.world.state.read();
        assert_eq!(state.active_slot_count(), 0);
        assert!(state.torps.is_empty());
    }
}
