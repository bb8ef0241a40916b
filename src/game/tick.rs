//! The simulation kernel
//!
//! [`tick`] advances the world by one frame. It runs synchronously under the
//! world write lock and never fails; everything it wants to tell clients is
//! collected into an [`Outbox`] the caller flushes after releasing the lock.
//!
//! Pipeline order is fixed: status sweep, ship systems, planet interactions,
//! projectiles, beams, alert levels, per-player physics, the bot hook, then
//! tournament and victory checks.

use crate::game::bots::BotScheduler;
use crate::game::catalogue::{team, ShipClass};
use crate::game::constants::{galaxy, timing};
use crate::game::spatial::PlayerGrid;
use crate::game::state::{AlertLevel, GameState, PlayerStatus, Slot, WhyDead, WinType};
use crate::game::systems::{beams, combat, planets, physics, ship};
use crate::game::tournament;
use crate::net::protocol::{ChatLine, MessageKind, Outbox, ServerMessage};

/// What one kernel invocation produced
pub struct TickOutput {
    /// Deferred messages; deliver after the write lock is released
    pub outbox: Outbox,
    /// A victory was declared this frame; schedule the galaxy reset
    pub victory_declared: bool,
}

/// Spawn a Dead player back into the world.
///
/// The pending refit is honoured unless it would give the team a second
/// starbase, in which case it is dropped and the current hull kept.
pub fn respawn_player(state: &mut GameState, slot: Slot) {
    let mut class = state.players[slot].ship;
    if let Some(next) = state.players[slot].next_ship.take() {
        let flag = state.players[slot].team;
        let blocked =
            next == ShipClass::Starbase && state.team_has_starbase(flag, Some(slot));
        if !blocked {
            class = next;
        }
    }

    state.players[slot].reset_ship(class);
    state.place_at_home(slot);
    let p = &mut state.players[slot];
    p.status = PlayerStatus::Alive;
    p.why_dead = WhyDead::None;
    p.killed_by = None;
    p.respawn_msg_sent = false;
}

/// Explode countdowns and Dead-slot respawns
fn status_sweep(state: &mut GameState, outbox: &mut Outbox) {
    for slot in 0..state.players.len() {
        match state.players[slot].status {
            PlayerStatus::Explode => {
                let p = &state.players[slot];
                // Area damage lands once, on the first frame; quitters just
                // vanish without taking the neighbourhood with them
                if p.explode_timer == timing::EXPLODE_TIMER_FRAMES && p.why_dead != WhyDead::Quit
                {
                    combat::ship_explosion(state, slot, outbox);
                }
                let p = &mut state.players[slot];
                p.explode_timer -= 1;
                if p.explode_timer <= 0 {
                    if p.why_dead == WhyDead::Quit {
                        p.free();
                    } else {
                        p.status = PlayerStatus::Dead;
                        p.num_torps = 0;
                        p.num_plasma = 0;
                    }
                }
            }
            PlayerStatus::Dead if state.players[slot].connected => {
                if state.t_mode {
                    let flag = state.players[slot].team;
                    let owned = state.planets_per_team(flag);
                    if owned == 0 {
                        if !state.players[slot].respawn_msg_sent {
                            state.players[slot].respawn_msg_sent = true;
                            outbox.player(
                                slot,
                                ServerMessage::Error {
                                    message: "Your team holds no planets; you cannot respawn"
                                        .into(),
                                },
                            );
                        }
                        continue;
                    }
                    if state.players[slot].respawn_msg_sent {
                        state.players[slot].respawn_msg_sent = false;
                        outbox.player(
                            slot,
                            ServerMessage::Message(ChatLine::notice(
                                MessageKind::Info,
                                "Your team holds a planet again; respawn enabled",
                            )),
                        );
                        continue;
                    }
                }
                respawn_player(state, slot);
            }
            _ => {}
        }
    }
}

/// Classify each Alive player by the nearest hostile ship
fn update_alerts(state: &mut GameState) {
    let positions: Vec<(Slot, crate::util::vec2::Vec2, u8)> = state
        .players
        .iter()
        .filter(|p| p.is_alive())
        .map(|p| (p.id, p.pos, p.team))
        .collect();

    for &(slot, pos, flag) in &positions {
        let nearest = positions
            .iter()
            .filter(|&&(other, _, other_flag)| other != slot && other_flag != flag)
            .map(|&(_, other_pos, _)| other_pos.distance_to(pos))
            .fold(f64::MAX, f64::min);

        state.players[slot].alert = if nearest < galaxy::RED_RANGE {
            AlertLevel::Red
        } else if nearest < galaxy::YELLOW_RANGE {
            AlertLevel::Yellow
        } else {
            AlertLevel::Green
        };
    }
}

/// When the last human leaves, the bots leave too; when the last slot
/// empties, the galaxy is rebuilt from the catalogue exactly once.
fn sweep_empty_galaxy(state: &mut GameState) {
    if state.connected_human_count() == 0 {
        for slot in 0..state.players.len() {
            if state.players[slot].is_bot && state.players[slot].status != PlayerStatus::Free {
                state.players[slot].free();
            }
        }
    }

    if state.active_slot_count() == 0 {
        if !state.galaxy_reset {
            tracing::info!("galaxy empty, re-initialising");
            state.reset_planets();
            state.clear_projectiles();
            state.t_mode = false;
            state.t_start = 0;
            state.t_remain = 0;
            state.tournament_stats.clear();
            state.game_over = false;
            state.winner = team::NONE;
            state.win_type = WinType::None;
            state.teams_ever_active = 0;
            state.galaxy_reset = true;
        }
    } else {
        state.galaxy_reset = false;
        for p in &state.players {
            if p.status != PlayerStatus::Free {
                state.teams_ever_active |= p.team;
            }
        }
    }
}

/// Advance the world one frame
pub fn tick(state: &mut GameState, grid: &mut PlayerGrid, bots: &mut BotScheduler) -> TickOutput {
    let mut outbox = Outbox::new();

    state.frame += 1;
    state.tick_count += 1;

    sweep_empty_galaxy(state);
    status_sweep(state, &mut outbox);

    for slot in 0..state.players.len() {
        if state.players[slot].is_alive() {
            ship::update_ship_systems(state, slot);
        }
    }

    planets::update_planet_interactions(state, &mut outbox);
    crate::game::systems::projectiles::update_projectiles(state, grid, &mut outbox);
    beams::update_beams(state);
    update_alerts(state);

    for slot in 0..state.players.len() {
        if state.players[slot].is_alive() {
            physics::update_player(state, slot, &mut outbox);
        }
    }

    bots.run(state, &mut outbox);

    let was_over = state.game_over;
    tournament::check_tournament(state, &mut outbox);
    tournament::check_victory(state, &mut outbox);

    TickOutput {
        outbox,
        victory_declared: state.game_over && !was_over,
    }
}
