//! Tournament mode and victory resolution
//!
//! Tournament mode arms when enough players are flying on enough teams; it
//! resets the galaxy, runs a thirty-minute clock with countdown
//! announcements, and ends in a timeout victory for whichever teams hold
//! the most planets. Genocide and conquest victories can end a round at any
//! time. A declared victory freezes the checks until the deferred galaxy
//! reset runs.

use crate::game::catalogue::team;
use crate::game::constants::{galaxy, timing, tournament};
use crate::game::state::{GameState, PlayerStatus, WinType};
use crate::net::protocol::{MessageKind, Outbox};

/// Teams currently fielding a tournament-sized squad
fn qualified_teams(state: &GameState) -> usize {
    team::ALL
        .iter()
        .filter(|&&flag| state.playing_per_team(flag) >= tournament::MIN_PER_TEAM)
        .count()
}

fn remaining_secs(state: &GameState, frame: u64) -> i64 {
    let elapsed = frame.saturating_sub(state.t_start) / timing::TICK_RATE as u64;
    tournament::DURATION_SECS - elapsed as i64
}

/// Reset every Alive, connected player to fresh class maxima at home
fn reset_combatants(state: &mut GameState) {
    for slot in 0..state.players.len() {
        let p = &state.players[slot];
        if p.is_alive() && p.connected {
            let class = p.ship;
            state.players[slot].reset_ship(class);
            state.place_at_home(slot);
            state.players[slot].shields_up = false;
        }
    }
}

fn enter_tournament(state: &mut GameState, outbox: &mut Outbox) {
    outbox.notice(
        MessageKind::Warning,
        "Tournament mode: galaxy reset imminent",
    );

    state.t_mode = true;
    state.t_start = state.frame;
    state.t_remain = tournament::DURATION_SECS;
    state.reset_planets();
    state.clear_projectiles();
    reset_combatants(state);

    state.tournament_stats.clear();
    for p in &state.players {
        if p.is_alive() && p.connected {
            state.tournament_stats.entry(p.id).or_default();
        }
    }

    outbox.notice(
        MessageKind::Info,
        format!(
            "Tournament mode has begun: {} minutes on the clock",
            tournament::DURATION_SECS / 60
        ),
    );
}

fn declare_victory(state: &mut GameState, winner: u8, win_type: WinType, outbox: &mut Outbox) {
    state.game_over = true;
    state.winner = winner;
    state.win_type = win_type;
    let how = match win_type {
        WinType::Genocide => "by genocide",
        WinType::Conquest => "by conquest",
        WinType::Timeout => "on time",
        WinType::None => "",
    };
    outbox.notice(
        MessageKind::Victory,
        format!("{} have won the galaxy {}", team::names(winner), how),
    );
}

/// Tournament entry, exit, clock, and timeout victory. Runs every tick.
pub fn check_tournament(state: &mut GameState, outbox: &mut Outbox) {
    let qualified = qualified_teams(state);

    if !state.t_mode {
        if qualified >= tournament::MIN_TEAMS {
            enter_tournament(state, outbox);
        }
        return;
    }

    if qualified < tournament::MIN_TEAMS {
        state.t_mode = false;
        outbox.notice(MessageKind::Info, "Tournament mode has ended");
        return;
    }

    let prev_remain = remaining_secs(state, state.frame.saturating_sub(1));
    state.t_remain = remaining_secs(state, state.frame);

    if prev_remain != state.t_remain {
        for mark in tournament::ANNOUNCE_MARKS {
            if state.t_remain == mark {
                outbox.notice(
                    MessageKind::Warning,
                    format!("Tournament: {} minutes remaining", mark / 60),
                );
            }
        }
    }

    if state.t_remain <= 0 && !state.game_over {
        let best = team::ALL
            .iter()
            .map(|&flag| state.planets_per_team(flag))
            .max()
            .unwrap_or(0);
        let winner = team::ALL
            .iter()
            .filter(|&&flag| state.planets_per_team(flag) == best)
            .fold(team::NONE, |mask, &flag| mask | flag);
        declare_victory(state, winner, WinType::Timeout, outbox);
    }
}

/// Genocide and conquest checks. Runs every tick after the tournament check.
pub fn check_victory(state: &mut GameState, outbox: &mut Outbox) {
    if state.game_over {
        return;
    }

    let ever_active = team::ALL
        .iter()
        .filter(|&&flag| state.teams_ever_active & flag != 0)
        .count();
    let total_alive: usize = team::ALL
        .iter()
        .map(|&flag| state.alive_per_team(flag))
        .sum();
    let teams_with_alive: Vec<u8> = team::ALL
        .iter()
        .copied()
        .filter(|&flag| state.alive_per_team(flag) > 0)
        .collect();

    if ever_active >= 2 && state.frame > 100 && total_alive >= 2 && teams_with_alive.len() == 1 {
        declare_victory(state, teams_with_alive[0], WinType::Genocide, outbox);
        return;
    }

    for flag in team::ALL {
        if state.planets_per_team(flag) == galaxy::MAX_PLANETS {
            declare_victory(state, flag, WinType::Conquest, outbox);
            return;
        }
    }
}

/// The deferred reset that follows a declared victory: fresh galaxy, bot
/// slots freed, connected humans re-outfitted at home.
pub fn post_victory_reset(state: &mut GameState, outbox: &mut Outbox) {
    state.reset_planets();
    state.clear_projectiles();
    crate::game::bots::clear_bots(state);

    state.t_mode = false;
    state.t_start = 0;
    state.t_remain = 0;
    state.tournament_stats.clear();
    state.game_over = false;
    state.winner = team::NONE;
    state.win_type = WinType::None;
    state.teams_ever_active = 0;

    for slot in 0..state.players.len() {
        let p = &state.players[slot];
        if p.connected && p.status != PlayerStatus::Free {
            let class = p.ship;
            let flag = p.team;
            state.players[slot].reset_ship(class);
            state.place_at_home(slot);
            state.players[slot].status = PlayerStatus::Alive;
            state.teams_ever_active |= flag;
        }
    }

    outbox.notice(MessageKind::Info, "The galaxy has been reset");
}
