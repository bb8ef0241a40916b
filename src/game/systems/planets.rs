//! Planet interactions
//!
//! Everything a planet does to ships and ships do to planets: garrison fire,
//! bombing, army transfer, conquest, and army repopulation. Interaction
//! pulses run every [`PLANET_PULSE_FRAMES`] frames; repopulation runs on its
//! own much longer cadence.

use rand::Rng;

use crate::game::catalogue::{pflags, team};
use crate::game::constants::orbit::{
    self, AGRI_REPOP_FRAMES, MAX_ARMIES, PLANET_PULSE_FRAMES, REPOP_FRAMES,
};
use crate::game::state::{GameState, Slot, WhyDead};
use crate::game::systems::combat::{apply_damage, kill_player};
use crate::net::protocol::{MessageKind, Outbox};

/// Garrison fire strength for a planet holding `armies`
fn garrison_damage(armies: i32) -> i32 {
    armies / 10 + 2
}

fn fire_on(state: &mut GameState, victim: Slot, armies: i32, outbox: &mut Outbox) {
    let amount = garrison_damage(armies);
    let result = apply_damage(state, victim, amount, None);
    if result.lethal {
        kill_player(state, victim, None, WhyDead::Planet, outbox);
    }
}

fn bomb_pulse(state: &mut GameState, slot: Slot, planet_idx: usize, outbox: &mut Outbox) {
    let (owner, armies) = {
        let planet = &state.planets[planet_idx];
        (planet.owner, planet.armies)
    };
    let bomber_team = state.players[slot].team;

    // Only hostile garrisons can be bombed
    if owner == team::NONE || owner == bomber_team || armies == 0 {
        state.players[slot].bombing = false;
        return;
    }

    if !state.rng.gen_bool(0.5) {
        return;
    }
    let roll = state.rng.gen_range(0..100);
    let hit = if roll < 60 {
        1
    } else if roll < 80 {
        2
    } else {
        3
    };

    let planet = &mut state.planets[planet_idx];
    planet.armies = (planet.armies - hit).max(0);
    if planet.armies == 0 {
        planet.owner = team::NONE;
        let text = format!(
            "{} has been bombed into independence by {}",
            planet.name,
            team::name(bomber_team),
        );
        state.players[slot].bombing = false;
        outbox.notice(MessageKind::Info, text);
    }
}

fn beam_up_pulse(state: &mut GameState, slot: Slot, planet_idx: usize) {
    let stats = state.players[slot].ship.stats();
    let (owner, armies) = {
        let planet = &state.planets[planet_idx];
        (planet.owner, planet.armies)
    };
    let p = &state.players[slot];

    let allowed = owner == p.team
        && armies > 1
        && p.armies < stats.max_armies
        && p.kills_streak >= orbit::ARMY_KILL_REQUIREMENT;
    if !allowed {
        state.players[slot].beaming = false;
        state.players[slot].beaming_up = false;
        return;
    }

    state.planets[planet_idx].armies -= 1;
    state.players[slot].armies += 1;
}

fn beam_down_pulse(state: &mut GameState, slot: Slot, planet_idx: usize, outbox: &mut Outbox) {
    let beamer_team = state.players[slot].team;
    let owner = state.planets[planet_idx].owner;

    if state.players[slot].armies == 0 || (owner != team::NONE && owner != beamer_team) {
        state.players[slot].beaming = false;
        return;
    }

    state.players[slot].armies -= 1;
    let planet = &mut state.planets[planet_idx];
    planet.armies += 1;
    if planet.owner == team::NONE {
        planet.owner = beamer_team;
        planet.info |= beamer_team;
        let text = format!(
            "{} is now held by the {}",
            planet.name,
            team::name(beamer_team),
        );
        outbox.notice(MessageKind::Info, text);
    }
}

/// One planet-interaction pass over all Alive players, plus repopulation
pub fn update_planet_interactions(state: &mut GameState, outbox: &mut Outbox) {
    let pulse = state.frame % PLANET_PULSE_FRAMES == 0;

    if pulse {
        for slot in 0..state.players.len() {
            if !state.players[slot].is_alive() {
                continue;
            }

            match state.players[slot].orbiting {
                Some(idx) if idx < state.planets.len() => {
                    let (owner, armies) = {
                        let planet = &state.planets[idx];
                        (planet.owner, planet.armies)
                    };
                    let p_team = state.players[slot].team;

                    // Hostile garrison fires on anything in orbit
                    if owner != team::NONE && owner != p_team && armies > 0 {
                        fire_on(state, slot, armies, outbox);
                        if !state.players[slot].is_alive() {
                            continue;
                        }
                    }

                    if state.players[slot].bombing {
                        bomb_pulse(state, slot, idx, outbox);
                    }
                    if state.players[slot].beaming {
                        if state.players[slot].beaming_up {
                            beam_up_pulse(state, slot, idx);
                        } else {
                            beam_down_pulse(state, slot, idx, outbox);
                        }
                    }
                }
                _ => {
                    // Garrisons also fire on ships loitering in range
                    let pos = state.players[slot].pos;
                    let p_team = state.players[slot].team;
                    let threat = state.planets.iter().find(|planet| {
                        planet.owner != team::NONE
                            && planet.owner != p_team
                            && planet.armies > 0
                            && planet.pos.distance_to(pos) < orbit::PLANET_FIRE_DIST
                    });
                    if let Some(planet) = threat {
                        let armies = planet.armies;
                        fire_on(state, slot, armies, outbox);
                    }
                }
            }
        }
    }

    // Army growth on owned planets
    let agri_tick = state.frame % AGRI_REPOP_FRAMES == 0;
    let slow_tick = state.frame % REPOP_FRAMES == 0;
    if agri_tick || slow_tick {
        for planet in &mut state.planets {
            if planet.owner == team::NONE {
                continue;
            }
            let grows = if planet.has_flag(pflags::AGRI) {
                agri_tick
            } else {
                slow_tick
            };
            if grows {
                planet.armies = (planet.armies + 1).min(MAX_ARMIES);
            }
        }
    }
}
