//! Tractor and pressor beam physics
//!
//! A live beam displaces both ends every tick: tractors pull the pair
//! together, pressors push them apart, each end moving by the beam strength
//! over its own hull mass. Beams cost fuel and engine heat and break on
//! range, death, dry tanks, overheat, or the source entering orbit.

use crate::game::constants::{beam, engine};
use crate::game::state::{GameState, Slot};
use crate::util::vec2::Vec2;

/// Which way a beam displaces its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BeamKind {
    Tractor,
    Pressor,
}

fn clear_beam(state: &mut GameState, source: Slot) {
    let p = &mut state.players[source];
    p.tractoring = None;
    p.pressoring = None;
}

fn run_beam(state: &mut GameState, source: Slot, target: Slot, kind: BeamKind) {
    let src_stats = state.players[source].ship.stats();

    // Overheated engines cannot hold a beam; neither can a docked ship
    if state.players[source].engine_overheat || state.players[source].orbiting.is_some() {
        clear_beam(state, source);
        return;
    }
    if target >= state.players.len() || !state.players[target].is_alive() {
        clear_beam(state, source);
        return;
    }

    let src_pos = state.players[source].pos;
    let tgt_pos = state.players[target].pos;
    let dist = src_pos.distance_to(tgt_pos);
    if dist > beam::TRACTOR_DIST * src_stats.tractor_range {
        clear_beam(state, source);
        return;
    }

    if state.players[source].fuel < beam::FUEL_COST {
        clear_beam(state, source);
        return;
    }
    {
        let p = &mut state.players[source];
        p.fuel -= beam::FUEL_COST;
        p.etemp = (p.etemp + beam::ETEMP_COST).min(engine::ETEMP_CAP);
    }

    // A beamed ship cannot hold orbit or keep working a planet
    if state.players[target].orbiting.is_some() {
        let t = &mut state.players[target];
        t.orbiting = None;
        t.bombing = false;
        t.beaming = false;
        t.beaming_up = false;
    }

    let theta = (tgt_pos - src_pos).angle();
    let pull = Vec2::from_angle(theta);
    let tgt_mass = state.players[target].ship.stats().mass;
    let src_step = beam::TRACTOR_FORCE * src_stats.tractor_str / src_stats.mass;
    let tgt_step = beam::TRACTOR_FORCE * src_stats.tractor_str / tgt_mass;

    match kind {
        BeamKind::Tractor => {
            state.players[source].pos += pull * src_step;
            state.players[target].pos += -pull * tgt_step;
        }
        BeamKind::Pressor => {
            state.players[source].pos += -pull * src_step;
            state.players[target].pos += pull * tgt_step;
        }
    }
}

/// One beam pass over all Alive players
pub fn update_beams(state: &mut GameState) {
    for slot in 0..state.players.len() {
        if !state.players[slot].is_alive() {
            continue;
        }
        if let Some(target) = state.players[slot].tractoring {
            run_beam(state, slot, target, BeamKind::Tractor);
        } else if let Some(target) = state.players[slot].pressoring {
            run_beam(state, slot, target, BeamKind::Pressor);
        }
    }
}
