//! Per-player kinematics
//!
//! Runs once per Alive player each tick, in order: turning, speed update,
//! translation with wall bounce, then orbital integration, then lock-on
//! course control. Turning runs in the byte-angle domain so progress is
//! monotone and never overshoots the desired heading.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::game::constants::{galaxy, lock as lockc, motion, orbit as orbc};
use crate::game::state::{GameState, Lock, Player, Slot};
use crate::net::protocol::{ChatLine, MessageKind, Outbox, ServerMessage};
use crate::util::angle;
use crate::util::vec2::Vec2;

/// Advance heading toward the desired heading.
///
/// Accumulates class turn rate (right-shifted by speed) into the sub-unit
/// counter; whole byte-angle units are spent along the shorter direction
/// and the remainder carries to the next tick.
fn turn(p: &mut Player) {
    let stats = p.ship.stats();
    let shift = (p.speed.max(0) as u32).min(motion::MAX_TURN_SHIFT);
    p.sub_dir += stats.turn_rate >> shift;
    let ticks = p.sub_dir / motion::FRAC_SCALE;
    p.sub_dir %= motion::FRAC_SCALE;
    if ticks <= 0 {
        return;
    }

    let cur = angle::rad_to_units(p.dir);
    let des = angle::rad_to_units(p.des_dir);
    let diff = angle::shortest_diff(cur, des);
    if diff == 0 {
        p.dir = p.des_dir;
    } else if diff.abs() <= ticks {
        p.dir = p.des_dir;
    } else {
        let step = if diff > 0 { ticks } else { -ticks };
        p.dir = angle::units_to_rad(cur + step);
    }
}

/// Step speed toward the desired speed using the class accel/decel integers
fn update_speed(p: &mut Player) {
    let stats = p.ship.stats();
    let ceiling = p.effective_max_speed();
    let des = p.des_speed.clamp(0, ceiling);

    use std::cmp::Ordering;
    match p.speed.cmp(&des) {
        Ordering::Less => {
            p.acc_frac += stats.acc_int;
            while p.acc_frac >= motion::FRAC_SCALE && p.speed < des {
                p.acc_frac -= motion::FRAC_SCALE;
                p.speed += 1;
            }
        }
        Ordering::Greater => {
            p.acc_frac += stats.dec_int;
            while p.acc_frac >= motion::FRAC_SCALE && p.speed > des {
                p.acc_frac -= motion::FRAC_SCALE;
                p.speed -= 1;
            }
        }
        Ordering::Equal => {
            p.acc_frac = 0;
        }
    }
    // Damage derating can undercut the current speed directly
    if p.speed > ceiling {
        p.speed = ceiling;
    }
}

/// Move along the heading and reflect off galaxy walls.
///
/// The desired heading is overwritten with the reflected heading so the
/// auto-turn does not immediately steer back into the wall.
fn translate(p: &mut Player) {
    if p.speed <= 0 {
        return;
    }
    let units = p.speed as f64 * motion::UNITS_PER_WARP;
    p.pos += Vec2::from_angle(p.dir) * units;

    let mut bounced = false;
    if p.pos.x < 0.0 {
        p.pos.x = 0.0;
        p.dir = PI - p.dir;
        bounced = true;
    } else if p.pos.x > galaxy::WIDTH {
        p.pos.x = galaxy::WIDTH;
        p.dir = PI - p.dir;
        bounced = true;
    }
    if p.pos.y < 0.0 {
        p.pos.y = 0.0;
        p.dir = -p.dir;
        bounced = true;
    } else if p.pos.y > galaxy::HEIGHT {
        p.pos.y = galaxy::HEIGHT;
        p.dir = -p.dir;
        bounced = true;
    }
    if bounced {
        p.dir = angle::normalize_rad(p.dir);
        p.des_dir = p.dir;
    }
}

/// Bind a ship into orbit: snap to the orbit radius along the current
/// bearing from the planet, take the tangent heading, kill translation and
/// both beams, and mark the planet as scanned by the team.
pub fn enter_orbit(state: &mut GameState, slot: Slot, planet_idx: usize) {
    let planet_pos = state.planets[planet_idx].pos;
    let p = &mut state.players[slot];
    let radial = (p.pos - planet_pos).angle();
    p.dir = angle::normalize_rad(radial + FRAC_PI_2);
    p.des_dir = p.dir;
    p.pos = planet_pos + Vec2::from_angle(radial) * orbc::ORBIT_DIST;
    p.speed = 0;
    p.des_speed = 0;
    p.orbiting = Some(planet_idx);
    p.lock = Lock::None;
    p.tractoring = None;
    p.pressoring = None;
    let team_flag = p.team;
    state.planets[planet_idx].info |= team_flag;
}

/// Rotate an orbiting ship one step around its planet
fn integrate_orbit(state: &mut GameState, slot: Slot) {
    let Some(idx) = state.players[slot].orbiting else {
        return;
    };
    // Self-repair on a stale planet index rather than indexing out of range
    if idx >= state.planets.len() {
        tracing::warn!(slot, idx, "orbiting invalid planet index, clearing");
        state.players[slot].orbiting = None;
        return;
    }
    let planet_pos = state.planets[idx].pos;
    let p = &mut state.players[slot];
    p.dir = angle::normalize_rad(p.dir + orbc::ORBIT_STEP);
    p.des_dir = p.dir;
    p.pos = planet_pos + Vec2::from_angle(p.dir - FRAC_PI_2) * orbc::ORBIT_DIST;
    p.speed = 0;
    p.des_speed = 0;
}

/// Steer a planet-locked ship: course toward the planet, throttle by
/// distance, and drop into orbit when close and slow.
fn apply_lock(state: &mut GameState, slot: Slot, outbox: &mut Outbox) {
    if state.players[slot].orbiting.is_some() {
        return;
    }
    let Lock::Planet(idx) = state.players[slot].lock else {
        return;
    };
    if idx >= state.planets.len() {
        tracing::warn!(slot, idx, "lock on invalid planet index, clearing");
        state.players[slot].lock = Lock::None;
        return;
    }

    let planet_pos = state.planets[idx].pos;
    let planet_name = state.planets[idx].name;
    let to = planet_pos - state.players[slot].pos;
    let dist = to.length();

    if dist < lockc::CAPTURE_DIST && state.players[slot].speed < lockc::CAPTURE_SPEED {
        enter_orbit(state, slot, idx);
        outbox.player(
            slot,
            ServerMessage::Message(ChatLine::notice(
                MessageKind::Info,
                format!("Entering standard orbit around {planet_name}"),
            )),
        );
        return;
    }

    let p = &mut state.players[slot];
    p.des_dir = angle::normalize_rad(to.angle());

    let max = p.effective_max_speed();
    if dist > lockc::FULL_THROTTLE_DIST {
        p.des_speed = max;
    } else if dist > lockc::CAPTURE_DIST {
        let span = lockc::FULL_THROTTLE_DIST - lockc::CAPTURE_DIST;
        let ramp = 3.0 + (max as f64 - 3.0) * (dist - lockc::CAPTURE_DIST) / span;
        p.des_speed = (ramp as i32).clamp(3, max);
    }

    // Hard turns bleed speed so the approach can actually converge
    let turn_error = angle::rad_diff(p.dir, p.des_dir);
    if turn_error > FRAC_PI_4 && p.speed > 6 {
        let frac = ((turn_error - FRAC_PI_4) / (PI - FRAC_PI_4)).min(1.0);
        p.des_speed = (6.0 - 3.0 * frac) as i32;
    }
}

/// Full per-player physics pass for one tick
pub fn update_player(state: &mut GameState, slot: Slot, outbox: &mut Outbox) {
    {
        let p = &mut state.players[slot];
        if p.orbiting.is_none() {
            turn(p);
            update_speed(p);
            translate(p);
        }
    }
    integrate_orbit(state, slot);
    apply_lock(state, slot, outbox);
}
