//! Damage routing, kills, phasers, and hull explosions
//!
//! All damage flows through [`apply_damage`], which routes through raised
//! shields and credits tournament tallies. Lethal damage ends in
//! [`kill_player`], the single place that hands out kill credit.

use crate::game::catalogue::team;
use crate::game::constants::combat;
use crate::game::state::{GameState, PlayerStatus, ProjectileStatus, Slot, WhyDead};
use crate::net::protocol::{ChatLine, MessageKind, Outbox, PhaserVisual, ServerMessage};

/// Fuel paid per point of class phaser damage
pub const PHASER_FUEL_MULT: i32 = 10;

/// Outcome of one damage application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageResult {
    /// Points that got past nothing (raw amount requested)
    pub dealt: i32,
    /// Victim crossed the hull ceiling
    pub lethal: bool,
}

/// Apply `amount` damage to `victim`, routed through raised shields.
///
/// Does not kill; the caller decides the death cause and calls
/// [`kill_player`] when `lethal` comes back true.
pub fn apply_damage(
    state: &mut GameState,
    victim: Slot,
    amount: i32,
    attacker: Option<Slot>,
) -> DamageResult {
    if amount <= 0 || !state.players[victim].is_alive() {
        return DamageResult {
            dealt: 0,
            lethal: false,
        };
    }

    let max_damage = state.players[victim].ship.stats().max_damage;
    let p = &mut state.players[victim];
    if p.shields_up && p.shields > 0 {
        let absorbed = amount.min(p.shields);
        p.shields -= absorbed;
        p.damage += amount - absorbed;
    } else {
        p.damage += amount;
    }
    let lethal = p.damage >= max_damage;

    if state.t_mode {
        if let Some(att) = attacker {
            state
                .tournament_stats
                .entry(att)
                .or_default()
                .damage_dealt += amount as i64;
        }
        state
            .tournament_stats
            .entry(victim)
            .or_default()
            .damage_taken += amount as i64;
    }

    DamageResult {
        dealt: amount,
        lethal,
    }
}

fn why_label(why: WhyDead) -> &'static str {
    match why {
        WhyDead::Torp => "torp",
        WhyDead::Phaser => "phaser",
        WhyDead::Plasma => "plasma",
        WhyDead::Explosion => "explosion",
        WhyDead::Planet => "planet",
        WhyDead::Quit => "quit",
        WhyDead::None => "unknown",
    }
}

/// Transition `victim` into Explode and credit `killer` if it is a live or
/// currently exploding slot. Enqueues the death notice on the outbox.
pub fn kill_player(
    state: &mut GameState,
    victim: Slot,
    killer: Option<Slot>,
    why: WhyDead,
    outbox: &mut Outbox,
) {
    state.start_explosion(victim, killer, why);

    let credited = killer.filter(|&k| {
        k != victim
            && matches!(
                state.players[k].status,
                PlayerStatus::Alive | PlayerStatus::Explode
            )
    });

    if let Some(k) = credited {
        let p = &mut state.players[k];
        p.kills += 1.0;
        p.kills_streak += 1.0;
    }

    if state.t_mode {
        if let Some(k) = credited {
            state.tournament_stats.entry(k).or_default().kills += 1;
        }
        state.tournament_stats.entry(victim).or_default().deaths += 1;
    }

    let text = match credited {
        Some(k) => format!(
            "{} ({}) was destroyed by {} ({}) [{}]",
            state.players[victim].name,
            team::name(state.players[victim].team),
            state.players[k].name,
            team::name(state.players[k].team),
            why_label(why),
        ),
        None => format!(
            "{} ({}) was destroyed [{}]",
            state.players[victim].name,
            team::name(state.players[victim].team),
            why_label(why),
        ),
    };
    outbox.all(ServerMessage::Message(ChatLine::notice(
        MessageKind::Kill,
        text,
    )));
}

/// Area damage dealt on the first Explode frame: full class explosion damage
/// inside the inner radius, falling linearly to zero at the outer radius.
pub fn ship_explosion(state: &mut GameState, exploder: Slot, outbox: &mut Outbox) {
    let origin = state.players[exploder].pos;
    let full = state.players[exploder].ship.stats().explosion_damage;

    for victim in 0..state.players.len() {
        if victim == exploder || !state.players[victim].is_alive() {
            continue;
        }
        let dist = state.players[victim].pos.distance_to(origin);
        if dist >= combat::SHIP_EXPLOSION_MAX_DIST {
            continue;
        }
        let amount = if dist <= combat::SHIP_EXPLOSION_DIST {
            full
        } else {
            let span = combat::SHIP_EXPLOSION_MAX_DIST - combat::SHIP_EXPLOSION_DIST;
            (full as f64 * (combat::SHIP_EXPLOSION_MAX_DIST - dist) / span) as i32
        };
        let result = apply_damage(state, victim, amount, Some(exploder));
        if result.lethal {
            kill_player(state, victim, Some(exploder), WhyDead::Explosion, outbox);
        }
    }
}

/// Resolve a phaser discharge for `shooter`.
///
/// Line-versus-circle: the ray from the shooter along `dir` is tested
/// against enemy plasma bolts first (they intercept), then against enemy
/// ships; the nearest confirmed hit wins. Fuel and weapon heat are paid
/// whether or not anything is hit.
pub fn phaser_fire(
    state: &mut GameState,
    shooter: Slot,
    target: Option<Slot>,
    dir: f64,
    outbox: &mut Outbox,
) {
    let stats = state.players[shooter].ship.stats();
    let cost = stats.phaser_damage * PHASER_FUEL_MULT;
    {
        let p = &state.players[shooter];
        if !p.is_alive() || p.cloaked || p.repairing {
            return;
        }
        if p.fuel < cost || p.wtemp > stats.max_wpn_temp - combat::WTEMP_FIRE_MARGIN {
            return;
        }
    }

    // Direction from an explicit angle or toward the named target
    let origin = state.players[shooter].pos;
    let dir = match target {
        Some(t)
            if t < state.players.len()
                && state.players[t].is_alive()
                && t != shooter =>
        {
            (state.players[t].pos - origin).angle()
        }
        _ => dir,
    };
    let ray = crate::util::vec2::Vec2::from_angle(dir);
    let range = combat::PHASER_DIST * stats.phaser_damage as f64 / 100.0;
    let shooter_team = state.players[shooter].team;

    // Pay up front; a miss costs the same as a hit
    {
        let p = &mut state.players[shooter];
        p.fuel -= cost;
        p.wtemp += combat::PHASER_WTEMP;
    }

    // Plasma bolts crossing the beam take priority over ships
    let mut plasma_hit: Option<(usize, f64)> = None;
    for (i, bolt) in state.plasmas.iter().enumerate() {
        if bolt.team == shooter_team || bolt.status != ProjectileStatus::Moving {
            continue;
        }
        let d = bolt.pos - origin;
        if d.x.abs() > range || d.y.abs() > range || d.length_sq() > range * range {
            continue;
        }
        let s = d.dot(ray).max(0.0);
        let off = (d - ray * s).length();
        if off <= combat::ZAP_PLASMA_DIST && plasma_hit.map_or(true, |(_, best)| s < best) {
            plasma_hit = Some((i, s));
        }
    }
    if let Some((i, _)) = plasma_hit {
        state.plasmas[i].status = ProjectileStatus::Exploding;
        outbox.all(ServerMessage::Phaser(PhaserVisual {
            from: shooter,
            to: -1,
            dir,
            range,
        }));
        return;
    }

    // Nearest enemy ship whose centre is close enough to the ray
    let mut ship_hit: Option<(Slot, f64)> = None;
    for other in 0..state.players.len() {
        if other == shooter {
            continue;
        }
        let p = &state.players[other];
        if !p.is_alive() || p.team == shooter_team {
            continue;
        }
        let d = p.pos - origin;
        if d.x.abs() > range || d.y.abs() > range || d.length_sq() > range * range {
            continue;
        }
        let s = d.dot(ray).max(0.0);
        let off = (d - ray * s).length();
        if off <= combat::ZAP_PLAYER_DIST && ship_hit.map_or(true, |(_, best)| s < best) {
            ship_hit = Some((other, s));
        }
    }

    let to = match ship_hit {
        Some((victim, _)) => {
            let dist = state.players[victim].pos.distance_to(origin);
            let amount = (stats.phaser_damage as f64 * (1.0 - dist / range)) as i32;
            let result = apply_damage(state, victim, amount, Some(shooter));
            if result.lethal {
                kill_player(state, victim, Some(shooter), WhyDead::Phaser, outbox);
            }
            victim as i64
        }
        None => -1,
    };

    outbox.all(ServerMessage::Phaser(PhaserVisual {
        from: shooter,
        to,
        dir,
        range,
    }));
}
