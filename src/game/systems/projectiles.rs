//! Torpedo and plasma flight
//!
//! Moves every live projectile, retires burned-out and out-of-bounds ones,
//! and resolves proximity hits against the player grid. A projectile that
//! hits stays in the list as Exploding for one more frame so clients can
//! draw the detonation, then is dropped on the next pass.

use crate::game::constants::{combat, galaxy};
use crate::game::spatial::PlayerGrid;
use crate::game::state::{GameState, Projectile, ProjectileStatus, Slot, WhyDead};
use crate::game::systems::combat::{apply_damage, kill_player};
use crate::net::protocol::Outbox;
use crate::util::vec2::Vec2;

/// Which projectile family a pass is operating on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Torpedo,
    Plasma,
}

impl Family {
    fn hit_radius(self) -> f64 {
        match self {
            Family::Torpedo => combat::EXPLOSION_DIST,
            Family::Plasma => combat::PLASMA_EXPLOSION_DIST,
        }
    }

    fn why(self) -> WhyDead {
        match self {
            Family::Torpedo => WhyDead::Torp,
            Family::Plasma => WhyDead::Plasma,
        }
    }
}

fn release_counter(state: &mut GameState, owner: Slot, family: Family) {
    let p = &mut state.players[owner];
    match family {
        Family::Torpedo => p.num_torps = (p.num_torps - 1).max(0),
        Family::Plasma => p.num_plasma = (p.num_plasma - 1).max(0),
    }
}

fn out_of_bounds(pos: Vec2) -> bool {
    pos.x < 0.0 || pos.x > galaxy::WIDTH || pos.y < 0.0 || pos.y > galaxy::HEIGHT
}

/// Closest Alive enemy within the hit radius, via the spatial grid
fn find_target(
    state: &GameState,
    grid: &PlayerGrid,
    shot: &Projectile,
    radius: f64,
) -> Option<Slot> {
    let mut best: Option<(Slot, f64)> = None;
    for entry in grid.query(shot.pos, radius) {
        if entry.slot == shot.owner || entry.team == shot.team {
            continue;
        }
        // The grid was built at the top of the pass; a slot may have died to
        // an earlier projectile this same frame
        if !state.players[entry.slot].is_alive() {
            continue;
        }
        let d = entry.pos.distance_to(shot.pos);
        if d <= radius && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((entry.slot, d));
        }
    }
    best.map(|(slot, _)| slot)
}

fn step_family(
    state: &mut GameState,
    grid: &PlayerGrid,
    family: Family,
    outbox: &mut Outbox,
) {
    let mut shots = match family {
        Family::Torpedo => std::mem::take(&mut state.torps),
        Family::Plasma => std::mem::take(&mut state.plasmas),
    };
    let radius = family.hit_radius();

    let mut keep = Vec::with_capacity(shots.len());
    for mut shot in shots.drain(..) {
        // Detonated last frame; the visual frame is over
        if shot.status == ProjectileStatus::Exploding {
            release_counter(state, shot.owner, family);
            continue;
        }

        shot.fuse -= 1;
        if shot.fuse <= 0 {
            release_counter(state, shot.owner, family);
            continue;
        }

        shot.pos += Vec2::from_angle(shot.dir) * shot.speed;
        if out_of_bounds(shot.pos) {
            release_counter(state, shot.owner, family);
            continue;
        }

        if let Some(victim) = find_target(state, grid, &shot, radius) {
            let result = apply_damage(state, victim, shot.damage, Some(shot.owner));
            if result.lethal {
                kill_player(state, victim, Some(shot.owner), family.why(), outbox);
            }
            shot.status = ProjectileStatus::Exploding;
        }

        keep.push(shot);
    }

    match family {
        Family::Torpedo => state.torps = keep,
        Family::Plasma => state.plasmas = keep,
    }
}

/// Launch a torpedo for `slot` along `dir`.
///
/// Rejected while cloaked or repairing, at the class tube limit, short on
/// fuel, or with weapons running hot. Returns whether a torpedo launched.
pub fn fire_torpedo(state: &mut GameState, slot: Slot, dir: f64) -> bool {
    let stats = state.players[slot].ship.stats();
    let cost = stats.torp_damage * combat::TORP_FUEL_MULT;
    {
        let p = &state.players[slot];
        if !p.is_alive() || p.cloaked || p.repairing {
            return false;
        }
        if p.num_torps >= stats.max_torps
            || p.fuel < cost
            || p.wtemp > stats.max_wpn_temp - combat::WTEMP_FIRE_MARGIN
        {
            return false;
        }
    }

    let id = state.alloc_torp_id();
    let p = &state.players[slot];
    let shot = Projectile {
        id,
        owner: slot,
        team: p.team,
        pos: p.pos,
        dir,
        speed: stats.torp_speed as f64 * 20.0,
        damage: stats.torp_damage,
        fuse: stats.torp_fuse,
        status: ProjectileStatus::Moving,
    };
    state.torps.push(shot);
    let p = &mut state.players[slot];
    p.num_torps += 1;
    p.fuel -= cost;
    p.wtemp += combat::TORP_WTEMP;
    true
}

/// Launch a plasma bolt for `slot` along `dir`.
///
/// Plasma needs a class that carries it and an empty launcher; the other
/// checks mirror the torpedo path with plasma costs.
pub fn fire_plasma(state: &mut GameState, slot: Slot, dir: f64) -> bool {
    let stats = state.players[slot].ship.stats();
    let cost = stats.plasma_damage * combat::TORP_FUEL_MULT;
    {
        let p = &state.players[slot];
        if !p.is_alive() || p.cloaked || p.repairing || !stats.has_plasma {
            return false;
        }
        if p.num_plasma >= 1
            || p.fuel < cost
            || p.wtemp > stats.max_wpn_temp - combat::WTEMP_FIRE_MARGIN
        {
            return false;
        }
    }

    let id = state.alloc_plasma_id();
    let p = &state.players[slot];
    let shot = Projectile {
        id,
        owner: slot,
        team: p.team,
        pos: p.pos,
        dir,
        speed: stats.plasma_speed as f64 * 20.0,
        damage: stats.plasma_damage,
        fuse: stats.plasma_fuse,
        status: ProjectileStatus::Moving,
    };
    state.plasmas.push(shot);
    let p = &mut state.players[slot];
    p.num_plasma += 1;
    p.fuel -= cost;
    p.wtemp += combat::PLASMA_WTEMP;
    true
}

/// Force-detonate enemy torpedoes near `slot`, paying the class detonate
/// cost per torpedo until the tank runs out.
pub fn detonate_enemy_torps(state: &mut GameState, slot: Slot) {
    let det_cost = state.players[slot].ship.stats().det_cost;
    let pos = state.players[slot].pos;
    let own_team = state.players[slot].team;

    for i in 0..state.torps.len() {
        if state.torps[i].team == own_team
            || state.torps[i].status != ProjectileStatus::Moving
        {
            continue;
        }
        if state.torps[i].pos.distance_to(pos) > combat::PHASER_DIST {
            continue;
        }
        if state.players[slot].fuel < det_cost {
            break;
        }
        state.players[slot].fuel -= det_cost;
        state.torps[i].fuse = 1;
    }
}

/// Rebuild the player grid and advance every projectile one tick
pub fn update_projectiles(state: &mut GameState, grid: &mut PlayerGrid, outbox: &mut Outbox) {
    grid.rebuild(
        state
            .players
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| (p.id, p.pos, p.team)),
    );
    step_family(state, grid, Family::Torpedo, outbox);
    step_family(state, grid, Family::Plasma, outbox);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalogue::{team, ShipClass};
    use crate::game::state::PlayerStatus;

    fn duel() -> GameState {
        let mut state = GameState::new(9);
        for (slot, flag) in [(0, team::FED), (1, team::KLI)] {
            let p = &mut state.players[slot];
            p.status = PlayerStatus::Alive;
            p.team = flag;
            p.name = format!("p{slot}");
            p.connected = true;
            p.reset_ship(ShipClass::Destroyer);
        }
        state.players[0].pos = Vec2::new(50_000.0, 50_000.0);
        state.players[1].pos = Vec2::new(52_000.0, 50_000.0);
        state
    }

    fn launch_torp(state: &mut GameState, owner: Slot, dir: f64) {
        let stats = state.players[owner].ship.stats();
        let id = state.alloc_torp_id();
        let shot = Projectile {
            id,
            owner,
            team: state.players[owner].team,
            pos: state.players[owner].pos,
            dir,
            speed: stats.torp_speed as f64 * 20.0,
            damage: stats.torp_damage,
            fuse: stats.torp_fuse,
            status: ProjectileStatus::Moving,
        };
        state.torps.push(shot);
        state.players[owner].num_torps += 1;
    }

    #[test]
    fn test_torpedo_advances_each_tick() {
        let mut state = duel();
        launch_torp(&mut state, 0, 0.0);
        let x0 = state.torps[0].pos.x;
        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        let stats = ShipClass::Destroyer.stats();
        assert!((state.torps[0].pos.x - x0 - stats.torp_speed as f64 * 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_torpedo_kills_wounded_target_within_two_ticks() {
        let mut state = duel();
        state.players[1].shields_up = false;
        state.players[1].shields = 0;
        state.players[1].damage = ShipClass::Destroyer.stats().max_damage - 1;
        launch_torp(&mut state, 0, 0.0);

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        // 2000 units at 280/tick: in explosion range within 7 ticks
        for _ in 0..8 {
            update_projectiles(&mut state, &mut grid, &mut outbox);
            if state.players[1].status == PlayerStatus::Explode {
                break;
            }
        }
        assert_eq!(state.players[1].status, PlayerStatus::Explode);
        assert_eq!(state.players[1].why_dead, WhyDead::Torp);
        assert_eq!(state.players[0].kills, 1.0);
        assert_eq!(state.players[1].deaths, 1);
        assert!(outbox
            .queue
            .iter()
            .any(|(_, m)| matches!(m, crate::net::protocol::ServerMessage::Message(l)
                if l.text.contains("[torp]"))));
    }

    #[test]
    fn test_exploding_torp_lingers_one_frame_then_drops() {
        let mut state = duel();
        state.players[1].shields_up = false;
        launch_torp(&mut state, 0, 0.0);
        state.torps[0].pos = state.players[1].pos + Vec2::new(-100.0, 0.0);

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert_eq!(state.torps.len(), 1);
        assert_eq!(state.torps[0].status, ProjectileStatus::Exploding);
        assert_eq!(state.players[0].num_torps, 1);

        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert!(state.torps.is_empty());
        assert_eq!(state.players[0].num_torps, 0);
    }

    #[test]
    fn test_torpedo_ignores_own_team() {
        let mut state = duel();
        state.players[1].team = team::FED;
        launch_torp(&mut state, 0, 0.0);
        state.torps[0].pos = state.players[1].pos + Vec2::new(-100.0, 0.0);

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert_eq!(state.torps[0].status, ProjectileStatus::Moving);
        assert_eq!(state.players[1].damage, 0);
    }

    #[test]
    fn test_fuse_expiry_releases_counter() {
        let mut state = duel();
        launch_torp(&mut state, 0, std::f64::consts::PI / 2.0);
        state.torps[0].fuse = 1;

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert!(state.torps.is_empty());
        assert_eq!(state.players[0].num_torps, 0);
    }

    #[test]
    fn test_out_of_bounds_drops() {
        let mut state = duel();
        launch_torp(&mut state, 0, std::f64::consts::PI);
        state.torps[0].pos = Vec2::new(10.0, 50_000.0);

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert!(state.torps.is_empty());
        assert_eq!(state.players[0].num_torps, 0);
    }

    #[test]
    fn test_hit_chooses_closest_eligible() {
        let mut state = duel();
        // Third hostile further from the impact point
        let p = &mut state.players[2];
        p.status = PlayerStatus::Alive;
        p.team = team::KLI;
        p.name = "far".into();
        p.connected = true;
        p.reset_ship(ShipClass::Destroyer);
        p.shields_up = false;
        state.players[2].pos = state.players[1].pos + Vec2::new(300.0, 0.0);
        state.players[1].shields_up = false;

        launch_torp(&mut state, 0, 0.0);
        // After this tick's move the torp sits 120 from p1 and 180 from p2:
        // both inside the hit radius, p1 strictly closer
        state.torps[0].pos = state.players[1].pos + Vec2::new(-160.0, 0.0);

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert!(state.players[1].damage > 0);
        assert_eq!(state.players[2].damage, 0);
    }

    #[test]
    fn test_fire_torpedo_pays_costs() {
        let mut state = duel();
        let stats = ShipClass::Destroyer.stats();
        assert!(fire_torpedo(&mut state, 0, 1.0));
        let p = &state.players[0];
        assert_eq!(p.num_torps, 1);
        assert_eq!(p.fuel, stats.max_fuel - stats.torp_damage * combat::TORP_FUEL_MULT);
        assert_eq!(p.wtemp, combat::TORP_WTEMP);
        assert_eq!(state.torps[0].fuse, stats.torp_fuse);
        assert_eq!(state.torps[0].id, 0);
        assert!(fire_torpedo(&mut state, 0, 1.0));
        assert_eq!(state.torps[1].id, 1);
    }

    #[test]
    fn test_fire_torpedo_rejections() {
        let mut state = duel();
        let stats = ShipClass::Destroyer.stats();

        state.players[0].cloaked = true;
        assert!(!fire_torpedo(&mut state, 0, 0.0));
        state.players[0].cloaked = false;

        state.players[0].repairing = true;
        assert!(!fire_torpedo(&mut state, 0, 0.0));
        state.players[0].repairing = false;

        state.players[0].num_torps = stats.max_torps;
        assert!(!fire_torpedo(&mut state, 0, 0.0));
        state.players[0].num_torps = 0;

        state.players[0].wtemp = stats.max_wpn_temp - combat::WTEMP_FIRE_MARGIN + 1;
        assert!(!fire_torpedo(&mut state, 0, 0.0));
        state.players[0].wtemp = 0;

        state.players[0].fuel = 0;
        assert!(!fire_torpedo(&mut state, 0, 0.0));
    }

    #[test]
    fn test_fire_plasma_requires_capability_and_empty_launcher() {
        let mut state = duel();
        state.players[0].reset_ship(ShipClass::Scout);
        assert!(!fire_plasma(&mut state, 0, 0.0));

        state.players[0].reset_ship(ShipClass::Destroyer);
        assert!(fire_plasma(&mut state, 0, 0.0));
        assert_eq!(state.players[0].num_plasma, 1);
        assert_eq!(state.players[0].wtemp, combat::PLASMA_WTEMP);
        assert!(!fire_plasma(&mut state, 0, 0.0));
    }

    #[test]
    fn test_detonate_sets_fuses_until_fuel_runs_out() {
        let mut state = duel();
        let det_cost = ShipClass::Destroyer.stats().det_cost;
        // Three hostile torps in range of player 1
        for _ in 0..3 {
            assert!(fire_torpedo(&mut state, 0, 0.0));
        }
        state.players[1].fuel = det_cost * 2;
        detonate_enemy_torps(&mut state, 1);

        let primed = state.torps.iter().filter(|t| t.fuse == 1).count();
        assert_eq!(primed, 2);
        assert_eq!(state.players[1].fuel, 0);
    }

    #[test]
    fn test_detonate_ignores_own_torps() {
        let mut state = duel();
        assert!(fire_torpedo(&mut state, 0, 0.0));
        detonate_enemy_torps(&mut state, 0);
        assert_ne!(state.torps[0].fuse, 1);
    }

    #[test]
    fn test_plasma_uses_wider_radius() {
        let mut state = duel();
        state.players[1].shields_up = false;
        let stats = ShipClass::Destroyer.stats();
        let id = state.alloc_plasma_id();
        state.plasmas.push(Projectile {
            id,
            owner: 0,
            team: team::FED,
            pos: state.players[1].pos
                + Vec2::new(-(combat::PLASMA_EXPLOSION_DIST - 20.0), 0.0),
            dir: std::f64::consts::FRAC_PI_2,
            speed: 0.0,
            damage: stats.plasma_damage,
            fuse: 10,
            status: ProjectileStatus::Moving,
        });
        state.players[0].num_plasma = 1;

        let mut grid = PlayerGrid::default();
        let mut outbox = Outbox::new();
        update_projectiles(&mut state, &mut grid, &mut outbox);
        assert_eq!(state.plasmas[0].status, ProjectileStatus::Exploding);
        assert_eq!(state.players[1].damage, stats.plasma_damage);
    }
}
