//! Ship housekeeping systems
//!
//! Fuel drain and recharge, engine and weapon temperature, the
//! engine-overheat state machine, repair, and cloak upkeep. Runs once per
//! Alive player per tick, before planet interactions.

use rand::Rng;

use crate::game::catalogue::pflags;
use crate::game::constants::engine;
use crate::game::state::{GameState, Slot};

/// One housekeeping pass for `slot`
pub fn update_ship_systems(state: &mut GameState, slot: Slot) {
    let stats = state.players[slot].ship.stats();

    // Friendly special-planet bonuses while orbiting
    let (fuel_boost, repair_boost) = match state.players[slot].orbiting {
        Some(idx) if idx < state.planets.len() => {
            let planet = &state.planets[idx];
            let friendly = planet.owner == state.players[slot].team;
            (
                friendly && planet.has_flag(pflags::FUEL),
                friendly && planet.has_flag(pflags::REPAIR),
            )
        }
        _ => (false, false),
    };

    {
        let p = &mut state.players[slot];

        // Repair request engages once the ship has stopped
        if p.repair_request && p.speed == 0 {
            p.repair_request = false;
            p.repairing = true;
            p.repair_counter = 0;
        }

        // Fuel drain and engine heat from running systems
        let mut drain = p.speed * 2;
        if p.shields_up {
            drain += stats.shield_cost;
        }
        p.fuel = (p.fuel - drain).max(0);
        p.etemp = (p.etemp + p.speed).min(engine::ETEMP_CAP);

        // Recharge, doubled over a friendly fuel depot
        let recharge = if fuel_boost {
            stats.recharge_rate * 2
        } else {
            stats.recharge_rate
        };
        p.fuel = (p.fuel + recharge).min(stats.max_fuel);

        // Cooling
        p.wtemp = (p.wtemp - stats.wpn_cool_rate).max(0);
        p.etemp = (p.etemp - stats.eng_cool_rate).max(0);
    }

    // Overheat state machine: roll only while hot, escalating odds
    let (overheating, etemp) = {
        let p = &state.players[slot];
        (p.engine_overheat, p.etemp)
    };
    if overheating {
        let p = &mut state.players[slot];
        p.overheat_timer -= 1;
        if p.overheat_timer <= 0 {
            p.overheat_timer = 0;
            p.engine_overheat = false;
        }
    } else if etemp > stats.max_eng_temp {
        let odds = if etemp > engine::CRITICAL_THRESHOLD {
            engine::OVERHEAT_ODDS_CRITICAL
        } else if etemp > engine::HOT_THRESHOLD {
            engine::OVERHEAT_ODDS_HOT
        } else {
            engine::OVERHEAT_ODDS
        };
        if state.rng.gen_ratio(1, odds) {
            let timer = state
                .rng
                .gen_range(engine::OVERHEAT_MIN_TICKS..engine::OVERHEAT_MAX_TICKS);
            let p = &mut state.players[slot];
            p.engine_overheat = true;
            p.overheat_timer = timer;
            p.des_speed = 0;
            p.tractoring = None;
            p.pressoring = None;
        }
    }

    // Repair tick, class interval halved over a friendly repair yard
    {
        let p = &mut state.players[slot];
        if p.repairing {
            let mut interval = stats.repair_interval;
            if repair_boost {
                interval = (interval / 2).max(1);
            }
            p.repair_counter += 1;
            if p.repair_counter >= interval {
                p.repair_counter = 0;
                p.damage = (p.damage - 1).max(0);
                p.shields = (p.shields + 2).min(stats.max_shields);
            }
        }
    }

    // Cloak upkeep, dropping the cloak when the tank runs dry
    {
        let p = &mut state.players[slot];
        if p.cloaked {
            p.fuel -= engine::CLOAK_DRAIN;
            if p.fuel <= 0 {
                p.fuel = 0;
                p.cloaked = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalogue::{team, ShipClass};
    use crate::game::state::PlayerStatus;

    fn cruiser() -> GameState {
        let mut state = GameState::new(11);
        let p = &mut state.players[0];
        p.status = PlayerStatus::Alive;
        p.team = team::FED;
        p.connected = true;
        p.reset_ship(ShipClass::Cruiser);
        state
    }

    #[test]
    fn test_fuel_drain_scales_with_speed() {
        let stats = ShipClass::Cruiser.stats();
        let mut state = cruiser();
        state.players[0].fuel = 1000;
        state.players[0].speed = 6;
        update_ship_systems(&mut state, 0);
        assert_eq!(state.players[0].fuel, 1000 - 12 + stats.recharge_rate);
    }

    #[test]
    fn test_shield_cost_applied() {
        let stats = ShipClass::Cruiser.stats();
        let mut state = cruiser();
        state.players[0].fuel = 1000;
        state.players[0].shields_up = true;
        update_ship_systems(&mut state, 0);
        assert_eq!(
            state.players[0].fuel,
            1000 - stats.shield_cost + stats.recharge_rate
        );
    }

    #[test]
    fn test_recharge_doubles_at_friendly_fuel_planet() {
        let stats = ShipClass::Cruiser.stats();
        // Planet 3 (Beta III) is a Federation fuel planet
        let mut state = cruiser();
        assert!(state.planets[3].has_flag(pflags::FUEL));
        state.players[0].orbiting = Some(3);
        state.players[0].fuel = 1000;
        update_ship_systems(&mut state, 0);
        assert_eq!(state.players[0].fuel, 1000 + stats.recharge_rate * 2);
    }

    #[test]
    fn test_fuel_never_exceeds_max() {
        let stats = ShipClass::Cruiser.stats();
        let mut state = cruiser();
        update_ship_systems(&mut state, 0);
        assert_eq!(state.players[0].fuel, stats.max_fuel);
    }

    #[test]
    fn test_repair_request_engages_at_rest() {
        let mut state = cruiser();
        state.players[0].repair_request = true;
        state.players[0].speed = 3;
        update_ship_systems(&mut state, 0);
        assert!(!state.players[0].repairing);

        state.players[0].speed = 0;
        update_ship_systems(&mut state, 0);
        assert!(state.players[0].repairing);
        assert!(!state.players[0].repair_request);
    }

    #[test]
    fn test_repair_heals_on_interval() {
        let stats = ShipClass::Cruiser.stats();
        let mut state = cruiser();
        state.players[0].repairing = true;
        state.players[0].damage = 10;
        state.players[0].shields = 0;
        for _ in 0..stats.repair_interval {
            update_ship_systems(&mut state, 0);
        }
        assert_eq!(state.players[0].damage, 9);
        assert_eq!(state.players[0].shields, 2);
    }

    #[test]
    fn test_repair_faster_at_friendly_repair_planet() {
        let stats = ShipClass::Cruiser.stats();
        // Planet 1 (Rigel) is a Federation repair planet
        let mut state = cruiser();
        assert!(state.planets[1].has_flag(pflags::REPAIR));
        state.players[0].orbiting = Some(1);
        state.players[0].repairing = true;
        state.players[0].damage = 10;
        for _ in 0..stats.repair_interval {
            update_ship_systems(&mut state, 0);
        }
        // Interval halved: two heal ticks in one full interval
        assert_eq!(state.players[0].damage, 8);
    }

    #[test]
    fn test_cloak_drains_and_drops_at_zero() {
        let mut state = cruiser();
        state.players[0].cloaked = true;
        state.players[0].fuel = engine::CLOAK_DRAIN - ShipClass::Cruiser.stats().recharge_rate;
        update_ship_systems(&mut state, 0);
        assert!(!state.players[0].cloaked);
        assert_eq!(state.players[0].fuel, 0);
    }

    #[test]
    fn test_overheat_triggers_eventually_and_clears() {
        let mut state = cruiser();
        // Pin temperature far above the critical threshold; the 1-in-8 roll
        // must land within a few hundred ticks under any seed
        let mut triggered = false;
        for _ in 0..500 {
            state.players[0].etemp = engine::CRITICAL_THRESHOLD + 50;
            update_ship_systems(&mut state, 0);
            if state.players[0].engine_overheat {
                triggered = true;
                break;
            }
        }
        assert!(triggered, "overheat never triggered");
        assert_eq!(state.players[0].des_speed, 0);
        assert!(state.players[0].overheat_timer >= engine::OVERHEAT_MIN_TICKS);
        assert!(state.players[0].overheat_timer < engine::OVERHEAT_MAX_TICKS);

        // Cool down and let the timer run out
        let timer = state.players[0].overheat_timer;
        state.players[0].etemp = 0;
        for _ in 0..timer {
            update_ship_systems(&mut state, 0);
        }
        assert!(!state.players[0].engine_overheat);
    }

    #[test]
    fn test_overheat_releases_beams() {
        let mut state = cruiser();
        state.players[0].tractoring = Some(5);
        let mut released = false;
        for _ in 0..500 {
            state.players[0].etemp = engine::CRITICAL_THRESHOLD + 50;
            state.players[0].tractoring = Some(5);
            update_ship_systems(&mut state, 0);
            if state.players[0].engine_overheat {
                released = state.players[0].tractoring.is_none();
                break;
            }
        }
        assert!(released);
    }

    #[test]
    fn test_etemp_capped() {
        let mut state = cruiser();
        state.players[0].etemp = engine::ETEMP_CAP;
        state.players[0].speed = 9;
        update_ship_systems(&mut state, 0);
        assert!(state.players[0].etemp <= engine::ETEMP_CAP);
    }
}
