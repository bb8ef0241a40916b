//! Read-only configuration catalogue
//!
//! Ship-class stat rows, the planet roster, and team constants. Nothing in
//! here mutates at runtime; the simulation reads it through lookups keyed by
//! ship class or planet index.

use crate::util::vec2::Vec2;

/// Team flags, powers of two so unions form by bitwise OR
pub mod team {
    pub const NONE: u8 = 0;
    pub const FED: u8 = 1;
    pub const ROM: u8 = 2;
    pub const KLI: u8 = 4;
    pub const ORI: u8 = 8;

    /// All four teams in flag order
    pub const ALL: [u8; 4] = [FED, ROM, KLI, ORI];

    pub fn name(flag: u8) -> &'static str {
        match flag {
            FED => "Federation",
            ROM => "Romulans",
            KLI => "Klingons",
            ORI => "Orions",
            _ => "Independent",
        }
    }

    /// Names of every team present in a flag union, for victory messages
    pub fn names(mask: u8) -> String {
        let present: Vec<&str> = ALL
            .iter()
            .filter(|&&t| mask & t != 0)
            .map(|&t| name(t))
            .collect();
        present.join(" and ")
    }

    pub fn is_valid(flag: u8) -> bool {
        ALL.contains(&flag)
    }
}

/// Team home coordinates
pub fn team_home(flag: u8) -> Vec2 {
    match flag {
        team::FED => Vec2::new(20_000.0, 80_000.0),
        team::ROM => Vec2::new(20_000.0, 20_000.0),
        team::KLI => Vec2::new(80_000.0, 20_000.0),
        team::ORI => Vec2::new(80_000.0, 80_000.0),
        _ => Vec2::new(50_000.0, 50_000.0),
    }
}

/// Ship classes, tag order matches the wire encoding 0..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ShipClass {
    Scout = 0,
    Destroyer = 1,
    Cruiser = 2,
    Battleship = 3,
    Assault = 4,
    Starbase = 5,
}

impl ShipClass {
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Self::Scout),
            1 => Some(Self::Destroyer),
            2 => Some(Self::Cruiser),
            3 => Some(Self::Battleship),
            4 => Some(Self::Assault),
            5 => Some(Self::Starbase),
            _ => None,
        }
    }

    pub fn stats(self) -> &'static ShipStats {
        &SHIP_TABLE[self as usize]
    }
}

/// Per-class performance row
///
/// Turn rate is in byte-angle thousandths per tick before the speed shift;
/// accel/decel integers accumulate in thousandths toward whole warp units.
#[derive(Debug)]
pub struct ShipStats {
    pub name: &'static str,
    pub max_speed: i32,
    pub max_fuel: i32,
    pub max_shields: i32,
    pub max_damage: i32,
    pub max_armies: i32,
    pub max_wpn_temp: i32,
    pub max_eng_temp: i32,
    pub turn_rate: i32,
    pub acc_int: i32,
    pub dec_int: i32,
    pub torp_damage: i32,
    pub torp_speed: i32,
    pub torp_fuse: i32,
    pub max_torps: i32,
    pub phaser_damage: i32,
    pub has_plasma: bool,
    pub plasma_damage: i32,
    pub plasma_speed: i32,
    pub plasma_fuse: i32,
    pub recharge_rate: i32,
    pub repair_interval: u64,
    pub shield_cost: i32,
    pub wpn_cool_rate: i32,
    pub eng_cool_rate: i32,
    pub det_cost: i32,
    pub tractor_range: f64,
    pub tractor_str: f64,
    pub mass: f64,
    pub explosion_damage: i32,
}

static SHIP_TABLE: [ShipStats; 6] = [
    ShipStats {
        name: "Scout",
        max_speed: 12,
        max_fuel: 5000,
        max_shields: 75,
        max_damage: 75,
        max_armies: 2,
        max_wpn_temp: 1000,
        max_eng_temp: 1000,
        turn_rate: 570_000,
        acc_int: 200,
        dec_int: 270,
        torp_damage: 25,
        torp_speed: 16,
        torp_fuse: 16,
        max_torps: 8,
        phaser_damage: 75,
        has_plasma: false,
        plasma_damage: 0,
        plasma_speed: 0,
        plasma_fuse: 0,
        recharge_rate: 4,
        repair_interval: 8,
        shield_cost: 2,
        wpn_cool_rate: 3,
        eng_cool_rate: 6,
        det_cost: 100,
        tractor_range: 0.7,
        tractor_str: 2000.0,
        mass: 1500.0,
        explosion_damage: 75,
    },
    ShipStats {
        name: "Destroyer",
        max_speed: 10,
        max_fuel: 7000,
        max_shields: 85,
        max_damage: 85,
        max_armies: 5,
        max_wpn_temp: 1000,
        max_eng_temp: 1000,
        turn_rate: 310_000,
        acc_int: 200,
        dec_int: 300,
        torp_damage: 30,
        torp_speed: 14,
        torp_fuse: 20,
        max_torps: 8,
        phaser_damage: 85,
        has_plasma: true,
        plasma_damage: 75,
        plasma_speed: 15,
        plasma_fuse: 30,
        recharge_rate: 5,
        repair_interval: 10,
        shield_cost: 3,
        wpn_cool_rate: 3,
        eng_cool_rate: 5,
        det_cost: 100,
        tractor_range: 0.9,
        tractor_str: 2500.0,
        mass: 1800.0,
        explosion_damage: 85,
    },
    ShipStats {
        name: "Cruiser",
        max_speed: 9,
        max_fuel: 10_000,
        max_shields: 100,
        max_damage: 100,
        max_armies: 10,
        max_wpn_temp: 1000,
        max_eng_temp: 1200,
        turn_rate: 170_000,
        acc_int: 150,
        dec_int: 200,
        torp_damage: 40,
        torp_speed: 12,
        torp_fuse: 25,
        max_torps: 8,
        phaser_damage: 100,
        has_plasma: true,
        plasma_damage: 100,
        plasma_speed: 15,
        plasma_fuse: 30,
        recharge_rate: 6,
        repair_interval: 10,
        shield_cost: 3,
        wpn_cool_rate: 2,
        eng_cool_rate: 5,
        det_cost: 100,
        tractor_range: 1.0,
        tractor_str: 3000.0,
        mass: 2000.0,
        explosion_damage: 100,
    },
    ShipStats {
        name: "Battleship",
        max_speed: 8,
        max_fuel: 14_000,
        max_shields: 130,
        max_damage: 130,
        max_armies: 6,
        max_wpn_temp: 1000,
        max_eng_temp: 1200,
        turn_rate: 75_000,
        acc_int: 80,
        dec_int: 180,
        torp_damage: 40,
        torp_speed: 12,
        torp_fuse: 25,
        max_torps: 8,
        phaser_damage: 105,
        has_plasma: true,
        plasma_damage: 130,
        plasma_speed: 15,
        plasma_fuse: 35,
        recharge_rate: 8,
        repair_interval: 12,
        shield_cost: 4,
        wpn_cool_rate: 2,
        eng_cool_rate: 4,
        det_cost: 100,
        tractor_range: 1.2,
        tractor_str: 4000.0,
        mass: 2300.0,
        explosion_damage: 130,
    },
    ShipStats {
        name: "Assault",
        max_speed: 8,
        max_fuel: 6000,
        max_shields: 80,
        max_damage: 200,
        max_armies: 20,
        max_wpn_temp: 1000,
        max_eng_temp: 1000,
        turn_rate: 120_000,
        acc_int: 100,
        dec_int: 200,
        torp_damage: 30,
        torp_speed: 16,
        torp_fuse: 20,
        max_torps: 8,
        phaser_damage: 80,
        has_plasma: false,
        plasma_damage: 0,
        plasma_speed: 0,
        plasma_fuse: 0,
        recharge_rate: 5,
        repair_interval: 12,
        shield_cost: 3,
        wpn_cool_rate: 2,
        eng_cool_rate: 5,
        det_cost: 100,
        tractor_range: 1.0,
        tractor_str: 3200.0,
        mass: 2300.0,
        explosion_damage: 200,
    },
    ShipStats {
        name: "Starbase",
        max_speed: 2,
        max_fuel: 60_000,
        max_shields: 500,
        max_damage: 600,
        max_armies: 25,
        max_wpn_temp: 1300,
        max_eng_temp: 1000,
        turn_rate: 50_000,
        acc_int: 100,
        dec_int: 200,
        torp_damage: 30,
        torp_speed: 14,
        torp_fuse: 30,
        max_torps: 8,
        phaser_damage: 120,
        has_plasma: true,
        plasma_damage: 150,
        plasma_speed: 15,
        plasma_fuse: 35,
        recharge_rate: 14,
        repair_interval: 5,
        shield_cost: 6,
        wpn_cool_rate: 4,
        eng_cool_rate: 7,
        det_cost: 75,
        tractor_range: 1.5,
        tractor_str: 8000.0,
        mass: 5000.0,
        explosion_damage: 200,
    },
];

/// Planet facility flags
pub mod pflags {
    pub const REPAIR: u8 = 1;
    pub const FUEL: u8 = 2;
    pub const AGRI: u8 = 4;
    pub const HOME: u8 = 8;
}

/// Immutable planet roster entry; owner and armies are starting values
#[derive(Debug)]
pub struct PlanetSpec {
    pub name: &'static str,
    pub x: f64,
    pub y: f64,
    pub owner: u8,
    pub armies: i32,
    pub flags: u8,
}

const fn planet(
    name: &'static str,
    x: f64,
    y: f64,
    owner: u8,
    armies: i32,
    flags: u8,
) -> PlanetSpec {
    PlanetSpec {
        name,
        x,
        y,
        owner,
        armies,
        flags,
    }
}

/// The forty-planet roster, ten per quadrant, home planets first per team
pub static PLANETS: [PlanetSpec; 40] = [
    // Federation quadrant (upper left)
    planet("Earth", 20_000.0, 80_000.0, team::FED, 30, pflags::HOME | pflags::REPAIR | pflags::FUEL),
    planet("Rigel", 10_000.0, 60_000.0, team::FED, 17, pflags::REPAIR),
    planet("Canopus", 25_000.0, 60_000.0, team::FED, 12, pflags::AGRI),
    planet("Beta III", 44_000.0, 81_000.0, team::FED, 17, pflags::FUEL),
    planet("Sirius", 39_000.0, 55_000.0, team::FED, 10, 0),
    planet("Altair", 30_000.0, 91_000.0, team::FED, 8, 0),
    planet("Vega", 45_000.0, 66_000.0, team::FED, 15, pflags::FUEL),
    planet("Deneb", 8000.0, 93_000.0, team::FED, 17, pflags::REPAIR),
    planet("Procyon", 34_000.0, 74_000.0, team::FED, 12, pflags::AGRI),
    planet("Castor", 6000.0, 75_000.0, team::FED, 10, 0),
    // Romulan quadrant (lower left)
    planet("Romulus", 20_000.0, 20_000.0, team::ROM, 30, pflags::HOME | pflags::REPAIR | pflags::FUEL),
    planet("Remus", 10_000.0, 40_000.0, team::ROM, 17, pflags::REPAIR),
    planet("Rho V", 25_000.0, 40_000.0, team::ROM, 12, pflags::AGRI),
    planet("Eridani", 44_000.0, 19_000.0, team::ROM, 17, pflags::FUEL),
    planet("Aldebaran", 39_000.0, 45_000.0, team::ROM, 10, 0),
    planet("Regulus", 30_000.0, 9000.0, team::ROM, 8, 0),
    planet("Tauri", 45_000.0, 34_000.0, team::ROM, 15, pflags::FUEL),
    planet("Draconis", 8000.0, 7000.0, team::ROM, 17, pflags::REPAIR),
    planet("Sagittari", 34_000.0, 26_000.0, team::ROM, 12, pflags::AGRI),
    planet("Pollux", 6000.0, 25_000.0, team::ROM, 10, 0),
    // Klingon quadrant (lower right)
    planet("Klingus", 80_000.0, 20_000.0, team::KLI, 30, pflags::HOME | pflags::REPAIR | pflags::FUEL),
    planet("Praxis", 90_000.0, 40_000.0, team::KLI, 17, pflags::REPAIR),
    planet("Laurasia", 75_000.0, 40_000.0, team::KLI, 12, pflags::AGRI),
    planet("Hercules", 56_000.0, 19_000.0, team::KLI, 17, pflags::FUEL),
    planet("Bootes", 61_000.0, 45_000.0, team::KLI, 10, 0),
    planet("Lyra", 70_000.0, 9000.0, team::KLI, 8, 0),
    planet("Antares", 55_000.0, 34_000.0, team::KLI, 15, pflags::FUEL),
    planet("Mirach", 92_000.0, 7000.0, team::KLI, 17, pflags::REPAIR),
    planet("Sheliak", 66_000.0, 26_000.0, team::KLI, 12, pflags::AGRI),
    planet("Markab", 94_000.0, 25_000.0, team::KLI, 10, 0),
    // Orion quadrant (upper right)
    planet("Orion", 80_000.0, 80_000.0, team::ORI, 30, pflags::HOME | pflags::REPAIR | pflags::FUEL),
    planet("Bellatrix", 90_000.0, 60_000.0, team::ORI, 17, pflags::REPAIR),
    planet("Mintaka", 75_000.0, 60_000.0, team::ORI, 12, pflags::AGRI),
    planet("Saiph", 56_000.0, 81_000.0, team::ORI, 17, pflags::FUEL),
    planet("Alnitak", 61_000.0, 55_000.0, team::ORI, 10, 0),
    planet("Meissa", 70_000.0, 91_000.0, team::ORI, 8, 0),
    planet("Betelgeuse", 55_000.0, 66_000.0, team::ORI, 15, pflags::FUEL),
    planet("Alnilam", 92_000.0, 93_000.0, team::ORI, 17, pflags::REPAIR),
    planet("Hatysa", 66_000.0, 74_000.0, team::ORI, 12, pflags::AGRI),
    planet("Thabit", 94_000.0, 75_000.0, team::ORI, 10, 0),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::galaxy;

    #[test]
    fn test_roster_size() {
        assert_eq!(PLANETS.len(), galaxy::MAX_PLANETS);
    }

    #[test]
    fn test_ten_planets_per_team() {
        for flag in team::ALL {
            let count = PLANETS.iter().filter(|p| p.owner == flag).count();
            assert_eq!(count, 10, "team {} owns {}", team::name(flag), count);
        }
    }

    #[test]
    fn test_home_planets_match_team_homes() {
        for flag in team::ALL {
            let home = PLANETS
                .iter()
                .find(|p| p.owner == flag && p.flags & pflags::HOME != 0)
                .expect("every team has a home planet");
            let expected = team_home(flag);
            assert_eq!(home.x, expected.x);
            assert_eq!(home.y, expected.y);
            assert_ne!(home.flags & pflags::REPAIR, 0);
            assert_ne!(home.flags & pflags::FUEL, 0);
        }
    }

    #[test]
    fn test_planets_inside_galaxy() {
        for p in &PLANETS {
            assert!(p.x > 0.0 && p.x < galaxy::WIDTH, "{}", p.name);
            assert!(p.y > 0.0 && p.y < galaxy::HEIGHT, "{}", p.name);
            assert!(p.armies > 0 && p.armies <= 40, "{}", p.name);
        }
    }

    #[test]
    fn test_ship_class_round_trip() {
        for i in 0..6 {
            let class = ShipClass::from_index(i).unwrap();
            assert_eq!(class as i64, i);
        }
        assert!(ShipClass::from_index(6).is_none());
        assert!(ShipClass::from_index(-1).is_none());
    }

    #[test]
    fn test_starbase_is_slowest_and_toughest() {
        let sb = ShipClass::Starbase.stats();
        for class in [
            ShipClass::Scout,
            ShipClass::Destroyer,
            ShipClass::Cruiser,
            ShipClass::Battleship,
            ShipClass::Assault,
        ] {
            let s = class.stats();
            assert!(sb.max_speed <= s.max_speed);
            assert!(sb.max_shields >= s.max_shields);
            assert!(sb.max_fuel >= s.max_fuel);
        }
    }

    #[test]
    fn test_team_names_union() {
        assert_eq!(team::names(team::FED | team::ROM), "Federation and Romulans");
        assert_eq!(team::names(team::KLI), "Klingons");
    }
}
