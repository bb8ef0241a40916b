//! Byte-angle turning domain
//!
//! Ship turning runs in an integer angle space of 256 units per full circle.
//! Headings are stored as radians everywhere else; these helpers convert at
//! the turning boundary and compute the shorter signed turn direction.

use std::f64::consts::TAU;

/// Units in a full circle
pub const FULL_CIRCLE: i32 = 256;

/// Half circle, the largest magnitude of a shortest signed difference
pub const HALF_CIRCLE: i32 = 128;

/// Wrap a radian angle into [0, 2*pi)
pub fn normalize_rad(rad: f64) -> f64 {
    let r = rad % TAU;
    if r < 0.0 {
        r + TAU
    } else {
        r
    }
}

/// Convert radians to byte-angle units in 0..=255
pub fn rad_to_units(rad: f64) -> i32 {
    let r = normalize_rad(rad);
    ((r / TAU * FULL_CIRCLE as f64).round() as i32).rem_euclid(FULL_CIRCLE)
}

/// Convert byte-angle units to radians in [0, 2*pi)
pub fn units_to_rad(units: i32) -> f64 {
    units.rem_euclid(FULL_CIRCLE) as f64 / FULL_CIRCLE as f64 * TAU
}

/// Shorter signed difference `to - from` in units, in -128..=127
pub fn shortest_diff(from: i32, to: i32) -> i32 {
    let mut diff = (to - from).rem_euclid(FULL_CIRCLE);
    if diff >= HALF_CIRCLE {
        diff -= FULL_CIRCLE;
    }
    diff
}

/// Absolute angular difference between two radian headings, in [0, pi]
pub fn rad_diff(a: f64, b: f64) -> f64 {
    let d = normalize_rad(a - b);
    if d > TAU / 2.0 {
        TAU - d
    } else {
        d
    }
}
