//! Spatial hash grid for projectile collision queries
//!
//! Divides the galaxy into uniform cells and stores live player positions.
//! Rebuilt once per tick before the projectile pass; queries check the cell
//! containing the probe point plus its eight neighbours, so the cell size
//! must stay at least as large as the widest proximity-hit radius.

use hashbrown::HashMap;

use crate::game::state::Slot;
use crate::util::vec2::Vec2;

/// Cell edge in world units, comfortably above the plasma hit radius
pub const CELL_SIZE: f64 = 2000.0;

/// Grid cell key - (x, y) cell coordinates
type CellKey = (i32, i32);

/// Player entry stored in the grid
#[derive(Debug, Clone, Copy)]
pub struct GridEntry {
    pub slot: Slot,
    pub pos: Vec2,
    pub team: u8,
}

/// Uniform grid over live players
pub struct PlayerGrid {
    cell_size: f64,
    inv_cell_size: f64,
    cells: HashMap<CellKey, Vec<GridEntry>>,
}

impl PlayerGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(64),
        }
    }

    #[inline]
    fn cell_of(&self, pos: Vec2) -> CellKey {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Drop all entries, keeping cell allocations for reuse
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
    }

    pub fn insert(&mut self, slot: Slot, pos: Vec2, team: u8) {
        let key = self.cell_of(pos);
        self.cells
            .entry(key)
            .or_insert_with(|| Vec::with_capacity(4))
            .push(GridEntry { slot, pos, team });
    }

    /// Rebuild from an iterator of live players
    pub fn rebuild<I>(&mut self, players: I)
    where
        I: Iterator<Item = (Slot, Vec2, u8)>,
    {
        self.clear();
        for (slot, pos, team) in players {
            self.insert(slot, pos, team);
        }
    }

    /// Iterate entries in the 3x3 cell neighbourhood around `pos`.
    ///
    /// The caller applies the exact radius test; `radius` must not exceed
    /// the cell size or hits in further cells would be missed.
    pub fn query(&self, pos: Vec2, radius: f64) -> impl Iterator<Item = &GridEntry> {
        debug_assert!(radius <= self.cell_size);
        let (cx, cy) = self.cell_of(pos);
        (-1..=1).flat_map(move |dy| {
            (-1..=1).flat_map(move |dx| {
                self.cells
                    .get(&(cx + dx, cy + dy))
                    .into_iter()
                    .flat_map(|cell| cell.iter())
            })
        })
    }
}

impl Default for PlayerGrid {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}
