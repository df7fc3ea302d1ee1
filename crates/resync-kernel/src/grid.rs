//! The shared arena grid. Only the arena's serial commit phase mutates it.

use contracts::{ArenaConfig, CellState, GridPos};
use rand::Rng;

/// Fixed neighbour enumeration order: row-major over `dy`, then `dx`,
/// skipping the centre. Policies break ties in favour of the earliest entry.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWorld {
    width: u16,
    height: u16,
    cells: Vec<CellState>,
}

impl GridWorld {
    pub fn empty(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![CellState::Empty; usize::from(width) * usize::from(height)],
        }
    }

    /// Seeded layout: every cell rolls once against the resource density,
    /// then the hazard density. `keep_clear` cells are forced Empty.
    pub fn generate(config: &ArenaConfig, rng: &mut impl Rng, keep_clear: &[GridPos]) -> Self {
        let mut grid = Self::empty(config.width, config.height);
        let resource_cut = config.resource_density;
        let hazard_cut = (config.resource_density + config.hazard_density).min(1.0);
        for cell in &mut grid.cells {
            let roll: f64 = rng.gen();
            *cell = if roll < resource_cut {
                CellState::Resource
            } else if roll < hazard_cut {
                CellState::Hazard
            } else {
                CellState::Empty
            };
        }
        for pos in keep_clear {
            grid.set(*pos, CellState::Empty);
        }
        grid
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < i32::from(self.width) && pos.y < i32::from(self.height)
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(pos.y as usize * usize::from(self.width) + pos.x as usize)
    }

    pub fn get(&self, pos: GridPos) -> Option<CellState> {
        self.index(pos).map(|index| self.cells[index])
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: GridPos, state: CellState) {
        if let Some(index) = self.index(pos) {
            self.cells[index] = state;
        }
    }

    /// Take whatever occupies `pos`, leaving it Empty.
    pub fn consume(&mut self, pos: GridPos) -> CellState {
        match self.index(pos) {
            Some(index) => std::mem::take(&mut self.cells[index]),
            None => CellState::Empty,
        }
    }

    /// In-bounds neighbours of `pos` in [`NEIGHBOR_OFFSETS`] order.
    pub fn neighbors(&self, pos: GridPos) -> Vec<(GridPos, CellState)> {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|(dx, dy)| pos.offset(*dx, *dy))
            .filter_map(|next| self.get(next).map(|cell| (next, cell)))
            .collect()
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|cell| **cell == state).count()
    }
}

/// Spawn cells in `PolicyKind::ALL` order.
pub fn start_positions(width: u16, height: u16) -> [GridPos; 3] {
    let w = i32::from(width);
    let h = i32::from(height);
    [
        GridPos::new(1, 1),
        GridPos::new((w - 2).max(0), 1),
        GridPos::new(w / 2, (h - 2).max(0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{stream_rng, STREAM_ARENA};

    #[test]
    fn corner_has_three_neighbors_in_fixed_order() {
        let grid = GridWorld::empty(4, 4);
        let positions = grid
            .neighbors(GridPos::new(0, 0))
            .into_iter()
            .map(|(pos, _)| pos)
            .collect::<Vec<_>>();
        assert_eq!(
            positions,
            vec![GridPos::new(1, 0), GridPos::new(0, 1), GridPos::new(1, 1)]
        );
        assert_eq!(grid.neighbors(GridPos::new(2, 2)).len(), 8);
    }

    #[test]
    fn consume_leaves_cell_empty() {
        let mut grid = GridWorld::empty(3, 3);
        grid.set(GridPos::new(2, 1), CellState::Resource);
        assert_eq!(grid.consume(GridPos::new(2, 1)), CellState::Resource);
        assert_eq!(grid.get(GridPos::new(2, 1)), Some(CellState::Empty));
        assert_eq!(grid.consume(GridPos::new(9, 9)), CellState::Empty);
    }

    #[test]
    fn generation_is_seeded_and_keeps_spawns_clear() {
        let config = ArenaConfig {
            resource_density: 0.5,
            hazard_density: 0.5,
            ..ArenaConfig::default()
        };
        let spawns = start_positions(config.width, config.height);
        let a = GridWorld::generate(&config, &mut stream_rng(11, STREAM_ARENA), &spawns);
        let b = GridWorld::generate(&config, &mut stream_rng(11, STREAM_ARENA), &spawns);
        assert_eq!(a, b);
        for pos in spawns {
            assert_eq!(a.get(pos), Some(CellState::Empty));
        }
        assert!(a.count(CellState::Resource) > 0);
        assert!(a.count(CellState::Hazard) > 0);
    }

    #[test]
    fn spawn_cells_follow_grid_size() {
        assert_eq!(
            start_positions(16, 12),
            [GridPos::new(1, 1), GridPos::new(14, 1), GridPos::new(8, 10)]
        );
    }
}
