//! World terrain and occupancy
//!
//! The turn engine only talks to terrain through `WorldMap`, so any map
//! source can drive a session. `Dungeon` is the bundled implementation.

mod dungeon;
mod floor;
mod tile;

pub use dungeon::{Dungeon, Room};
pub use floor::Floor;
pub use tile::Tile;

use crate::agent::{AgentId, Position};

/// Terrain and occupancy queries the session depends on
pub trait WorldMap {
    /// Number of floors
    fn depth(&self) -> usize;

    /// `(width, height)` of a floor, or `None` when it has no terrain layer
    fn bounds(&self, floor: usize) -> Option<(i32, i32)>;

    /// Terrain walkability; false out of bounds
    fn is_tile_passable(&self, x: i32, y: i32, floor: usize) -> bool;

    /// Agent standing on a cell
    fn entity_at(&self, x: i32, y: i32, floor: usize) -> Option<AgentId>;

    /// Put an agent on a free in-bounds cell
    fn place_entity(&mut self, id: AgentId, pos: Position) -> bool;

    /// Move an agent between free cells, possibly across floors
    fn move_entity(&mut self, id: AgentId, from: Position, to: Position) -> bool;

    /// Clear an agent's cell
    fn remove_entity(&mut self, id: AgentId, pos: Position);

    /// Arrival cell when descending onto `floor`
    fn entry_point(&self, floor: usize) -> Option<(i32, i32)>;

    /// Arrival cell when ascending onto `floor`, and the way down from it
    fn exit_point(&self, floor: usize) -> Option<(i32, i32)>;
}

/// Nearest free walkable cell to `origin`, searching outward ring by ring
pub fn nearest_free_cell(
    world: &dyn WorldMap,
    origin: (i32, i32),
    floor: usize,
) -> Option<Position> {
    let (width, height) = world.bounds(floor)?;
    let is_free = |x: i32, y: i32| {
        world.is_tile_passable(x, y, floor) && world.entity_at(x, y, floor).is_none()
    };
    for radius in 0..=width.max(height) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs().max(dy.abs()) != radius {
                    continue;
                }
                let (x, y) = (origin.0 + dx, origin.1 + dy);
                if is_free(x, y) {
                    return Some(Position::new(x, y, floor));
                }
            }
        }
    }
    None
}
