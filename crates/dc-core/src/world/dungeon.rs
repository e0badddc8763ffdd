//! Multi-floor dungeon: terrain plus an occupancy index
//!
//! Generation carves rectangular rooms, joins each room to the next with an
//! L-shaped corridor, and puts the up stairs in the first room and the down
//! stairs in the last.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Floor, Tile, WorldMap};
use crate::agent::{AgentId, Position};
use crate::config::DungeonConfig;
use crate::rng::GameRng;

/// A carved room, interior coordinates only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Room {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// True if the rooms come within `margin` cells of each other
    pub fn overlaps(&self, other: &Room, margin: i32) -> bool {
        self.x - margin < other.x + other.width
            && other.x - margin < self.x + self.width
            && self.y - margin < other.y + other.height
            && other.y - margin < self.y + self.height
    }
}

/// Terrain for every floor plus who stands where
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dungeon {
    floors: Vec<Floor>,
    #[serde(skip)]
    occupants: HashMap<Position, AgentId>,
}

impl Dungeon {
    /// Wrap prebuilt floors
    pub fn from_floors(floors: Vec<Floor>) -> Self {
        Self {
            floors,
            occupants: HashMap::new(),
        }
    }

    /// Generate `config.floors` floors of rooms and corridors
    pub fn generate(config: &DungeonConfig, rng: &mut GameRng) -> Self {
        let floors = (0..config.floors)
            .map(|depth| {
                let (floor, rooms) = generate_floor(config, rng);
                debug!(depth, rooms = rooms.len(), "generated floor");
                floor
            })
            .collect();
        Self::from_floors(floors)
    }

    pub fn floor(&self, index: usize) -> Option<&Floor> {
        self.floors.get(index)
    }

    pub fn floor_mut(&mut self, index: usize) -> Option<&mut Floor> {
        self.floors.get_mut(index)
    }

    /// Number of agents currently on the map
    pub fn population(&self) -> usize {
        self.occupants.len()
    }

    fn is_free(&self, pos: Position) -> bool {
        self.floors
            .get(pos.floor)
            .is_some_and(|f| f.in_bounds(pos.x, pos.y))
            && !self.occupants.contains_key(&pos)
    }
}

impl WorldMap for Dungeon {
    fn depth(&self) -> usize {
        self.floors.len()
    }

    fn bounds(&self, floor: usize) -> Option<(i32, i32)> {
        self.floors.get(floor).map(|f| (f.width(), f.height()))
    }

    fn is_tile_passable(&self, x: i32, y: i32, floor: usize) -> bool {
        self.floors
            .get(floor)
            .is_some_and(|f| f.is_passable(x, y))
    }

    fn entity_at(&self, x: i32, y: i32, floor: usize) -> Option<AgentId> {
        self.occupants.get(&Position::new(x, y, floor)).copied()
    }

    fn place_entity(&mut self, id: AgentId, pos: Position) -> bool {
        if !self.is_free(pos) {
            return false;
        }
        self.occupants.insert(pos, id);
        true
    }

    fn move_entity(&mut self, id: AgentId, from: Position, to: Position) -> bool {
        if from == to {
            return self.occupants.get(&from) == Some(&id);
        }
        if self.occupants.get(&from) != Some(&id) || !self.is_free(to) {
            return false;
        }
        self.occupants.remove(&from);
        self.occupants.insert(to, id);
        true
    }

    fn remove_entity(&mut self, id: AgentId, pos: Position) {
        if self.occupants.get(&pos) == Some(&id) {
            self.occupants.remove(&pos);
        }
    }

    fn entry_point(&self, floor: usize) -> Option<(i32, i32)> {
        self.floors.get(floor)?.entry()
    }

    fn exit_point(&self, floor: usize) -> Option<(i32, i32)> {
        self.floors.get(floor)?.exit()
    }
}

/// Carve one floor; always yields at least two rooms
fn generate_floor(config: &DungeonConfig, rng: &mut GameRng) -> (Floor, Vec<Room>) {
    let mut floor = Floor::new(config.width, config.height);
    let mut rooms: Vec<Room> = Vec::new();

    for _ in 0..config.max_rooms * 3 {
        let width = rng.roll(7) as i32 + 2;
        let height = rng.roll(4) as i32 + 1;

        // Keep one cell of wall plus one of stone margin on every side
        let max_x = config.width - width - 2;
        let max_y = config.height - height - 2;
        if max_x < 2 || max_y < 2 {
            continue;
        }
        let x = rng.below((max_x - 1) as u32) as i32 + 2;
        let y = rng.below((max_y - 1) as u32) as i32 + 2;
        let room = Room::new(x, y, width, height);

        if rooms.iter().any(|r| room.overlaps(r, 2)) {
            continue;
        }
        rooms.push(room);
        if rooms.len() >= config.max_rooms {
            break;
        }
    }

    if rooms.len() < 2 {
        rooms = vec![
            Room::new(2, 2, 3, 3),
            Room::new(config.width - 5, config.height - 5, 3, 3),
        ];
    }

    // Left to right keeps corridors short
    rooms.sort_by_key(|r| r.x);

    for room in &rooms {
        carve_room(&mut floor, room);
    }
    for pair in rooms.windows(2) {
        carve_corridor(&mut floor, pair[0].center(), pair[1].center(), rng);
    }

    let (ux, uy) = rooms[0].center();
    floor.set_tile(ux, uy, Tile::StairsUp);
    let (dx, dy) = rooms[rooms.len() - 1].center();
    floor.set_tile(dx, dy, Tile::StairsDown);

    (floor, rooms)
}

fn carve_room(floor: &mut Floor, room: &Room) {
    for x in room.x - 1..=room.x + room.width {
        for y in room.y - 1..=room.y + room.height {
            let edge = x == room.x - 1
                || x == room.x + room.width
                || y == room.y - 1
                || y == room.y + room.height;
            let tile = if edge { Tile::Wall } else { Tile::Floor };
            floor.set_tile(x, y, tile);
        }
    }
}

fn carve_corridor(floor: &mut Floor, from: (i32, i32), to: (i32, i32), rng: &mut GameRng) {
    // Pick which leg of the L comes first
    let corner = if rng.one_in(2) {
        (to.0, from.1)
    } else {
        (from.0, to.1)
    };
    for (a, b) in [(from, corner), (corner, to)] {
        let (mut x, mut y) = a;
        loop {
            dig(floor, x, y);
            if (x, y) == b {
                break;
            }
            x += (b.0 - x).signum();
            y += (b.1 - y).signum();
        }
    }
}

fn dig(floor: &mut Floor, x: i32, y: i32) {
    match floor.tile(x, y) {
        Tile::Stone => floor.set_tile(x, y, Tile::Corridor),
        Tile::Wall => floor.set_tile(x, y, Tile::Door),
        _ => {}
    }
}
