//! Terrain tiles

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// Terrain type of one map cell
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
#[repr(u8)]
pub enum Tile {
    #[default]
    Stone = 0,
    Wall = 1,
    Rubble = 2,
    Water = 3,
    Floor = 4,
    Corridor = 5,
    Door = 6,
    StairsUp = 7,
    StairsDown = 8,
}

impl Tile {
    /// Can be walked on
    pub const fn is_passable(&self) -> bool {
        matches!(
            self,
            Tile::Floor | Tile::Corridor | Tile::Door | Tile::StairsUp | Tile::StairsDown
        )
    }

    pub const fn is_stairs(&self) -> bool {
        matches!(self, Tile::StairsUp | Tile::StairsDown)
    }

    /// Map glyph used by `Floor::from_ascii` and `Floor::render`
    pub const fn glyph(&self) -> char {
        match self {
            Tile::Stone => ' ',
            Tile::Wall => '#',
            Tile::Rubble => ':',
            Tile::Water => '~',
            Tile::Floor => '.',
            Tile::Corridor => ',',
            Tile::Door => '+',
            Tile::StairsUp => '<',
            Tile::StairsDown => '>',
        }
    }

    pub const fn from_glyph(ch: char) -> Option<Self> {
        match ch {
            ' ' => Some(Tile::Stone),
            '#' => Some(Tile::Wall),
            ':' => Some(Tile::Rubble),
            '~' => Some(Tile::Water),
            '.' => Some(Tile::Floor),
            ',' => Some(Tile::Corridor),
            '+' => Some(Tile::Door),
            '<' => Some(Tile::StairsUp),
            '>' => Some(Tile::StairsDown),
            _ => None,
        }
    }
}
