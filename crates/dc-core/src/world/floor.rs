//! One floor of terrain

use serde::{Deserialize, Serialize};

use super::Tile;
use crate::error::MapError;

/// Terrain grid for a single floor, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Floor {
    /// Solid stone floor of the given size
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            tiles: vec![Tile::Stone; (width * height) as usize],
        }
    }

    /// Parse ASCII art, one row per line, using `Tile::glyph` characters
    pub fn from_ascii(art: &str) -> Result<Self, MapError> {
        let rows: Vec<Vec<char>> = art.lines().map(|line| line.chars().collect()).collect();
        let expected = rows.first().map(Vec::len).ok_or(MapError::Empty)?;
        if expected == 0 {
            return Err(MapError::Empty);
        }

        let mut floor = Floor::new(expected as i32, rows.len() as i32);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(MapError::Ragged {
                    row: y,
                    expected,
                    found: row.len(),
                });
            }
            for (x, &glyph) in row.iter().enumerate() {
                let tile = Tile::from_glyph(glyph).ok_or(MapError::UnknownGlyph { glyph, x, y })?;
                floor.set_tile(x as i32, y as i32, tile);
            }
        }
        Ok(floor)
    }

    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub const fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Tile at a position; out of bounds reads as stone
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        if !self.in_bounds(x, y) {
            return Tile::Stone;
        }
        self.tiles[(y * self.width + x) as usize]
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) {
        if self.in_bounds(x, y) {
            self.tiles[(y * self.width + x) as usize] = tile;
        }
    }

    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).is_passable()
    }

    /// First cell holding `tile`, scanning rows top to bottom
    pub fn find(&self, tile: Tile) -> Option<(i32, i32)> {
        self.tiles
            .iter()
            .position(|&t| t == tile)
            .map(|i| (i as i32 % self.width, i as i32 / self.width))
    }

    /// Up stairs
    pub fn entry(&self) -> Option<(i32, i32)> {
        self.find(Tile::StairsUp)
    }

    /// Down stairs
    pub fn exit(&self) -> Option<(i32, i32)> {
        self.find(Tile::StairsDown)
    }

    /// Back to ASCII, inverse of `from_ascii`
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(((self.width + 1) * self.height) as usize);
        for y in 0..self.height {
            if y > 0 {
                out.push('\n');
            }
            for x in 0..self.width {
                out.push(self.tile(x, y).glyph());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ART: &str = "#####\n#<.>#\n#####";

    #[test]
    fn test_parse_and_render() {
        let floor = Floor::from_ascii(ART).unwrap();
        assert_eq!(floor.width(), 5);
        assert_eq!(floor.height(), 3);
        assert_eq!(floor.tile(1, 1), Tile::StairsUp);
        assert_eq!(floor.entry(), Some((1, 1)));
        assert_eq!(floor.exit(), Some((3, 1)));
        assert_eq!(floor.render(), ART);
    }

    #[test]
    fn test_out_of_bounds_is_stone() {
        let floor = Floor::from_ascii(ART).unwrap();
        assert_eq!(floor.tile(-1, 0), Tile::Stone);
        assert_eq!(floor.tile(5, 1), Tile::Stone);
        assert!(!floor.is_passable(9, 9));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Floor::from_ascii(""), Err(MapError::Empty));
        assert_eq!(
            Floor::from_ascii("###\n##"),
            Err(MapError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            Floor::from_ascii("#?#"),
            Err(MapError::UnknownGlyph { glyph: '?', x: 1, y: 0 })
        );
    }
}
