//! Who may enter or target which cell
//!
//! The oracle is a read-only view: it borrows the world and the roster and
//! never mutates either, so any number of planners can query it at once.

use crate::agent::{Agent, Roster};
use crate::world::WorldMap;

/// Which rules a pathing map honours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Own cell, attackable occupants, then terrain
    Full,
    /// Own cell, then terrain only
    Simple,
}

/// Passability predicate for one asking agent on its current floor
#[derive(Clone, Copy)]
pub struct Passability<'a> {
    world: &'a dyn WorldMap,
    roster: &'a Roster,
    asker: &'a Agent,
    mode: PassMode,
}

impl<'a> Passability<'a> {
    pub fn new(
        world: &'a dyn WorldMap,
        roster: &'a Roster,
        asker: &'a Agent,
        mode: PassMode,
    ) -> Self {
        Self {
            world,
            roster,
            asker,
            mode,
        }
    }

    pub fn mode(&self) -> PassMode {
        self.mode
    }

    /// May the asker enter or target `(x, y)` on its own floor?
    pub fn can_pass(&self, x: i32, y: i32) -> bool {
        let floor = self.asker.pos.floor;
        if self.asker.pos.x == x && self.asker.pos.y == y {
            return true;
        }
        if self.mode == PassMode::Full && self.attackable_at(x, y, floor) {
            return true;
        }
        self.world.is_tile_passable(x, y, floor)
    }

    fn attackable_at(&self, x: i32, y: i32, floor: usize) -> bool {
        self.world
            .entity_at(x, y, floor)
            .and_then(|id| self.roster.get(&id))
            .is_some_and(|occupant| self.asker.can_attack(occupant))
    }
}

impl core::fmt::Debug for Passability<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Passability")
            .field("asker", &self.asker.id)
            .field("mode", &self.mode)
            .finish()
    }
}
